// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::parameter::{Addressing, ObjectType, ParameterSpec, ValueKind};
use fieldgate_core::errors::ValidationError;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One entry in a descriptor's error-code table.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct ErrorCode {
  description: String,
  remediation_steps: Vec<String>,
}

impl ErrorCode {
  pub fn new(description: &str, remediation_steps: Vec<String>) -> Self {
    Self {
      description: description.to_owned(),
      remediation_steps,
    }
  }
}

/// One row of a Modbus register map.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize, Deserialize)]
pub struct RegisterEntry {
  #[getset(get = "pub")]
  parameter: String,
  #[getset(get_copy = "pub")]
  kind: ValueKind,
  #[getset(get = "pub")]
  unit: String,
  /// Wire scale for float registers (value × scale, rounded, big-endian in
  /// two consecutive registers).
  #[getset(get_copy = "pub")]
  scale: f64,
}

impl RegisterEntry {
  pub fn new(parameter: &str, kind: ValueKind, unit: &str, scale: f64) -> Self {
    Self {
      parameter: parameter.to_owned(),
      kind,
      unit: unit.to_owned(),
      scale,
    }
  }
}

/// BACnet `(object_type, instance)` pair, serialized as `"AI:1"` so it can
/// key a JSON map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ObjectRef {
  pub object_type: ObjectType,
  pub instance: u32,
}

impl ObjectRef {
  pub fn new(object_type: ObjectType, instance: u32) -> Self {
    Self {
      object_type,
      instance,
    }
  }
}

impl fmt::Display for ObjectRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.object_type, self.instance)
  }
}

impl From<ObjectRef> for String {
  fn from(value: ObjectRef) -> Self {
    value.to_string()
  }
}

impl TryFrom<String> for ObjectRef {
  type Error = String;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    let (object_type, instance) = value
      .split_once(':')
      .ok_or_else(|| format!("object reference \"{value}\" is missing ':'"))?;
    Ok(ObjectRef {
      object_type: ObjectType::from_str(object_type)
        .map_err(|_| format!("unknown object type \"{object_type}\""))?,
      instance: instance
        .parse()
        .map_err(|_| format!("bad object instance \"{instance}\""))?,
    })
  }
}

/// Protocol-specific addressing extension of a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum ProtocolExtension {
  Modbus {
    register_map: BTreeMap<u32, RegisterEntry>,
  },
  Bacnet {
    object_map: BTreeMap<ObjectRef, String>,
  },
  Rest {
    endpoint_map: BTreeMap<String, String>,
  },
}

impl ProtocolExtension {
  pub fn protocol_key(&self) -> &'static str {
    match self {
      ProtocolExtension::Modbus { .. } => "modbus",
      ProtocolExtension::Bacnet { .. } => "bacnet",
      ProtocolExtension::Rest { .. } => "rest",
    }
  }
}

/// Everything the gateway has learned about one device model.
///
/// Field order matters: serialization is field-ordered and all maps are
/// `BTreeMap`s, so saving the same descriptor twice produces byte-identical
/// files.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize, Deserialize)]
pub struct DeviceDescriptor {
  #[getset(get = "pub")]
  device_id: String,
  #[getset(get = "pub")]
  manufacturer: String,
  #[getset(get = "pub")]
  model: String,
  #[getset(get = "pub")]
  device_type: String,
  /// Canonical protocol name: `REST`, `BACnet`, `Modbus`, or `OPC-UA`.
  #[getset(get = "pub")]
  protocol_name: String,
  #[getset(get = "pub")]
  parameters: BTreeMap<String, ParameterSpec>,
  #[getset(get = "pub")]
  error_codes: BTreeMap<String, ErrorCode>,
  #[getset(get = "pub")]
  troubleshooting_steps: Vec<String>,
  /// Task name → interval in days.
  #[getset(get = "pub")]
  maintenance_schedule: BTreeMap<String, u32>,
  /// Original document text, retained for re-embedding.
  #[getset(get = "pub")]
  raw_text: String,
  /// Set when the source document did not support every field; consumers
  /// treat absent fields as unknown rather than defaulting.
  #[getset(get_copy = "pub")]
  partial: bool,
  #[getset(get = "pub")]
  extension: ProtocolExtension,
}

impl DeviceDescriptor {
  /// Stable identifier derived from manufacturer and model.
  pub fn derive_device_id(manufacturer: &str, model: &str) -> String {
    let normalize = |s: &str| {
      s.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
    };
    format!("{}_{}", normalize(manufacturer), normalize(model))
  }

  /// Build and validate a descriptor. Parameter and error-code inputs are
  /// sequences so duplicate names/codes can be rejected instead of silently
  /// collapsed.
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    manufacturer: &str,
    model: &str,
    device_type: &str,
    protocol_name: &str,
    parameters: Vec<ParameterSpec>,
    error_codes: Vec<(String, ErrorCode)>,
    troubleshooting_steps: Vec<String>,
    maintenance_schedule: Vec<(String, u32)>,
    raw_text: String,
    partial: bool,
    extension: ProtocolExtension,
  ) -> Result<Self, ValidationError> {
    let mut parameter_map = BTreeMap::new();
    for parameter in parameters {
      if parameter_map
        .insert(parameter.name().clone(), parameter)
        .is_some()
      {
        return Err(ValidationError::InvariantViolation(
          "duplicate parameter name in descriptor".to_owned(),
        ));
      }
    }
    let mut code_map = BTreeMap::new();
    for (code, entry) in error_codes {
      if code_map.insert(code.clone(), entry).is_some() {
        return Err(ValidationError::InvariantViolation(format!(
          "duplicate error code \"{code}\" in descriptor"
        )));
      }
    }
    let mut schedule = BTreeMap::new();
    for (task, interval_days) in maintenance_schedule {
      if interval_days == 0 {
        return Err(ValidationError::InvariantViolation(format!(
          "maintenance task \"{task}\" has a zero-day interval"
        )));
      }
      schedule.insert(task, interval_days);
    }

    let descriptor = Self {
      device_id: Self::derive_device_id(manufacturer, model),
      manufacturer: manufacturer.to_owned(),
      model: model.to_owned(),
      device_type: device_type.to_owned(),
      protocol_name: protocol_name.to_owned(),
      parameters: parameter_map,
      error_codes: code_map,
      troubleshooting_steps,
      maintenance_schedule: schedule,
      raw_text,
      partial,
      extension,
    };
    descriptor.validate()?;
    Ok(descriptor)
  }

  /// Lowercase protocol key used for registry and addressing checks.
  pub fn protocol_key(&self) -> String {
    self.protocol_name.to_lowercase()
  }

  pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
    self.parameters.get(name)
  }

  /// Full §3 validation: range nesting (checked again in case the descriptor
  /// was deserialized rather than constructed), addressing consistency, and
  /// extension/parameter cross-consistency.
  pub fn validate(&self) -> Result<(), ValidationError> {
    let key = self.protocol_key();
    if self.extension.protocol_key() != key {
      return Err(ValidationError::InvariantViolation(format!(
        "descriptor speaks {} but carries a {} extension",
        key,
        self.extension.protocol_key()
      )));
    }
    for parameter in self.parameters.values() {
      parameter.validate_for_protocol(&key)?;
      match (&self.extension, parameter.addressing()) {
        (ProtocolExtension::Modbus { register_map }, Addressing::Register { address, .. }) => {
          if !register_map.contains_key(address) {
            return Err(ValidationError::InvariantViolation(format!(
              "parameter \"{}\" addresses register {address} missing from the register map",
              parameter.name()
            )));
          }
        }
        (ProtocolExtension::Bacnet { object_map }, Addressing::Object { object_type, instance }) => {
          let object = ObjectRef::new(*object_type, *instance);
          if !object_map.contains_key(&object) {
            return Err(ValidationError::InvariantViolation(format!(
              "parameter \"{}\" addresses object {object} missing from the object map",
              parameter.name()
            )));
          }
        }
        (ProtocolExtension::Rest { endpoint_map }, Addressing::Endpoint { .. }) => {
          if !endpoint_map.contains_key(parameter.name()) {
            return Err(ValidationError::InvariantViolation(format!(
              "parameter \"{}\" is missing from the endpoint map",
              parameter.name()
            )));
          }
        }
        // validate_for_protocol already rejected the mismatch.
        _ => unreachable!("addressing/extension mismatch survived protocol check"),
      }
    }
    Ok(())
  }

  /// Find the parameter mapped to a Modbus register address, if any.
  pub fn parameter_for_register(&self, address: u32) -> Option<&ParameterSpec> {
    match &self.extension {
      ProtocolExtension::Modbus { register_map } => {
        let entry = register_map.get(&address)?;
        self.parameters.get(entry.parameter())
      }
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parameter::Interval;

  #[test]
  fn device_id_derivation() {
    assert_eq!(
      DeviceDescriptor::derive_device_id("Johnson Controls", "Metasys NAE55"),
      "johnson_controls_metasys_nae55"
    );
    assert_eq!(
      DeviceDescriptor::derive_device_id(" Honeywell ", "T6 Pro"),
      "honeywell_t6_pro"
    );
  }

  #[test]
  fn object_ref_round_trips_through_string() {
    let object = ObjectRef::new(ObjectType::MSV, 12);
    let text: String = object.into();
    assert_eq!(text, "MSV:12");
    assert_eq!(ObjectRef::try_from(text).unwrap(), object);
    assert!(ObjectRef::try_from("XX:1".to_owned()).is_err());
    assert!(ObjectRef::try_from("AI".to_owned()).is_err());
  }

  #[test]
  fn duplicate_error_codes_rejected() {
    let result = DeviceDescriptor::new(
      "Acme",
      "Unit 1",
      "sensor",
      "REST",
      vec![],
      vec![
        ("E001".to_owned(), ErrorCode::new("first", vec![])),
        ("E001".to_owned(), ErrorCode::new("second", vec![])),
      ],
      vec![],
      vec![],
      String::new(),
      true,
      ProtocolExtension::Rest {
        endpoint_map: BTreeMap::new(),
      },
    );
    assert!(result.is_err());
  }

  #[test]
  fn extension_mismatch_rejected() {
    let parameter = ParameterSpec::new(
      "temperature",
      ValueKind::Float,
      "°C",
      Interval::new(18.0, 26.0).unwrap(),
      Interval::new(15.0, 30.0).unwrap(),
      Interval::new(10.0, 40.0).unwrap(),
      vec![],
      Addressing::Register { address: 30001, scale: 100.0 },
    )
    .unwrap();
    let result = DeviceDescriptor::new(
      "Acme",
      "Unit 1",
      "sensor",
      "REST",
      vec![parameter],
      vec![],
      vec![],
      vec![],
      String::new(),
      false,
      ProtocolExtension::Rest {
        endpoint_map: BTreeMap::new(),
      },
    );
    assert!(result.is_err());
  }

  #[test]
  fn zero_interval_maintenance_rejected() {
    let result = DeviceDescriptor::new(
      "Acme",
      "Unit 1",
      "sensor",
      "REST",
      vec![],
      vec![],
      vec![],
      vec![("calibration".to_owned(), 0)],
      String::new(),
      false,
      ProtocolExtension::Rest {
        endpoint_map: BTreeMap::new(),
      },
    );
    assert!(result.is_err());
  }
}
