// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Regex structuring of extracted document text.
//!
//! Determinism rules: the document is walked top to bottom exactly once per
//! concern, first match wins for identity fields, and troubleshooting text
//! attaches to the nearest preceding error row (a blank line or section
//! header breaks adjacency). Nothing is invented: a document that does not
//! support a field leaves it empty and the descriptor is marked partial.

use fieldgate_core::errors::{GatewayError, GatewayResult, ValidationError};
use fieldgate_descriptor::{
  Addressing, DeviceDescriptor, ErrorCode, Interval, ObjectRef, ObjectType, ParameterSpec,
  ProtocolExtension, RegisterEntry, ValueKind,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

static MANUFACTURER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
  [
    r"(?im)^\s*manufacturer[:\s]+([A-Za-z0-9 &\-\.]+?)\s*$",
    r"(?im)^\s*brand[:\s]+([A-Za-z0-9 &\-\.]+?)\s*$",
    r"(?im)^\s*company[:\s]+([A-Za-z0-9 &\-\.]+?)\s*$",
  ]
  .iter()
  .map(|p| Regex::new(p).expect("static pattern compiles"))
  .collect()
});

static MODEL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
  [
    r"(?im)^\s*model[:\s]+([A-Za-z0-9 \-_\.]+?)\s*$",
    r"(?im)^\s*part number[:\s]+([A-Za-z0-9 \-_\.]+?)\s*$",
    r"(?im)^\s*product[:\s]+([A-Za-z0-9 \-_\.]+?)\s*$",
  ]
  .iter()
  .map(|p| Regex::new(p).expect("static pattern compiles"))
  .collect()
});

static PROTOCOL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
  [
    r"(?im)^\s*protocol[:\s]+([A-Za-z0-9 \-_/]+?)\s*$",
    r"(?im)^\s*communication[:\s]+([A-Za-z0-9 \-_/]+?)\s*$",
    r"(?im)^\s*interface[:\s]+([A-Za-z0-9 \-_/]+?)\s*$",
  ]
  .iter()
  .map(|p| Regex::new(p).expect("static pattern compiles"))
  .collect()
});

static DEVICE_TYPE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
  [
    r"(?im)^\s*device type[:\s]+([A-Za-z0-9 \-_]+?)\s*$",
    r"(?im)^\s*product type[:\s]+([A-Za-z0-9 \-_]+?)\s*$",
    r"(?im)^\s*category[:\s]+([A-Za-z0-9 \-_]+?)\s*$",
  ]
  .iter()
  .map(|p| Regex::new(p).expect("static pattern compiles"))
  .collect()
});

/// BACnet object tuples: `AI:1 Room Temperature`, `AV 2: Setpoint` ...
static OBJECT_ROW: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?m)^\s*(AI|AV|BI|BV|MSV)[\s:]+(\d+)[\s:]+([A-Za-z][A-Za-z0-9 _\-]*?)\s*(?:\(|range|units?|$)")
    .expect("static pattern compiles")
});

/// REST endpoint rows: `endpoint: /api/temperature` and friends.
static ENDPOINT_ROW: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?im)^\s*(?:endpoint|api|url)[:\s]+(/[A-Za-z0-9/_\-]+)").expect("static pattern compiles")
});

/// Modbus register rows: `register 30001: Temperature_Sensor_1 (float, °C)`.
static REGISTER_ROW: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?im)^\s*register\s+(\d{1,5})[:\s]+([A-Za-z][A-Za-z0-9_]*)\s*(?:\((float|int|bool)(?:\s*,\s*([^)]+))?\))?",
  )
  .expect("static pattern compiles")
});

/// Error table rows: `E001 - Temperature sensor failure`, `0x02: ...`,
/// `S003 ...`.
static ERROR_ROW: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?m)^\s*(E\d{3}|S\d{3}|0x[0-9A-Fa-f]{2})\s*[-:\s]\s*(\S.*?)\s*$").expect("static pattern compiles")
});

static RANGE_IN_LINE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)range[:\s]*\(?\s*(-?\d+(?:\.\d+)?)\s*(?:to|–|\.\.|,|-)\s*(-?\d+(?:\.\d+)?)\s*\)?")
    .expect("static pattern compiles")
});

static UNIT_IN_LINE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)units?[:\s]*([A-Za-z%°][A-Za-z0-9%°/]*)").expect("static pattern compiles"));

static SECTION_HEADER: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)^\s*(troubleshooting|maintenance)\b").expect("static pattern compiles"));

static BULLET_LINE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^\s*[-•*]\s*(\S.*?)\s*$").expect("static pattern compiles"));

/// Maintenance rows: `sensor calibration: every 90 days`.
static MAINTENANCE_ROW: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)^\s*[-•*]?\s*([A-Za-z][A-Za-z _]*?)\s*:\s*(?:every\s+)?(\d+)\s*([A-Za-z]+)\s*$")
    .expect("static pattern compiles")
});

fn reject(message: String) -> GatewayError {
  GatewayError::Validation(ValidationError::InvariantViolation(message))
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
  for pattern in patterns {
    if let Some(captures) = pattern.captures(text) {
      return Some(captures[1].trim().to_owned());
    }
  }
  None
}

/// Fold vendor spellings into the canonical protocol set.
fn normalize_protocol(raw: &str) -> Option<&'static str> {
  let lower = raw.to_lowercase();
  if lower.contains("bacnet") {
    Some("BACnet")
  } else if lower.contains("modbus") {
    Some("Modbus")
  } else if lower.contains("rest") || lower.contains("http") {
    Some("REST")
  } else if lower.contains("opc") {
    Some("OPC-UA")
  } else {
    None
  }
}

fn snake_case(raw: &str) -> String {
  raw
    .trim()
    .to_lowercase()
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
    .collect::<String>()
    .split('_')
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join("_")
}

fn interval_or_wide(range: Option<(f64, f64)>, kind: ValueKind) -> GatewayResult<Interval> {
  let (low, high) = match range {
    Some(pair) => pair,
    // Type-appropriate wide defaults for silent documents.
    None => match kind {
      ValueKind::Float => (-1.0e6, 1.0e6),
      ValueKind::Int => (-1.0e6, 1.0e6),
      ValueKind::Bool => (0.0, 1.0),
      ValueKind::Enum => (1.0, 16.0),
    },
  };
  Interval::new(low, high).map_err(GatewayError::Validation)
}

fn range_in(line: &str) -> Option<(f64, f64)> {
  let captures = RANGE_IN_LINE.captures(line)?;
  let low: f64 = captures[1].parse().ok()?;
  let high: f64 = captures[2].parse().ok()?;
  (low <= high).then_some((low, high))
}

fn unit_in(line: &str) -> Option<String> {
  UNIT_IN_LINE.captures(line).map(|c| c[1].trim().to_owned())
}

/// Normalize a maintenance interval to days. Unknown units reject the
/// document rather than guessing.
fn interval_to_days(count: u32, unit: &str) -> GatewayResult<u32> {
  let multiplier = match unit.to_lowercase().as_str() {
    "day" | "days" => 1,
    "week" | "weeks" => 7,
    "month" | "months" => 30,
    "year" | "years" => 365,
    other => {
      return Err(reject(format!(
        "maintenance interval unit \"{other}\" cannot be normalized to days"
      )));
    }
  };
  Ok(count * multiplier)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
  Body,
  Troubleshooting,
  Maintenance,
}

/// Structure extracted text into a validated descriptor.
pub fn structure_text(text: &str) -> GatewayResult<DeviceDescriptor> {
  let manufacturer = first_capture(&MANUFACTURER_PATTERNS, text);
  let model = first_capture(&MODEL_PATTERNS, text);
  let device_type = first_capture(&DEVICE_TYPE_PATTERNS, text).map(|t| snake_case(&t));

  // Parameter tables, one sweep per protocol style.
  let mut object_params: Vec<(ObjectRef, ParameterSpec)> = Vec::new();
  for captures in OBJECT_ROW.captures_iter(text) {
    let object_type =
      ObjectType::from_str(&captures[1]).expect("pattern only matches known object types");
    let instance: u32 = captures[2].parse().map_err(|_| reject("object instance overflow".to_owned()))?;
    let name = snake_case(&captures[3]);
    let line = &text[captures.get(0).expect("whole match").range().start..];
    let line = line.lines().next().unwrap_or_default();
    let kind = match object_type {
      ObjectType::AI | ObjectType::AV => ValueKind::Float,
      ObjectType::BI | ObjectType::BV => ValueKind::Bool,
      ObjectType::MSV => ValueKind::Enum,
    };
    let range = interval_or_wide(range_in(line), kind)?;
    let parameter = ParameterSpec::new(
      &name,
      kind,
      &unit_in(line).unwrap_or_default(),
      range,
      range,
      range,
      Vec::new(),
      Addressing::Object { object_type, instance },
    )
    .map_err(GatewayError::Validation)?;
    object_params.push((ObjectRef::new(object_type, instance), parameter));
  }

  let mut endpoint_params: Vec<ParameterSpec> = Vec::new();
  for captures in ENDPOINT_ROW.captures_iter(text) {
    let path = captures[1].trim_end_matches('/').to_owned();
    let name = snake_case(path.rsplit('/').next().unwrap_or(&path));
    if name.is_empty() {
      continue;
    }
    let line = &text[captures.get(0).expect("whole match").range().start..];
    let line = line.lines().next().unwrap_or_default();
    let range = interval_or_wide(range_in(line), ValueKind::Float)?;
    endpoint_params.push(
      ParameterSpec::new(
        &name,
        ValueKind::Float,
        &unit_in(line).unwrap_or_default(),
        range,
        range,
        range,
        Vec::new(),
        Addressing::Endpoint { path },
      )
      .map_err(GatewayError::Validation)?,
    );
  }

  let mut register_params: Vec<(u32, ParameterSpec)> = Vec::new();
  for captures in REGISTER_ROW.captures_iter(text) {
    let address: u32 = captures[1].parse().map_err(|_| reject("register address overflow".to_owned()))?;
    let name = captures[2].to_owned();
    let kind = match captures.get(3).map(|m| m.as_str()) {
      Some("int") => ValueKind::Int,
      Some("bool") => ValueKind::Bool,
      Some(_) => ValueKind::Float,
      // Coils and discrete inputs are bits; registers default to floats.
      None if address < 30000 => ValueKind::Bool,
      None => ValueKind::Float,
    };
    let unit = captures.get(4).map(|m| m.as_str().trim().to_owned()).unwrap_or_default();
    let line = &text[captures.get(0).expect("whole match").range().start..];
    let line = line.lines().next().unwrap_or_default();
    let range = interval_or_wide(range_in(line), kind)?;
    register_params.push((
      address,
      ParameterSpec::new(
        &name,
        kind,
        &unit,
        range,
        range,
        range,
        Vec::new(),
        Addressing::Register {
          address,
          scale: if kind == ValueKind::Float { 100.0 } else { 1.0 },
        },
      )
      .map_err(GatewayError::Validation)?,
    ));
  }

  // Protocol: declared in the document, or inferred from which table style
  // the document actually contains.
  let protocol = first_capture(&PROTOCOL_PATTERNS, text)
    .and_then(|raw| normalize_protocol(&raw).map(|p| p.to_owned()))
    .or_else(|| {
      if !object_params.is_empty() {
        Some("BACnet".to_owned())
      } else if !register_params.is_empty() {
        Some("Modbus".to_owned())
      } else if !endpoint_params.is_empty() {
        Some("REST".to_owned())
      } else {
        None
      }
    })
    .ok_or_else(|| reject("document does not identify a protocol".to_owned()))?;
  if protocol == "OPC-UA" {
    return Err(reject("OPC-UA documents are recognized but the gateway does not speak OPC-UA".to_owned()));
  }

  // Line walk: error table, troubleshooting adjacency, maintenance schedule.
  let mut error_codes: Vec<(String, ErrorCode)> = Vec::new();
  let mut troubleshooting: Vec<String> = Vec::new();
  let mut maintenance: Vec<(String, u32)> = Vec::new();
  let mut section = Section::Body;
  // Index into error_codes of the nearest preceding error row, cleared by
  // blank lines and section headers.
  let mut adjacent_error: Option<usize> = None;

  for line in text.lines() {
    if line.trim().is_empty() {
      adjacent_error = None;
      continue;
    }
    if let Some(captures) = SECTION_HEADER.captures(line) {
      section = match captures[1].to_lowercase().as_str() {
        "troubleshooting" => Section::Troubleshooting,
        _ => Section::Maintenance,
      };
      adjacent_error = None;
      continue;
    }
    if let Some(captures) = ERROR_ROW.captures(line) {
      let code = captures[1].to_owned();
      let rest = captures[2].trim();
      // `description - first remediation step` rows carry their remediation
      // inline.
      let (description, remediation) = match rest.split_once(" - ") {
        Some((description, step)) => (description.trim(), vec![step.trim().to_owned()]),
        None => (rest, Vec::new()),
      };
      if error_codes.iter().any(|(existing, _)| *existing == code) {
        return Err(reject(format!("duplicate error code \"{code}\" in document")));
      }
      error_codes.push((code, ErrorCode::new(description, remediation)));
      adjacent_error = Some(error_codes.len() - 1);
      continue;
    }
    if section == Section::Maintenance {
      if let Some(captures) = MAINTENANCE_ROW.captures(line) {
        let task = snake_case(&captures[1]);
        let count: u32 = captures[2].parse().map_err(|_| reject("maintenance interval overflow".to_owned()))?;
        maintenance.push((task, interval_to_days(count, &captures[3])?));
        continue;
      }
    }
    if let Some(captures) = BULLET_LINE.captures(line) {
      let step = captures[1].to_owned();
      // Nearest preceding error row wins; orphan bullets inside the
      // troubleshooting section become descriptor-level steps.
      if let Some(slot) = adjacent_error {
        let (code, entry) = &error_codes[slot];
        let mut steps = entry.remediation_steps().clone();
        steps.push(step);
        error_codes[slot] = (code.clone(), ErrorCode::new(entry.description(), steps));
      } else if section == Section::Troubleshooting {
        troubleshooting.push(step);
      }
    }
  }

  let partial = manufacturer.is_none()
    || model.is_none()
    || device_type.is_none()
    || (object_params.is_empty() && endpoint_params.is_empty() && register_params.is_empty());

  let (parameters, extension) = match protocol.as_str() {
    "BACnet" => {
      let mut object_map = BTreeMap::new();
      let mut parameters = Vec::new();
      for (object, parameter) in object_params {
        object_map.insert(object, parameter.name().clone());
        parameters.push(parameter);
      }
      (parameters, ProtocolExtension::Bacnet { object_map })
    }
    "Modbus" => {
      let mut register_map = BTreeMap::new();
      let mut parameters = Vec::new();
      for (address, parameter) in register_params {
        register_map.insert(
          address,
          RegisterEntry::new(
            parameter.name(),
            parameter.kind(),
            parameter.unit(),
            match parameter.addressing() {
              Addressing::Register { scale, .. } => *scale,
              _ => 1.0,
            },
          ),
        );
        parameters.push(parameter);
      }
      (parameters, ProtocolExtension::Modbus { register_map })
    }
    _ => {
      let mut endpoint_map = BTreeMap::new();
      let mut parameters = Vec::new();
      for parameter in endpoint_params {
        if let Addressing::Endpoint { path } = parameter.addressing() {
          endpoint_map.insert(parameter.name().clone(), path.clone());
        }
        parameters.push(parameter);
      }
      (parameters, ProtocolExtension::Rest { endpoint_map })
    }
  };

  debug!(
    "structured document: protocol={protocol}, {} parameters, {} error codes, partial={partial}",
    parameters.len(),
    error_codes.len()
  );

  DeviceDescriptor::new(
    manufacturer.as_deref().unwrap_or("unknown"),
    model.as_deref().unwrap_or("unknown"),
    device_type.as_deref().unwrap_or("unknown"),
    &protocol,
    parameters,
    error_codes,
    troubleshooting,
    maintenance,
    text.to_owned(),
    partial,
    extension,
  )
  .map_err(GatewayError::Validation)
}
