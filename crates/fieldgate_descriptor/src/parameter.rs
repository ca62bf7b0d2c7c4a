// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use fieldgate_core::errors::ValidationError;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value type of a readable/writable quantity.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
  Float,
  Int,
  Bool,
  Enum,
}

/// BACnet object types the gateway reads and writes.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum_macros::Display,
  strum_macros::EnumString,
)]
pub enum ObjectType {
  /// Analog input
  AI,
  /// Analog value
  AV,
  /// Binary input
  BI,
  /// Binary value
  BV,
  /// Multi-state value
  MSV,
}

impl ObjectType {
  /// BACnet object-type number used in object identifiers on the wire.
  pub fn wire_type(&self) -> u16 {
    match self {
      ObjectType::AI => 0,
      ObjectType::AV => 2,
      ObjectType::BI => 3,
      ObjectType::BV => 5,
      ObjectType::MSV => 19,
    }
  }

  pub fn from_wire_type(wire: u16) -> Option<Self> {
    match wire {
      0 => Some(ObjectType::AI),
      2 => Some(ObjectType::AV),
      3 => Some(ObjectType::BI),
      5 => Some(ObjectType::BV),
      19 => Some(ObjectType::MSV),
      _ => None,
    }
  }
}

/// Closed interval `[low, high]`. Intervals are never empty: construction
/// requires `low <= high`.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct Interval {
  low: f64,
  high: f64,
}

impl Interval {
  pub fn new(low: f64, high: f64) -> Result<Self, ValidationError> {
    if low > high || !low.is_finite() || !high.is_finite() {
      return Err(ValidationError::InvariantViolation(format!(
        "interval [{low}, {high}] is empty or non-finite"
      )));
    }
    Ok(Self { low, high })
  }

  pub fn contains(&self, value: f64) -> bool {
    value >= self.low && value <= self.high
  }

  /// `self ⊆ other`, both closed.
  pub fn within(&self, other: &Interval) -> bool {
    self.low >= other.low && self.high <= other.high
  }

  pub fn center(&self) -> f64 {
    (self.low + self.high) / 2.0
  }

  pub fn width(&self) -> f64 {
    self.high - self.low
  }
}

impl fmt::Display for Interval {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}, {}]", self.low, self.high)
  }
}

/// Protocol-specific addressing hint for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Addressing {
  /// Modbus logical register address (30001/40001/1/10001 address spaces)
  /// with the scale factor applied to float values on the wire.
  Register { address: u32, scale: f64 },
  /// BACnet object identifier.
  Object { object_type: ObjectType, instance: u32 },
  /// REST endpoint path relative to the device base URL.
  Endpoint { path: String },
}

impl Addressing {
  /// Canonical protocol name this addressing form belongs to.
  pub fn protocol_key(&self) -> &'static str {
    match self {
      Addressing::Register { .. } => "modbus",
      Addressing::Object { .. } => "bacnet",
      Addressing::Endpoint { .. } => "rest",
    }
  }
}

/// Typed description of one readable/writable quantity on a device.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize, Deserialize)]
pub struct ParameterSpec {
  #[getset(get = "pub")]
  name: String,
  #[getset(get_copy = "pub")]
  kind: ValueKind,
  #[getset(get = "pub")]
  unit: String,
  #[getset(get_copy = "pub")]
  normal_range: Interval,
  #[getset(get_copy = "pub")]
  warning_range: Interval,
  #[getset(get_copy = "pub")]
  error_range: Interval,
  #[getset(get = "pub")]
  troubleshooting_steps: Vec<String>,
  #[getset(get = "pub")]
  addressing: Addressing,
}

impl ParameterSpec {
  pub fn new(
    name: &str,
    kind: ValueKind,
    unit: &str,
    normal_range: Interval,
    warning_range: Interval,
    error_range: Interval,
    troubleshooting_steps: Vec<String>,
    addressing: Addressing,
  ) -> Result<Self, ValidationError> {
    let spec = Self {
      name: name.to_owned(),
      kind,
      unit: unit.to_owned(),
      normal_range,
      warning_range,
      error_range,
      troubleshooting_steps,
      addressing,
    };
    spec.validate_ranges()?;
    Ok(spec)
  }

  /// `normal ⊆ warning ⊆ error`.
  fn validate_ranges(&self) -> Result<(), ValidationError> {
    if !self.normal_range.within(&self.warning_range) {
      return Err(ValidationError::InvariantViolation(format!(
        "parameter \"{}\": normal range {} exceeds warning range {}",
        self.name, self.normal_range, self.warning_range
      )));
    }
    if !self.warning_range.within(&self.error_range) {
      return Err(ValidationError::InvariantViolation(format!(
        "parameter \"{}\": warning range {} exceeds error range {}",
        self.name, self.warning_range, self.error_range
      )));
    }
    Ok(())
  }

  /// The addressing hint must match the descriptor's protocol.
  pub fn validate_for_protocol(&self, protocol_key: &str) -> Result<(), ValidationError> {
    if self.addressing.protocol_key() != protocol_key {
      return Err(ValidationError::InvariantViolation(format!(
        "parameter \"{}\" is addressed for {} but the descriptor speaks {}",
        self.name,
        self.addressing.protocol_key(),
        protocol_key
      )));
    }
    Ok(())
  }
}
