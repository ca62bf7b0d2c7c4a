// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use chrono::{DateTime, Utc};
use getset::Getters;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value read from or written to a device, already lifted out of its wire
/// representation by the protocol codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
  Float(f64),
  Int(i64),
  Bool(bool),
  /// Multi-state value carried as its state name.
  Enum(String),
  /// Free-text payload (e.g. a text/plain REST response).
  Text(String),
}

impl TypedValue {
  /// Numeric view used by the anomaly strategies. Booleans map to 0/1;
  /// enum/text values have no numeric reading.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      TypedValue::Float(v) => Some(*v),
      TypedValue::Int(v) => Some(*v as f64),
      TypedValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
      TypedValue::Enum(_) | TypedValue::Text(_) => None,
    }
  }
}

impl fmt::Display for TypedValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TypedValue::Float(v) => write!(f, "{v}"),
      TypedValue::Int(v) => write!(f, "{v}"),
      TypedValue::Bool(v) => write!(f, "{v}"),
      TypedValue::Enum(v) | TypedValue::Text(v) => write!(f, "{v}"),
    }
  }
}

/// One observation of one parameter, as returned by a session read. The unit
/// always comes from the descriptor's parameter spec, never from the wire.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct Reading {
  parameter: String,
  value: TypedValue,
  unit: String,
  timestamp: DateTime<Utc>,
}

impl Reading {
  pub fn new(parameter: &str, value: TypedValue, unit: &str, timestamp: DateTime<Utc>) -> Self {
    Self {
      parameter: parameter.to_owned(),
      value,
      unit: unit.to_owned(),
      timestamp,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn numeric_views() {
    assert_eq!(TypedValue::Float(22.5).as_f64(), Some(22.5));
    assert_eq!(TypedValue::Int(1450).as_f64(), Some(1450.0));
    assert_eq!(TypedValue::Bool(true).as_f64(), Some(1.0));
    assert_eq!(TypedValue::Enum("auto".to_owned()).as_f64(), None);
  }
}
