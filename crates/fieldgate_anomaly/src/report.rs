// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use chrono::{DateTime, Utc};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyType {
  Range,
  Drift,
  Pattern,
  MaintenanceOverdue,
  Environmental,
  Learned,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum_macros::Display,
  strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

/// One detected anomaly with its documentation context.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize, Deserialize)]
pub struct AnomalyReport {
  #[getset(get = "pub")]
  anomaly_id: String,
  #[getset(get = "pub")]
  device_id: String,
  #[getset(get_copy = "pub")]
  anomaly_type: AnomalyType,
  #[getset(get_copy = "pub")]
  severity: Severity,
  #[getset(get = "pub")]
  parameter: String,
  #[getset(get_copy = "pub")]
  current_value: f64,
  /// `(low, high)` the value was expected inside.
  #[getset(get_copy = "pub")]
  expected_range: (f64, f64),
  #[getset(get_copy = "pub")]
  deviation_pct: f64,
  #[getset(get = "pub")]
  description: String,
  #[getset(get = "pub")]
  root_cause_hint: String,
  /// Always sourced from the descriptor or the fixed environmental playbook.
  #[getset(get = "pub")]
  remediation_steps: Vec<String>,
  #[getset(get_copy = "pub")]
  maintenance_required: bool,
  #[getset(get_copy = "pub")]
  confidence: f64,
  #[getset(get_copy = "pub")]
  timestamp: DateTime<Utc>,
}

impl AnomalyReport {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    device_id: &str,
    anomaly_type: AnomalyType,
    severity: Severity,
    parameter: &str,
    current_value: f64,
    expected_range: (f64, f64),
    deviation_pct: f64,
    description: String,
    root_cause_hint: String,
    remediation_steps: Vec<String>,
    maintenance_required: bool,
    confidence: f64,
    timestamp: DateTime<Utc>,
  ) -> Self {
    Self {
      anomaly_id: format!(
        "{device_id}_{parameter}_{anomaly_type}_{}",
        timestamp.format("%Y%m%d_%H%M%S")
      ),
      device_id: device_id.to_owned(),
      anomaly_type,
      severity,
      parameter: parameter.to_owned(),
      current_value,
      expected_range,
      deviation_pct,
      description,
      root_cause_hint,
      remediation_steps,
      maintenance_required,
      confidence,
      timestamp,
    }
  }
}

/// Aggregate view over the retained report history of one device.
#[derive(Debug, Clone, Getters, CopyGetters, Serialize, Deserialize)]
pub struct AnomalySummary {
  #[getset(get_copy = "pub")]
  total: usize,
  #[getset(get = "pub")]
  by_severity: BTreeMap<String, usize>,
  #[getset(get = "pub")]
  by_type: BTreeMap<String, usize>,
  #[getset(get_copy = "pub")]
  latest: Option<DateTime<Utc>>,
  #[getset(get_copy = "pub")]
  critical_count: usize,
}

impl AnomalySummary {
  pub fn new(
    total: usize,
    by_severity: BTreeMap<String, usize>,
    by_type: BTreeMap<String, usize>,
    latest: Option<DateTime<Utc>>,
    critical_count: usize,
  ) -> Self {
    Self {
      total,
      by_severity,
      by_type,
      latest,
      critical_count,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn severity_orders_low_to_critical() {
    assert!(Severity::Low < Severity::Medium);
    assert!(Severity::Medium < Severity::High);
    assert!(Severity::High < Severity::Critical);
  }

  #[test]
  fn type_tags_are_kebab_case() {
    assert_eq!(AnomalyType::MaintenanceOverdue.to_string(), "maintenance-overdue");
    assert_eq!(AnomalyType::Range.to_string(), "range");
  }

  #[test]
  fn anomaly_id_carries_device_parameter_and_type() {
    let report = AnomalyReport::new(
      "hvac_001",
      AnomalyType::Range,
      Severity::Medium,
      "temperature",
      38.5,
      (18.0, 26.0),
      120.0,
      "out of range".to_owned(),
      "sensor".to_owned(),
      vec![],
      false,
      0.85,
      Utc::now(),
    );
    assert!(report.anomaly_id().starts_with("hvac_001_temperature_range_"));
    assert_eq!(report.device_id(), "hvac_001");
  }
}
