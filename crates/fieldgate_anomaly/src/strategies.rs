// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The six detection strategies.
//!
//! Thresholds and confidences follow the device-documentation playbook:
//! 20%/50% drift, std over 10% of mean or a 20%-of-mean jump for patterns,
//! interval and 2× interval for maintenance, 30 °C / 80 %RH for the
//! environmental cross-check, and a 0.7 trigger for the learned score.

use crate::report::{AnomalyReport, AnomalyType, Severity};
use crate::{DetectionContext, Observation};
use fieldgate_descriptor::ParameterSpec;
use fieldgate_ml::ModelBundle;

/// Drift beyond this fraction of the baseline is reported.
const DRIFT_MEDIUM: f64 = 20.0;
const DRIFT_HIGH: f64 = 50.0;
/// Sample std above this fraction of the mean flags noise.
const PATTERN_NOISE_RATIO: f64 = 0.1;
/// A sample-to-sample jump above this fraction of the mean flags a spike.
const PATTERN_JUMP_RATIO: f64 = 0.2;
const ENV_TEMP_LIMIT: f64 = 30.0;
const ENV_HUMIDITY_LIMIT: f64 = 80.0;
const LEARNED_TRIGGER: f32 = 0.7;

const ENVIRONMENTAL_PLAYBOOK: [&str; 4] = [
  "Check HVAC system operation",
  "Verify ventilation",
  "Monitor for condensation",
  "Adjust environmental controls",
];

fn deviation_pct(value: f64, low: f64, high: f64) -> f64 {
  let center = (low + high) / 2.0;
  let width = high - low;
  if width == 0.0 {
    return 0.0;
  }
  (value - center).abs() / width * 100.0
}

/// Name-and-value heuristic for the likely root cause of a range excursion.
fn root_cause_hint(parameter: &str, value: f64) -> String {
  let lower = parameter.to_lowercase();
  if lower.contains("temperature") {
    if value > 40.0 {
      return "Possible sensor overheating or environmental issue".to_owned();
    }
    if value < 0.0 {
      return "Possible sensor failure or extreme cold".to_owned();
    }
  } else if lower.contains("humidity") {
    if value > 90.0 {
      return "Possible condensation or sensor contamination".to_owned();
    }
    if value < 10.0 {
      return "Possible sensor drift or dry environment".to_owned();
    }
  } else if lower.contains("pressure") {
    if value > 1100.0 {
      return "Possible sensor calibration issue".to_owned();
    }
    if value < 900.0 {
      return "Possible altitude change or sensor failure".to_owned();
    }
  }
  "Parameter outside normal operating range".to_owned()
}

fn numeric_parameters<'a>(
  context: &'a DetectionContext<'_>,
) -> impl Iterator<Item = (&'a String, &'a ParameterSpec, f64)> {
  context.current.iter().filter_map(|(name, value)| {
    context
      .descriptor
      .parameter(name)
      .map(|parameter| (name, parameter, *value))
  })
}

/// Strategy 1: documentation ranges. Closed intervals: a value exactly on the
/// warning boundary is inside warning, and a value exactly on the error
/// boundary is inside error (medium, not critical).
pub fn range(context: &DetectionContext<'_>) -> Vec<AnomalyReport> {
  let mut reports = Vec::new();
  for (name, parameter, value) in numeric_parameters(context) {
    let normal = parameter.normal_range();
    let expected = (normal.low(), normal.high());
    let deviation = deviation_pct(value, normal.low(), normal.high());
    let unit = parameter.unit();
    if !parameter.error_range().contains(value) {
      reports.push(AnomalyReport::new(
        context.device_id,
        AnomalyType::Range,
        Severity::Critical,
        name,
        value,
        expected,
        deviation,
        format!("{name} reading {value} {unit} is outside the critical range"),
        root_cause_hint(name, value),
        parameter.troubleshooting_steps().clone(),
        true,
        0.95,
        context.now,
      ));
    } else if !parameter.warning_range().contains(value) {
      reports.push(AnomalyReport::new(
        context.device_id,
        AnomalyType::Range,
        Severity::Medium,
        name,
        value,
        expected,
        deviation,
        format!("{name} reading {value} {unit} is outside the normal range"),
        root_cause_hint(name, value),
        parameter.troubleshooting_steps().clone(),
        false,
        0.85,
        context.now,
      ));
    }
  }
  reports
}

fn baseline_for(window: &[Observation], parameter: &str) -> Option<f64> {
  window
    .iter()
    .filter(|o| o.parameter == parameter)
    .min_by_key(|o| o.timestamp)
    .map(|o| o.value)
}

/// Strategy 2: drift against the first recorded observation of the session.
pub fn drift(context: &DetectionContext<'_>) -> Vec<AnomalyReport> {
  let mut reports = Vec::new();
  for (name, parameter, value) in numeric_parameters(context) {
    let Some(baseline) = baseline_for(context.window, name) else {
      continue;
    };
    if baseline.abs() < f64::EPSILON {
      continue;
    }
    let trend = (value - baseline) / baseline * 100.0;
    if !trend.is_finite() || trend.abs() <= DRIFT_MEDIUM {
      continue;
    }
    let high = trend.abs() > DRIFT_HIGH;
    reports.push(AnomalyReport::new(
      context.device_id,
      AnomalyType::Drift,
      if high { Severity::High } else { Severity::Medium },
      name,
      value,
      (baseline * 0.8, baseline * 1.2),
      trend,
      format!("{name} showing {trend:.1}% drift from baseline"),
      "Possible sensor drift or environmental change".to_owned(),
      parameter.troubleshooting_steps().clone(),
      high,
      0.80,
      context.now,
    ));
  }
  reports
}

fn window_values(window: &[Observation], parameter: &str) -> Vec<f64> {
  let mut observations: Vec<&Observation> =
    window.iter().filter(|o| o.parameter == parameter).collect();
  observations.sort_by_key(|o| o.timestamp);
  observations.iter().map(|o| o.value).collect()
}

/// Strategy 3: noise and spikes over the rolling window. Needs at least
/// three observations of the parameter.
pub fn pattern(context: &DetectionContext<'_>) -> Vec<AnomalyReport> {
  let mut reports = Vec::new();
  for (name, parameter, value) in numeric_parameters(context) {
    let values = window_values(context.window, name);
    if values.len() < 3 {
      continue;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean.abs() < f64::EPSILON {
      continue;
    }
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    let noisy = variance.sqrt() > mean.abs() * PATTERN_NOISE_RATIO;
    let spiky = values
      .windows(2)
      .any(|pair| (pair[1] - pair[0]).abs() > mean.abs() * PATTERN_JUMP_RATIO);
    if !noisy && !spiky {
      continue;
    }
    let normal = parameter.normal_range();
    reports.push(AnomalyReport::new(
      context.device_id,
      AnomalyType::Pattern,
      Severity::Medium,
      name,
      value,
      (normal.low(), normal.high()),
      0.0,
      format!("{name} showing an unusual pattern over the last {} readings", values.len()),
      "Possible sensor noise or communication issues".to_owned(),
      parameter.troubleshooting_steps().clone(),
      false,
      0.75,
      context.now,
    ));
  }
  reports
}

/// Strategy 4: maintenance schedule. Medium past the interval, high past
/// twice the interval.
pub fn maintenance(context: &DetectionContext<'_>) -> Vec<AnomalyReport> {
  let Some(last_maintenance) = context.last_maintenance else {
    return Vec::new();
  };
  let days_since = (context.now - last_maintenance).num_days();
  if days_since < 0 {
    return Vec::new();
  }
  let mut reports = Vec::new();
  for (task, interval_days) in context.descriptor.maintenance_schedule() {
    let interval = *interval_days as i64;
    if days_since <= interval {
      continue;
    }
    let high = days_since > interval * 2;
    reports.push(AnomalyReport::new(
      context.device_id,
      AnomalyType::MaintenanceOverdue,
      if high { Severity::High } else { Severity::Medium },
      "maintenance",
      days_since as f64,
      (0.0, interval as f64),
      (days_since - interval) as f64 / interval as f64 * 100.0,
      format!("{task} overdue by {} days", days_since - interval),
      "Maintenance schedule not followed".to_owned(),
      vec![format!("Schedule {task} immediately ({interval_days} day interval)")],
      true,
      0.90,
      context.now,
    ));
  }
  reports
}

/// Strategy 5: temperature/humidity cross-check with a fixed playbook.
pub fn environmental(context: &DetectionContext<'_>) -> Vec<AnomalyReport> {
  let (Some(temperature), Some(humidity)) = (
    context.current.get("temperature").copied(),
    context.current.get("humidity").copied(),
  ) else {
    return Vec::new();
  };
  if temperature <= ENV_TEMP_LIMIT || humidity <= ENV_HUMIDITY_LIMIT {
    return Vec::new();
  }
  vec![AnomalyReport::new(
    context.device_id,
    AnomalyType::Environmental,
    Severity::Medium,
    "environmental",
    temperature * humidity / 100.0,
    (15.0, 25.0),
    50.0,
    "High temperature and humidity combination detected".to_owned(),
    "Environmental conditions outside comfort range".to_owned(),
    ENVIRONMENTAL_PLAYBOOK.iter().map(|s| (*s).to_owned()).collect(),
    false,
    0.85,
    context.now,
  )]
}

fn score_severity(score: f32) -> Severity {
  if score > 0.9 {
    Severity::Critical
  } else if score > 0.7 {
    Severity::High
  } else if score > 0.5 {
    Severity::Medium
  } else {
    Severity::Low
  }
}

/// Strategy 6: learned scalar score over the normalized reading features.
pub fn learned(context: &DetectionContext<'_>, models: &ModelBundle) -> Vec<AnomalyReport> {
  let score = models.score_anomaly(context.current, context.now);
  if score <= LEARNED_TRIGGER {
    return Vec::new();
  }
  // Attribute the report to the parameter farthest outside its normal range,
  // measured in range widths; fall back to a whole-reading report. Readings
  // with non-finite values (a garbage sensor sample is still a reading) rank
  // last instead of poisoning the comparison.
  let focus = numeric_parameters(context)
    .map(|(name, parameter, value)| {
      let normal = parameter.normal_range();
      (name, parameter, value, deviation_pct(value, normal.low(), normal.high()))
    })
    .max_by(|a, b| {
      let left = if a.3.is_finite() { a.3 } else { f64::NEG_INFINITY };
      let right = if b.3.is_finite() { b.3 } else { f64::NEG_INFINITY };
      left.partial_cmp(&right).unwrap_or(std::cmp::Ordering::Equal)
    });
  let (parameter_name, remediation, value, expected) = match &focus {
    Some((name, parameter, value, _)) => (
      name.as_str(),
      parameter.troubleshooting_steps().clone(),
      *value,
      (parameter.normal_range().low(), parameter.normal_range().high()),
    ),
    None => ("reading", Vec::new(), 0.0, (0.0, 0.0)),
  };
  vec![AnomalyReport::new(
    context.device_id,
    AnomalyType::Learned,
    score_severity(score),
    parameter_name,
    value,
    expected,
    score as f64 * 100.0,
    format!("Learned scorer flagged this reading (score {score:.3})"),
    "Unusual combination of reading features".to_owned(),
    remediation,
    score > 0.8,
    score as f64,
    context.now,
  )]
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone, Utc};
  use fieldgate_descriptor::builtin;
  use std::collections::BTreeMap;

  fn reading(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
  }

  #[test]
  fn boundary_values_stay_inside_their_interval() {
    let descriptor = builtin::sensirion_sht40();
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();

    // Exactly on the warning boundary: no report at all.
    let current = reading(&[("temperature", 30.0)]);
    let reports = range(&DetectionContext {
      device_id: "d",
      descriptor: &descriptor,
      current: &current,
      window: &[],
      last_maintenance: None,
      now,
    });
    assert!(reports.is_empty());

    // Exactly on the error boundary: warning severity, not critical.
    let current = reading(&[("temperature", 40.0)]);
    let reports = range(&DetectionContext {
      device_id: "d",
      descriptor: &descriptor,
      current: &current,
      window: &[],
      last_maintenance: None,
      now,
    });
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity(), Severity::Medium);
  }

  #[test]
  fn drift_thresholds() {
    let descriptor = builtin::sensirion_sht40();
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
    let window = vec![
      Observation { timestamp: now - Duration::minutes(30), parameter: "temperature".to_owned(), value: 20.0 },
      Observation { timestamp: now, parameter: "temperature".to_owned(), value: 25.0 },
    ];

    // 25% drift: medium, no maintenance.
    let current = reading(&[("temperature", 25.0)]);
    let reports = drift(&DetectionContext {
      device_id: "d",
      descriptor: &descriptor,
      current: &current,
      window: &window,
      last_maintenance: None,
      now,
    });
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity(), Severity::Medium);
    assert!(!reports[0].maintenance_required());

    // 75% drift: high, maintenance required.
    let current = reading(&[("temperature", 35.0)]);
    let reports = drift(&DetectionContext {
      device_id: "d",
      descriptor: &descriptor,
      current: &current,
      window: &window,
      last_maintenance: None,
      now,
    });
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity(), Severity::High);
    assert!(reports[0].maintenance_required());
  }

  #[test]
  fn pattern_flags_spikes() {
    let descriptor = builtin::sensirion_sht40();
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
    let mut window = Vec::new();
    for (i, value) in [22.0, 22.1, 29.0].iter().enumerate() {
      window.push(Observation {
        timestamp: now - Duration::minutes(10 - i as i64),
        parameter: "temperature".to_owned(),
        value: *value,
      });
    }
    let current = reading(&[("temperature", 29.0)]);
    let reports = pattern(&DetectionContext {
      device_id: "d",
      descriptor: &descriptor,
      current: &current,
      window: &window,
      last_maintenance: None,
      now,
    });
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].anomaly_type(), AnomalyType::Pattern);
    assert!((reports[0].confidence() - 0.75).abs() < 1e-9);
  }

  #[test]
  fn maintenance_severity_doubles_at_twice_the_interval() {
    let descriptor = builtin::honeywell_t6_pro();
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
    let current = reading(&[("room_temperature", 22.0)]);

    // 200 days since maintenance: sensor_calibration (90 d) is past 2×.
    let reports = maintenance(&DetectionContext {
      device_id: "d",
      descriptor: &descriptor,
      current: &current,
      window: &[],
      last_maintenance: Some(now - Duration::days(200)),
      now,
    });
    let calibration = reports
      .iter()
      .find(|r| r.description().contains("sensor_calibration"))
      .unwrap();
    assert_eq!(calibration.severity(), Severity::High);
    assert!(calibration.remediation_steps()[0].contains("sensor_calibration"));
    assert!((calibration.confidence() - 0.90).abs() < 1e-9);

    // 100 days: past the interval but under 2×.
    let reports = maintenance(&DetectionContext {
      device_id: "d",
      descriptor: &descriptor,
      current: &current,
      window: &[],
      last_maintenance: Some(now - Duration::days(100)),
      now,
    });
    let calibration = reports
      .iter()
      .find(|r| r.description().contains("sensor_calibration"))
      .unwrap();
    assert_eq!(calibration.severity(), Severity::Medium);
  }

  #[test]
  fn environmental_needs_both_channels_high() {
    let descriptor = builtin::sensirion_sht40();
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();

    let current = reading(&[("temperature", 32.0), ("humidity", 85.0)]);
    let reports = environmental(&DetectionContext {
      device_id: "d",
      descriptor: &descriptor,
      current: &current,
      window: &[],
      last_maintenance: None,
      now,
    });
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity(), Severity::Medium);
    assert_eq!(reports[0].remediation_steps().len(), 4);

    let current = reading(&[("temperature", 22.0), ("humidity", 85.0)]);
    assert!(
      environmental(&DetectionContext {
        device_id: "d",
        descriptor: &descriptor,
        current: &current,
        window: &[],
        last_maintenance: None,
        now,
      })
      .is_empty()
    );
  }

  #[test]
  fn learned_strategy_steps_severity_by_score() {
    assert_eq!(score_severity(0.95), Severity::Critical);
    assert_eq!(score_severity(0.8), Severity::High);
    assert_eq!(score_severity(0.6), Severity::Medium);
    assert_eq!(score_severity(0.3), Severity::Low);
  }
}
