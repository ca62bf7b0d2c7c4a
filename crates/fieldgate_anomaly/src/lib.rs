// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Documentation-driven anomaly detection.
//!
//! Every observation runs through six strategies: documentation ranges,
//! drift from the session baseline, patterns over the rolling window,
//! maintenance schedules, an environmental cross-check, and a learned
//! scalar score. Remediation text always comes from the descriptor (or the
//! fixed environmental playbook), never from the detector itself, and a
//! failure in one strategy does not suppress the others.

mod report;
mod strategies;

use chrono::{DateTime, Utc};
use fieldgate_descriptor::DeviceDescriptor;
use fieldgate_ml::ModelBundle;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub use report::{AnomalyReport, AnomalySummary, AnomalyType, Severity};

/// One historical observation from a session's rolling window.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
  pub timestamp: DateTime<Utc>,
  pub parameter: String,
  pub value: f64,
}

/// Everything one detection pass looks at. The rolling window belongs to the
/// session (the detector holds no per-session state), so the caller hands in
/// a snapshot that already includes the current reading.
pub struct DetectionContext<'a> {
  pub device_id: &'a str,
  pub descriptor: &'a DeviceDescriptor,
  pub current: &'a BTreeMap<String, f64>,
  pub window: &'a [Observation],
  pub last_maintenance: Option<DateTime<Utc>>,
  pub now: DateTime<Utc>,
}

/// Multi-strategy anomaly detector. Shared across sessions; the only state
/// it keeps is the report history behind [`summary`](AnomalyDetector::summary).
pub struct AnomalyDetector {
  models: Arc<ModelBundle>,
  history: Mutex<Vec<AnomalyReport>>,
}

/// Report history kept for summaries. Old entries age out; this is not a
/// historian.
const HISTORY_CAP: usize = 1024;

impl AnomalyDetector {
  pub fn new(models: Arc<ModelBundle>) -> Self {
    Self {
      models,
      history: Mutex::new(Vec::new()),
    }
  }

  /// Run all six strategies. Each is a total function over the reading —
  /// non-finite values are tolerated, not fatal — so one strategy coming up
  /// empty never suppresses the others.
  pub fn detect(&self, context: &DetectionContext<'_>) -> Vec<AnomalyReport> {
    let mut reports = Vec::new();
    reports.extend(strategies::range(context));
    reports.extend(strategies::drift(context));
    reports.extend(strategies::pattern(context));
    reports.extend(strategies::maintenance(context));
    reports.extend(strategies::environmental(context));
    reports.extend(strategies::learned(context, &self.models));

    let mut history = self.history.lock().expect("anomaly history lock");
    history.extend(reports.iter().cloned());
    if history.len() > HISTORY_CAP {
      let excess = history.len() - HISTORY_CAP;
      history.drain(..excess);
    }
    reports
  }

  /// Per-device summary over the retained report history.
  pub fn summary(&self, device_id: &str) -> AnomalySummary {
    let history = self.history.lock().expect("anomaly history lock");
    let device_reports: Vec<&AnomalyReport> = history
      .iter()
      .filter(|r| r.device_id() == device_id)
      .collect();

    let mut by_severity = BTreeMap::new();
    let mut by_type = BTreeMap::new();
    for report in &device_reports {
      *by_severity.entry(report.severity().to_string()).or_insert(0usize) += 1;
      *by_type.entry(report.anomaly_type().to_string()).or_insert(0usize) += 1;
    }
    AnomalySummary::new(
      device_reports.len(),
      by_severity,
      by_type,
      device_reports.last().map(|r| r.timestamp()),
      device_reports.iter().filter(|r| r.severity() == Severity::Critical).count(),
    )
  }
}
