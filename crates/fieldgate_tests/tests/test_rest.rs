// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

mod util;

use chrono::{Duration as ChronoDuration, Utc};
use fieldgate::{AnomalyType, Gateway, GatewayError, QueryOutcome, RawAddress, Severity, TypedValue};
use fieldgate_core::errors::ProtocolException;
use std::collections::BTreeMap;
use util::rest_sim;

const SHT40: &str = "sensirion_sht40";

async fn gateway() -> Gateway {
  Gateway::builder().default_connectors().finish().await.expect("gateway builds")
}

fn reading_map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
  pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
}

#[tokio::test]
async fn json_read_carries_the_descriptor_unit() {
  let sim = rest_sim::spawn(22.5, 45.0).await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("rest", &sim.base_url, Some(SHT40)).await.unwrap();

  let reading = gateway.read(&session, "temperature").await.unwrap();
  assert_eq!(reading.value(), &TypedValue::Float(22.5));
  assert_eq!(reading.unit(), "°C");
}

#[tokio::test]
async fn high_humidity_alone_is_only_a_range_anomaly() {
  let sim = rest_sim::spawn(22.0, 85.0).await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("rest", &sim.base_url, Some(SHT40)).await.unwrap();

  let reports = gateway
    .detect_anomalies(&session, &reading_map(&[("temperature", 22.0), ("humidity", 85.0)]))
    .unwrap();
  assert_eq!(reports.len(), 1, "unexpected reports: {reports:?}");
  assert_eq!(reports[0].anomaly_type(), AnomalyType::Range);
  assert_eq!(reports[0].parameter(), "humidity");
  assert_eq!(reports[0].severity(), Severity::Medium);
}

#[tokio::test]
async fn hot_and_humid_adds_the_environmental_cross_check() {
  let sim = rest_sim::spawn(32.0, 85.0).await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("rest", &sim.base_url, Some(SHT40)).await.unwrap();

  let reports = gateway
    .detect_anomalies(&session, &reading_map(&[("temperature", 32.0), ("humidity", 85.0)]))
    .unwrap();
  let environmental: Vec<_> = reports
    .iter()
    .filter(|r| r.anomaly_type() == AnomalyType::Environmental)
    .collect();
  assert_eq!(environmental.len(), 1);
  assert_eq!(environmental[0].severity(), Severity::Medium);
  assert!(environmental[0].root_cause_hint().contains("comfort range"));
}

#[tokio::test]
async fn overdue_maintenance_quotes_the_task() {
  let sim = rest_sim::spawn(22.0, 45.0).await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("rest", &sim.base_url, Some(SHT40)).await.unwrap();
  gateway
    .set_last_maintenance(&session, Some(Utc::now() - ChronoDuration::days(200)))
    .unwrap();

  let reports = gateway
    .detect_anomalies(&session, &reading_map(&[("temperature", 22.0), ("humidity", 45.0)]))
    .unwrap();
  // cleaning is the 90-day task: 200 days is past twice the interval.
  let cleaning = reports
    .iter()
    .find(|r| r.anomaly_type() == AnomalyType::MaintenanceOverdue && r.description().contains("cleaning"))
    .expect("cleaning must be overdue");
  assert_eq!(cleaning.severity(), Severity::High);
  assert!(cleaning.remediation_steps()[0].contains("cleaning"));

  // calibration (180 days) is overdue but under twice its interval.
  let calibration = reports
    .iter()
    .find(|r| r.anomaly_type() == AnomalyType::MaintenanceOverdue && r.description().contains("calibration"))
    .expect("calibration must be overdue");
  assert_eq!(calibration.severity(), Severity::Medium);
}

#[tokio::test]
async fn process_query_executes_the_read_plan() {
  let sim = rest_sim::spawn(22.5, 45.0).await;
  let gateway = gateway().await;
  gateway.implement_protocol("rest", &sim.base_url, Some(SHT40)).await.unwrap();

  let result = gateway.process_query("What's the temperature in room 101?").await;
  let readings: Vec<_> = result
    .outcomes()
    .iter()
    .filter_map(|o| match o {
      QueryOutcome::Reading { reading, .. } => Some(reading),
      _ => None,
    })
    .collect();
  assert_eq!(readings.len(), 1);
  assert_eq!(readings[0].value(), &TypedValue::Float(22.5));
}

#[tokio::test]
async fn rest_write_round_trips() {
  let sim = rest_sim::spawn(22.5, 45.0).await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("rest", &sim.base_url, Some(SHT40)).await.unwrap();

  gateway.write(&session, "temperature", TypedValue::Float(25.0)).await.unwrap();
  let reading = gateway.read(&session, "temperature").await.unwrap();
  assert_eq!(reading.value(), &TypedValue::Float(25.0));
}

#[tokio::test]
async fn missing_endpoint_surfaces_the_status_code() {
  let sim = rest_sim::spawn(22.5, 45.0).await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("rest", &sim.base_url, Some(SHT40)).await.unwrap();

  let error = gateway
    .read_raw(&session, &RawAddress::Path("/api/bogus".to_owned()))
    .await
    .unwrap_err();
  assert!(matches!(
    error,
    GatewayError::Protocol(ProtocolException::HttpStatus(404))
  ));
}
