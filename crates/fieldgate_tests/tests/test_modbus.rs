// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

mod util;

use fieldgate::{Deadline, Gateway, GatewayError, RawAddress, TypedValue};
use fieldgate_core::errors::{ProtocolException, ValidationError};
use std::collections::BTreeMap;
use std::time::Duration;
use util::modbus_sim;

const PLC: &str = "schneider_electric_modicon_m580_plc";

async fn gateway() -> Gateway {
  Gateway::builder().default_connectors().finish().await.expect("gateway builds")
}

#[tokio::test]
async fn happy_read_returns_twenty_two_and_a_half_degrees() {
  let address = modbus_sim::spawn().await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();

  let reading = gateway.read(&session, "Temperature_Sensor_1").await.unwrap();
  assert_eq!(reading.value(), &TypedValue::Float(22.5));
  assert_eq!(reading.unit(), "°C");

  // 22.5 °C sits inside the documented normal range: no anomaly.
  let mut current = BTreeMap::new();
  current.insert("Temperature_Sensor_1".to_owned(), 22.5);
  let reports = gateway.detect_anomalies(&session, &current).unwrap();
  assert!(reports.is_empty(), "unexpected reports: {reports:?}");
}

#[tokio::test]
async fn unknown_parameter_is_a_validation_result() {
  let address = modbus_sim::spawn().await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();

  let error = gateway.read(&session, "DoesNotExist").await.unwrap_err();
  assert!(matches!(
    error,
    GatewayError::Validation(ValidationError::UnknownParameter(_))
  ));
}

#[tokio::test]
async fn raw_read_past_the_map_answers_exception_0x02() {
  let address = modbus_sim::spawn().await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();

  let error = gateway.read_raw(&session, &RawAddress::Register(30099)).await.unwrap_err();
  assert!(matches!(
    error,
    GatewayError::Protocol(ProtocolException::ModbusException { code: 0x02, .. })
  ));
}

#[tokio::test]
async fn setpoint_write_reads_back() {
  let address = modbus_sim::spawn().await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();

  gateway.write(&session, "Setpoint_Temperature", TypedValue::Float(28.0)).await.unwrap();
  let reading = gateway.read(&session, "Setpoint_Temperature").await.unwrap();
  assert_eq!(reading.value(), &TypedValue::Float(28.0));
}

#[tokio::test]
async fn write_outside_the_error_range_is_rejected_before_io() {
  let address = modbus_sim::spawn().await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();

  let error = gateway
    .write(&session, "Setpoint_Temperature", TypedValue::Float(99.0))
    .await
    .unwrap_err();
  assert!(matches!(
    error,
    GatewayError::Validation(ValidationError::OutOfRange { .. })
  ));
  // The stored setpoint is untouched.
  let reading = gateway.read(&session, "Setpoint_Temperature").await.unwrap();
  assert_eq!(reading.value(), &TypedValue::Float(25.0));
}

#[tokio::test]
async fn zero_deadline_cancels_without_io() {
  let address = modbus_sim::spawn().await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();

  let error = gateway
    .read_with_deadline(&session, "Temperature_Sensor_1", Deadline::after(Duration::ZERO))
    .await
    .unwrap_err();
  assert!(matches!(error, GatewayError::Cancelled));
}

#[tokio::test]
async fn same_address_reuses_the_session() {
  let address = modbus_sim::spawn().await;
  let gateway = gateway().await;
  let first = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();
  let second = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();
  assert_eq!(first, second);

  gateway.close_session(&first).await.unwrap();
  let third = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();
  assert_ne!(first, third, "closing must produce a fresh session id");
}

#[tokio::test]
async fn coils_and_discrete_inputs_read_as_bools() {
  let address = modbus_sim::spawn().await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();

  assert_eq!(
    gateway.read(&session, "Motor_Start").await.unwrap().value(),
    &TypedValue::Bool(true)
  );
  assert_eq!(
    gateway.read(&session, "Power_Supply_OK").await.unwrap().value(),
    &TypedValue::Bool(true)
  );
  assert_eq!(
    gateway.read(&session, "Emergency_Stop").await.unwrap().value(),
    &TypedValue::Bool(false)
  );
}

#[tokio::test]
async fn motor_speed_reads_as_int() {
  let address = modbus_sim::spawn().await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();

  assert_eq!(
    gateway.read(&session, "Motor_Speed").await.unwrap().value(),
    &TypedValue::Int(1450)
  );
}

#[tokio::test]
async fn coil_write_round_trips() {
  let address = modbus_sim::spawn().await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("modbus", &address, Some(PLC)).await.unwrap();

  gateway.write(&session, "Pump_Enable", TypedValue::Bool(true)).await.unwrap();
  assert_eq!(
    gateway.read(&session, "Pump_Enable").await.unwrap().value(),
    &TypedValue::Bool(true)
  );
}
