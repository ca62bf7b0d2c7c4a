// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Built-in descriptor corpus.
//!
//! Four documented device models ship with the gateway so a fresh install can
//! resolve common field devices before any documentation has been ingested.
//! A store seeded from here behaves exactly like one filled by ingestion.

use crate::descriptor::{DeviceDescriptor, ErrorCode, ObjectRef, ProtocolExtension, RegisterEntry};
use crate::parameter::{Addressing, Interval, ObjectType, ParameterSpec, ValueKind};
use std::collections::BTreeMap;

fn interval(low: f64, high: f64) -> Interval {
  Interval::new(low, high).expect("builtin interval is well-formed")
}

#[allow(clippy::too_many_arguments)]
fn object_param(
  name: &str,
  kind: ValueKind,
  unit: &str,
  object_type: ObjectType,
  instance: u32,
  normal: (f64, f64),
  warning: (f64, f64),
  error: (f64, f64),
  troubleshooting: &[&str],
) -> ParameterSpec {
  ParameterSpec::new(
    name,
    kind,
    unit,
    interval(normal.0, normal.1),
    interval(warning.0, warning.1),
    interval(error.0, error.1),
    troubleshooting.iter().map(|s| (*s).to_owned()).collect(),
    Addressing::Object { object_type, instance },
  )
  .expect("builtin parameter is well-formed")
}

#[allow(clippy::too_many_arguments)]
fn register_param(
  name: &str,
  kind: ValueKind,
  unit: &str,
  address: u32,
  scale: f64,
  normal: (f64, f64),
  warning: (f64, f64),
  error: (f64, f64),
  troubleshooting: &[&str],
) -> ParameterSpec {
  ParameterSpec::new(
    name,
    kind,
    unit,
    interval(normal.0, normal.1),
    interval(warning.0, warning.1),
    interval(error.0, error.1),
    troubleshooting.iter().map(|s| (*s).to_owned()).collect(),
    Addressing::Register { address, scale },
  )
  .expect("builtin parameter is well-formed")
}

#[allow(clippy::too_many_arguments)]
fn endpoint_param(
  name: &str,
  kind: ValueKind,
  unit: &str,
  path: &str,
  normal: (f64, f64),
  warning: (f64, f64),
  error: (f64, f64),
  troubleshooting: &[&str],
) -> ParameterSpec {
  ParameterSpec::new(
    name,
    kind,
    unit,
    interval(normal.0, normal.1),
    interval(warning.0, warning.1),
    interval(error.0, error.1),
    troubleshooting.iter().map(|s| (*s).to_owned()).collect(),
    Addressing::Endpoint { path: path.to_owned() },
  )
  .expect("builtin parameter is well-formed")
}

fn error_code(code: &str, description: &str, remediation: &[&str]) -> (String, ErrorCode) {
  (
    code.to_owned(),
    ErrorCode::new(description, remediation.iter().map(|s| (*s).to_owned()).collect()),
  )
}

/// Honeywell T6 Pro smart thermostat, BACnet/IP HVAC controller.
pub fn honeywell_t6_pro() -> DeviceDescriptor {
  let mut object_map = BTreeMap::new();
  object_map.insert(ObjectRef::new(ObjectType::AI, 1), "room_temperature".to_owned());
  object_map.insert(ObjectRef::new(ObjectType::AV, 1), "setpoint".to_owned());
  object_map.insert(ObjectRef::new(ObjectType::MSV, 1), "fan_mode".to_owned());

  DeviceDescriptor::new(
    "Honeywell",
    "T6 Pro",
    "hvac_controller",
    "BACnet",
    vec![
      object_param(
        "room_temperature",
        ValueKind::Float,
        "°C",
        ObjectType::AI,
        1,
        (18.0, 26.0),
        (15.0, 30.0),
        (10.0, 40.0),
        &[
          "Check temperature sensor calibration",
          "Verify HVAC system is running",
          "Check for air flow obstructions",
        ],
      ),
      object_param(
        "setpoint",
        ValueKind::Float,
        "°C",
        ObjectType::AV,
        1,
        (16.0, 30.0),
        (15.0, 32.0),
        (10.0, 35.0),
        &["Adjust setpoint within the valid range", "Check user permissions"],
      ),
      object_param(
        "fan_mode",
        ValueKind::Enum,
        "",
        ObjectType::MSV,
        1,
        (1.0, 3.0),
        (1.0, 3.0),
        (1.0, 3.0),
        &["Inspect fan motor and electrical connections"],
      ),
    ],
    vec![
      error_code(
        "E001",
        "Temperature sensor failure",
        &["Check sensor connection and calibration"],
      ),
      error_code("E002", "Communication timeout", &["Verify network connectivity"]),
      error_code(
        "E003",
        "Setpoint out of range",
        &["Adjust setpoint within valid range"],
      ),
      error_code("E004", "Fan motor fault", &["Check fan motor and wiring"]),
      error_code(
        "E005",
        "Display error",
        &["Reset thermostat or replace display"],
      ),
    ],
    vec![
      "If temperature reading is incorrect, check sensor placement and calibration".to_owned(),
      "For communication issues, verify BACnet network configuration".to_owned(),
      "If setpoint changes are not working, check user permissions".to_owned(),
      "For fan issues, inspect fan motor and electrical connections".to_owned(),
      "Display problems may require thermostat reset or replacement".to_owned(),
    ],
    vec![
      ("filter_replacement".to_owned(), 30),
      ("sensor_calibration".to_owned(), 90),
      ("system_inspection".to_owned(), 180),
      ("firmware_update".to_owned(), 365),
    ],
    "Honeywell T6 Pro smart thermostat. BACnet/IP HVAC controller exposing room \
     temperature (AI:1), temperature setpoint (AV:1) and fan mode (MSV:1). \
     Operating range 10-40 °C, recommended comfort band 18-26 °C."
      .to_owned(),
    false,
    ProtocolExtension::Bacnet { object_map },
  )
  .expect("builtin descriptor is well-formed")
}

/// Sensirion SHT40 environmental sensor behind a REST bridge.
pub fn sensirion_sht40() -> DeviceDescriptor {
  let mut endpoint_map = BTreeMap::new();
  endpoint_map.insert("temperature".to_owned(), "/api/temperature".to_owned());
  endpoint_map.insert("humidity".to_owned(), "/api/humidity".to_owned());
  endpoint_map.insert("pressure".to_owned(), "/api/pressure".to_owned());

  DeviceDescriptor::new(
    "Sensirion",
    "SHT40",
    "environmental_sensor",
    "REST",
    vec![
      endpoint_param(
        "temperature",
        ValueKind::Float,
        "°C",
        "/api/temperature",
        (18.0, 26.0),
        (15.0, 30.0),
        (10.0, 40.0),
        &[
          "Check sensor placement and environmental conditions",
          "Check for condensation or contamination on sensor surface",
        ],
      ),
      endpoint_param(
        "humidity",
        ValueKind::Float,
        "%",
        "/api/humidity",
        (30.0, 60.0),
        (20.0, 70.0),
        (10.0, 90.0),
        &[
          "Check humidity sensor for condensation",
          "Verify HVAC dehumidification settings",
          "Check for water leaks",
        ],
      ),
      endpoint_param(
        "pressure",
        ValueKind::Float,
        "hPa",
        "/api/pressure",
        (950.0, 1050.0),
        (920.0, 1080.0),
        (300.0, 1100.0),
        &["Recalibrate pressure sensor", "Verify sensor is not exposed to extreme conditions"],
      ),
    ],
    vec![
      error_code(
        "S001",
        "Sensor reading out of range",
        &["Check sensor calibration"],
      ),
      error_code("S002", "Communication error", &["Verify network connection"]),
      error_code(
        "S003",
        "Sensor calibration required",
        &["Perform calibration procedure"],
      ),
      error_code("S004", "Power supply issue", &["Check power connections"]),
      error_code(
        "S005",
        "Sensor drift detected",
        &["Recalibrate or replace sensor"],
      ),
    ],
    vec![
      "For inaccurate readings, check sensor placement and environmental conditions".to_owned(),
      "Communication errors may indicate network or power issues".to_owned(),
      "Regular calibration ensures measurement accuracy".to_owned(),
      "Check for condensation or contamination on sensor surface".to_owned(),
      "Verify sensor is not exposed to extreme conditions".to_owned(),
    ],
    vec![
      ("cleaning".to_owned(), 90),
      ("calibration".to_owned(), 180),
      ("replacement".to_owned(), 365),
      ("firmware_update".to_owned(), 365),
    ],
    "Sensirion SHT40 digital temperature and humidity sensor behind a REST/HTTP \
     bridge. Endpoints /api/temperature (°C, ±0.1), /api/humidity (%RH, ±1.5) and \
     /api/pressure (hPa). JSON responses."
      .to_owned(),
    false,
    ProtocolExtension::Rest { endpoint_map },
  )
  .expect("builtin descriptor is well-formed")
}

/// Johnson Controls Metasys NAE55 building controller, BACnet/IP, vendor id 260.
pub fn johnson_controls_metasys_nae55() -> DeviceDescriptor {
  let mut object_map = BTreeMap::new();
  object_map.insert(ObjectRef::new(ObjectType::AI, 1), "zone_temperature".to_owned());
  object_map.insert(ObjectRef::new(ObjectType::AI, 2), "supply_air_temperature".to_owned());
  object_map.insert(ObjectRef::new(ObjectType::AI, 3), "zone_humidity".to_owned());
  object_map.insert(ObjectRef::new(ObjectType::AV, 1), "cooling_setpoint".to_owned());

  DeviceDescriptor::new(
    "Johnson Controls",
    "Metasys NAE55",
    "building_controller",
    "BACnet",
    vec![
      object_param(
        "zone_temperature",
        ValueKind::Float,
        "°C",
        ObjectType::AI,
        1,
        (18.0, 26.0),
        (15.0, 30.0),
        (10.0, 40.0),
        &["Verify zone sensor wiring", "Compare against adjacent zone sensors"],
      ),
      object_param(
        "supply_air_temperature",
        ValueKind::Float,
        "°C",
        ObjectType::AI,
        2,
        (10.0, 18.0),
        (8.0, 22.0),
        (4.0, 30.0),
        &["Inspect cooling coil operation", "Check supply fan status"],
      ),
      object_param(
        "zone_humidity",
        ValueKind::Float,
        "%",
        ObjectType::AI,
        3,
        (30.0, 60.0),
        (20.0, 70.0),
        (10.0, 90.0),
        &["Check dehumidification sequence", "Inspect humidity sensor element"],
      ),
      object_param(
        "cooling_setpoint",
        ValueKind::Float,
        "°C",
        ObjectType::AV,
        1,
        (20.0, 26.0),
        (18.0, 28.0),
        (15.0, 32.0),
        &["Review schedule overrides before changing setpoints"],
      ),
    ],
    vec![
      error_code(
        "E101",
        "Field controller offline",
        &["Check MS/TP trunk wiring", "Power-cycle the field controller"],
      ),
      error_code(
        "E102",
        "Sensor unreliable",
        &["Replace or recalibrate the reporting sensor"],
      ),
      error_code(
        "E103",
        "Database archive failure",
        &["Free supervisory controller storage", "Re-run the archive"],
      ),
    ],
    vec![
      "For offline field devices, verify 24 VAC supply and trunk terminations".to_owned(),
      "Unreliable sensor values usually trace to wiring or sensor drift".to_owned(),
      "Persistent alarms should be cross-checked against the zone schedule".to_owned(),
    ],
    vec![
      ("sensor_calibration".to_owned(), 90),
      ("controller_inspection".to_owned(), 180),
      ("battery_replacement".to_owned(), 365),
    ],
    "Johnson Controls Metasys NAE55 network automation engine. BACnet/IP building \
     controller (vendor identifier 260) supervising zone temperature, supply air \
     temperature, zone humidity and cooling setpoints across connected field buses."
      .to_owned(),
    false,
    ProtocolExtension::Bacnet { object_map },
  )
  .expect("builtin descriptor is well-formed")
}

/// Schneider Electric Modicon M580 PLC, Modbus/TCP industrial controller.
///
/// Register catalogue mirrors the vendor documentation: input registers
/// from 30001, holding registers from 40001, coils 1-5, discrete inputs
/// 10001-10005. Floats occupy two registers, high word first, scaled ×100.
pub fn schneider_modicon_m580() -> DeviceDescriptor {
  let mut register_map = BTreeMap::new();
  let mut parameters = Vec::new();

  // Floats occupy two consecutive registers (high word first), so float
  // entries are spaced two addresses apart.
  let float_inputs: &[(&str, u32, &str, (f64, f64), (f64, f64), (f64, f64))] = &[
    ("Temperature_Sensor_1", 30001, "°C", (15.0, 35.0), (10.0, 40.0), (0.0, 100.0)),
    ("Temperature_Sensor_2", 30003, "°C", (15.0, 35.0), (10.0, 40.0), (0.0, 100.0)),
    ("Pressure_Sensor", 30005, "bar", (1.0, 5.0), (0.5, 8.0), (0.0, 10.0)),
    ("Flow_Rate", 30007, "L/min", (20.0, 80.0), (10.0, 90.0), (0.0, 100.0)),
    ("Vibration_Level", 30009, "mm/s", (0.0, 2.0), (0.0, 5.0), (0.0, 20.0)),
    ("Power_Consumption", 30013, "kW", (5.0, 30.0), (2.0, 40.0), (0.0, 50.0)),
  ];
  for (name, address, unit, normal, warning, error) in float_inputs {
    register_map.insert(*address, RegisterEntry::new(name, ValueKind::Float, unit, 100.0));
    parameters.push(register_param(
      name,
      ValueKind::Float,
      unit,
      *address,
      100.0,
      *normal,
      *warning,
      *error,
      &["Check sensor wiring at the I/O drop", "Verify channel scaling in the PLC program"],
    ));
  }

  let int_registers: &[(&str, u32, &str, (f64, f64), (f64, f64), (f64, f64))] = &[
    ("Motor_Speed", 30011, "RPM", (500.0, 2500.0), (100.0, 2800.0), (0.0, 3000.0)),
    ("System_Status", 30012, "", (0.0, 3.0), (0.0, 3.0), (0.0, 3.0)),
    ("Control_Mode", 40005, "", (0.0, 2.0), (0.0, 2.0), (0.0, 2.0)),
    ("Maintenance_Interval", 40008, "days", (1.0, 365.0), (1.0, 365.0), (1.0, 365.0)),
    ("Calibration_Date", 40009, "days_since_epoch", (0.0, 99999.0), (0.0, 99999.0), (0.0, 99999.0)),
  ];
  for (name, address, unit, normal, warning, error) in int_registers {
    register_map.insert(*address, RegisterEntry::new(name, ValueKind::Int, unit, 1.0));
    parameters.push(register_param(
      name,
      ValueKind::Int,
      unit,
      *address,
      1.0,
      *normal,
      *warning,
      *error,
      &["Cross-check the value against the HMI display"],
    ));
  }

  let float_holdings: &[(&str, u32, &str, (f64, f64), (f64, f64), (f64, f64))] = &[
    ("Setpoint_Temperature", 40001, "°C", (18.0, 30.0), (15.0, 35.0), (10.0, 40.0)),
    ("Setpoint_Pressure", 40003, "bar", (1.5, 4.0), (1.0, 5.0), (0.5, 8.0)),
    ("Alarm_Threshold", 40006, "°C", (25.0, 35.0), (22.0, 38.0), (20.0, 40.0)),
  ];
  for (name, address, unit, normal, warning, error) in float_holdings {
    register_map.insert(*address, RegisterEntry::new(name, ValueKind::Float, unit, 100.0));
    parameters.push(register_param(
      name,
      ValueKind::Float,
      unit,
      *address,
      100.0,
      *normal,
      *warning,
      *error,
      &["Confirm the setpoint is within the process design limits"],
    ));
  }

  let coils: &[(&str, u32)] = &[
    ("Motor_Start", 1),
    ("Pump_Enable", 2),
    ("Alarm_Reset", 3),
    ("Maintenance_Mode", 4),
    ("Remote_Control", 5),
  ];
  for (name, address) in coils {
    register_map.insert(*address, RegisterEntry::new(name, ValueKind::Bool, "", 1.0));
    parameters.push(register_param(
      name,
      ValueKind::Bool,
      "",
      *address,
      1.0,
      (0.0, 1.0),
      (0.0, 1.0),
      (0.0, 1.0),
      &["Verify interlock conditions before forcing the coil"],
    ));
  }

  let discrete_inputs: &[(&str, u32)] = &[
    ("Emergency_Stop", 10001),
    ("Door_Open", 10002),
    ("Power_Supply_OK", 10003),
    ("Communication_OK", 10004),
    ("Sensor_Fault", 10005),
  ];
  for (name, address) in discrete_inputs {
    register_map.insert(*address, RegisterEntry::new(name, ValueKind::Bool, "", 1.0));
    parameters.push(register_param(
      name,
      ValueKind::Bool,
      "",
      *address,
      1.0,
      (0.0, 1.0),
      (0.0, 1.0),
      (0.0, 1.0),
      &["Inspect the field wiring for the reporting input"],
    ));
  }

  DeviceDescriptor::new(
    "Schneider Electric",
    "Modicon M580 PLC",
    "industrial_controller",
    "Modbus",
    parameters,
    vec![
      error_code("E001", "Communication timeout", &["Check network connectivity"]),
      error_code(
        "E002",
        "Sensor reading out of range",
        &["Verify sensor calibration"],
      ),
      error_code(
        "E003",
        "Device not responding",
        &["Check power and connections"],
      ),
      error_code("E004", "Configuration error", &["Verify device settings"]),
      error_code(
        "E005",
        "Maintenance required",
        &["Schedule device maintenance"],
      ),
    ],
    vec![
      "Check device power and connections".to_owned(),
      "Verify network connectivity".to_owned(),
      "Check sensor calibration and placement".to_owned(),
      "Review device configuration settings".to_owned(),
      "Contact manufacturer support if issues persist".to_owned(),
    ],
    vec![
      ("filter_inspection".to_owned(), 30),
      ("sensor_calibration".to_owned(), 90),
      ("controller_inspection".to_owned(), 180),
    ],
    "Schneider Electric Modicon M580 programmable logic controller. Modbus/TCP \
     unit id 1. Input registers 30001-30014 (temperatures, pressure, flow, \
     vibration, motor speed, status, power), holding registers 40001-40010 \
     (setpoints, control mode, alarm threshold, maintenance data), coils 1-5, \
     discrete inputs 10001-10005. Floats span two registers, high word first, \
     scaled ×100."
      .to_owned(),
    false,
    ProtocolExtension::Modbus { register_map },
  )
  .expect("builtin descriptor is well-formed")
}

/// The full built-in corpus in deterministic order.
pub fn all() -> Vec<DeviceDescriptor> {
  vec![
    honeywell_t6_pro(),
    johnson_controls_metasys_nae55(),
    schneider_modicon_m580(),
    sensirion_sht40(),
  ]
}
