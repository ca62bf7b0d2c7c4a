// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::features::{
  FINGERPRINT_FEATURES, QUERY_FEATURES, SENSOR_FEATURES, fingerprint_features, query_features,
  sensor_features,
};
use crate::model::{LinearModel, logistic, softmax};
use chrono::{DateTime, Utc};
use fieldgate_core::Fingerprint;
use getset::{CopyGetters, Getters};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Output classes of the intent model, in model row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum IntentClass {
  GetTemperature,
  GetHumidity,
  GetPressure,
  GetStatus,
  SetValue,
  CompareData,
  GetTrend,
  GeneralQuery,
}

const INTENT_CLASSES: [IntentClass; 8] = [
  IntentClass::GetTemperature,
  IntentClass::GetHumidity,
  IntentClass::GetPressure,
  IntentClass::GetStatus,
  IntentClass::SetValue,
  IntentClass::CompareData,
  IntentClass::GetTrend,
  IntentClass::GeneralQuery,
];

/// Output classes of the device model, in model row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DeviceClass {
  #[strum(serialize = "rest")]
  Rest,
  #[strum(serialize = "bacnet")]
  Bacnet,
  #[strum(serialize = "modbus")]
  Modbus,
  #[strum(serialize = "opc-ua")]
  OpcUa,
  #[strum(serialize = "unknown")]
  Unknown,
}

const DEVICE_CLASSES: [DeviceClass; 5] = [
  DeviceClass::Rest,
  DeviceClass::Bacnet,
  DeviceClass::Modbus,
  DeviceClass::OpcUa,
  DeviceClass::Unknown,
];

/// Port-based prior used as the coarse-classifier tie-break and as the whole
/// of the rule path.
fn port_prior(port: u16) -> Option<(DeviceClass, f32)> {
  match port {
    80 | 8000 | 8080 => Some((DeviceClass::Rest, 0.95)),
    47808 => Some((DeviceClass::Bacnet, 0.90)),
    502 => Some((DeviceClass::Modbus, 0.85)),
    4840 => Some((DeviceClass::OpcUa, 0.88)),
    _ => None,
  }
}

#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct ModelInfo {
  #[getset(get = "pub")]
  name: String,
  #[getset(get_copy = "pub")]
  input_size: usize,
  #[getset(get_copy = "pub")]
  output_size: usize,
  #[getset(get_copy = "pub")]
  size_bytes: usize,
  #[getset(get_copy = "pub")]
  loaded: bool,
}

/// The three edge models, each optional. A missing model means that
/// consumer runs its deterministic rule path instead.
#[derive(Debug, Default)]
pub struct ModelBundle {
  intent: Option<LinearModel>,
  device: Option<LinearModel>,
  anomaly: Option<LinearModel>,
}

impl ModelBundle {
  /// Load whatever model files exist under `dir`. Unreadable or corrupt
  /// files degrade to the rule path for that model only.
  pub fn load(dir: &Path) -> Self {
    let load_one = |file: &str, name: &str| match LinearModel::load(name, &dir.join(file)) {
      Ok(model) => {
        info!("loaded model {name} ({} bytes)", model.size_bytes());
        Some(model)
      }
      Err(e) => {
        info!("model {name} unavailable ({e}); using rule path");
        None
      }
    };
    Self {
      intent: load_one("intent.fgm", "intent"),
      device: load_one("device.fgm", "device"),
      anomaly: load_one("anomaly.fgm", "anomaly"),
    }
  }

  /// Bundle with the shipped fixed weights, no files involved.
  pub fn with_defaults() -> Self {
    Self {
      intent: Some(default_intent_model()),
      device: Some(default_device_model()),
      anomaly: Some(default_anomaly_model()),
    }
  }

  /// Bundle with no models at all: every consumer takes the rule path.
  pub fn rule_only() -> Self {
    Self::default()
  }

  /// Write the shipped fixed weights to `dir` as `.fgm` files.
  pub fn write_defaults(dir: &Path) -> Result<(), crate::model::ModelError> {
    std::fs::create_dir_all(dir)?;
    default_intent_model().save(&dir.join("intent.fgm"))?;
    default_device_model().save(&dir.join("device.fgm"))?;
    default_anomaly_model().save(&dir.join("anomaly.fgm"))?;
    Ok(())
  }

  pub fn info(&self) -> Vec<ModelInfo> {
    let describe = |name: &str, model: &Option<LinearModel>, input: usize, output: usize| ModelInfo {
      name: name.to_owned(),
      input_size: model.as_ref().map(|m| m.input_size()).unwrap_or(input),
      output_size: model.as_ref().map(|m| m.output_size()).unwrap_or(output),
      size_bytes: model.as_ref().map(|m| m.size_bytes()).unwrap_or(0),
      loaded: model.is_some(),
    };
    vec![
      describe("intent", &self.intent, QUERY_FEATURES, 8),
      describe("device", &self.device, FINGERPRINT_FEATURES, 5),
      describe("anomaly", &self.anomaly, SENSOR_FEATURES, 1),
    ]
  }

  /// Classify a natural-language request into one of the eight intent
  /// classes. Model path and rule path agree on the golden inputs.
  pub fn classify_intent(&self, query: &str) -> (IntentClass, f32) {
    if let Some(model) = &self.intent {
      let probs = softmax(&model.predict(&query_features(query)));
      let (idx, best) = argmax(&probs);
      return (INTENT_CLASSES[idx], best);
    }
    (rule_intent(query), 1.0)
  }

  /// Coarse protocol classification from a fingerprint. The model's
  /// decision is overridden by the port prior whenever the prior's class
  /// scores within 0.15 of the winner.
  pub fn classify_protocol(&self, fingerprint: &Fingerprint) -> (DeviceClass, f32) {
    let prior = port_prior(fingerprint.port());
    if let Some(model) = &self.device {
      let probs = softmax(&model.predict(&fingerprint_features(fingerprint)));
      let (idx, best) = argmax(&probs);
      let mut class = DEVICE_CLASSES[idx];
      let mut confidence = best;
      if let Some((prior_class, _)) = prior {
        let prior_idx = DEVICE_CLASSES.iter().position(|c| *c == prior_class).expect("prior class is a model class");
        if prior_class != class && probs[prior_idx] + 0.15 >= best {
          class = prior_class;
          confidence = probs[prior_idx];
        }
      }
      return (class, confidence);
    }
    prior.unwrap_or((DeviceClass::Unknown, 0.50))
  }

  /// Scalar anomaly score in [0, 1] for one reading.
  pub fn score_anomaly(&self, reading: &BTreeMap<String, f64>, at: DateTime<Utc>) -> f32 {
    if let Some(model) = &self.anomaly {
      let raw = model.predict(&sensor_features(reading, at));
      return logistic(raw[0]);
    }
    rule_anomaly_score(reading)
  }

  pub fn has_anomaly_model(&self) -> bool {
    self.anomaly.is_some()
  }
}

fn argmax(values: &[f32]) -> (usize, f32) {
  let mut best = (0usize, f32::NEG_INFINITY);
  for (i, v) in values.iter().enumerate() {
    if *v > best.1 {
      best = (i, *v);
    }
  }
  best
}

/// Keyword rule path for intent classification. Ordering matters: commands
/// (set/compare/trend) outrank the parameter keywords they mention.
fn rule_intent(query: &str) -> IntentClass {
  let lower = query.to_lowercase();
  let has = |needles: &[&str]| {
    needles
      .iter()
      .any(|n| lower.split_whitespace().any(|w| w.contains(n)))
  };
  if has(&["set", "change", "update"]) {
    IntentClass::SetValue
  } else if lower.contains("compare") {
    IntentClass::CompareData
  } else if lower.contains("trend") {
    IntentClass::GetTrend
  } else if has(&["temperature", "temp", "heat"]) {
    IntentClass::GetTemperature
  } else if has(&["humidity", "moisture"]) {
    IntentClass::GetHumidity
  } else if has(&["pressure", "psi"]) {
    IntentClass::GetPressure
  } else if has(&["status", "state", "health"]) {
    IntentClass::GetStatus
  } else {
    IntentClass::GeneralQuery
  }
}

/// Rule anomaly score: the fraction of the three core environmental channels
/// that sit outside their hard limits.
fn rule_anomaly_score(reading: &BTreeMap<String, f64>) -> f32 {
  let mut hits = 0;
  let temperature = reading.get("temperature").copied().unwrap_or(20.0);
  let humidity = reading.get("humidity").copied().unwrap_or(50.0);
  let pressure = reading.get("pressure").copied().unwrap_or(1013.0);
  if !(10.0..=40.0).contains(&temperature) {
    hits += 1;
  }
  if !(10.0..=90.0).contains(&humidity) {
    hits += 1;
  }
  if !(900.0..=1100.0).contains(&pressure) {
    hits += 1;
  }
  hits as f32 / 3.0
}

/// Shipped intent weights: each class keys on its keyword-count slot, with
/// command classes weighted above parameter mentions so "set the temperature"
/// lands on set_value.
fn default_intent_model() -> LinearModel {
  let mut weights = vec![0.0f32; 8 * QUERY_FEATURES];
  let mut bias = vec![0.0f32; 8];
  let mut set = |row: usize, col: usize, value: f32| weights[row * QUERY_FEATURES + col] = value;
  set(0, 34, 8.0); // temp mentions → get_temperature
  set(1, 35, 8.0); // humid mentions → get_humidity
  set(2, 36, 8.0); // press mentions → get_pressure
  set(3, 37, 8.0); // status mentions → get_status
  set(4, 38, 12.0); // set mentions → set_value
  set(4, 60, 2.0); // starts with "set"
  set(5, 61, 10.0); // "compare" → compare_data
  set(6, 62, 10.0); // "trend" → get_trend
  bias[7] = 0.5; // general_query floor
  LinearModel::new("intent", QUERY_FEATURES, 8, weights, bias).expect("shipped weights are well-formed")
}

/// Shipped device weights over the fingerprint features.
fn default_device_model() -> LinearModel {
  let mut weights = vec![0.0f32; 5 * FINGERPRINT_FEATURES];
  let mut bias = vec![0.0f32; 5];
  let mut set = |row: usize, col: usize, value: f32| weights[row * FINGERPRINT_FEATURES + col] = value;
  // rest: tcp with a JSON body
  set(0, 1, 2.0);
  set(0, 6, 4.0);
  set(0, 9, 0.5);
  // bacnet: udp, high port number
  set(1, 2, 3.0);
  set(1, 0, 2.0);
  // modbus: tcp on a well-known port, no json
  set(2, 1, 2.0);
  set(2, 9, 2.0);
  set(2, 6, -4.0);
  set(2, 7, 1.0);
  // opc-ua: tcp in the 4xxx range
  set(3, 1, 1.0);
  set(3, 7, 2.0);
  bias[4] = 0.3; // unknown floor
  LinearModel::new("device", FINGERPRINT_FEATURES, 5, weights, bias).expect("shipped weights are well-formed")
}

/// Shipped anomaly weights: deviation-from-normal slots dominate, with the
/// spread features contributing a little.
fn default_anomaly_model() -> LinearModel {
  let mut weights = vec![0.0f32; SENSOR_FEATURES];
  weights[16] = 6.0;
  weights[17] = 4.0;
  weights[18] = 4.0;
  weights[14] = 1.0;
  weights[23] = 0.2;
  LinearModel::new("anomaly", SENSOR_FEATURES, 1, weights, vec![-2.2]).expect("shipped weights are well-formed")
}

#[cfg(test)]
mod tests {
  use super::*;
  use fieldgate_core::Transport;

  fn fingerprint(port: u16, transport: Transport, json: bool) -> Fingerprint {
    Fingerprint::new(transport, port, 15.0, 128, None, None, None, None, json)
  }

  #[test]
  fn rule_path_port_priors() {
    let bundle = ModelBundle::rule_only();
    assert_eq!(bundle.classify_protocol(&fingerprint(47808, Transport::Udp, false)).0, DeviceClass::Bacnet);
    assert_eq!(bundle.classify_protocol(&fingerprint(502, Transport::Tcp, false)).0, DeviceClass::Modbus);
    assert_eq!(bundle.classify_protocol(&fingerprint(8080, Transport::Tcp, true)).0, DeviceClass::Rest);
    let (class, confidence) = bundle.classify_protocol(&fingerprint(9999, Transport::Tcp, false));
    assert_eq!(class, DeviceClass::Unknown);
    assert!((confidence - 0.5).abs() < 1e-6);
  }

  #[test]
  fn model_path_agrees_with_priors_on_the_standard_ports() {
    let bundle = ModelBundle::with_defaults();
    assert_eq!(bundle.classify_protocol(&fingerprint(47808, Transport::Udp, false)).0, DeviceClass::Bacnet);
    assert_eq!(bundle.classify_protocol(&fingerprint(502, Transport::Tcp, false)).0, DeviceClass::Modbus);
    assert_eq!(bundle.classify_protocol(&fingerprint(80, Transport::Tcp, true)).0, DeviceClass::Rest);
    assert_eq!(bundle.classify_protocol(&fingerprint(8080, Transport::Tcp, true)).0, DeviceClass::Rest);
    assert_eq!(bundle.classify_protocol(&fingerprint(4840, Transport::Tcp, false)).0, DeviceClass::OpcUa);
  }

  #[test]
  fn intent_paths_agree_on_golden_inputs() {
    let golden = [
      ("What's the temperature in room 101?", IntentClass::GetTemperature),
      ("What's the humidity in the building?", IntentClass::GetHumidity),
      ("What's the pressure in room 205?", IntentClass::GetPressure),
      ("What's the status of the HVAC system?", IntentClass::GetStatus),
      ("Set temperature to 22 in room 101", IntentClass::SetValue),
      ("Compare temperature in room 101 and room 102", IntentClass::CompareData),
      ("Show me the temperature trend", IntentClass::GetTrend),
      ("Discover new devices", IntentClass::GeneralQuery),
    ];
    let learned = ModelBundle::with_defaults();
    let rules = ModelBundle::rule_only();
    for (query, expected) in golden {
      assert_eq!(learned.classify_intent(query).0, expected, "learned path: {query}");
      assert_eq!(rules.classify_intent(query).0, expected, "rule path: {query}");
    }
  }

  #[test]
  fn anomaly_score_rises_with_deviation() {
    let bundle = ModelBundle::with_defaults();
    let at = chrono::Utc::now();
    let mut normal = BTreeMap::new();
    normal.insert("temperature".to_owned(), 22.0);
    normal.insert("humidity".to_owned(), 45.0);
    let mut hot = BTreeMap::new();
    hot.insert("temperature".to_owned(), 45.0);
    hot.insert("humidity".to_owned(), 85.0);
    assert!(bundle.score_anomaly(&normal, at) < bundle.score_anomaly(&hot, at));
  }

  #[test]
  fn total_model_budget_is_under_8_kb() {
    let total: usize = ModelBundle::with_defaults().info().iter().map(|m| m.size_bytes()).sum();
    assert!(total <= 8 * 1024, "models take {total} bytes");
  }
}
