// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use fieldgate_ml::{IntentClass, ModelBundle};
use getset::{CopyGetters, Getters};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

static LOCATION_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\b(?:room|zone)\s+([A-Za-z0-9]+)").expect("static pattern compiles"));
static VALUE_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\b(?:to|at)\s+(-?\d+(?:\.\d+)?)\b").expect("static pattern compiles"));
static NUMBER_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)").expect("static pattern compiles"));

/// Operator intent, collapsed from the eight model classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Intent {
  Get,
  Set,
  Status,
  Compare,
  Trend,
}

impl From<IntentClass> for Intent {
  fn from(class: IntentClass) -> Self {
    match class {
      IntentClass::GetTemperature | IntentClass::GetHumidity | IntentClass::GetPressure => Intent::Get,
      IntentClass::SetValue => Intent::Set,
      IntentClass::CompareData => Intent::Compare,
      IntentClass::GetTrend => Intent::Trend,
      IntentClass::GetStatus | IntentClass::GeneralQuery => Intent::Status,
    }
  }
}

/// One step of an operation plan.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct PlanOperation {
  /// Target session, when one is live and carries the parameter.
  #[getset(get = "pub")]
  session_id: Option<String>,
  #[getset(get = "pub")]
  operation: Intent,
  #[getset(get = "pub")]
  parameter: Option<String>,
  #[getset(get = "pub")]
  value: Option<f64>,
}

impl PlanOperation {
  fn new(session_id: Option<String>, operation: Intent, parameter: Option<String>, value: Option<f64>) -> Self {
    Self {
      session_id,
      operation,
      parameter,
      value,
    }
  }
}

/// A planned response to one operator request.
#[derive(Debug, Clone, PartialEq, Serialize, Getters, CopyGetters)]
pub struct Plan {
  #[getset(get_copy = "pub")]
  intent: Intent,
  #[getset(get = "pub")]
  parameter: Option<String>,
  #[getset(get = "pub")]
  location: Option<String>,
  #[getset(get_copy = "pub")]
  value: Option<f64>,
  #[getset(get = "pub")]
  operations: Vec<PlanOperation>,
}

/// A live session the planner may target.
#[derive(Debug, Clone)]
pub struct SessionCandidate {
  pub session_id: String,
  pub parameters: Vec<String>,
}

impl SessionCandidate {
  fn has(&self, parameter: &str) -> bool {
    self.parameters.iter().any(|p| p == parameter)
  }
}

/// Intent + entity extraction → ordered operation plan.
///
/// The learned intent classifier and the keyword rule path produce the same
/// plans for the golden inputs; entity extraction is always rule-based.
pub struct QueryDispatcher {
  models: Arc<ModelBundle>,
}

impl QueryDispatcher {
  pub fn new(models: Arc<ModelBundle>) -> Self {
    Self { models }
  }

  pub fn plan(&self, query: &str, known_parameters: &[String], candidates: &[SessionCandidate]) -> Plan {
    let (class, confidence) = self.models.classify_intent(query);
    let intent = Intent::from(class);
    let parameter = extract_parameter(query, known_parameters);
    let location = extract_location(query);
    let value = extract_value(query, intent);
    debug!("query \"{query}\" → {intent} (class {class}, confidence {confidence:.2})");

    let operations = match intent {
      Intent::Get | Intent::Trend => match &parameter {
        Some(parameter) => vec![PlanOperation::new(
          first_session_with(candidates, parameter),
          intent,
          Some(parameter.clone()),
          None,
        )],
        None => Vec::new(),
      },
      Intent::Set => match &parameter {
        Some(parameter) => vec![PlanOperation::new(
          first_session_with(candidates, parameter),
          Intent::Set,
          Some(parameter.clone()),
          value,
        )],
        None => Vec::new(),
      },
      Intent::Compare => match &parameter {
        Some(parameter) => {
          let mut with_parameter: Vec<&SessionCandidate> =
            candidates.iter().filter(|c| c.has(parameter)).collect();
          with_parameter.truncate(2);
          with_parameter
            .iter()
            .map(|c| {
              PlanOperation::new(Some(c.session_id.clone()), Intent::Get, Some(parameter.clone()), None)
            })
            .collect()
        }
        None => Vec::new(),
      },
      Intent::Status => candidates
        .iter()
        .map(|c| PlanOperation::new(Some(c.session_id.clone()), Intent::Status, None, None))
        .collect(),
    };

    Plan {
      intent,
      parameter,
      location,
      value,
      operations,
    }
  }
}

/// Longest known parameter name mentioned in the query, matched on
/// normalized word boundaries; falls back to the bare channel words.
fn extract_parameter(query: &str, known_parameters: &[String]) -> Option<String> {
  let normalized = normalize(query);
  let mut best: Option<&String> = None;
  for name in known_parameters {
    if normalized.contains(&normalize(name))
      && best.map(|b| name.len() > b.len()).unwrap_or(true)
    {
      best = Some(name);
    }
  }
  if let Some(best) = best {
    return Some(best.clone());
  }
  for channel in ["temperature", "humidity", "pressure"] {
    if normalized.contains(channel) {
      return Some(channel.to_owned());
    }
  }
  None
}

fn normalize(text: &str) -> String {
  text
    .to_lowercase()
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
    .collect::<String>()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

fn extract_location(query: &str) -> Option<String> {
  LOCATION_RE
    .captures(query)
    .map(|c| format!("room_{}", c[1].to_lowercase()))
}

fn extract_value(query: &str, intent: Intent) -> Option<f64> {
  if intent != Intent::Set {
    return None;
  }
  // Prefer "to 22" / "at 22"; otherwise the last number that is not a room.
  if let Some(captures) = VALUE_RE.captures(query) {
    return captures[1].parse().ok();
  }
  let stripped = LOCATION_RE.replace_all(query, "");
  NUMBER_RE
    .captures_iter(&stripped)
    .last()
    .and_then(|c| c[1].parse().ok())
}

fn first_session_with(candidates: &[SessionCandidate], parameter: &str) -> Option<String> {
  candidates.iter().find(|c| c.has(parameter)).map(|c| c.session_id.clone())
}
