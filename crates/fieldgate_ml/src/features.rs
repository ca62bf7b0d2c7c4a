// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Feature extraction for the three edge models.
//!
//! The recipes are part of the model contract: weights are trained (or
//! hand-set) against exactly these layouts, so changing a slot here is a
//! model-format change.

use chrono::{DateTime, Datelike, Timelike, Utc};
use fieldgate_core::{Fingerprint, Transport};
use std::collections::BTreeMap;

pub const QUERY_FEATURES: usize = 64;
pub const FINGERPRINT_FEATURES: usize = 16;
pub const SENSOR_FEATURES: usize = 32;

/// 64 features from a natural-language request: character codes (0-31),
/// keyword counts (32-47), and shape flags (48-63).
pub fn query_features(query: &str) -> Vec<f32> {
  let mut features = vec![0.0f32; QUERY_FEATURES];

  for (i, ch) in query.chars().take(32).enumerate() {
    features[i] = (ch as u32).min(255) as f32 / 255.0;
  }

  let lower = query.to_lowercase();
  let words: Vec<&str> = lower.split_whitespace().collect();
  let count = |needle: &str| words.iter().filter(|w| w.contains(needle)).count() as f32;
  let word_features = [
    query.len() as f32,
    words.len() as f32,
    count("temp"),
    count("humid"),
    count("press"),
    count("status"),
    count("set"),
    count("get"),
    count("room"),
    count("device"),
    count("hvac"),
    count("energy"),
    count("anomal"),
    count("optim"),
    count("bacnet"),
    count("rest"),
  ];
  for (i, feature) in word_features.iter().enumerate() {
    features[32 + i] = (feature / 10.0).min(1.0);
  }

  let len = query.chars().count().max(1) as f32;
  features[48] = if query.contains('?') { 1.0 } else { 0.0 };
  features[49] = if query.contains('!') { 1.0 } else { 0.0 };
  features[50] = if query.chars().any(|c| c.is_ascii_digit()) { 1.0 } else { 0.0 };
  features[51] = if query.chars().any(|c| c.is_uppercase()) { 1.0 } else { 0.0 };
  features[52] = query.chars().filter(|c| c.is_alphabetic()).count() as f32 / len;
  features[53] = query.chars().filter(|c| c.is_ascii_digit()).count() as f32 / len;
  features[54] = query.chars().filter(|c| c.is_whitespace()).count() as f32 / len;
  features[55] = if query.ends_with('?') { 1.0 } else { 0.0 };
  features[56] = if lower.starts_with("what") { 1.0 } else { 0.0 };
  features[57] = if lower.starts_with("how") { 1.0 } else { 0.0 };
  features[58] = if lower.starts_with("show") { 1.0 } else { 0.0 };
  features[59] = if lower.starts_with("get") { 1.0 } else { 0.0 };
  features[60] = if lower.starts_with("set") { 1.0 } else { 0.0 };
  features[61] = if lower.contains("compare") { 1.0 } else { 0.0 };
  features[62] = if lower.contains("trend") { 1.0 } else { 0.0 };
  features[63] = if lower.contains("all") { 1.0 } else { 0.0 };

  features
}

/// 16 features from a device fingerprint: raw network observables plus a few
/// fixed interactions.
pub fn fingerprint_features(fingerprint: &Fingerprint) -> Vec<f32> {
  let port = fingerprint.port();
  let latency = fingerprint.response_latency_ms();
  let size = fingerprint.payload_size() as f32;
  vec![
    port as f32 / 65535.0,
    if fingerprint.transport() == Transport::Tcp { 1.0 } else { 0.0 },
    if fingerprint.transport() == Transport::Udp { 1.0 } else { 0.0 },
    (latency as f32 / 1000.0).min(1.0),
    (size / 10_000.0).min(1.0),
    fingerprint.vendor_id().map(|v| (v as f32 / 1000.0).min(1.0)).unwrap_or(0.0),
    if fingerprint.json_payload() { 1.0 } else { 0.0 },
    (port % 1000) as f32 / 1000.0,
    port.to_string().len() as f32,
    if port < 1024 { 1.0 } else { 0.0 },
    if port > 49152 { 1.0 } else { 0.0 },
    (latency as f32 % 100.0) / 100.0,
    (size % 1000.0) / 1000.0,
    if size > 1000.0 { 1.0 } else { 0.0 },
    fingerprint.request_cadence_ms().map(|c| (c as f32 / 1000.0).min(1.0)).unwrap_or(0.0),
    0.0,
  ]
}

/// 32 features from one reading: raw sensor slots, distribution statistics,
/// fixed interactions, and time-of-day/time-of-week slots taken from the
/// caller's timestamp (never the wall clock, so scoring stays deterministic).
pub fn sensor_features(reading: &BTreeMap<String, f64>, at: DateTime<Utc>) -> Vec<f32> {
  let mut features = vec![0.0f32; SENSOR_FEATURES];
  // Non-finite samples (a device can report NaN) fall back to the channel
  // default so the feature vector stays finite.
  let get = |name: &str, default: f64| {
    reading
      .get(name)
      .copied()
      .filter(|v| v.is_finite())
      .unwrap_or(default) as f32
  };

  features[0] = get("temperature", 20.0) / 50.0;
  features[1] = get("humidity", 50.0) / 100.0;
  features[2] = get("pressure", 1013.0) / 2000.0;
  features[3] = get("voltage", 220.0) / 500.0;
  features[4] = get("current", 1.0) / 10.0;
  features[5] = get("power", 100.0) / 1000.0;
  features[6] = get("frequency", 50.0) / 100.0;
  features[7] = get("vibration", 0.0) / 10.0;

  let mut values: Vec<f32> = reading
    .values()
    .filter(|v| v.is_finite())
    .map(|v| *v as f32)
    .collect();
  if !values.is_empty() {
    values.sort_by(f32::total_cmp);
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let min = values[0];
    let max = values[values.len() - 1];
    let median = values[values.len() / 2];
    features[8] = mean / 100.0;
    features[9] = var.sqrt() / 100.0;
    features[10] = min / 100.0;
    features[11] = max / 100.0;
    features[12] = median / 100.0;
    features[13] = n / 20.0;
    features[14] = (max - min) / 100.0;
    features[15] = var / 100.0;
  }

  features[16] = (features[0] - 0.4).abs();
  features[17] = (features[1] - 0.5).abs();
  features[18] = (features[2] - 0.5).abs();
  features[19] = features[0] * features[1];
  features[20] = features[2] * features[0];
  features[21] = features[1] * features[2];
  features[22] = features[8] * features[9];
  features[23] = features[14] / (features[8] + 0.001);

  features[24] = at.hour() as f32 / 24.0;
  features[25] = at.minute() as f32 / 60.0;
  features[26] = at.second() as f32 / 60.0;
  features[27] = at.weekday().num_days_from_monday() as f32 / 7.0;
  features[28] = at.day() as f32 / 31.0;
  features[29] = at.month() as f32 / 12.0;
  features[30] = if at.hour() < 6 || at.hour() > 22 { 1.0 } else { 0.0 };
  features[31] = if at.weekday().num_days_from_monday() >= 5 { 1.0 } else { 0.0 };

  features
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn query_features_have_fixed_width() {
    assert_eq!(query_features("").len(), QUERY_FEATURES);
    assert_eq!(query_features("what's the temperature in room 101?").len(), QUERY_FEATURES);
  }

  #[test]
  fn keyword_slots_fire() {
    let features = query_features("set the temperature in room 101");
    assert!(features[34] > 0.0, "temp slot");
    assert!(features[38] > 0.0, "set slot");
    assert!(features[40] > 0.0, "room slot");
    assert_eq!(features[50], 1.0, "digit flag");
  }

  #[test]
  fn fingerprint_features_have_fixed_width() {
    let fp = Fingerprint::new(Transport::Udp, 47808, 12.0, 24, Some(260), None, None, None, false);
    let features = fingerprint_features(&fp);
    assert_eq!(features.len(), FINGERPRINT_FEATURES);
    assert_eq!(features[2], 1.0, "udp flag");
    assert_eq!(features[9], 0.0, "47808 is not well-known");
  }

  #[test]
  fn non_finite_samples_fall_back_to_channel_defaults() {
    let at = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
    let mut reading = BTreeMap::new();
    reading.insert("temperature".to_owned(), f64::NAN);
    reading.insert("humidity".to_owned(), 45.0);
    let features = sensor_features(&reading, at);
    assert!(features.iter().all(|f| f.is_finite()));
    assert_eq!(features[0], 0.4, "NaN temperature uses the channel default of 20 °C");
  }

  #[test]
  fn sensor_features_are_deterministic_for_a_fixed_timestamp() {
    let at = Utc.with_ymd_and_hms(2026, 3, 14, 2, 30, 0).unwrap();
    let mut reading = BTreeMap::new();
    reading.insert("temperature".to_owned(), 22.5);
    reading.insert("humidity".to_owned(), 45.0);
    let a = sensor_features(&reading, at);
    let b = sensor_features(&reading, at);
    assert_eq!(a, b);
    assert_eq!(a.len(), SENSOR_FEATURES);
    assert_eq!(a[30], 1.0, "02:30 is night");
  }
}
