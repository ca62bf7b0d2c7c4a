// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use crate::util::text_digest;

/// Transport a device was observed on.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Transport {
  Udp,
  Tcp,
}

/// Feature vector extracted from first contact with an unknown device.
///
/// Ephemeral: the resolver consumes it, caches the result under
/// [`digest`](Fingerprint::digest), and discards the fingerprint itself.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize, Deserialize)]
pub struct Fingerprint {
  #[getset(get_copy = "pub")]
  transport: Transport,
  #[getset(get_copy = "pub")]
  port: u16,
  #[getset(get_copy = "pub")]
  response_latency_ms: f64,
  #[getset(get_copy = "pub")]
  payload_size: u32,
  #[getset(get_copy = "pub")]
  vendor_id: Option<u16>,
  #[getset(get = "pub")]
  model_hint: Option<String>,
  #[getset(get = "pub")]
  firmware: Option<String>,
  #[getset(get_copy = "pub")]
  request_cadence_ms: Option<f64>,
  /// Whether the first response advertised a JSON content type.
  #[getset(get_copy = "pub")]
  json_payload: bool,
}

impl Fingerprint {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    transport: Transport,
    port: u16,
    response_latency_ms: f64,
    payload_size: u32,
    vendor_id: Option<u16>,
    model_hint: Option<String>,
    firmware: Option<String>,
    request_cadence_ms: Option<f64>,
    json_payload: bool,
  ) -> Self {
    Self {
      transport,
      port,
      response_latency_ms,
      payload_size,
      vendor_id,
      model_hint,
      firmware,
      request_cadence_ms,
      json_payload,
    }
  }

  /// Cache key for resolver lookups. Built from the identifying features
  /// only; latency and payload size jitter between sightings of the same
  /// device and are left out.
  pub fn digest(&self) -> String {
    let key = format!(
      "{}|{}|{}|{}",
      self.transport,
      self.port,
      self.vendor_id.map(|v| v.to_string()).unwrap_or_default(),
      self.model_hint.as_deref().unwrap_or_default(),
    );
    text_digest(&key)
  }
}

/// Builder-free convenience for the common probe results.
impl Default for Fingerprint {
  fn default() -> Self {
    Self {
      transport: Transport::Tcp,
      port: 0,
      response_latency_ms: 0.0,
      payload_size: 0,
      vendor_id: None,
      model_hint: None,
      firmware: None,
      request_cadence_ms: None,
      json_payload: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn digest_ignores_jitter() {
    let a = Fingerprint::new(Transport::Udp, 47808, 12.0, 24, Some(260), None, None, None, false);
    let b = Fingerprint::new(Transport::Udp, 47808, 48.0, 31, Some(260), None, None, None, false);
    assert_eq!(a.digest(), b.digest());
  }

  #[test]
  fn digest_distinguishes_vendors() {
    let a = Fingerprint::new(Transport::Udp, 47808, 12.0, 24, Some(260), None, None, None, false);
    let b = Fingerprint::new(Transport::Udp, 47808, 12.0, 24, Some(123), None, None, None, false);
    assert_ne!(a.digest(), b.digest());
  }
}
