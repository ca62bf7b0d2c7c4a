// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Immutable wire-protocol descriptions.
//!
//! A [`ProtocolSpec`] is configuration, not code: the three protocol clients
//! are table-driven over its timing, retry, and discovery fields. Specs are
//! created once at startup by [`ProtocolRegistry::with_defaults`] and never
//! mutated; a protocol upgrade is a new spec under a new name.

use crate::fingerprint::Transport;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};

/// How a protocol finds devices on first contact.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryMethod {
  /// BACnet Who-Is broadcast, answered by I-Am.
  BroadcastWhoIs,
  /// HTTP GET against a well-known status endpoint.
  HttpProbe,
  /// Modbus read against unit id 1 to confirm a responder.
  UnitIdProbe,
}

#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize, Deserialize)]
pub struct ProtocolSpec {
  #[getset(get = "pub")]
  name: String,
  #[getset(get_copy = "pub")]
  transport: Transport,
  #[getset(get_copy = "pub")]
  default_port: u16,
  #[getset(get_copy = "pub")]
  request_timeout: Duration,
  #[getset(get_copy = "pub")]
  retry_attempts: u32,
  #[getset(get_copy = "pub")]
  retry_base_delay: Duration,
  #[getset(get_copy = "pub")]
  discovery: DiscoveryMethod,
}

impl ProtocolSpec {
  pub fn new(
    name: &str,
    transport: Transport,
    default_port: u16,
    request_timeout: Duration,
    retry_attempts: u32,
    retry_base_delay: Duration,
    discovery: DiscoveryMethod,
  ) -> Self {
    Self {
      name: name.to_owned(),
      transport,
      default_port,
      request_timeout,
      retry_attempts,
      retry_base_delay,
      discovery,
    }
  }

  /// Exponential backoff delay before retry number `attempt` (0-based).
  pub fn retry_delay(&self, attempt: u32) -> Duration {
    self.retry_base_delay * 2u32.saturating_pow(attempt)
  }
}

/// Registry of every protocol the gateway speaks. Immutable after startup;
/// collaborators hold an `Arc` to it rather than reaching into a global.
#[derive(Debug, Clone)]
pub struct ProtocolRegistry {
  specs: HashMap<String, Arc<ProtocolSpec>>,
}

impl ProtocolRegistry {
  pub fn with_defaults() -> Self {
    let mut specs = HashMap::new();
    for spec in [
      ProtocolSpec::new(
        "rest",
        Transport::Tcp,
        80,
        Duration::from_secs(30),
        3,
        Duration::from_secs(1),
        DiscoveryMethod::HttpProbe,
      ),
      ProtocolSpec::new(
        "bacnet",
        Transport::Udp,
        47808,
        Duration::from_secs(5),
        3,
        Duration::from_millis(500),
        DiscoveryMethod::BroadcastWhoIs,
      ),
      ProtocolSpec::new(
        "modbus",
        Transport::Tcp,
        502,
        Duration::from_secs(5),
        3,
        Duration::from_millis(500),
        DiscoveryMethod::UnitIdProbe,
      ),
    ] {
      specs.insert(spec.name().clone(), Arc::new(spec));
    }
    Self { specs }
  }

  /// Case-insensitive lookup by protocol name.
  pub fn get(&self, name: &str) -> Option<Arc<ProtocolSpec>> {
    self.specs.get(&name.to_lowercase()).cloned()
  }

  pub fn get_by_port(&self, port: u16) -> Option<Arc<ProtocolSpec>> {
    self.specs.values().find(|s| s.default_port() == port).cloned()
  }

  pub fn all(&self) -> Vec<Arc<ProtocolSpec>> {
    let mut all: Vec<_> = self.specs.values().cloned().collect();
    all.sort_by(|a, b| a.name().cmp(b.name()));
    all
  }
}
