// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Traits the protocol clients implement.
//!
//! A [`ProtocolConnector`] knows how to reach a device address for one wire
//! protocol and hands back a live [`ProtocolClient`]. Clients are stateless
//! apart from their transport handle and the per-session invoke/transaction
//! counters, so the [`ConnectionManager`](crate::ConnectionManager) can own
//! the rest of the session state.

use async_trait::async_trait;
use fieldgate_core::{Deadline, GatewayResult, ProtocolSpec, TypedValue};
use fieldgate_descriptor::{ObjectType, ParameterSpec};
use getset::{CopyGetters, Getters};

/// Addressing for callers that bypass the descriptor (raw register reads,
/// direct object access, explicit paths).
#[derive(Debug, Clone, PartialEq)]
pub enum RawAddress {
  /// Modbus logical register address.
  Register(u32),
  /// BACnet object identifier.
  Object { object_type: ObjectType, instance: u32 },
  /// REST endpoint path.
  Path(String),
}

/// What the protocol handshake learned about the peer. Feeds fingerprints
/// and the session's identity hints.
#[derive(Debug, Clone, Default, Getters, CopyGetters)]
pub struct ProbeInfo {
  #[getset(get_copy = "pub")]
  latency_ms: f64,
  #[getset(get_copy = "pub")]
  payload_size: u32,
  #[getset(get_copy = "pub")]
  vendor_id: Option<u16>,
  #[getset(get_copy = "pub")]
  device_instance: Option<u32>,
  #[getset(get = "pub")]
  model_hint: Option<String>,
  #[getset(get_copy = "pub")]
  json_payload: bool,
}

impl ProbeInfo {
  pub fn new(
    latency_ms: f64,
    payload_size: u32,
    vendor_id: Option<u16>,
    device_instance: Option<u32>,
    model_hint: Option<String>,
    json_payload: bool,
  ) -> Self {
    Self {
      latency_ms,
      payload_size,
      vendor_id,
      device_instance,
      model_hint,
      json_payload,
    }
  }
}

/// One live connection to one device.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
  fn protocol_name(&self) -> &str;
  fn address(&self) -> &str;

  /// Protocol-specific handshake: a probe read for Modbus/REST, the
  /// Who-Is/I-Am exchange for BACnet.
  async fn probe(&self, deadline: Deadline) -> GatewayResult<ProbeInfo>;

  async fn read(&self, parameter: &ParameterSpec, deadline: Deadline) -> GatewayResult<TypedValue>;

  async fn write(
    &self,
    parameter: &ParameterSpec,
    value: &TypedValue,
    deadline: Deadline,
  ) -> GatewayResult<()>;

  /// Read without a descriptor. Whatever the peer says comes back raw,
  /// including protocol exceptions.
  async fn read_raw(&self, address: &RawAddress, deadline: Deadline) -> GatewayResult<TypedValue>;

  async fn close(&self);
}

/// Factory for [`ProtocolClient`]s, one per wire protocol.
#[async_trait]
pub trait ProtocolConnector: Send + Sync {
  fn protocol_name(&self) -> &str;

  async fn connect(
    &self,
    address: &str,
    spec: &ProtocolSpec,
    deadline: Deadline,
  ) -> GatewayResult<Box<dyn ProtocolClient>>;
}
