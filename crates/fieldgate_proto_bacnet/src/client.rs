// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::frame::{
  Ack, BacnetValue, IAm, PROP_PRESENT_VALUE, decode_ack, decode_i_am, encode_read_property,
  encode_who_is, encode_write_property,
};
use async_trait::async_trait;
use fieldgate_core::errors::{GatewayError, GatewayResult, TransportError, ValidationError};
use fieldgate_core::{Deadline, ProtocolSpec, TypedValue};
use fieldgate_descriptor::{Addressing, ObjectType, ParameterSpec, ValueKind};
use fieldgate_server::transport::{ProbeInfo, ProtocolClient, ProtocolConnector, RawAddress};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::debug;

fn io_error(e: std::io::Error) -> GatewayError {
  GatewayError::Transport(TransportError::Unreachable(e.to_string()))
}

/// BACnet/IP client for one device. The invoke-id counter is session local
/// and increases monotonically modulo its 8-bit width.
pub struct BacnetClient {
  address: String,
  peer: SocketAddr,
  socket: Mutex<UdpSocket>,
  invoke_id: AtomicU8,
}

impl BacnetClient {
  pub async fn connect(address: &str, spec: &ProtocolSpec, deadline: Deadline) -> GatewayResult<Self> {
    let target = if address.contains(':') {
      address.to_owned()
    } else {
      format!("{address}:{}", spec.default_port())
    };
    let peer: SocketAddr = target
      .parse()
      .map_err(|_| GatewayError::Transport(TransportError::Unreachable(format!("bad address {target}"))))?;
    let socket = deadline
      .bound(async {
        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(io_error)?;
        socket.set_broadcast(true).map_err(io_error)?;
        Ok(socket)
      })
      .await?;
    debug!("bacnet socket bound for {target}");
    Ok(Self {
      address: target,
      peer,
      socket: Mutex::new(socket),
      invoke_id: AtomicU8::new(1),
    })
  }

  fn next_invoke_id(&self) -> u8 {
    self.invoke_id.fetch_add(1, Ordering::Relaxed)
  }

  /// Who-Is/I-Am exchange against the peer. Frames from other hosts are
  /// ignored; the first parseable I-Am from the peer wins.
  pub async fn discover(&self, deadline: Deadline) -> GatewayResult<IAm> {
    let socket = self.socket.lock().await;
    deadline
      .bound(async {
        socket.send_to(&encode_who_is(), self.peer).await.map_err(io_error)?;
        let mut buffer = [0u8; 1500];
        loop {
          let (received, from) = socket.recv_from(&mut buffer).await.map_err(io_error)?;
          if from.ip() != self.peer.ip() {
            continue;
          }
          match decode_i_am(&buffer[..received]) {
            Ok(i_am) => return Ok(i_am),
            Err(e) => debug!("ignoring non-I-Am frame from {from}: {e}"),
          }
        }
      })
      .await
  }

  /// Send one confirmed request and wait for its acknowledgement, matched by
  /// invoke id within the deadline window.
  async fn confirmed(&self, request: Vec<u8>, invoke_id: u8, deadline: Deadline) -> GatewayResult<Ack> {
    let socket = self.socket.lock().await;
    deadline
      .bound(async {
        socket.send_to(&request, self.peer).await.map_err(io_error)?;
        let mut buffer = [0u8; 1500];
        loop {
          let (received, from) = socket.recv_from(&mut buffer).await.map_err(io_error)?;
          if from.ip() != self.peer.ip() {
            continue;
          }
          match decode_ack(&buffer[..received], invoke_id) {
            Ok(ack) => return Ok(ack),
            // Protocol errors answer this invoke id; anything else is a
            // stale or foreign frame to skip.
            Err(e @ GatewayError::Protocol(_)) => return Err(e),
            Err(e) => debug!("ignoring frame from {from}: {e}"),
          }
        }
      })
      .await
  }

  fn object_addressing(parameter: &ParameterSpec) -> GatewayResult<(ObjectType, u32)> {
    match parameter.addressing() {
      Addressing::Object { object_type, instance } => Ok((*object_type, *instance)),
      _ => Err(GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "parameter \"{}\" is not object-addressed",
        parameter.name()
      )))),
    }
  }

  fn value_from(ack: BacnetValue, kind: ValueKind) -> TypedValue {
    match (kind, ack) {
      (ValueKind::Float, BacnetValue::Real(v)) => TypedValue::Float(v as f64),
      (ValueKind::Float, BacnetValue::Unsigned(v)) => TypedValue::Float(v as f64),
      (ValueKind::Bool, BacnetValue::Boolean(v)) => TypedValue::Bool(v),
      (ValueKind::Bool, BacnetValue::Enumerated(v)) => TypedValue::Bool(v != 0),
      (ValueKind::Enum, BacnetValue::Enumerated(v) | BacnetValue::Unsigned(v)) => {
        TypedValue::Enum(v.to_string())
      }
      (ValueKind::Int, BacnetValue::Unsigned(v) | BacnetValue::Enumerated(v)) => TypedValue::Int(v as i64),
      (_, BacnetValue::Real(v)) => TypedValue::Float(v as f64),
      (_, BacnetValue::Unsigned(v)) => TypedValue::Int(v as i64),
      (_, BacnetValue::Boolean(v)) => TypedValue::Bool(v),
      (_, BacnetValue::Enumerated(v)) => TypedValue::Int(v as i64),
    }
  }

  fn value_to(parameter: &ParameterSpec, value: &TypedValue) -> GatewayResult<BacnetValue> {
    match (parameter.kind(), value) {
      (ValueKind::Float, TypedValue::Float(v)) => Ok(BacnetValue::Real(*v as f32)),
      (ValueKind::Float, TypedValue::Int(v)) => Ok(BacnetValue::Real(*v as f32)),
      (ValueKind::Int, TypedValue::Int(v)) => Ok(BacnetValue::Unsigned(*v as u32)),
      (ValueKind::Bool, TypedValue::Bool(v)) => Ok(BacnetValue::Boolean(*v)),
      (ValueKind::Enum, TypedValue::Enum(state)) => state
        .parse::<u32>()
        .map(BacnetValue::Enumerated)
        .map_err(|_| {
          GatewayError::Validation(ValidationError::InvariantViolation(format!(
            "multi-state value \"{state}\" is not a state number"
          )))
        }),
      (ValueKind::Enum, TypedValue::Int(v)) => Ok(BacnetValue::Enumerated(*v as u32)),
      (kind, value) => Err(GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "cannot write {value} to {kind} parameter \"{}\"",
        parameter.name()
      )))),
    }
  }
}

#[async_trait]
impl ProtocolClient for BacnetClient {
  fn protocol_name(&self) -> &str {
    "bacnet"
  }

  fn address(&self) -> &str {
    &self.address
  }

  /// The BACnet handshake is the Who-Is/I-Am exchange.
  async fn probe(&self, deadline: Deadline) -> GatewayResult<ProbeInfo> {
    let started = Instant::now();
    let i_am = self.discover(deadline).await?;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    Ok(ProbeInfo::new(
      latency_ms,
      i_am.max_apdu_length as u32,
      Some(i_am.vendor_id),
      Some(i_am.device_instance),
      None,
      false,
    ))
  }

  async fn read(&self, parameter: &ParameterSpec, deadline: Deadline) -> GatewayResult<TypedValue> {
    let (object_type, instance) = Self::object_addressing(parameter)?;
    let invoke_id = self.next_invoke_id();
    let request = encode_read_property(invoke_id, object_type.wire_type(), instance, PROP_PRESENT_VALUE);
    match self.confirmed(request, invoke_id, deadline).await? {
      Ack::Value(value) => Ok(Self::value_from(value, parameter.kind())),
      Ack::Simple => Err(GatewayError::Decode(fieldgate_core::errors::DecodeError::UnexpectedFrame(
        "ReadProperty answered with a simple ack".to_owned(),
      ))),
    }
  }

  async fn write(&self, parameter: &ParameterSpec, value: &TypedValue, deadline: Deadline) -> GatewayResult<()> {
    let (object_type, instance) = Self::object_addressing(parameter)?;
    let payload = Self::value_to(parameter, value)?;
    let invoke_id = self.next_invoke_id();
    let request =
      encode_write_property(invoke_id, object_type.wire_type(), instance, PROP_PRESENT_VALUE, &payload);
    match self.confirmed(request, invoke_id, deadline).await? {
      Ack::Simple | Ack::Value(_) => Ok(()),
    }
  }

  async fn read_raw(&self, address: &RawAddress, deadline: Deadline) -> GatewayResult<TypedValue> {
    let (object_type, instance) = match address {
      RawAddress::Object { object_type, instance } => (*object_type, *instance),
      other => {
        return Err(GatewayError::Validation(ValidationError::InvariantViolation(format!(
          "bacnet cannot address {other:?}"
        ))));
      }
    };
    let invoke_id = self.next_invoke_id();
    let request = encode_read_property(invoke_id, object_type.wire_type(), instance, PROP_PRESENT_VALUE);
    match self.confirmed(request, invoke_id, deadline).await? {
      Ack::Value(BacnetValue::Real(v)) => Ok(TypedValue::Float(v as f64)),
      Ack::Value(BacnetValue::Unsigned(v)) => Ok(TypedValue::Int(v as i64)),
      Ack::Value(BacnetValue::Boolean(v)) => Ok(TypedValue::Bool(v)),
      Ack::Value(BacnetValue::Enumerated(v)) => Ok(TypedValue::Int(v as i64)),
      Ack::Simple => Err(GatewayError::Decode(fieldgate_core::errors::DecodeError::UnexpectedFrame(
        "ReadProperty answered with a simple ack".to_owned(),
      ))),
    }
  }

  async fn close(&self) {
    // UDP has nothing to tear down; dropping the socket releases the port.
  }
}

/// Connector registered with the connection manager at startup.
#[derive(Debug, Default)]
pub struct BacnetConnector;

#[async_trait]
impl ProtocolConnector for BacnetConnector {
  fn protocol_name(&self) -> &str {
    "bacnet"
  }

  async fn connect(
    &self,
    address: &str,
    spec: &ProtocolSpec,
    deadline: Deadline,
  ) -> GatewayResult<Box<dyn ProtocolClient>> {
    Ok(Box::new(BacnetClient::connect(address, spec, deadline).await?))
  }
}
