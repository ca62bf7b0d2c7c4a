// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::frame::{
  self, AddressSpace, MBAP_LEN, ResponsePdu, decode_response, encode_read, encode_write_single_coil,
  encode_write_single_register,
};
use async_trait::async_trait;
use byteorder::{BigEndian, ByteOrder};
use fieldgate_core::errors::{DecodeError, GatewayError, GatewayResult, TransportError, ValidationError};
use fieldgate_core::{Deadline, ProtocolSpec, TypedValue};
use fieldgate_descriptor::{Addressing, ParameterSpec, ValueKind};
use fieldgate_server::transport::{ProbeInfo, ProtocolClient, ProtocolConnector, RawAddress};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_UNIT_ID: u8 = 1;

fn io_error(e: std::io::Error) -> GatewayError {
  use std::io::ErrorKind;
  let transport = match e.kind() {
    ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof => {
      TransportError::ConnectionReset
    }
    ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout(0),
    _ => TransportError::Unreachable(e.to_string()),
  };
  GatewayError::Transport(transport)
}

/// Modbus/TCP client for one device. The transaction counter is session
/// local and increases monotonically modulo the field width.
pub struct ModbusClient {
  address: String,
  unit_id: u8,
  stream: Mutex<TcpStream>,
  transaction_id: AtomicU16,
}

impl ModbusClient {
  pub async fn connect(address: &str, spec: &ProtocolSpec, deadline: Deadline) -> GatewayResult<Self> {
    let target = if address.contains(':') {
      address.to_owned()
    } else {
      format!("{address}:{}", spec.default_port())
    };
    let stream = deadline
      .bound(async { TcpStream::connect(&target).await.map_err(io_error) })
      .await?;
    debug!("modbus connected to {target}");
    Ok(Self {
      address: target,
      unit_id: DEFAULT_UNIT_ID,
      stream: Mutex::new(stream),
      transaction_id: AtomicU16::new(1),
    })
  }

  fn next_transaction_id(&self) -> u16 {
    self.transaction_id.fetch_add(1, Ordering::Relaxed)
  }

  /// One request/response exchange. Responses are matched by transaction id;
  /// a stale frame is discarded and the read continues within the deadline.
  async fn transact(&self, request: Vec<u8>, expected: u16, deadline: Deadline) -> GatewayResult<ResponsePdu> {
    let mut stream = self.stream.lock().await;
    deadline
      .bound(async {
        stream.write_all(&request).await.map_err(io_error)?;
        loop {
          let mut header = [0u8; MBAP_LEN];
          stream.read_exact(&mut header).await.map_err(io_error)?;
          let length = BigEndian::read_u16(&header[4..6]) as usize;
          if length == 0 {
            return Err(GatewayError::Decode(DecodeError::InvalidMbap("zero length".to_owned())));
          }
          let mut body = vec![0u8; length - 1];
          stream.read_exact(&mut body).await.map_err(io_error)?;
          let mut frame = header.to_vec();
          frame.extend_from_slice(&body);
          let transaction_id = BigEndian::read_u16(&frame[0..2]);
          if transaction_id != expected {
            debug!("discarding stale transaction {transaction_id}, waiting for {expected}");
            continue;
          }
          return decode_response(&frame).map(|(_, response)| response);
        }
      })
      .await
  }

  async fn read_registers(&self, space: AddressSpace, start: u16, quantity: u16, deadline: Deadline) -> GatewayResult<Vec<u16>> {
    let transaction_id = self.next_transaction_id();
    let request = encode_read(transaction_id, self.unit_id, space, start, quantity);
    match self.transact(request, transaction_id, deadline).await? {
      ResponsePdu::Registers(registers) if registers.len() == quantity as usize => Ok(registers),
      ResponsePdu::Registers(registers) => Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
        "asked for {quantity} registers, got {}",
        registers.len()
      )))),
      other => Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
        "register read answered with {other:?}"
      )))),
    }
  }

  async fn read_bits(&self, space: AddressSpace, start: u16, quantity: u16, deadline: Deadline) -> GatewayResult<Vec<bool>> {
    let transaction_id = self.next_transaction_id();
    let request = encode_read(transaction_id, self.unit_id, space, start, quantity);
    match self.transact(request, transaction_id, deadline).await? {
      ResponsePdu::Bits(bits) if bits.len() >= quantity as usize => Ok(bits),
      other => Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
        "bit read answered with {other:?}"
      )))),
    }
  }

  async fn write_register(&self, address: u16, value: u16, deadline: Deadline) -> GatewayResult<()> {
    let transaction_id = self.next_transaction_id();
    let request = encode_write_single_register(transaction_id, self.unit_id, address, value);
    match self.transact(request, transaction_id, deadline).await? {
      ResponsePdu::WriteAck { .. } => Ok(()),
      other => Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
        "register write answered with {other:?}"
      )))),
    }
  }

  fn register_addressing(parameter: &ParameterSpec) -> GatewayResult<(u32, f64)> {
    match parameter.addressing() {
      Addressing::Register { address, scale } => Ok((*address, *scale)),
      _ => Err(GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "parameter \"{}\" is not register-addressed",
        parameter.name()
      )))),
    }
  }
}

#[async_trait]
impl ProtocolClient for ModbusClient {
  fn protocol_name(&self) -> &str {
    "modbus"
  }

  fn address(&self) -> &str {
    &self.address
  }

  /// Unit-id probe: read the first input register. A protocol exception
  /// still proves a live Modbus peer.
  async fn probe(&self, deadline: Deadline) -> GatewayResult<ProbeInfo> {
    let started = Instant::now();
    match self.read_registers(AddressSpace::InputRegister, 0, 1, deadline).await {
      Ok(_) | Err(GatewayError::Protocol(_)) => {}
      Err(e) => return Err(e),
    }
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    Ok(ProbeInfo::new(latency_ms, 2, None, None, None, false))
  }

  async fn read(&self, parameter: &ParameterSpec, deadline: Deadline) -> GatewayResult<TypedValue> {
    let (logical, scale) = Self::register_addressing(parameter)?;
    let (space, start) = frame::wire_address(logical)?;
    match parameter.kind() {
      ValueKind::Float if space.is_register() => {
        let registers = self.read_registers(space, start, 2, deadline).await?;
        Ok(TypedValue::Float(frame::decode_scaled_float(registers[0], registers[1], scale)))
      }
      ValueKind::Int | ValueKind::Enum if space.is_register() => {
        let registers = self.read_registers(space, start, 1, deadline).await?;
        Ok(TypedValue::Int(registers[0] as i64))
      }
      ValueKind::Bool if !space.is_register() => {
        let bits = self.read_bits(space, start, 1, deadline).await?;
        Ok(TypedValue::Bool(bits[0]))
      }
      kind => Err(GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "parameter \"{}\" ({kind}) does not fit register {logical}",
        parameter.name()
      )))),
    }
  }

  async fn write(&self, parameter: &ParameterSpec, value: &TypedValue, deadline: Deadline) -> GatewayResult<()> {
    let (logical, scale) = Self::register_addressing(parameter)?;
    let (space, start) = frame::wire_address(logical)?;
    if !space.writable() {
      return Err(GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "register {logical} is read-only"
      ))));
    }
    match (parameter.kind(), value) {
      (ValueKind::Float, TypedValue::Float(v)) => {
        let [high, low] = frame::encode_scaled_float(*v, scale);
        self.write_register(start, high, deadline).await?;
        self.write_register(start + 1, low, deadline).await
      }
      (ValueKind::Int | ValueKind::Enum, TypedValue::Int(v)) => {
        self.write_register(start, *v as u16, deadline).await
      }
      (ValueKind::Bool, TypedValue::Bool(v)) => {
        let transaction_id = self.next_transaction_id();
        let request = encode_write_single_coil(transaction_id, self.unit_id, start, *v);
        match self.transact(request, transaction_id, deadline).await? {
          ResponsePdu::WriteAck { .. } => Ok(()),
          other => Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
            "coil write answered with {other:?}"
          )))),
        }
      }
      (kind, value) => Err(GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "cannot write {value} to {kind} parameter \"{}\"",
        parameter.name()
      )))),
    }
  }

  /// Raw register read without a descriptor. One register (or bit) comes
  /// back as an integer/boolean; protocol exceptions surface unchanged.
  async fn read_raw(&self, address: &RawAddress, deadline: Deadline) -> GatewayResult<TypedValue> {
    let logical = match address {
      RawAddress::Register(logical) => *logical,
      other => {
        return Err(GatewayError::Validation(ValidationError::InvariantViolation(format!(
          "modbus cannot address {other:?}"
        ))));
      }
    };
    let (space, start) = frame::wire_address(logical)?;
    if space.is_register() {
      let registers = self.read_registers(space, start, 1, deadline).await?;
      Ok(TypedValue::Int(registers[0] as i64))
    } else {
      let bits = self.read_bits(space, start, 1, deadline).await?;
      Ok(TypedValue::Bool(bits[0]))
    }
  }

  async fn close(&self) {
    let mut stream = self.stream.lock().await;
    let _ = stream.shutdown().await;
  }
}

/// Connector registered with the connection manager at startup.
#[derive(Debug, Default)]
pub struct ModbusConnector;

#[async_trait]
impl ProtocolConnector for ModbusConnector {
  fn protocol_name(&self) -> &str {
    "modbus"
  }

  async fn connect(
    &self,
    address: &str,
    spec: &ProtocolSpec,
    deadline: Deadline,
  ) -> GatewayResult<Box<dyn ProtocolClient>> {
    Ok(Box::new(ModbusClient::connect(address, spec, deadline).await?))
  }
}
