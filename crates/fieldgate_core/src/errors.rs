// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Fieldgate error structs/enums, representing gateway and wire errors.

use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type GatewayResult<T = ()> = Result<T, GatewayError>;

/// Transport errors occur while moving bytes to or from a device. They are the
/// only error class the connection manager retries, under the retry policy of
/// the session's [ProtocolSpec](crate::protocol_spec::ProtocolSpec).
#[derive(Debug, Error, Display, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportError {
  /// Host unreachable: {0}
  Unreachable(String),
  /// Operation timed out after {0} ms
  Timeout(u64),
  /// Connection reset by peer
  ConnectionReset,
  /// Malformed TCP/UDP exchange: {0}
  MalformedExchange(String),
}

/// Decode errors occur when a frame fails structural validation. Never
/// retried; the frame is wrong, not the network.
#[derive(Debug, Error, Display, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeError {
  /// Invalid BVLC header: {0}
  InvalidBvlc(String),
  /// Invalid MBAP header: {0}
  InvalidMbap(String),
  /// Frame truncated: needed {0} bytes, got {1}
  Truncated(usize, usize),
  /// Invalid JSON payload: {0}
  InvalidJson(String),
  /// Unexpected content type: {0}
  UnexpectedContentType(String),
  /// Unexpected frame contents: {0}
  UnexpectedFrame(String),
}

/// Protocol exceptions are well-formed error replies from the peer: a BACnet
/// error PDU, a Modbus exception response, or an HTTP 4xx/5xx. Surfaced
/// immediately, never retried.
#[derive(Debug, Error, Display, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolException {
  /// BACnet error response: class {class}, code {code}
  BacnetError { class: u8, code: u8 },
  /// BACnet request rejected: reason {0}
  BacnetReject(u8),
  /// Modbus exception {code:#04x}: {message}
  ModbusException { code: u8, message: String },
  /// HTTP status {0}
  HttpStatus(u16),
}

/// Caller-facing validation results. These describe a request the engine will
/// not carry out, not a failure of the engine itself.
#[derive(Debug, Error, Display, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
  /// No descriptor reached the acceptance threshold for this device
  UnknownDevice,
  /// Parameter "{0}" is not present in the device descriptor
  UnknownParameter(String),
  /// Value {value} for "{parameter}" lies outside the error range [{low}, {high}]
  OutOfRange {
    parameter: String,
    value: f64,
    low: f64,
    high: f64,
  },
  /// Descriptor invariant violated: {0}
  InvariantViolation(String),
}

/// Aggregation enum for all gateway error kinds.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum GatewayError {
  #[error(transparent)]
  Transport(#[from] TransportError),
  #[error(transparent)]
  Decode(#[from] DecodeError),
  #[error(transparent)]
  Protocol(#[from] ProtocolException),
  #[error(transparent)]
  Validation(#[from] ValidationError),
  /// The caller-supplied deadline elapsed before the operation completed.
  #[error("operation cancelled: deadline elapsed")]
  Cancelled,
}

impl GatewayError {
  /// Stable kind tag, surfaced alongside the human-readable message.
  pub fn kind(&self) -> &'static str {
    match self {
      GatewayError::Transport(_) => "transport",
      GatewayError::Decode(_) => "decode",
      GatewayError::Protocol(_) => "protocol-exception",
      GatewayError::Validation(ValidationError::UnknownDevice) => "unknown-device",
      GatewayError::Validation(ValidationError::UnknownParameter(_)) => "unknown-parameter",
      GatewayError::Validation(ValidationError::OutOfRange { .. }) => "out-of-range",
      GatewayError::Validation(ValidationError::InvariantViolation(_)) => "invariant-violation",
      GatewayError::Cancelled => "cancelled",
    }
  }

  /// Transient transport failures are retried under the protocol spec's
  /// policy. Everything else surfaces immediately.
  pub fn is_retryable(&self) -> bool {
    matches!(self, GatewayError::Transport(_))
  }
}
