// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Pure Modbus/TCP codec: bytes ↔ typed frames. All multi-byte wire fields
//! are big-endian.

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use fieldgate_core::errors::{DecodeError, GatewayError, GatewayResult, ProtocolException, ValidationError};

pub const MBAP_LEN: usize = 7;
pub const PROTOCOL_ID: u16 = 0;

pub const FN_READ_COILS: u8 = 0x01;
pub const FN_READ_DISCRETE_INPUTS: u8 = 0x02;
pub const FN_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FN_READ_INPUT_REGISTERS: u8 = 0x04;
pub const FN_WRITE_SINGLE_COIL: u8 = 0x05;
pub const FN_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// MBAP header: transaction id, protocol id (always 0), remaining length,
/// unit id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
  pub transaction_id: u16,
  pub protocol_id: u16,
  pub length: u16,
  pub unit_id: u8,
}

/// The four Modbus address spaces, with their logical numbering bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSpace {
  Coil,
  DiscreteInput,
  InputRegister,
  HoldingRegister,
}

impl AddressSpace {
  pub fn read_function(&self) -> u8 {
    match self {
      AddressSpace::Coil => FN_READ_COILS,
      AddressSpace::DiscreteInput => FN_READ_DISCRETE_INPUTS,
      AddressSpace::InputRegister => FN_READ_INPUT_REGISTERS,
      AddressSpace::HoldingRegister => FN_READ_HOLDING_REGISTERS,
    }
  }

  pub fn is_register(&self) -> bool {
    matches!(self, AddressSpace::InputRegister | AddressSpace::HoldingRegister)
  }

  pub fn writable(&self) -> bool {
    matches!(self, AddressSpace::Coil | AddressSpace::HoldingRegister)
  }
}

/// Translate a logical address (30001-style) to its space and zero-based
/// wire address.
pub fn wire_address(logical: u32) -> GatewayResult<(AddressSpace, u16)> {
  match logical {
    1..=9999 => Ok((AddressSpace::Coil, (logical - 1) as u16)),
    10001..=19999 => Ok((AddressSpace::DiscreteInput, (logical - 10001) as u16)),
    30001..=39999 => Ok((AddressSpace::InputRegister, (logical - 30001) as u16)),
    40001..=49999 => Ok((AddressSpace::HoldingRegister, (logical - 40001) as u16)),
    other => Err(GatewayError::Validation(ValidationError::InvariantViolation(
      format!("address {other} lies outside every Modbus address space"),
    ))),
  }
}

/// Decoded response PDU.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePdu {
  Registers(Vec<u16>),
  Bits(Vec<bool>),
  WriteAck { address: u16, value: u16 },
}

fn adu(transaction_id: u16, unit_id: u8, pdu: &[u8]) -> Vec<u8> {
  let mut frame = Vec::with_capacity(MBAP_LEN + pdu.len());
  frame.write_u16::<BigEndian>(transaction_id).expect("vec write");
  frame.write_u16::<BigEndian>(PROTOCOL_ID).expect("vec write");
  frame.write_u16::<BigEndian>(pdu.len() as u16 + 1).expect("vec write");
  frame.push(unit_id);
  frame.extend_from_slice(pdu);
  frame
}

/// Read request for any of the four spaces.
pub fn encode_read(
  transaction_id: u16,
  unit_id: u8,
  space: AddressSpace,
  start: u16,
  quantity: u16,
) -> Vec<u8> {
  let mut pdu = Vec::with_capacity(5);
  pdu.push(space.read_function());
  pdu.write_u16::<BigEndian>(start).expect("vec write");
  pdu.write_u16::<BigEndian>(quantity).expect("vec write");
  adu(transaction_id, unit_id, &pdu)
}

pub fn encode_write_single_register(transaction_id: u16, unit_id: u8, address: u16, value: u16) -> Vec<u8> {
  let mut pdu = Vec::with_capacity(5);
  pdu.push(FN_WRITE_SINGLE_REGISTER);
  pdu.write_u16::<BigEndian>(address).expect("vec write");
  pdu.write_u16::<BigEndian>(value).expect("vec write");
  adu(transaction_id, unit_id, &pdu)
}

pub fn encode_write_single_coil(transaction_id: u16, unit_id: u8, address: u16, on: bool) -> Vec<u8> {
  let mut pdu = Vec::with_capacity(5);
  pdu.push(FN_WRITE_SINGLE_COIL);
  pdu.write_u16::<BigEndian>(address).expect("vec write");
  pdu.write_u16::<BigEndian>(if on { 0xFF00 } else { 0x0000 }).expect("vec write");
  adu(transaction_id, unit_id, &pdu)
}

pub fn decode_mbap(frame: &[u8]) -> GatewayResult<(MbapHeader, &[u8])> {
  if frame.len() < MBAP_LEN + 1 {
    return Err(GatewayError::Decode(DecodeError::Truncated(MBAP_LEN + 1, frame.len())));
  }
  let header = MbapHeader {
    transaction_id: BigEndian::read_u16(&frame[0..2]),
    protocol_id: BigEndian::read_u16(&frame[2..4]),
    length: BigEndian::read_u16(&frame[4..6]),
    unit_id: frame[6],
  };
  if header.protocol_id != PROTOCOL_ID {
    return Err(GatewayError::Decode(DecodeError::InvalidMbap(format!(
      "protocol id {:#06x}",
      header.protocol_id
    ))));
  }
  let pdu = &frame[MBAP_LEN..];
  if pdu.len() + 1 != header.length as usize {
    return Err(GatewayError::Decode(DecodeError::InvalidMbap(format!(
      "length field {} does not match {} PDU bytes",
      header.length,
      pdu.len()
    ))));
  }
  Ok((header, pdu))
}

/// Decode a response ADU. Exception responses (function | 0x80) surface as
/// [`ProtocolException::ModbusException`].
pub fn decode_response(frame: &[u8]) -> GatewayResult<(MbapHeader, ResponsePdu)> {
  let (header, pdu) = decode_mbap(frame)?;
  let function = pdu[0];
  if function & 0x80 != 0 {
    if pdu.len() < 2 {
      return Err(GatewayError::Decode(DecodeError::Truncated(2, pdu.len())));
    }
    let code = pdu[1];
    return Err(GatewayError::Protocol(ProtocolException::ModbusException {
      code,
      message: exception_message(code).to_owned(),
    }));
  }
  let body = &pdu[1..];
  let response = match function {
    FN_READ_HOLDING_REGISTERS | FN_READ_INPUT_REGISTERS => {
      let byte_count = *body.first().ok_or(GatewayError::Decode(DecodeError::Truncated(1, 0)))? as usize;
      let data = &body[1..];
      if data.len() != byte_count || byte_count % 2 != 0 {
        return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
          "register byte count {byte_count} vs {} data bytes",
          data.len()
        ))));
      }
      ResponsePdu::Registers(data.chunks_exact(2).map(BigEndian::read_u16).collect())
    }
    FN_READ_COILS | FN_READ_DISCRETE_INPUTS => {
      let byte_count = *body.first().ok_or(GatewayError::Decode(DecodeError::Truncated(1, 0)))? as usize;
      let data = &body[1..];
      if data.len() != byte_count {
        return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
          "bit byte count {byte_count} vs {} data bytes",
          data.len()
        ))));
      }
      let mut bits = Vec::with_capacity(byte_count * 8);
      for byte in data {
        for bit in 0..8 {
          bits.push(byte & (1 << bit) != 0);
        }
      }
      ResponsePdu::Bits(bits)
    }
    FN_WRITE_SINGLE_REGISTER | FN_WRITE_SINGLE_COIL => {
      if body.len() != 4 {
        return Err(GatewayError::Decode(DecodeError::Truncated(4, body.len())));
      }
      ResponsePdu::WriteAck {
        address: BigEndian::read_u16(&body[0..2]),
        value: BigEndian::read_u16(&body[2..4]),
      }
    }
    other => {
      return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
        "unexpected function code {other:#04x}"
      ))));
    }
  };
  Ok((header, response))
}

/// Tabulated exception meanings.
pub fn exception_message(code: u8) -> &'static str {
  match code {
    0x01 => "illegal function",
    0x02 => "illegal data address",
    0x03 => "illegal data value",
    0x04 => "slave device failure",
    0x05 => "acknowledge",
    0x06 => "slave device busy",
    0x08 => "memory parity error",
    0x0A => "gateway path unavailable",
    0x0B => "gateway target device failed to respond",
    _ => "unknown exception",
  }
}

/// A float occupies two consecutive registers, high word first, scaled to an
/// integer (commonly ×100 to preserve two decimals).
pub fn encode_scaled_float(value: f64, scale: f64) -> [u16; 2] {
  let scaled = (value * scale).round() as i32 as u32;
  [(scaled >> 16) as u16, (scaled & 0xFFFF) as u16]
}

pub fn decode_scaled_float(high: u16, low: u16, scale: f64) -> f64 {
  let raw = ((high as u32) << 16 | low as u32) as i32;
  raw as f64 / scale
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn logical_addresses_translate_per_space() {
    assert_eq!(wire_address(30001).unwrap(), (AddressSpace::InputRegister, 0));
    assert_eq!(wire_address(40006).unwrap(), (AddressSpace::HoldingRegister, 5));
    assert_eq!(wire_address(1).unwrap(), (AddressSpace::Coil, 0));
    assert_eq!(wire_address(10005).unwrap(), (AddressSpace::DiscreteInput, 4));
    assert!(wire_address(0).is_err());
    assert!(wire_address(20001).is_err());
  }

  #[test]
  fn read_request_layout() {
    let frame = encode_read(0x1234, 1, AddressSpace::InputRegister, 0, 2);
    assert_eq!(
      frame,
      vec![0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x01, 0x04, 0x00, 0x00, 0x00, 0x02]
    );
  }

  #[test]
  fn register_response_round_trip() {
    // MBAP + function 0x04 + byte count 4 + two registers.
    let frame = vec![0x12, 0x34, 0x00, 0x00, 0x00, 0x07, 0x01, 0x04, 0x04, 0x00, 0x00, 0x08, 0xCA];
    let (header, response) = decode_response(&frame).unwrap();
    assert_eq!(header.transaction_id, 0x1234);
    assert_eq!(response, ResponsePdu::Registers(vec![0x0000, 0x08CA]));
  }

  #[test]
  fn exception_response_decodes_to_protocol_exception() {
    let frame = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x01, 0x84, 0x02];
    let error = decode_response(&frame).unwrap_err();
    assert!(matches!(
      error,
      GatewayError::Protocol(ProtocolException::ModbusException { code: 0x02, .. })
    ));
  }

  #[test]
  fn bad_protocol_id_is_a_decode_error() {
    let frame = vec![0x00, 0x01, 0x00, 0x07, 0x00, 0x03, 0x01, 0x84, 0x02];
    assert!(matches!(decode_response(&frame), Err(GatewayError::Decode(_))));
  }

  #[test]
  fn length_mismatch_is_a_decode_error() {
    let frame = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x09, 0x01, 0x84, 0x02];
    assert!(matches!(decode_response(&frame), Err(GatewayError::Decode(_))));
  }

  #[test]
  fn scaled_float_round_trips_to_two_decimals() {
    for value in [22.5, 0.0, -3.21, 99.99, 655.35] {
      let [high, low] = encode_scaled_float(value, 100.0);
      let decoded = decode_scaled_float(high, low, 100.0);
      assert!((decoded - (value * 100.0).round() / 100.0).abs() < 1e-9, "value {value}");
    }
  }

  #[test]
  fn scaled_float_is_high_word_first() {
    let [high, low] = encode_scaled_float(22.5, 100.0);
    assert_eq!(high, 0x0000);
    assert_eq!(low, 2250);
  }

  #[test]
  fn coil_write_uses_ff00() {
    let frame = encode_write_single_coil(1, 1, 4, true);
    assert_eq!(&frame[7..], &[0x05, 0x00, 0x04, 0xFF, 0x00]);
    let frame = encode_write_single_coil(1, 1, 4, false);
    assert_eq!(&frame[7..], &[0x05, 0x00, 0x04, 0x00, 0x00]);
  }

  #[test]
  fn bit_response_unpacks_lsb_first() {
    let frame = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x04, 0x01, 0x01, 0x01, 0b0000_0101];
    let (_, response) = decode_response(&frame).unwrap();
    match response {
      ResponsePdu::Bits(bits) => {
        assert!(bits[0]);
        assert!(!bits[1]);
        assert!(bits[2]);
      }
      other => panic!("unexpected response {other:?}"),
    }
  }
}
