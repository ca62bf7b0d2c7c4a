// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Pure BACnet/IP codec: BVLC + NPDU + APDU.
//!
//! Frame layout is bit-accurate: BVLC header (0x81, function, 16-bit
//! length), NPDU (version 0x01, control byte, optional destination fields),
//! then the APDU. Who-Is is `0x10 0x08`, I-Am is `0x10 0x00` followed by the
//! device object identifier, max APDU length, segmentation support, and
//! vendor id as application-tagged values.

use byteorder::{BigEndian, ByteOrder};
use fieldgate_core::errors::{DecodeError, GatewayError, GatewayResult, ProtocolException};

pub const BVLC_TYPE: u8 = 0x81;
pub const BVLC_ORIGINAL_UNICAST: u8 = 0x0A;
pub const BVLC_ORIGINAL_BROADCAST: u8 = 0x0B;

const NPDU_VERSION: u8 = 0x01;
/// Control bit: destination specifier present.
const NPDU_HAS_DESTINATION: u8 = 0x20;
/// Control bit: source specifier present.
const NPDU_HAS_SOURCE: u8 = 0x08;
/// Control bit: a confirmed request expects a reply.
const NPDU_EXPECTING_REPLY: u8 = 0x04;

const PDU_UNCONFIRMED: u8 = 0x10;
const PDU_CONFIRMED: u8 = 0x00;
const PDU_SIMPLE_ACK: u8 = 0x20;
const PDU_COMPLEX_ACK: u8 = 0x30;
const PDU_ERROR: u8 = 0x50;
const PDU_REJECT: u8 = 0x60;

pub const SERVICE_I_AM: u8 = 0x00;
pub const SERVICE_WHO_IS: u8 = 0x08;
pub const SERVICE_READ_PROPERTY: u8 = 0x0C;
pub const SERVICE_WRITE_PROPERTY: u8 = 0x0F;

/// Max-segments/max-APDU octet for outbound confirmed requests (no
/// segmentation, up to 1476 octets).
const CONFIRMED_MAX_APDU: u8 = 0x05;

pub const OBJECT_TYPE_DEVICE: u16 = 8;
pub const PROP_PRESENT_VALUE: u32 = 85;

/// An application-tagged primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum BacnetValue {
  Real(f32),
  Unsigned(u32),
  Boolean(bool),
  Enumerated(u32),
}

/// Decoded I-Am payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IAm {
  pub device_instance: u32,
  pub max_apdu_length: u16,
  pub segmentation: u8,
  pub vendor_id: u16,
}

/// Decoded acknowledgement of a confirmed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Ack {
  Simple,
  Value(BacnetValue),
}

fn bvlc(function: u8, payload: &[u8]) -> Vec<u8> {
  let mut frame = Vec::with_capacity(4 + payload.len());
  frame.push(BVLC_TYPE);
  frame.push(function);
  let length = (payload.len() + 4) as u16;
  frame.push((length >> 8) as u8);
  frame.push((length & 0xFF) as u8);
  frame.extend_from_slice(payload);
  frame
}

/// NPDU for a global broadcast (DNET 0xFFFF, hop count 255).
fn npdu_broadcast() -> Vec<u8> {
  vec![NPDU_VERSION, NPDU_HAS_DESTINATION, 0xFF, 0xFF, 0x00, 0xFF]
}

fn npdu_unicast(expecting_reply: bool) -> Vec<u8> {
  vec![NPDU_VERSION, if expecting_reply { NPDU_EXPECTING_REPLY } else { 0x00 }]
}

fn object_identifier(object_type: u16, instance: u32) -> u32 {
  ((object_type as u32) << 22) | (instance & 0x003F_FFFF)
}

fn push_unsigned_app(frame: &mut Vec<u8>, value: u32) {
  // Application tag 2 (unsigned), length by magnitude.
  if value <= 0xFF {
    frame.push(0x21);
    frame.push(value as u8);
  } else if value <= 0xFFFF {
    frame.push(0x22);
    frame.push((value >> 8) as u8);
    frame.push((value & 0xFF) as u8);
  } else {
    frame.push(0x24);
    frame.extend_from_slice(&value.to_be_bytes());
  }
}

fn push_app_value(frame: &mut Vec<u8>, value: &BacnetValue) {
  match value {
    BacnetValue::Real(v) => {
      frame.push(0x44);
      frame.extend_from_slice(&v.to_be_bytes());
    }
    BacnetValue::Unsigned(v) => push_unsigned_app(frame, *v),
    BacnetValue::Boolean(v) => frame.push(if *v { 0x11 } else { 0x10 }),
    BacnetValue::Enumerated(v) => {
      frame.push(0x91);
      frame.push(*v as u8);
    }
  }
}

/// Outbound Who-Is: unconfirmed request broadcast to the BACnet port.
pub fn encode_who_is() -> Vec<u8> {
  let mut payload = npdu_broadcast();
  payload.push(PDU_UNCONFIRMED);
  payload.push(SERVICE_WHO_IS);
  bvlc(BVLC_ORIGINAL_BROADCAST, &payload)
}

/// Outbound I-Am (used by test simulators and device-side tooling).
pub fn encode_i_am(device_instance: u32, max_apdu_length: u16, segmentation: u8, vendor_id: u16) -> Vec<u8> {
  let mut payload = npdu_unicast(false);
  payload.push(PDU_UNCONFIRMED);
  payload.push(SERVICE_I_AM);
  payload.push(0xC4);
  payload.extend_from_slice(&object_identifier(OBJECT_TYPE_DEVICE, device_instance).to_be_bytes());
  push_unsigned_app(&mut payload, max_apdu_length as u32);
  payload.push(0x91);
  payload.push(segmentation);
  push_unsigned_app(&mut payload, vendor_id as u32);
  bvlc(BVLC_ORIGINAL_UNICAST, &payload)
}

/// Outbound confirmed ReadProperty for `present-value`.
pub fn encode_read_property(invoke_id: u8, object_type: u16, instance: u32, property_id: u32) -> Vec<u8> {
  let mut payload = npdu_unicast(true);
  payload.push(PDU_CONFIRMED);
  payload.push(CONFIRMED_MAX_APDU);
  payload.push(invoke_id);
  payload.push(SERVICE_READ_PROPERTY);
  payload.push(0x0C); // context tag 0, object identifier
  payload.extend_from_slice(&object_identifier(object_type, instance).to_be_bytes());
  payload.push(0x19); // context tag 1, property identifier
  payload.push(property_id as u8);
  bvlc(BVLC_ORIGINAL_UNICAST, &payload)
}

/// Outbound confirmed WriteProperty carrying one application-tagged value.
pub fn encode_write_property(
  invoke_id: u8,
  object_type: u16,
  instance: u32,
  property_id: u32,
  value: &BacnetValue,
) -> Vec<u8> {
  let mut payload = npdu_unicast(true);
  payload.push(PDU_CONFIRMED);
  payload.push(CONFIRMED_MAX_APDU);
  payload.push(invoke_id);
  payload.push(SERVICE_WRITE_PROPERTY);
  payload.push(0x0C);
  payload.extend_from_slice(&object_identifier(object_type, instance).to_be_bytes());
  payload.push(0x19);
  payload.push(property_id as u8);
  payload.push(0x3E); // opening tag 3, property value
  push_app_value(&mut payload, value);
  payload.push(0x3F); // closing tag 3
  bvlc(BVLC_ORIGINAL_UNICAST, &payload)
}

struct Cursor<'a> {
  bytes: &'a [u8],
  at: usize,
}

impl<'a> Cursor<'a> {
  fn new(bytes: &'a [u8]) -> Self {
    Self { bytes, at: 0 }
  }

  fn need(&self, n: usize) -> GatewayResult<()> {
    if self.at + n > self.bytes.len() {
      return Err(GatewayError::Decode(DecodeError::Truncated(self.at + n, self.bytes.len())));
    }
    Ok(())
  }

  fn u8(&mut self) -> GatewayResult<u8> {
    self.need(1)?;
    let byte = self.bytes[self.at];
    self.at += 1;
    Ok(byte)
  }

  fn take(&mut self, n: usize) -> GatewayResult<&'a [u8]> {
    self.need(n)?;
    let slice = &self.bytes[self.at..self.at + n];
    self.at += n;
    Ok(slice)
  }
}

/// Strip BVLC + NPDU, returning the APDU slice.
pub fn strip_headers(frame: &[u8]) -> GatewayResult<&[u8]> {
  let mut cursor = Cursor::new(frame);
  let bvlc_type = cursor.u8()?;
  if bvlc_type != BVLC_TYPE {
    return Err(GatewayError::Decode(DecodeError::InvalidBvlc(format!(
      "type {bvlc_type:#04x}"
    ))));
  }
  let _function = cursor.u8()?;
  let length = BigEndian::read_u16(cursor.take(2)?) as usize;
  if length != frame.len() {
    return Err(GatewayError::Decode(DecodeError::InvalidBvlc(format!(
      "length field {length} for a {}-byte frame",
      frame.len()
    ))));
  }
  let version = cursor.u8()?;
  if version != NPDU_VERSION {
    return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
      "NPDU version {version:#04x}"
    ))));
  }
  let control = cursor.u8()?;
  if control & NPDU_HAS_DESTINATION != 0 {
    let _dnet = cursor.take(2)?;
    let dlen = cursor.u8()? as usize;
    let _dadr = cursor.take(dlen)?;
  }
  if control & NPDU_HAS_SOURCE != 0 {
    let _snet = cursor.take(2)?;
    let slen = cursor.u8()? as usize;
    let _sadr = cursor.take(slen)?;
  }
  if control & NPDU_HAS_DESTINATION != 0 {
    let _hop_count = cursor.u8()?;
  }
  Ok(&frame[cursor.at..])
}

fn read_unsigned_app(cursor: &mut Cursor<'_>) -> GatewayResult<u32> {
  let tag = cursor.u8()?;
  let (tag_number, length) = (tag >> 4, (tag & 0x07) as usize);
  if tag_number != 2 {
    return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
      "expected an unsigned tag, got tag {tag_number}"
    ))));
  }
  let mut value = 0u32;
  for byte in cursor.take(length)? {
    value = (value << 8) | *byte as u32;
  }
  Ok(value)
}

fn read_app_value(cursor: &mut Cursor<'_>) -> GatewayResult<BacnetValue> {
  let tag = cursor.u8()?;
  let tag_number = tag >> 4;
  let lvt = (tag & 0x07) as usize;
  match tag_number {
    1 => Ok(BacnetValue::Boolean(lvt == 1)),
    2 => {
      let mut value = 0u32;
      for byte in cursor.take(lvt)? {
        value = (value << 8) | *byte as u32;
      }
      Ok(BacnetValue::Unsigned(value))
    }
    4 => {
      let bytes = cursor.take(4)?;
      Ok(BacnetValue::Real(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])))
    }
    9 => {
      let mut value = 0u32;
      for byte in cursor.take(lvt)? {
        value = (value << 8) | *byte as u32;
      }
      Ok(BacnetValue::Enumerated(value))
    }
    other => Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
      "unsupported application tag {other}"
    )))),
  }
}

/// True when the frame is a Who-Is request.
pub fn is_who_is(frame: &[u8]) -> bool {
  matches!(strip_headers(frame), Ok(apdu) if apdu.len() >= 2 && apdu[0] == PDU_UNCONFIRMED && apdu[1] == SERVICE_WHO_IS)
}

/// Decode an inbound I-Am.
pub fn decode_i_am(frame: &[u8]) -> GatewayResult<IAm> {
  let apdu = strip_headers(frame)?;
  let mut cursor = Cursor::new(apdu);
  let pdu_type = cursor.u8()?;
  let service = cursor.u8()?;
  if pdu_type != PDU_UNCONFIRMED || service != SERVICE_I_AM {
    return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
      "not an I-Am (pdu {pdu_type:#04x}, service {service:#04x})"
    ))));
  }
  let tag = cursor.u8()?;
  if tag != 0xC4 {
    return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
      "expected a device object identifier, got tag {tag:#04x}"
    ))));
  }
  let raw = BigEndian::read_u32(cursor.take(4)?);
  let object_type = (raw >> 22) as u16;
  if object_type != OBJECT_TYPE_DEVICE {
    return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
      "I-Am for non-device object type {object_type}"
    ))));
  }
  let device_instance = raw & 0x003F_FFFF;
  let max_apdu_length = read_unsigned_app(&mut cursor)? as u16;
  let seg_tag = cursor.u8()?;
  if seg_tag >> 4 != 9 {
    return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(
      "expected a segmentation enumeration".to_owned(),
    )));
  }
  let segmentation = cursor.u8()?;
  let vendor_id = read_unsigned_app(&mut cursor)? as u16;
  Ok(IAm {
    device_instance,
    max_apdu_length,
    segmentation,
    vendor_id,
  })
}

/// Decode the acknowledgement for a confirmed request, matched by invoke id.
pub fn decode_ack(frame: &[u8], expected_invoke_id: u8) -> GatewayResult<Ack> {
  let apdu = strip_headers(frame)?;
  let mut cursor = Cursor::new(apdu);
  let pdu_type = cursor.u8()? & 0xF0;
  match pdu_type {
    PDU_SIMPLE_ACK => {
      let invoke_id = cursor.u8()?;
      let _service = cursor.u8()?;
      check_invoke(invoke_id, expected_invoke_id)?;
      Ok(Ack::Simple)
    }
    PDU_COMPLEX_ACK => {
      let invoke_id = cursor.u8()?;
      let _service = cursor.u8()?;
      check_invoke(invoke_id, expected_invoke_id)?;
      // Context tag 0: object identifier.
      let tag = cursor.u8()?;
      if tag != 0x0C {
        return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(
          "complex ack missing its object identifier".to_owned(),
        )));
      }
      let _object = cursor.take(4)?;
      // Context tag 1: property identifier.
      let tag = cursor.u8()?;
      if tag != 0x19 {
        return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(
          "complex ack missing its property identifier".to_owned(),
        )));
      }
      let _property = cursor.u8()?;
      // Opening tag 3, value, closing tag 3.
      if cursor.u8()? != 0x3E {
        return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(
          "complex ack missing its opening tag".to_owned(),
        )));
      }
      let value = read_app_value(&mut cursor)?;
      if cursor.u8()? != 0x3F {
        return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(
          "complex ack missing its closing tag".to_owned(),
        )));
      }
      Ok(Ack::Value(value))
    }
    PDU_ERROR => {
      let invoke_id = cursor.u8()?;
      let _service = cursor.u8()?;
      check_invoke(invoke_id, expected_invoke_id)?;
      // Error class and code arrive as enumerations.
      let _tag = cursor.u8()?;
      let class = cursor.u8()?;
      let _tag = cursor.u8()?;
      let code = cursor.u8()?;
      Err(GatewayError::Protocol(ProtocolException::BacnetError { class, code }))
    }
    PDU_REJECT => {
      let invoke_id = cursor.u8()?;
      let reason = cursor.u8()?;
      check_invoke(invoke_id, expected_invoke_id)?;
      Err(GatewayError::Protocol(ProtocolException::BacnetReject(reason)))
    }
    other => Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
      "unexpected PDU type {other:#04x}"
    )))),
  }
}

fn check_invoke(got: u8, expected: u8) -> GatewayResult<()> {
  if got != expected {
    return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(format!(
      "invoke id {got} does not match outstanding request {expected}"
    ))));
  }
  Ok(())
}

/// Extract `(service, invoke_id, object_type, instance, property, value?)`
/// from a confirmed request. Used by device-side simulators.
pub fn decode_confirmed_request(
  frame: &[u8],
) -> GatewayResult<(u8, u8, u16, u32, u32, Option<BacnetValue>)> {
  let apdu = strip_headers(frame)?;
  let mut cursor = Cursor::new(apdu);
  let pdu_type = cursor.u8()?;
  if pdu_type & 0xF0 != PDU_CONFIRMED {
    return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(
      "not a confirmed request".to_owned(),
    )));
  }
  let _max_apdu = cursor.u8()?;
  let invoke_id = cursor.u8()?;
  let service = cursor.u8()?;
  if cursor.u8()? != 0x0C {
    return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(
      "confirmed request missing its object identifier".to_owned(),
    )));
  }
  let raw = BigEndian::read_u32(cursor.take(4)?);
  if cursor.u8()? != 0x19 {
    return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(
      "confirmed request missing its property identifier".to_owned(),
    )));
  }
  let property = cursor.u8()? as u32;
  let value = if service == SERVICE_WRITE_PROPERTY {
    if cursor.u8()? != 0x3E {
      return Err(GatewayError::Decode(DecodeError::UnexpectedFrame(
        "write request missing its opening tag".to_owned(),
      )));
    }
    Some(read_app_value(&mut cursor)?)
  } else {
    None
  };
  Ok((service, invoke_id, (raw >> 22) as u16, raw & 0x003F_FFFF, property, value))
}

/// Simple-ACK for a confirmed service (device side).
pub fn encode_simple_ack(invoke_id: u8, service: u8) -> Vec<u8> {
  let mut payload = npdu_unicast(false);
  payload.push(PDU_SIMPLE_ACK);
  payload.push(invoke_id);
  payload.push(service);
  bvlc(BVLC_ORIGINAL_UNICAST, &payload)
}

/// Complex-ACK answering a ReadProperty (device side).
pub fn encode_complex_ack(
  invoke_id: u8,
  object_type: u16,
  instance: u32,
  property_id: u32,
  value: &BacnetValue,
) -> Vec<u8> {
  let mut payload = npdu_unicast(false);
  payload.push(PDU_COMPLEX_ACK);
  payload.push(invoke_id);
  payload.push(SERVICE_READ_PROPERTY);
  payload.push(0x0C);
  payload.extend_from_slice(&object_identifier(object_type, instance).to_be_bytes());
  payload.push(0x19);
  payload.push(property_id as u8);
  payload.push(0x3E);
  push_app_value(&mut payload, value);
  payload.push(0x3F);
  bvlc(BVLC_ORIGINAL_UNICAST, &payload)
}

/// Error PDU answering a confirmed request (device side).
pub fn encode_error(invoke_id: u8, service: u8, class: u8, code: u8) -> Vec<u8> {
  let mut payload = npdu_unicast(false);
  payload.push(PDU_ERROR);
  payload.push(invoke_id);
  payload.push(service);
  payload.push(0x91);
  payload.push(class);
  payload.push(0x91);
  payload.push(code);
  bvlc(BVLC_ORIGINAL_UNICAST, &payload)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn who_is_is_twelve_bytes_bit_accurate() {
    let frame = encode_who_is();
    assert_eq!(
      frame,
      vec![0x81, 0x0B, 0x00, 0x0C, 0x01, 0x20, 0xFF, 0xFF, 0x00, 0xFF, 0x10, 0x08]
    );
    assert!(is_who_is(&frame));
  }

  #[test]
  fn i_am_round_trips_instance_and_vendor() {
    let frame = encode_i_am(1234, 1476, 0x03, 260);
    let i_am = decode_i_am(&frame).unwrap();
    assert_eq!(i_am.device_instance, 1234);
    assert_eq!(i_am.max_apdu_length, 1476);
    assert_eq!(i_am.segmentation, 0x03);
    assert_eq!(i_am.vendor_id, 260);
  }

  #[test]
  fn read_property_request_round_trips() {
    let frame = encode_read_property(7, 0, 1, PROP_PRESENT_VALUE);
    let (service, invoke_id, object_type, instance, property, value) =
      decode_confirmed_request(&frame).unwrap();
    assert_eq!(service, SERVICE_READ_PROPERTY);
    assert_eq!(invoke_id, 7);
    assert_eq!(object_type, 0);
    assert_eq!(instance, 1);
    assert_eq!(property, PROP_PRESENT_VALUE);
    assert!(value.is_none());
  }

  #[test]
  fn write_property_request_carries_its_value() {
    let frame = encode_write_property(9, 2, 1, PROP_PRESENT_VALUE, &BacnetValue::Real(23.5));
    let (service, invoke_id, object_type, _instance, _property, value) =
      decode_confirmed_request(&frame).unwrap();
    assert_eq!(service, SERVICE_WRITE_PROPERTY);
    assert_eq!(invoke_id, 9);
    assert_eq!(object_type, 2);
    assert_eq!(value, Some(BacnetValue::Real(23.5)));
  }

  #[test]
  fn complex_ack_round_trips_a_real() {
    let frame = encode_complex_ack(7, 0, 1, PROP_PRESENT_VALUE, &BacnetValue::Real(22.5));
    assert_eq!(decode_ack(&frame, 7).unwrap(), Ack::Value(BacnetValue::Real(22.5)));
  }

  #[test]
  fn error_pdu_surfaces_as_protocol_exception() {
    let frame = encode_error(7, SERVICE_READ_PROPERTY, 0x01, 0x1F);
    assert!(matches!(
      decode_ack(&frame, 7),
      Err(GatewayError::Protocol(ProtocolException::BacnetError { class: 0x01, code: 0x1F }))
    ));
  }

  #[test]
  fn invoke_id_mismatch_is_a_decode_error() {
    let frame = encode_complex_ack(7, 0, 1, PROP_PRESENT_VALUE, &BacnetValue::Real(22.5));
    assert!(matches!(decode_ack(&frame, 8), Err(GatewayError::Decode(_))));
  }

  #[test]
  fn bvlc_length_mismatch_is_a_decode_error() {
    let mut frame = encode_who_is();
    frame.push(0x00);
    assert!(matches!(strip_headers(&frame), Err(GatewayError::Decode(DecodeError::InvalidBvlc(_)))));
  }

  #[test]
  fn simple_ack_decodes() {
    let frame = encode_simple_ack(3, SERVICE_WRITE_PROPERTY);
    assert_eq!(decode_ack(&frame, 3).unwrap(), Ack::Simple);
  }
}
