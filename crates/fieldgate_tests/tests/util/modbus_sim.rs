// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Minimal Modbus/TCP device simulator: an industrial controller with a
//! small register file. Input registers hold Temperature_Sensor_1 = 22.5 °C
//! (×100, high word first) in registers 30001/30002; reads past the
//! declared file answer exception 0x02.

use byteorder::{BigEndian, ByteOrder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const UNIT_ID: u8 = 1;
const INPUT_REGISTERS: usize = 14;
const HOLDING_REGISTERS: usize = 10;
const COILS: usize = 5;
const DISCRETE_INPUTS: usize = 5;

struct RegisterFile {
  input: Vec<u16>,
  holding: Vec<u16>,
  coils: Vec<bool>,
  discrete: Vec<bool>,
}

fn float_words(value: f64) -> [u16; 2] {
  let scaled = (value * 100.0).round() as i32 as u32;
  [(scaled >> 16) as u16, (scaled & 0xFFFF) as u16]
}

impl RegisterFile {
  fn new() -> Self {
    let mut input = vec![0u16; INPUT_REGISTERS];
    for (offset, value) in [(0, 22.5), (2, 23.1), (4, 2.5), (6, 45.2), (8, 0.8), (12, 15.3)] {
      let words = float_words(value);
      input[offset] = words[0];
      input[offset + 1] = words[1];
    }
    input[10] = 1450; // Motor_Speed
    input[11] = 1; // System_Status = run

    let mut holding = vec![0u16; HOLDING_REGISTERS];
    for (offset, value) in [(0, 25.0), (2, 2.0), (5, 30.0)] {
      let words = float_words(value);
      holding[offset] = words[0];
      holding[offset + 1] = words[1];
    }
    holding[4] = 1; // Control_Mode = auto
    holding[7] = 30; // Maintenance_Interval
    holding[8] = 19423; // Calibration_Date

    Self {
      input,
      holding,
      coils: vec![true, false, false, false, true],
      discrete: vec![false, false, true, true, false],
    }
  }
}

/// Spawn the simulator; returns the `host:port` it listens on.
pub async fn spawn() -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind simulator");
  let address = listener.local_addr().expect("local addr").to_string();
  tokio::spawn(async move {
    loop {
      let Ok((stream, _)) = listener.accept().await else {
        return;
      };
      tokio::spawn(serve(stream));
    }
  });
  address
}

async fn serve(mut stream: TcpStream) {
  let mut file = RegisterFile::new();
  loop {
    let mut header = [0u8; 7];
    if stream.read_exact(&mut header).await.is_err() {
      return;
    }
    let transaction_id = BigEndian::read_u16(&header[0..2]);
    let length = BigEndian::read_u16(&header[4..6]) as usize;
    if length == 0 {
      return;
    }
    let mut body = vec![0u8; length - 1];
    if stream.read_exact(&mut body).await.is_err() {
      return;
    }
    let response = respond(&mut file, transaction_id, &body);
    if stream.write_all(&response).await.is_err() {
      return;
    }
  }
}

fn respond(file: &mut RegisterFile, transaction_id: u16, pdu: &[u8]) -> Vec<u8> {
  let function = pdu[0];
  match function {
    0x03 | 0x04 => {
      let start = BigEndian::read_u16(&pdu[1..3]) as usize;
      let quantity = BigEndian::read_u16(&pdu[3..5]) as usize;
      let registers = if function == 0x04 { &file.input } else { &file.holding };
      if start + quantity > registers.len() || quantity == 0 {
        return exception(transaction_id, function, 0x02);
      }
      let mut body = vec![function, (quantity * 2) as u8];
      for register in &registers[start..start + quantity] {
        let mut word = [0u8; 2];
        BigEndian::write_u16(&mut word, *register);
        body.extend_from_slice(&word);
      }
      frame(transaction_id, &body)
    }
    0x01 | 0x02 => {
      let start = BigEndian::read_u16(&pdu[1..3]) as usize;
      let quantity = BigEndian::read_u16(&pdu[3..5]) as usize;
      let bits = if function == 0x01 { &file.coils } else { &file.discrete };
      if start + quantity > bits.len() || quantity == 0 {
        return exception(transaction_id, function, 0x02);
      }
      let byte_count = quantity.div_ceil(8);
      let mut packed = vec![0u8; byte_count];
      for (i, bit) in bits[start..start + quantity].iter().enumerate() {
        if *bit {
          packed[i / 8] |= 1 << (i % 8);
        }
      }
      let mut body = vec![function, byte_count as u8];
      body.extend_from_slice(&packed);
      frame(transaction_id, &body)
    }
    0x06 => {
      let address = BigEndian::read_u16(&pdu[1..3]) as usize;
      let value = BigEndian::read_u16(&pdu[3..5]);
      if address >= file.holding.len() {
        return exception(transaction_id, function, 0x02);
      }
      file.holding[address] = value;
      frame(transaction_id, &pdu[0..5])
    }
    0x05 => {
      let address = BigEndian::read_u16(&pdu[1..3]) as usize;
      let value = BigEndian::read_u16(&pdu[3..5]);
      if address >= file.coils.len() {
        return exception(transaction_id, function, 0x02);
      }
      file.coils[address] = value == 0xFF00;
      frame(transaction_id, &pdu[0..5])
    }
    _ => exception(transaction_id, function, 0x01),
  }
}

fn frame(transaction_id: u16, pdu: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity(7 + pdu.len());
  let mut word = [0u8; 2];
  BigEndian::write_u16(&mut word, transaction_id);
  out.extend_from_slice(&word);
  out.extend_from_slice(&[0x00, 0x00]);
  BigEndian::write_u16(&mut word, pdu.len() as u16 + 1);
  out.extend_from_slice(&word);
  out.push(UNIT_ID);
  out.extend_from_slice(pdu);
  out
}

fn exception(transaction_id: u16, function: u8, code: u8) -> Vec<u8> {
  frame(transaction_id, &[function | 0x80, code])
}
