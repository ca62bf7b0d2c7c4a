// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Minimal BACnet/IP device simulator: answers Who-Is with I-Am and serves
//! present-value reads for a couple of analog objects. Received invoke ids
//! are recorded so tests can check monotonicity.

use fieldgate_proto_bacnet::frame::{
  BacnetValue, SERVICE_READ_PROPERTY, SERVICE_WRITE_PROPERTY, decode_confirmed_request,
  encode_complex_ack, encode_error, encode_i_am, encode_simple_ack, is_who_is,
};
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;

pub struct BacnetSim {
  pub address: String,
  pub invoke_ids: Arc<Mutex<Vec<u8>>>,
}

/// Spawn a simulator advertising `device_instance` and `vendor_id`.
/// Objects served: AI:1 = 22.5, AI:2 = 14.0, AI:3 = 45.0, AV:1 = 24.0.
pub async fn spawn(device_instance: u32, vendor_id: u16) -> BacnetSim {
  let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind simulator");
  let address = socket.local_addr().expect("local addr").to_string();
  let invoke_ids = Arc::new(Mutex::new(Vec::new()));
  let seen = invoke_ids.clone();
  tokio::spawn(async move {
    let mut buffer = [0u8; 1500];
    loop {
      let Ok((received, from)) = socket.recv_from(&mut buffer).await else {
        return;
      };
      let frame = &buffer[..received];
      let reply = if is_who_is(frame) {
        Some(encode_i_am(device_instance, 1476, 0x03, vendor_id))
      } else {
        match decode_confirmed_request(frame) {
          Ok((service, invoke_id, object_type, instance, _property, value)) => {
            seen.lock().expect("invoke id log").push(invoke_id);
            match service {
              SERVICE_READ_PROPERTY => match (object_type, instance) {
                (0, 1) => Some(encode_complex_ack(invoke_id, 0, 1, 85, &BacnetValue::Real(22.5))),
                (0, 2) => Some(encode_complex_ack(invoke_id, 0, 2, 85, &BacnetValue::Real(14.0))),
                (0, 3) => Some(encode_complex_ack(invoke_id, 0, 3, 85, &BacnetValue::Real(45.0))),
                (2, 1) => Some(encode_complex_ack(invoke_id, 2, 1, 85, &BacnetValue::Real(24.0))),
                // error class 1 (object), code 31 (unknown-object)
                _ => Some(encode_error(invoke_id, service, 0x01, 0x1F)),
              },
              SERVICE_WRITE_PROPERTY if value.is_some() => Some(encode_simple_ack(invoke_id, service)),
              _ => Some(encode_error(invoke_id, service, 0x05, 0x00)),
            }
          }
          Err(_) => None,
        }
      };
      if let Some(reply) = reply {
        let _ = socket.send_to(&reply, from).await;
      }
    }
  });
  BacnetSim { address, invoke_ids }
}
