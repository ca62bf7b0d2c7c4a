// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

mod util;

use fieldgate::{Deadline, Fingerprint, Gateway, GatewayError, RawAddress, Transport, TypedValue};
use fieldgate_core::ProtocolRegistry;
use fieldgate_core::errors::ProtocolException;
use fieldgate_descriptor::ObjectType;
use fieldgate_proto_bacnet::BacnetClient;
use std::time::Duration;
use util::bacnet_sim;

const NAE55: &str = "johnson_controls_metasys_nae55";

async fn gateway() -> Gateway {
  Gateway::builder().default_connectors().finish().await.expect("gateway builds")
}

#[tokio::test]
async fn who_is_receives_the_advertised_identity() {
  let sim = bacnet_sim::spawn(1234, 260).await;
  let registry = ProtocolRegistry::with_defaults();
  let spec = registry.get("bacnet").unwrap();
  let client = BacnetClient::connect(&sim.address, &spec, Deadline::after(Duration::from_secs(2)))
    .await
    .unwrap();
  let i_am = client.discover(Deadline::after(Duration::from_secs(2))).await.unwrap();
  assert_eq!(i_am.device_instance, 1234);
  assert_eq!(i_am.vendor_id, 260);
}

#[tokio::test]
async fn present_value_read_through_the_descriptor() {
  let sim = bacnet_sim::spawn(1234, 260).await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("bacnet", &sim.address, Some(NAE55)).await.unwrap();

  let reading = gateway.read(&session, "zone_temperature").await.unwrap();
  assert_eq!(reading.value(), &TypedValue::Float(22.5));
  assert_eq!(reading.unit(), "°C");
}

#[tokio::test]
async fn fingerprint_with_vendor_260_resolves_to_johnson() {
  let gateway = gateway().await;
  let fingerprint = Fingerprint::new(
    Transport::Udp,
    47808,
    12.0,
    24,
    Some(260),
    Some("Metasys NAE55".to_owned()),
    None,
    None,
    false,
  );
  let (protocol, _confidence) = gateway.classify_device(&fingerprint);
  assert_eq!(protocol, "bacnet");
  let descriptor = gateway.resolve_descriptor(&fingerprint).await.unwrap();
  assert!(descriptor.device_id().starts_with("johnson"));
}

#[tokio::test]
async fn invoke_ids_increase_within_a_session() {
  let sim = bacnet_sim::spawn(1234, 260).await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("bacnet", &sim.address, Some(NAE55)).await.unwrap();

  for _ in 0..3 {
    gateway.read(&session, "zone_temperature").await.unwrap();
  }
  let seen = sim.invoke_ids.lock().unwrap().clone();
  assert!(seen.len() >= 3);
  assert!(
    seen.windows(2).all(|pair| pair[1] > pair[0]),
    "invoke ids not monotone: {seen:?}"
  );
}

#[tokio::test]
async fn unknown_object_surfaces_the_error_pdu() {
  let sim = bacnet_sim::spawn(1234, 260).await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("bacnet", &sim.address, Some(NAE55)).await.unwrap();

  let error = gateway
    .read_raw(
      &session,
      &RawAddress::Object {
        object_type: ObjectType::AI,
        instance: 99,
      },
    )
    .await
    .unwrap_err();
  assert!(matches!(
    error,
    GatewayError::Protocol(ProtocolException::BacnetError { class: 0x01, code: 0x1F })
  ));
}

#[tokio::test]
async fn write_property_is_acknowledged() {
  let sim = bacnet_sim::spawn(1234, 260).await;
  let gateway = gateway().await;
  let session = gateway.implement_protocol("bacnet", &sim.address, Some(NAE55)).await.unwrap();

  gateway.write(&session, "cooling_setpoint", TypedValue::Float(24.5)).await.unwrap();
}
