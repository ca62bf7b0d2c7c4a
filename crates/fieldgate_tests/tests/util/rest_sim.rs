// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Minimal REST environmental-sensor simulator on a random local port.

use axum::{Json, Router, routing::get};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct SensorState {
  pub temperature: Arc<Mutex<f64>>,
  pub humidity: Arc<Mutex<f64>>,
}

pub struct RestSim {
  pub base_url: String,
  pub state: SensorState,
}

/// Spawn the simulator; reads answer JSON, unknown paths 404.
pub async fn spawn(temperature: f64, humidity: f64) -> RestSim {
  let state = SensorState {
    temperature: Arc::new(Mutex::new(temperature)),
    humidity: Arc::new(Mutex::new(humidity)),
  };

  let temp_state = state.clone();
  let humid_state = state.clone();
  let set_state = state.clone();
  let app = Router::new()
    .route(
      "/api/status",
      get(|| async { Json(json!({"status": "online", "device": "SHT40"})) }),
    )
    .route(
      "/api/temperature",
      get(move || {
        let state = temp_state.clone();
        async move {
          let value = *state.temperature.lock().expect("sensor state");
          Json(json!({"value": value, "unit": "°C"}))
        }
      })
      .post(move |Json(body): Json<serde_json::Value>| {
        let state = set_state.clone();
        async move {
          if let Some(value) = body.get("value").and_then(|v| v.as_f64()) {
            *state.temperature.lock().expect("sensor state") = value;
          }
          Json(json!({"success": true}))
        }
      }),
    )
    .route(
      "/api/humidity",
      get(move || {
        let state = humid_state.clone();
        async move {
          let value = *state.humidity.lock().expect("sensor state");
          Json(json!({"value": value, "unit": "%"}))
        }
      }),
    )
    .route(
      "/api/pressure",
      get(|| async { Json(json!({"value": 1013.2, "unit": "hPa"})) }),
    );

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind simulator");
  let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
  tokio::spawn(async move {
    axum::serve(listener, app).await.expect("rest simulator serve");
  });
  RestSim { base_url, state }
}
