// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use async_trait::async_trait;
use fieldgate_core::errors::{
  DecodeError, GatewayError, GatewayResult, ProtocolException, TransportError, ValidationError,
};
use fieldgate_core::{Deadline, ProtocolSpec, TypedValue};
use fieldgate_descriptor::{Addressing, ParameterSpec, ValueKind};
use fieldgate_server::transport::{ProbeInfo, ProtocolClient, ProtocolConnector, RawAddress};
use std::time::Instant;
use tracing::debug;

/// Authentication modes the codec recognizes.
#[derive(Debug, Clone, Default)]
pub enum AuthMode {
  #[default]
  None,
  Bearer(String),
  ApiKey {
    header: String,
    key: String,
  },
}

fn request_error(e: reqwest::Error) -> GatewayError {
  if e.is_timeout() {
    GatewayError::Transport(TransportError::Timeout(0))
  } else if e.is_connect() {
    GatewayError::Transport(TransportError::Unreachable(e.to_string()))
  } else if e.is_decode() {
    GatewayError::Decode(DecodeError::InvalidJson(e.to_string()))
  } else {
    GatewayError::Transport(TransportError::MalformedExchange(e.to_string()))
  }
}

/// REST client for one device base URL.
pub struct RestClient {
  address: String,
  base_url: String,
  http: reqwest::Client,
  auth: AuthMode,
}

impl RestClient {
  pub fn new(address: &str, spec: &ProtocolSpec, auth: AuthMode) -> GatewayResult<Self> {
    let base_url = if address.starts_with("http://") || address.starts_with("https://") {
      address.trim_end_matches('/').to_owned()
    } else if address.contains(':') {
      format!("http://{address}")
    } else {
      format!("http://{address}:{}", spec.default_port())
    };
    let http = reqwest::Client::builder()
      .timeout(spec.request_timeout())
      .build()
      .map_err(|e| GatewayError::Transport(TransportError::Unreachable(e.to_string())))?;
    Ok(Self {
      address: address.to_owned(),
      base_url,
      http,
      auth,
    })
  }

  fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.auth {
      AuthMode::None => request,
      AuthMode::Bearer(token) => request.bearer_auth(token),
      AuthMode::ApiKey { header, key } => request.header(header, key),
    }
  }

  async fn get(&self, path: &str, deadline: Deadline) -> GatewayResult<(serde_json::Value, bool, u32)> {
    let url = format!("{}{path}", self.base_url);
    deadline
      .bound(async {
        let response = self.apply_auth(self.http.get(&url)).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
          return Err(GatewayError::Protocol(ProtocolException::HttpStatus(status.as_u16())));
        }
        let json = response
          .headers()
          .get(reqwest::header::CONTENT_TYPE)
          .and_then(|v| v.to_str().ok())
          .map(|v| v.contains("application/json"))
          .unwrap_or(false);
        let body = response.text().await.map_err(request_error)?;
        let size = body.len() as u32;
        if json {
          let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| GatewayError::Decode(DecodeError::InvalidJson(e.to_string())))?;
          Ok((value, true, size))
        } else {
          Ok((serde_json::Value::String(body), false, size))
        }
      })
      .await
  }

  async fn post(&self, path: &str, body: serde_json::Value, deadline: Deadline) -> GatewayResult<()> {
    let url = format!("{}{path}", self.base_url);
    deadline
      .bound(async {
        let response = self
          .apply_auth(self.http.post(&url))
          .json(&body)
          .send()
          .await
          .map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
          return Err(GatewayError::Protocol(ProtocolException::HttpStatus(status.as_u16())));
        }
        Ok(())
      })
      .await
  }

  fn endpoint_path(parameter: &ParameterSpec) -> GatewayResult<String> {
    match parameter.addressing() {
      Addressing::Endpoint { path } => Ok(path.clone()),
      _ => Err(GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "parameter \"{}\" is not endpoint-addressed",
        parameter.name()
      )))),
    }
  }

  /// Pull the parameter's value out of a JSON body. Accepts a bare number,
  /// `{"value": …}`, `{"<parameter>": …}`, or an object with exactly one
  /// numeric field.
  fn extract_json(body: &serde_json::Value, parameter_name: &str) -> Option<serde_json::Value> {
    match body {
      serde_json::Value::Object(map) => {
        if let Some(value) = map.get("value").or_else(|| map.get(parameter_name)) {
          return Some(value.clone());
        }
        let numeric: Vec<&serde_json::Value> = map.values().filter(|v| v.is_number()).collect();
        if numeric.len() == 1 {
          return Some(numeric[0].clone());
        }
        None
      }
      other => Some(other.clone()),
    }
  }

  fn typed_value(raw: serde_json::Value, kind: ValueKind, parameter_name: &str) -> GatewayResult<TypedValue> {
    let mismatch = || {
      GatewayError::Decode(DecodeError::InvalidJson(format!(
        "response for \"{parameter_name}\" does not hold a {kind} value"
      )))
    };
    match kind {
      ValueKind::Float => match raw {
        serde_json::Value::Number(n) => n.as_f64().map(TypedValue::Float).ok_or_else(mismatch),
        serde_json::Value::String(s) => s.trim().parse().map(TypedValue::Float).map_err(|_| mismatch()),
        _ => Err(mismatch()),
      },
      ValueKind::Int => match raw {
        serde_json::Value::Number(n) => n.as_i64().map(TypedValue::Int).ok_or_else(mismatch),
        serde_json::Value::String(s) => s.trim().parse().map(TypedValue::Int).map_err(|_| mismatch()),
        _ => Err(mismatch()),
      },
      ValueKind::Bool => match raw {
        serde_json::Value::Bool(b) => Ok(TypedValue::Bool(b)),
        serde_json::Value::Number(n) => Ok(TypedValue::Bool(n.as_f64().unwrap_or(0.0) != 0.0)),
        _ => Err(mismatch()),
      },
      ValueKind::Enum => match raw {
        serde_json::Value::String(s) => Ok(TypedValue::Enum(s)),
        serde_json::Value::Number(n) => Ok(TypedValue::Enum(n.to_string())),
        _ => Err(mismatch()),
      },
    }
  }
}

#[async_trait]
impl ProtocolClient for RestClient {
  fn protocol_name(&self) -> &str {
    "rest"
  }

  fn address(&self) -> &str {
    &self.address
  }

  /// HTTP probe against the status endpoint, falling back to the root path.
  async fn probe(&self, deadline: Deadline) -> GatewayResult<ProbeInfo> {
    let started = Instant::now();
    let (payload_size, json) = match self.get("/api/status", deadline).await {
      Ok((_, json, size)) => (size, json),
      Err(GatewayError::Protocol(ProtocolException::HttpStatus(404))) => {
        let (_, json, size) = self.get("/", deadline).await?;
        (size, json)
      }
      Err(e) => return Err(e),
    };
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    debug!("rest probe of {} answered in {latency_ms:.1} ms", self.base_url);
    Ok(ProbeInfo::new(latency_ms, payload_size, None, None, None, json))
  }

  async fn read(&self, parameter: &ParameterSpec, deadline: Deadline) -> GatewayResult<TypedValue> {
    let path = Self::endpoint_path(parameter)?;
    let (body, json, _) = self.get(&path, deadline).await?;
    if json {
      let raw = Self::extract_json(&body, parameter.name()).ok_or_else(|| {
        GatewayError::Decode(DecodeError::InvalidJson(format!(
          "response has no field for \"{}\"",
          parameter.name()
        )))
      })?;
      Self::typed_value(raw, parameter.kind(), parameter.name())
    } else {
      // text/plain: a parseable number, otherwise the string itself.
      let text = body.as_str().unwrap_or_default().trim().to_owned();
      match parameter.kind() {
        ValueKind::Float | ValueKind::Int => {
          Self::typed_value(serde_json::Value::String(text), parameter.kind(), parameter.name())
        }
        _ => Ok(TypedValue::Text(text)),
      }
    }
  }

  async fn write(&self, parameter: &ParameterSpec, value: &TypedValue, deadline: Deadline) -> GatewayResult<()> {
    let path = Self::endpoint_path(parameter)?;
    let body = match value {
      TypedValue::Float(v) => serde_json::json!({ "value": v }),
      TypedValue::Int(v) => serde_json::json!({ "value": v }),
      TypedValue::Bool(v) => serde_json::json!({ "value": v }),
      TypedValue::Enum(v) | TypedValue::Text(v) => serde_json::json!({ "value": v }),
    };
    self.post(&path, body, deadline).await
  }

  async fn read_raw(&self, address: &RawAddress, deadline: Deadline) -> GatewayResult<TypedValue> {
    let path = match address {
      RawAddress::Path(path) => path.clone(),
      other => {
        return Err(GatewayError::Validation(ValidationError::InvariantViolation(format!(
          "rest cannot address {other:?}"
        ))));
      }
    };
    let (body, json, _) = self.get(&path, deadline).await?;
    if json {
      match Self::extract_json(&body, "value") {
        Some(serde_json::Value::Number(n)) if n.is_i64() => Ok(TypedValue::Int(n.as_i64().expect("checked"))),
        Some(serde_json::Value::Number(n)) => Ok(TypedValue::Float(n.as_f64().unwrap_or_default())),
        Some(serde_json::Value::Bool(b)) => Ok(TypedValue::Bool(b)),
        Some(serde_json::Value::String(s)) => Ok(TypedValue::Text(s)),
        _ => Ok(TypedValue::Text(body.to_string())),
      }
    } else {
      Ok(TypedValue::Text(body.as_str().unwrap_or_default().to_owned()))
    }
  }

  async fn close(&self) {
    // Connection pooling belongs to the HTTP library.
  }
}

/// Connector registered with the connection manager at startup.
#[derive(Debug, Default)]
pub struct RestConnector {
  auth: AuthMode,
}

impl RestConnector {
  pub fn with_auth(auth: AuthMode) -> Self {
    Self { auth }
  }
}

#[async_trait]
impl ProtocolConnector for RestConnector {
  fn protocol_name(&self) -> &str {
    "rest"
  }

  async fn connect(
    &self,
    address: &str,
    spec: &ProtocolSpec,
    _deadline: Deadline,
  ) -> GatewayResult<Box<dyn ProtocolClient>> {
    Ok(Box::new(RestClient::new(address, spec, self.auth.clone())?))
  }
}
