// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::session::{DeviceSession, SessionState};
use crate::transport::{ProtocolConnector, RawAddress};
use chrono::Utc;
use dashmap::DashMap;
use fieldgate_core::errors::{GatewayError, GatewayResult, ValidationError};
use fieldgate_core::{Deadline, ProtocolRegistry, Reading, TypedValue};
use fieldgate_descriptor::DeviceDescriptor;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sessions idle past this are swept on the next manager access.
const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(300);

/// Owns every [`DeviceSession`] and its state machine.
///
/// The manager keeps two maps: `session_id → session` and
/// `(protocol, address) → session_id`, so a second caller addressing the
/// same device reuses the live session instead of opening another
/// connection.
pub struct ConnectionManager {
  registry: Arc<ProtocolRegistry>,
  connectors: HashMap<String, Arc<dyn ProtocolConnector>>,
  sessions: DashMap<String, Arc<DeviceSession>>,
  by_address: DashMap<(String, String), String>,
  idle_ttl: Duration,
}

impl ConnectionManager {
  pub fn new(registry: Arc<ProtocolRegistry>) -> Self {
    Self {
      registry,
      connectors: HashMap::new(),
      sessions: DashMap::new(),
      by_address: DashMap::new(),
      idle_ttl: DEFAULT_IDLE_TTL,
    }
  }

  pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
    self.idle_ttl = idle_ttl;
    self
  }

  /// Register a protocol connector. Called once per protocol at startup.
  pub fn register_connector(&mut self, connector: Arc<dyn ProtocolConnector>) {
    self.connectors.insert(connector.protocol_name().to_owned(), connector);
  }

  /// Open a session to `address`, or reuse the live one for the same
  /// `(protocol, address)` tuple. Connect and handshake retry under the
  /// protocol spec's policy; the deadline bounds the whole open.
  pub async fn open(
    &self,
    protocol_name: &str,
    address: &str,
    descriptor: Arc<DeviceDescriptor>,
    deadline: Deadline,
  ) -> GatewayResult<Arc<DeviceSession>> {
    self.sweep_idle().await;

    let protocol_key = protocol_name.to_lowercase();
    let reuse_key = (protocol_key.clone(), address.to_owned());
    if let Some(session_id) = self.by_address.get(&reuse_key).map(|s| s.value().clone()) {
      if let Some(session) = self.sessions.get(&session_id) {
        if session.state() == SessionState::Ready {
          debug!("reusing session {} for {protocol_key}://{address}", session.session_id());
          return Ok(session.value().clone());
        }
      }
      // Failed or closed: a re-open replaces it under a fresh id.
      self.sessions.remove(&session_id);
      self.by_address.remove(&reuse_key);
    }

    let spec = self.registry.get(&protocol_key).ok_or_else(|| {
      GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "no protocol spec registered under \"{protocol_name}\""
      )))
    })?;
    let connector = self.connectors.get(&protocol_key).ok_or_else(|| {
      GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "no connector registered for protocol \"{protocol_name}\""
      )))
    })?;

    // Connect + handshake with retry on transient transport errors only.
    let mut attempt = 0u32;
    let session = loop {
      let result = async {
        let client = connector.connect(address, &spec, deadline).await?;
        let session = DeviceSession::new(descriptor.clone(), spec.clone(), client);
        session.set_state(SessionState::Connecting);
        let probe = session.client().probe(deadline).await;
        match probe {
          Ok(_) => {
            session.set_state(SessionState::Ready);
            Ok(session)
          }
          Err(e) => {
            session.set_state(SessionState::Failed);
            Err(e)
          }
        }
      }
      .await;
      match result {
        Ok(session) => break session,
        Err(e) if e.is_retryable() && attempt + 1 < spec.retry_attempts() && !deadline.expired() => {
          warn!("open attempt {attempt} for {protocol_key}://{address} failed: {e}; retrying");
          tokio::time::sleep(spec.retry_delay(attempt)).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    };

    let session = Arc::new(session);
    info!("session {} ready for {protocol_key}://{address}", session.session_id());
    self.sessions.insert(session.session_id().to_owned(), session.clone());
    self.by_address.insert(reuse_key, session.session_id().to_owned());
    Ok(session)
  }

  pub fn session(&self, session_id: &str) -> Option<Arc<DeviceSession>> {
    self.sessions.get(session_id).map(|s| s.value().clone())
  }

  /// Sessions currently alive, for planning and display.
  pub fn sessions(&self) -> Vec<Arc<DeviceSession>> {
    let mut all: Vec<_> = self.sessions.iter().map(|s| s.value().clone()).collect();
    all.sort_by(|a, b| a.session_id().cmp(b.session_id()));
    all
  }

  fn ready_session(&self, session_id: &str) -> GatewayResult<Arc<DeviceSession>> {
    let session = self
      .session(session_id)
      .ok_or(GatewayError::Validation(ValidationError::UnknownDevice))?;
    match session.state() {
      SessionState::Ready => Ok(session),
      state => Err(GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "session {session_id} is {state}"
      )))),
    }
  }

  /// Read one parameter by name. Serialized per session, retried per spec,
  /// and recorded into the rolling window on success.
  pub async fn read(
    &self,
    session_id: &str,
    parameter_name: &str,
    deadline: Deadline,
  ) -> GatewayResult<Reading> {
    let session = self.ready_session(session_id)?;
    let parameter = session
      .descriptor()
      .parameter(parameter_name)
      .ok_or_else(|| GatewayError::Validation(ValidationError::UnknownParameter(parameter_name.to_owned())))?
      .clone();

    let _op = session.op_lock.lock().await;
    let value = self
      .run_with_retry(&session, deadline, || session.client().read(&parameter, deadline))
      .await?;
    let now = Utc::now();
    if let Some(numeric) = value.as_f64() {
      session.record_reading(parameter_name, numeric, now);
    }
    session.touch();
    Ok(Reading::new(parameter_name, value, parameter.unit(), now))
  }

  /// Write one parameter by name. Values outside the parameter's error range
  /// are rejected before any I/O.
  pub async fn write(
    &self,
    session_id: &str,
    parameter_name: &str,
    value: TypedValue,
    deadline: Deadline,
  ) -> GatewayResult<()> {
    let session = self.ready_session(session_id)?;
    let parameter = session
      .descriptor()
      .parameter(parameter_name)
      .ok_or_else(|| GatewayError::Validation(ValidationError::UnknownParameter(parameter_name.to_owned())))?
      .clone();

    if let Some(numeric) = value.as_f64() {
      let error_range = parameter.error_range();
      if !error_range.contains(numeric) {
        return Err(GatewayError::Validation(ValidationError::OutOfRange {
          parameter: parameter_name.to_owned(),
          value: numeric,
          low: error_range.low(),
          high: error_range.high(),
        }));
      }
    }

    let _op = session.op_lock.lock().await;
    self
      .run_with_retry(&session, deadline, || {
        session.client().write(&parameter, &value, deadline)
      })
      .await?;
    session.touch();
    Ok(())
  }

  /// Raw read that bypasses the descriptor; protocol exceptions surface
  /// unchanged.
  pub async fn read_raw(
    &self,
    session_id: &str,
    address: &RawAddress,
    deadline: Deadline,
  ) -> GatewayResult<TypedValue> {
    let session = self.ready_session(session_id)?;
    let _op = session.op_lock.lock().await;
    let value = self
      .run_with_retry(&session, deadline, || session.client().read_raw(address, deadline))
      .await?;
    session.touch();
    Ok(value)
  }

  /// Explicit close. The session id is dead afterwards; reopening the same
  /// address produces a fresh id.
  pub async fn close(&self, session_id: &str) -> GatewayResult<()> {
    let session = self
      .session(session_id)
      .ok_or(GatewayError::Validation(ValidationError::UnknownDevice))?;
    session.client().close().await;
    session.set_state(SessionState::Closed);
    self.sessions.remove(session_id);
    self
      .by_address
      .retain(|_, mapped_id| mapped_id.as_str() != session_id);
    info!("session {session_id} closed");
    Ok(())
  }

  /// Retry transient transport errors under the session's spec. Decode
  /// errors, protocol exceptions, and cancellation surface immediately.
  /// Exhausting the retry budget transitions the session to `Failed`.
  async fn run_with_retry<T, F, Fut>(
    &self,
    session: &Arc<DeviceSession>,
    deadline: Deadline,
    operation: F,
  ) -> GatewayResult<T>
  where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = GatewayResult<T>>,
  {
    let spec = session.spec().clone();
    let mut attempt = 0u32;
    loop {
      match operation().await {
        Ok(value) => {
          session.clear_errors();
          return Ok(value);
        }
        Err(e) if e.is_retryable() => {
          let failures = session.record_error();
          if attempt + 1 >= spec.retry_attempts() || deadline.expired() {
            if failures >= spec.retry_attempts() {
              warn!(
                "session {} exhausted its retry budget; marking failed",
                session.session_id()
              );
              session.set_state(SessionState::Failed);
            }
            return Err(e);
          }
          debug!("transient failure on session {} (attempt {attempt}): {e}", session.session_id());
          tokio::time::sleep(spec.retry_delay(attempt)).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  /// Close sessions idle past the TTL. Runs opportunistically on access.
  async fn sweep_idle(&self) {
    let stale: Vec<String> = self
      .sessions
      .iter()
      .filter(|s| s.state() == SessionState::Ready && s.idle_for() > self.idle_ttl)
      .map(|s| s.session_id().to_owned())
      .collect();
    for session_id in stale {
      debug!("closing idle session {session_id}");
      let _ = self.close(&session_id).await;
    }
  }
}
