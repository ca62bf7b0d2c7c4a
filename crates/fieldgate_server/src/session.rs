// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::transport::ProtocolClient;
use chrono::{DateTime, Utc};
use fieldgate_core::ProtocolSpec;
use fieldgate_descriptor::DeviceDescriptor;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Rolling window length. The gateway is not a historian; longer horizons
/// come from documentation baselines.
pub const HISTORY_CAP: usize = 10;

/// Session lifecycle. `Failed` is terminal until a caller re-opens, which
/// produces a fresh session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
  New,
  Connecting,
  Ready,
  Failed,
  Closed,
}

/// One `(timestamp, parameter, value)` triple from the rolling window.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRecord {
  pub timestamp: DateTime<Utc>,
  pub parameter: String,
  pub value: f64,
}

/// Runtime state of one live device connection.
///
/// Operations on a session are serialized through `op_lock`; state, history,
/// and activity tracking sit behind their own short-lived locks so scoring
/// and display never block the wire.
pub struct DeviceSession {
  session_id: String,
  descriptor: Arc<DeviceDescriptor>,
  spec: Arc<ProtocolSpec>,
  client: Box<dyn ProtocolClient>,
  opened_at: DateTime<Utc>,
  state: std::sync::RwLock<SessionState>,
  last_activity: std::sync::RwLock<Instant>,
  error_count: AtomicU32,
  history: std::sync::Mutex<VecDeque<ReadingRecord>>,
  last_maintenance: std::sync::RwLock<Option<DateTime<Utc>>>,
  /// Serializes in-flight operations: a new read is not issued while a
  /// previous one on the same session is outstanding.
  pub(crate) op_lock: Mutex<()>,
}

impl DeviceSession {
  pub(crate) fn new(
    descriptor: Arc<DeviceDescriptor>,
    spec: Arc<ProtocolSpec>,
    client: Box<dyn ProtocolClient>,
  ) -> Self {
    Self {
      session_id: Uuid::new_v4().to_string(),
      descriptor,
      spec,
      client,
      opened_at: Utc::now(),
      state: std::sync::RwLock::new(SessionState::New),
      last_activity: std::sync::RwLock::new(Instant::now()),
      error_count: AtomicU32::new(0),
      history: std::sync::Mutex::new(VecDeque::with_capacity(HISTORY_CAP)),
      last_maintenance: std::sync::RwLock::new(None),
      op_lock: Mutex::new(()),
    }
  }

  /// Opaque session identifier; never leaks the device address.
  pub fn session_id(&self) -> &str {
    &self.session_id
  }

  pub fn descriptor(&self) -> &Arc<DeviceDescriptor> {
    &self.descriptor
  }

  pub fn spec(&self) -> &Arc<ProtocolSpec> {
    &self.spec
  }

  pub(crate) fn client(&self) -> &dyn ProtocolClient {
    self.client.as_ref()
  }

  pub fn opened_at(&self) -> DateTime<Utc> {
    self.opened_at
  }

  pub fn state(&self) -> SessionState {
    *self.state.read().expect("session state lock")
  }

  pub(crate) fn set_state(&self, state: SessionState) {
    *self.state.write().expect("session state lock") = state;
  }

  pub(crate) fn touch(&self) {
    *self.last_activity.write().expect("session activity lock") = Instant::now();
  }

  pub fn idle_for(&self) -> Duration {
    self.last_activity.read().expect("session activity lock").elapsed()
  }

  pub fn error_count(&self) -> u32 {
    self.error_count.load(Ordering::Relaxed)
  }

  /// Returns the count after incrementing.
  pub(crate) fn record_error(&self) -> u32 {
    self.error_count.fetch_add(1, Ordering::Relaxed) + 1
  }

  pub(crate) fn clear_errors(&self) {
    self.error_count.store(0, Ordering::Relaxed);
  }

  /// Append to the rolling window. The buffer stays length-bounded and
  /// timestamp-ordered: a reading that arrives with a clock earlier than the
  /// window tail is clamped to the tail's timestamp.
  pub fn record_reading(&self, parameter: &str, value: f64, timestamp: DateTime<Utc>) {
    let mut history = self.history.lock().expect("session history lock");
    let timestamp = match history.back() {
      Some(last) if timestamp < last.timestamp => last.timestamp,
      _ => timestamp,
    };
    history.push_back(ReadingRecord {
      timestamp,
      parameter: parameter.to_owned(),
      value,
    });
    while history.len() > HISTORY_CAP {
      history.pop_front();
    }
  }

  pub fn history_snapshot(&self) -> Vec<ReadingRecord> {
    self.history.lock().expect("session history lock").iter().cloned().collect()
  }

  pub fn last_maintenance(&self) -> Option<DateTime<Utc>> {
    *self.last_maintenance.read().expect("session maintenance lock")
  }

  /// Recorded from operator input or a maintenance log integration; the
  /// maintenance strategy needs a reference point.
  pub fn set_last_maintenance(&self, at: Option<DateTime<Utc>>) {
    *self.last_maintenance.write().expect("session maintenance lock") = at;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transport::{ProbeInfo, RawAddress};
  use async_trait::async_trait;
  use chrono::Duration as ChronoDuration;
  use fieldgate_core::{Deadline, GatewayResult, ProtocolRegistry, TypedValue};
  use fieldgate_descriptor::{ParameterSpec, builtin};

  struct NullClient;

  #[async_trait]
  impl crate::transport::ProtocolClient for NullClient {
    fn protocol_name(&self) -> &str {
      "rest"
    }
    fn address(&self) -> &str {
      "127.0.0.1:0"
    }
    async fn probe(&self, _deadline: Deadline) -> GatewayResult<ProbeInfo> {
      Ok(ProbeInfo::default())
    }
    async fn read(&self, _parameter: &ParameterSpec, _deadline: Deadline) -> GatewayResult<TypedValue> {
      Ok(TypedValue::Float(0.0))
    }
    async fn write(
      &self,
      _parameter: &ParameterSpec,
      _value: &TypedValue,
      _deadline: Deadline,
    ) -> GatewayResult<()> {
      Ok(())
    }
    async fn read_raw(&self, _address: &RawAddress, _deadline: Deadline) -> GatewayResult<TypedValue> {
      Ok(TypedValue::Float(0.0))
    }
    async fn close(&self) {}
  }

  fn session_fixture() -> DeviceSession {
    let registry = ProtocolRegistry::with_defaults();
    DeviceSession::new(
      Arc::new(builtin::sensirion_sht40()),
      registry.get("rest").unwrap(),
      Box::new(NullClient),
    )
  }

  #[test]
  fn history_is_bounded_and_ordered() {
    let session = session_fixture();
    let base = Utc::now();
    for i in 0..15 {
      session.record_reading("temperature", 20.0 + i as f64, base + ChronoDuration::seconds(i));
    }
    let history = session.history_snapshot();
    assert_eq!(history.len(), HISTORY_CAP);
    assert!(history.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
    assert_eq!(history.last().unwrap().value, 34.0);
  }

  #[test]
  fn backwards_clock_is_clamped() {
    let session = session_fixture();
    let base = Utc::now();
    session.record_reading("temperature", 20.0, base);
    session.record_reading("temperature", 21.0, base - ChronoDuration::seconds(30));
    let history = session.history_snapshot();
    assert_eq!(history[0].timestamp, history[1].timestamp);
  }

  #[test]
  fn fresh_sessions_start_new_with_unique_ids() {
    let a = session_fixture();
    let b = session_fixture();
    assert_eq!(a.state(), SessionState::New);
    assert_ne!(a.session_id(), b.session_id());
  }
}
