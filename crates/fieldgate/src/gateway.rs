// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use chrono::{DateTime, Utc};
use fieldgate_anomaly::{AnomalyDetector, AnomalyReport, AnomalySummary, DetectionContext, Observation};
use fieldgate_core::errors::{GatewayError, GatewayResult, ValidationError};
use fieldgate_core::util::raw_digest;
use fieldgate_core::{Deadline, Fingerprint, ProtocolRegistry, Reading, TypedValue};
use fieldgate_descriptor::{DescriptorStore, DeviceDescriptor, builtin};
use fieldgate_ml::{ModelBundle, ModelInfo};
use fieldgate_server::transport::{ProtocolConnector, RawAddress};
use fieldgate_server::{ConnectionManager, DeviceResolver, Intent, Plan, QueryDispatcher, SessionCandidate, SessionState};
use fieldgate_vector::{HashEmbedder, IndexStats, VectorIndex, descriptor_summary};
use getset::Getters;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

const DEFAULT_OP_DEADLINE: Duration = Duration::from_secs(10);

/// Builder wiring a [`Gateway`] together. Storage, models, connectors, and
/// tuning knobs are all decided here; the finished gateway is immutable in
/// configuration.
pub struct GatewayBuilder {
  storage_dir: Option<PathBuf>,
  models: Option<ModelBundle>,
  connectors: Vec<Arc<dyn ProtocolConnector>>,
  dimension: usize,
  idle_ttl: Option<Duration>,
  accept_threshold: Option<f32>,
  seed_builtins: bool,
  default_deadline: Duration,
}

impl Default for GatewayBuilder {
  fn default() -> Self {
    Self {
      storage_dir: None,
      models: None,
      connectors: Vec::new(),
      dimension: fieldgate_vector::DEFAULT_DIMENSION,
      idle_ttl: None,
      accept_threshold: None,
      seed_builtins: true,
      default_deadline: DEFAULT_OP_DEADLINE,
    }
  }
}

impl GatewayBuilder {
  /// Persist descriptors, the vector index, and model files under `dir`.
  /// Without a storage dir the gateway is fully in-memory.
  pub fn storage_dir(mut self, dir: &Path) -> Self {
    self.storage_dir = Some(dir.to_owned());
    self
  }

  /// Use an explicit model bundle instead of loading from storage.
  pub fn models(mut self, models: ModelBundle) -> Self {
    self.models = Some(models);
    self
  }

  pub fn connector(mut self, connector: Arc<dyn ProtocolConnector>) -> Self {
    self.connectors.push(connector);
    self
  }

  /// Register the three stock protocol connectors.
  pub fn default_connectors(self) -> Self {
    self
      .connector(Arc::new(fieldgate_proto_rest::RestConnector::default()))
      .connector(Arc::new(fieldgate_proto_bacnet::BacnetConnector::default()))
      .connector(Arc::new(fieldgate_proto_modbus::ModbusConnector::default()))
  }

  pub fn idle_ttl(mut self, ttl: Duration) -> Self {
    self.idle_ttl = Some(ttl);
    self
  }

  pub fn accept_threshold(mut self, threshold: f32) -> Self {
    self.accept_threshold = Some(threshold);
    self
  }

  pub fn seed_builtins(mut self, seed: bool) -> Self {
    self.seed_builtins = seed;
    self
  }

  pub fn default_deadline(mut self, deadline: Duration) -> Self {
    self.default_deadline = deadline;
    self
  }

  pub async fn finish(self) -> GatewayResult<Gateway> {
    let registry = Arc::new(ProtocolRegistry::with_defaults());

    let store = Arc::new(match &self.storage_dir {
      Some(dir) => DescriptorStore::open(&dir.join("descriptors"))?,
      None => DescriptorStore::ephemeral(),
    });
    if store.is_empty() && self.seed_builtins {
      for descriptor in builtin::all() {
        store.insert(descriptor)?;
      }
      info!("seeded {} built-in descriptors", store.len());
    }

    let models = Arc::new(match self.models {
      Some(models) => models,
      None => match &self.storage_dir {
        Some(dir) => ModelBundle::load(&dir.join("models")),
        None => ModelBundle::rule_only(),
      },
    });

    let embedder = HashEmbedder::new(self.dimension);
    let index_path = self.storage_dir.as_ref().map(|dir| dir.join("index.bin"));
    let mut index = match &index_path {
      Some(path) if path.exists() => VectorIndex::load(path).map_err(|e| {
        GatewayError::Validation(ValidationError::InvariantViolation(format!(
          "cannot load vector index: {e}"
        )))
      })?,
      _ => VectorIndex::new(self.dimension),
    };
    // Index whatever the store holds; digest keying makes this idempotent.
    let mut index_dirty = false;
    for descriptor in store.all() {
      let summary = descriptor_summary(&descriptor);
      let inserted = index
        .insert(descriptor.device_id(), embedder.embed(&summary), raw_digest(&summary))
        .map_err(|e| {
          GatewayError::Validation(ValidationError::InvariantViolation(format!(
            "cannot index descriptor {}: {e}",
            descriptor.device_id()
          )))
        })?;
      index_dirty |= inserted;
    }
    if index_dirty {
      if let Some(path) = &index_path {
        index.persist(path).map_err(|e| {
          GatewayError::Validation(ValidationError::InvariantViolation(format!(
            "cannot persist vector index: {e}"
          )))
        })?;
      }
    }
    let index = Arc::new(RwLock::new(index));

    let mut manager = ConnectionManager::new(registry.clone());
    if let Some(ttl) = self.idle_ttl {
      manager = manager.with_idle_ttl(ttl);
    }
    for connector in self.connectors {
      manager.register_connector(connector);
    }

    let mut resolver = DeviceResolver::new(models.clone(), embedder.clone(), index.clone(), store.clone());
    if let Some(threshold) = self.accept_threshold {
      resolver = resolver.with_accept_threshold(threshold);
    }

    Ok(Gateway {
      registry,
      store,
      embedder,
      index,
      index_path,
      detector: AnomalyDetector::new(models.clone()),
      dispatcher: QueryDispatcher::new(models.clone()),
      models,
      manager,
      resolver,
      default_deadline: self.default_deadline,
    })
  }
}

/// Result of executing one planned operation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum QueryOutcome {
  Reading {
    session_id: String,
    reading: Reading,
  },
  Written {
    session_id: String,
    parameter: String,
    value: f64,
  },
  Status {
    session_id: String,
    state: String,
    device_id: String,
  },
  Error {
    session_id: Option<String>,
    kind: String,
    message: String,
  },
}

/// Answer to one operator request: the plan plus whatever executed.
#[derive(Debug, Clone, Serialize, Getters)]
#[getset(get = "pub")]
pub struct QueryResult {
  query: String,
  plan: Plan,
  outcomes: Vec<QueryOutcome>,
}

/// The assembled gateway. See the crate docs for the ownership picture.
pub struct Gateway {
  registry: Arc<ProtocolRegistry>,
  store: Arc<DescriptorStore>,
  embedder: HashEmbedder,
  index: Arc<RwLock<VectorIndex>>,
  index_path: Option<PathBuf>,
  models: Arc<ModelBundle>,
  manager: ConnectionManager,
  resolver: DeviceResolver,
  detector: AnomalyDetector,
  dispatcher: QueryDispatcher,
  default_deadline: Duration,
}

impl Gateway {
  pub fn builder() -> GatewayBuilder {
    GatewayBuilder::default()
  }

  fn deadline(&self) -> Deadline {
    Deadline::after(self.default_deadline)
  }

  /// Open (or reuse) a managed connection and return its opaque session id.
  /// `device_hint` names a known descriptor (`device_id` or
  /// "manufacturer model"); without a hint the first known descriptor for
  /// the protocol is used.
  pub async fn implement_protocol(
    &self,
    protocol_name: &str,
    device_address: &str,
    device_hint: Option<&str>,
  ) -> GatewayResult<String> {
    let descriptor = self.descriptor_for(protocol_name, device_hint)?;
    let session = self
      .manager
      .open(protocol_name, device_address, descriptor, self.deadline())
      .await?;
    Ok(session.session_id().to_owned())
  }

  fn descriptor_for(&self, protocol_name: &str, device_hint: Option<&str>) -> GatewayResult<Arc<DeviceDescriptor>> {
    let protocol_key = protocol_name.to_lowercase();
    if let Some(hint) = device_hint {
      if let Some(descriptor) = self.store.get(hint) {
        return Ok(descriptor);
      }
      if let Some((manufacturer, model)) = hint.split_once(' ') {
        if let Some(descriptor) = self.store.get_by_make_model(manufacturer, model) {
          return Ok(descriptor);
        }
      }
      return Err(GatewayError::Validation(ValidationError::UnknownDevice));
    }
    self
      .store
      .all()
      .into_iter()
      .find(|d| d.protocol_key() == protocol_key)
      .ok_or(GatewayError::Validation(ValidationError::UnknownDevice))
  }

  pub async fn close_session(&self, session_id: &str) -> GatewayResult<()> {
    self.manager.close(session_id).await
  }

  pub async fn read(&self, session_id: &str, parameter_name: &str) -> GatewayResult<Reading> {
    self.read_with_deadline(session_id, parameter_name, self.deadline()).await
  }

  pub async fn read_with_deadline(
    &self,
    session_id: &str,
    parameter_name: &str,
    deadline: Deadline,
  ) -> GatewayResult<Reading> {
    self.manager.read(session_id, parameter_name, deadline).await
  }

  pub async fn write(&self, session_id: &str, parameter_name: &str, value: TypedValue) -> GatewayResult<()> {
    self
      .write_with_deadline(session_id, parameter_name, value, self.deadline())
      .await
  }

  pub async fn write_with_deadline(
    &self,
    session_id: &str,
    parameter_name: &str,
    value: TypedValue,
    deadline: Deadline,
  ) -> GatewayResult<()> {
    self.manager.write(session_id, parameter_name, value, deadline).await
  }

  /// Raw read that bypasses the descriptor (protocol exceptions surface
  /// unchanged).
  pub async fn read_raw(&self, session_id: &str, address: &RawAddress) -> GatewayResult<TypedValue> {
    self.manager.read_raw(session_id, address, self.deadline()).await
  }

  pub async fn read_raw_with_deadline(
    &self,
    session_id: &str,
    address: &RawAddress,
    deadline: Deadline,
  ) -> GatewayResult<TypedValue> {
    self.manager.read_raw(session_id, address, deadline).await
  }

  /// Coarse classification only: `(protocol_name, confidence)`.
  pub fn classify_device(&self, fingerprint: &Fingerprint) -> (String, f32) {
    self.resolver.classify(fingerprint)
  }

  /// Full resolver cascade; `UnknownDevice` below the acceptance threshold.
  pub async fn resolve_descriptor(&self, fingerprint: &Fingerprint) -> GatewayResult<Arc<DeviceDescriptor>> {
    self.resolver.resolve(fingerprint).await
  }

  /// Run all six anomaly strategies against a reading on this session. The
  /// reading is folded into the session's rolling window first.
  pub fn detect_anomalies(
    &self,
    session_id: &str,
    current_reading: &BTreeMap<String, f64>,
  ) -> GatewayResult<Vec<AnomalyReport>> {
    let session = self
      .manager
      .session(session_id)
      .ok_or(GatewayError::Validation(ValidationError::UnknownDevice))?;
    let now = Utc::now();
    for (parameter, value) in current_reading {
      if session.descriptor().parameter(parameter).is_some() {
        session.record_reading(parameter, *value, now);
      }
    }
    let window: Vec<Observation> = session
      .history_snapshot()
      .into_iter()
      .map(|r| Observation {
        timestamp: r.timestamp,
        parameter: r.parameter,
        value: r.value,
      })
      .collect();
    let descriptor = session.descriptor().clone();
    Ok(self.detector.detect(&DetectionContext {
      device_id: descriptor.device_id(),
      descriptor: &descriptor,
      current: current_reading,
      window: &window,
      last_maintenance: session.last_maintenance(),
      now,
    }))
  }

  /// Ingest one vendor document: parse, validate, store, embed, index,
  /// persist. A document that fails validation mutates nothing.
  pub async fn ingest_document(&self, path: &Path) -> GatewayResult<Arc<DeviceDescriptor>> {
    let descriptor = fieldgate_ingest::ingest_document(path)?;
    let descriptor = self.store.insert(descriptor)?;
    let summary = descriptor_summary(&descriptor);
    {
      let mut index = self.index.write().await;
      index
        .insert(descriptor.device_id(), self.embedder.embed(&summary), raw_digest(&summary))
        .map_err(|e| {
          GatewayError::Validation(ValidationError::InvariantViolation(format!(
            "cannot index descriptor: {e}"
          )))
        })?;
      if let Some(index_path) = &self.index_path {
        index.persist(index_path).map_err(|e| {
          GatewayError::Validation(ValidationError::InvariantViolation(format!(
            "cannot persist vector index: {e}"
          )))
        })?;
      }
    }
    // Cached resolutions may point at the replaced descriptor version.
    self.resolver.invalidate_cache();
    info!("ingested descriptor {}", descriptor.device_id());
    Ok(descriptor)
  }

  /// Top-k descriptor search by free text.
  pub async fn search_descriptors(&self, query_text: &str, top_k: usize) -> Vec<(String, f32)> {
    let vector = self.embedder.embed(query_text);
    let index = self.index.read().await;
    index.search(&vector, top_k)
  }

  /// Natural-language request → plan → execution against live sessions.
  pub async fn process_query(&self, text: &str) -> QueryResult {
    let sessions = self.manager.sessions();
    let candidates: Vec<SessionCandidate> = sessions
      .iter()
      .filter(|s| s.state() == SessionState::Ready)
      .map(|s| SessionCandidate {
        session_id: s.session_id().to_owned(),
        parameters: s.descriptor().parameters().keys().cloned().collect(),
      })
      .collect();
    let plan = self.dispatcher.plan(text, &self.store.known_parameters(), &candidates);

    let mut outcomes = Vec::new();
    for operation in plan.operations() {
      match (operation.operation(), operation.session_id(), operation.parameter()) {
        (Intent::Get | Intent::Trend | Intent::Compare, Some(session_id), Some(parameter)) => {
          match self.read(session_id, parameter).await {
            Ok(reading) => outcomes.push(QueryOutcome::Reading {
              session_id: session_id.clone(),
              reading,
            }),
            Err(e) => outcomes.push(QueryOutcome::Error {
              session_id: Some(session_id.clone()),
              kind: e.kind().to_owned(),
              message: e.to_string(),
            }),
          }
        }
        (Intent::Set, Some(session_id), Some(parameter)) => {
          let Some(value) = *operation.value() else {
            outcomes.push(QueryOutcome::Error {
              session_id: Some(session_id.clone()),
              kind: "invariant-violation".to_owned(),
              message: "set request carries no value".to_owned(),
            });
            continue;
          };
          match self.write(session_id, parameter, TypedValue::Float(value)).await {
            Ok(()) => outcomes.push(QueryOutcome::Written {
              session_id: session_id.clone(),
              parameter: parameter.clone(),
              value,
            }),
            Err(e) => outcomes.push(QueryOutcome::Error {
              session_id: Some(session_id.clone()),
              kind: e.kind().to_owned(),
              message: e.to_string(),
            }),
          }
        }
        (Intent::Status, Some(session_id), _) => {
          if let Some(session) = self.manager.session(session_id) {
            outcomes.push(QueryOutcome::Status {
              session_id: session_id.clone(),
              state: session.state().to_string(),
              device_id: session.descriptor().device_id().clone(),
            });
          }
        }
        (intent, None, parameter) => {
          warn!("no live session for planned {intent} of {parameter:?}");
          outcomes.push(QueryOutcome::Error {
            session_id: None,
            kind: "unknown-device".to_owned(),
            message: format!("no live session can serve this {intent} request"),
          });
        }
        _ => {}
      }
    }

    QueryResult {
      query: text.to_owned(),
      plan,
      outcomes,
    }
  }

  // Introspection for the CLI banner and operator tooling.

  pub fn registry(&self) -> &ProtocolRegistry {
    &self.registry
  }

  pub fn store(&self) -> &DescriptorStore {
    &self.store
  }

  pub fn model_info(&self) -> Vec<ModelInfo> {
    self.models.info()
  }

  pub async fn index_stats(&self) -> IndexStats {
    self.index.read().await.stats()
  }

  pub fn anomaly_summary(&self, device_id: &str) -> AnomalySummary {
    self.detector.summary(device_id)
  }

  /// Record when a device last had maintenance (operator input; the
  /// maintenance strategy needs a reference point).
  pub fn set_last_maintenance(&self, session_id: &str, at: Option<DateTime<Utc>>) -> GatewayResult<()> {
    let session = self
      .manager
      .session(session_id)
      .ok_or(GatewayError::Validation(ValidationError::UnknownDevice))?;
    session.set_last_maintenance(at);
    Ok(())
  }

  pub fn session_state(&self, session_id: &str) -> Option<SessionState> {
    self.manager.session(session_id).map(|s| s.state())
  }
}
