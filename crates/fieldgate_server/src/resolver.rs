// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use fieldgate_core::errors::{GatewayError, GatewayResult, ValidationError};
use fieldgate_core::Fingerprint;
use fieldgate_descriptor::{DescriptorStore, DeviceDescriptor};
use fieldgate_ml::ModelBundle;
use fieldgate_vector::{HashEmbedder, VectorIndex};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Similarity floor below which the resolver reports `unknown`.
const DEFAULT_ACCEPT_THRESHOLD: f32 = 0.10;
/// Fingerprint-cache freshness window and size bound.
const CACHE_TTL_SECONDS: i64 = 60;
const CACHE_CAP: usize = 256;

/// BACnet vendor identifiers the gateway recognizes by name. Vendor names
/// materially improve the refinement query.
fn vendor_name(vendor_id: u16) -> Option<&'static str> {
  match vendor_id {
    17 => Some("Honeywell"),
    260 => Some("Johnson Controls"),
    7 => Some("Siemens"),
    _ => None,
  }
}

struct CacheEntry {
  at: DateTime<Utc>,
  result: Option<Arc<DeviceDescriptor>>,
}

/// Two-stage device identification: coarse protocol classification over the
/// fingerprint, then semantic refinement against the descriptor index.
///
/// Results are cached by fingerprint digest for a bounded window so repeated
/// sightings of the same device skip the embedding cost.
pub struct DeviceResolver {
  models: Arc<ModelBundle>,
  embedder: HashEmbedder,
  index: Arc<RwLock<VectorIndex>>,
  store: Arc<DescriptorStore>,
  cache: DashMap<String, CacheEntry>,
  accept_threshold: f32,
}

impl DeviceResolver {
  pub fn new(
    models: Arc<ModelBundle>,
    embedder: HashEmbedder,
    index: Arc<RwLock<VectorIndex>>,
    store: Arc<DescriptorStore>,
  ) -> Self {
    Self {
      models,
      embedder,
      index,
      store,
      cache: DashMap::new(),
      accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
    }
  }

  pub fn with_accept_threshold(mut self, accept_threshold: f32) -> Self {
    self.accept_threshold = accept_threshold;
    self
  }

  /// Stage 1 only: `(protocol_name, confidence)` from the coarse classifier.
  pub fn classify(&self, fingerprint: &Fingerprint) -> (String, f32) {
    let (class, confidence) = self.models.classify_protocol(fingerprint);
    (class.to_string(), confidence)
  }

  /// Full cascade. `UnknownDevice` when the top match falls under the
  /// acceptance threshold; negative results are cached too.
  pub async fn resolve(&self, fingerprint: &Fingerprint) -> GatewayResult<Arc<DeviceDescriptor>> {
    let digest = fingerprint.digest();
    if let Some(entry) = self.cache.get(&digest) {
      if Utc::now() - entry.at < ChronoDuration::seconds(CACHE_TTL_SECONDS) {
        debug!("resolver cache hit for {digest}");
        return entry
          .result
          .clone()
          .ok_or(GatewayError::Validation(ValidationError::UnknownDevice));
      }
    }

    let (protocol, confidence) = self.classify(fingerprint);
    let query = self.refinement_query(&protocol, fingerprint);
    debug!("resolver query (protocol {protocol}, confidence {confidence:.2}): {query}");

    let vector = self.embedder.embed(&query);
    let top = {
      let index = self.index.read().await;
      index.search(&vector, 1)
    };

    let result = match top.first() {
      Some((device_id, similarity)) if *similarity >= self.accept_threshold => {
        let descriptor = self.store.get(device_id);
        if let Some(descriptor) = &descriptor {
          info!(
            "resolved fingerprint to {} (similarity {similarity:.3})",
            descriptor.device_id()
          );
        }
        descriptor
      }
      Some((device_id, similarity)) => {
        debug!("best match {device_id} at {similarity:.3} is under the acceptance threshold");
        None
      }
      None => None,
    };

    self.cache_insert(digest, result.clone());
    result.ok_or(GatewayError::Validation(ValidationError::UnknownDevice))
  }

  /// Query text built from the identified protocol, advertised vendor and
  /// model, and discovery-derived hints.
  fn refinement_query(&self, protocol: &str, fingerprint: &Fingerprint) -> String {
    let mut parts = vec![format!("Protocol: {protocol}")];
    if let Some(vendor_id) = fingerprint.vendor_id() {
      match vendor_name(vendor_id) {
        Some(name) => parts.push(format!("Manufacturer: {name}")),
        None => parts.push(format!("Vendor id: {vendor_id}")),
      }
    }
    if let Some(model) = fingerprint.model_hint() {
      parts.push(format!("Model: {model}"));
    }
    if let Some(firmware) = fingerprint.firmware() {
      parts.push(format!("Firmware: {firmware}"));
    }
    parts.push(format!("Port: {}", fingerprint.port()));
    parts.join(" ")
  }

  /// Drop every cached resolution. Called when the descriptor corpus
  /// changes (document ingestion); cached results may name stale versions.
  pub fn invalidate_cache(&self) {
    self.cache.clear();
  }

  fn cache_insert(&self, digest: String, result: Option<Arc<DeviceDescriptor>>) {
    if self.cache.len() >= CACHE_CAP {
      // Cheap pressure valve; the cache is a short-window memo, not a store.
      self.cache.clear();
    }
    self.cache.insert(
      digest,
      CacheEntry {
        at: Utc::now(),
        result,
      },
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use fieldgate_core::Transport;
  use fieldgate_core::util::raw_digest;
  use fieldgate_descriptor::builtin;
  use fieldgate_vector::descriptor_summary;

  async fn resolver_fixture() -> DeviceResolver {
    let store = Arc::new(DescriptorStore::ephemeral());
    let embedder = HashEmbedder::default();
    let mut index = VectorIndex::new(embedder.dimension());
    for descriptor in builtin::all() {
      let summary = descriptor_summary(&descriptor);
      index
        .insert(descriptor.device_id(), embedder.embed(&summary), raw_digest(&summary))
        .unwrap();
      store.insert(descriptor).unwrap();
    }
    DeviceResolver::new(
      Arc::new(ModelBundle::with_defaults()),
      embedder,
      Arc::new(RwLock::new(index)),
      store,
    )
  }

  fn bacnet_fingerprint(vendor_id: Option<u16>, model_hint: Option<&str>) -> Fingerprint {
    Fingerprint::new(
      Transport::Udp,
      47808,
      12.0,
      24,
      vendor_id,
      model_hint.map(|m| m.to_owned()),
      None,
      None,
      false,
    )
  }

  #[tokio::test]
  async fn vendor_260_resolves_to_johnson_controls() {
    let resolver = resolver_fixture().await;
    // Vendor id alone is enough: the vendor-name table feeds the query.
    let descriptor = resolver.resolve(&bacnet_fingerprint(Some(260), None)).await.unwrap();
    assert!(descriptor.device_id().starts_with("johnson"));

    // A model hint sharpens the same answer.
    let descriptor = resolver
      .resolve(&bacnet_fingerprint(Some(260), Some("Metasys NAE55")))
      .await
      .unwrap();
    assert!(descriptor.device_id().starts_with("johnson"));
  }

  #[tokio::test]
  async fn rest_sensor_resolves_by_model_hint() {
    let resolver = resolver_fixture().await;
    let fingerprint = Fingerprint::new(
      Transport::Tcp,
      8000,
      5.0,
      256,
      None,
      Some("SHT40 temperature humidity sensor".to_owned()),
      None,
      None,
      true,
    );
    let descriptor = resolver.resolve(&fingerprint).await.unwrap();
    assert_eq!(descriptor.device_id(), "sensirion_sht40");
  }

  #[tokio::test]
  async fn unmatchable_fingerprint_reports_unknown() {
    let resolver = resolver_fixture().await;
    // A threshold of 1.01 is unreachable: every result is unknown.
    let resolver = resolver.with_accept_threshold(1.01);
    let result = resolver.resolve(&bacnet_fingerprint(Some(260), None)).await;
    assert!(matches!(
      result,
      Err(GatewayError::Validation(ValidationError::UnknownDevice))
    ));
  }

  #[tokio::test]
  async fn repeated_sightings_hit_the_cache() {
    let resolver = resolver_fixture().await;
    let fingerprint = bacnet_fingerprint(Some(260), Some("Metasys NAE55"));
    let first = resolver.resolve(&fingerprint).await.unwrap();
    let second = resolver.resolve(&fingerprint).await.unwrap();
    assert_eq!(first.device_id(), second.device_id());
    assert_eq!(resolver.cache.len(), 1);
  }

  #[test]
  fn classification_follows_port_priors() {
    let store = Arc::new(DescriptorStore::ephemeral());
    let embedder = HashEmbedder::default();
    let index = Arc::new(RwLock::new(VectorIndex::new(embedder.dimension())));
    let resolver = DeviceResolver::new(Arc::new(ModelBundle::rule_only()), embedder, index, store);
    let (protocol, _) = resolver.classify(&bacnet_fingerprint(None, None));
    assert_eq!(protocol, "bacnet");
  }
}
