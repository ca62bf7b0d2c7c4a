// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::descriptor::DeviceDescriptor;
use dashmap::DashMap;
use fieldgate_core::errors::{GatewayError, GatewayResult, ValidationError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// On-disk and in-memory home of every known [`DeviceDescriptor`].
///
/// One JSON file per descriptor, named by `device_id`. Descriptors are
/// validated on the way in; files that fail validation on reload are skipped
/// with a warning rather than poisoning the store.
pub struct DescriptorStore {
  dir: PathBuf,
  by_id: DashMap<String, Arc<DeviceDescriptor>>,
}

impl DescriptorStore {
  /// Open (creating if needed) the descriptor directory and load every
  /// descriptor in it.
  pub fn open(dir: &Path) -> GatewayResult<Self> {
    std::fs::create_dir_all(dir).map_err(|e| {
      GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "cannot create descriptor directory {}: {e}",
        dir.display()
      )))
    })?;
    let store = Self {
      dir: dir.to_owned(),
      by_id: DashMap::new(),
    };
    store.reload()?;
    Ok(store)
  }

  /// In-memory store for tests and ephemeral gateways; nothing persists.
  pub fn ephemeral() -> Self {
    Self {
      dir: PathBuf::new(),
      by_id: DashMap::new(),
    }
  }

  fn reload(&self) -> GatewayResult<()> {
    let entries = match std::fs::read_dir(&self.dir) {
      Ok(entries) => entries,
      Err(e) => {
        warn!("cannot read descriptor directory {}: {e}", self.dir.display());
        return Ok(());
      }
    };
    let mut loaded = 0usize;
    for entry in entries.flatten() {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }
      match Self::load_file(&path) {
        Ok(descriptor) => {
          self
            .by_id
            .insert(descriptor.device_id().clone(), Arc::new(descriptor));
          loaded += 1;
        }
        Err(e) => warn!("skipping descriptor {}: {e}", path.display()),
      }
    }
    if loaded > 0 {
      info!("loaded {loaded} descriptors from {}", self.dir.display());
    }
    Ok(())
  }

  fn load_file(path: &Path) -> GatewayResult<DeviceDescriptor> {
    let text = std::fs::read_to_string(path).map_err(|e| {
      GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "cannot read descriptor file: {e}"
      )))
    })?;
    let descriptor: DeviceDescriptor = serde_json::from_str(&text).map_err(|e| {
      GatewayError::Validation(ValidationError::InvariantViolation(format!(
        "descriptor file is not valid JSON: {e}"
      )))
    })?;
    descriptor.validate()?;
    Ok(descriptor)
  }

  /// Validate and insert, replacing any earlier descriptor with the same id.
  /// Persisted before the in-memory map is touched, so a failed write leaves
  /// the store unchanged.
  pub fn insert(&self, descriptor: DeviceDescriptor) -> GatewayResult<Arc<DeviceDescriptor>> {
    descriptor.validate()?;
    if !self.dir.as_os_str().is_empty() {
      let path = self.path_for(descriptor.device_id());
      let json = serde_json::to_string_pretty(&descriptor).map_err(|e| {
        GatewayError::Validation(ValidationError::InvariantViolation(format!(
          "descriptor serialization failed: {e}"
        )))
      })?;
      std::fs::write(&path, json).map_err(|e| {
        GatewayError::Validation(ValidationError::InvariantViolation(format!(
          "cannot write descriptor file {}: {e}",
          path.display()
        )))
      })?;
      debug!("persisted descriptor {}", path.display());
    }
    let descriptor = Arc::new(descriptor);
    self
      .by_id
      .insert(descriptor.device_id().clone(), descriptor.clone());
    Ok(descriptor)
  }

  pub fn get(&self, device_id: &str) -> Option<Arc<DeviceDescriptor>> {
    self.by_id.get(device_id).map(|d| d.value().clone())
  }

  pub fn get_by_make_model(&self, manufacturer: &str, model: &str) -> Option<Arc<DeviceDescriptor>> {
    self.get(&DeviceDescriptor::derive_device_id(manufacturer, model))
  }

  /// All descriptors, ordered by id for deterministic iteration.
  pub fn all(&self) -> Vec<Arc<DeviceDescriptor>> {
    let mut all: Vec<_> = self.by_id.iter().map(|e| e.value().clone()).collect();
    all.sort_by(|a, b| a.device_id().cmp(b.device_id()));
    all
  }

  pub fn len(&self) -> usize {
    self.by_id.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_id.is_empty()
  }

  /// Union of parameter names across every descriptor, for entity matching.
  pub fn known_parameters(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .by_id
      .iter()
      .flat_map(|d| d.value().parameters().keys().cloned().collect::<Vec<_>>())
      .collect();
    names.sort();
    names.dedup();
    names
  }

  fn path_for(&self, device_id: &str) -> PathBuf {
    self.dir.join(format!("{device_id}.json"))
  }
}
