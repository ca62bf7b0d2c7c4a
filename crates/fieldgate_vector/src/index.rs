// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use displaydoc::Display;
use getset::CopyGetters;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Index file format version.
const INDEX_VERSION: u32 = 1;

#[derive(Debug, Error, Display)]
pub enum IndexError {
  /// Index file I/O error: {0}
  Io(#[from] std::io::Error),
  /// Index file is corrupt: {0}
  Corrupt(String),
  /// Vector dimension mismatch: index is {expected}, got {got}
  DimensionMismatch { expected: usize, got: usize },
}

/// One indexed descriptor embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
  pub device_id: String,
  pub vector: Vec<f32>,
  /// MD5 of the summary text the vector was computed from. Re-embedding the
  /// same text is a no-op.
  pub source_digest: [u8; 16],
}

#[derive(Debug, Clone, Copy, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct IndexStats {
  dimension: usize,
  count: usize,
}

/// Append-mostly store of `(device_id, vector)` pairs with cosine top-k
/// search.
///
/// The dimension is fixed at construction and never changes for a given
/// index. Readers are concurrent and writers serialized by the owner
/// (the gateway wraps the index in an `RwLock`).
#[derive(Debug, PartialEq)]
pub struct VectorIndex {
  dimension: usize,
  records: Vec<EmbeddingRecord>,
  by_id: HashMap<String, usize>,
}

impl VectorIndex {
  pub fn new(dimension: usize) -> Self {
    Self {
      dimension,
      records: Vec::new(),
      by_id: HashMap::new(),
    }
  }

  pub fn dimension(&self) -> usize {
    self.dimension
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn stats(&self) -> IndexStats {
    IndexStats {
      dimension: self.dimension,
      count: self.records.len(),
    }
  }

  /// Insert or replace the record for `device_id`. Returns `false` when the
  /// identical source text is already indexed (idempotent re-embedding).
  pub fn insert(
    &mut self,
    device_id: &str,
    vector: Vec<f32>,
    source_digest: [u8; 16],
  ) -> Result<bool, IndexError> {
    if vector.len() != self.dimension {
      return Err(IndexError::DimensionMismatch {
        expected: self.dimension,
        got: vector.len(),
      });
    }
    if let Some(&slot) = self.by_id.get(device_id) {
      if self.records[slot].source_digest == source_digest {
        debug!("index already holds {device_id} at this digest, skipping");
        return Ok(false);
      }
      self.records[slot] = EmbeddingRecord {
        device_id: device_id.to_owned(),
        vector,
        source_digest,
      };
      return Ok(true);
    }
    self.by_id.insert(device_id.to_owned(), self.records.len());
    self.records.push(EmbeddingRecord {
      device_id: device_id.to_owned(),
      vector,
      source_digest,
    });
    Ok(true)
  }

  /// Remove a record. Rare; rebuilds the id map.
  pub fn remove(&mut self, device_id: &str) -> bool {
    let Some(slot) = self.by_id.remove(device_id) else {
      return false;
    };
    self.records.remove(slot);
    self.by_id = self
      .records
      .iter()
      .enumerate()
      .map(|(i, r)| (r.device_id.clone(), i))
      .collect();
    true
  }

  /// Top-k device ids by cosine similarity, best first.
  pub fn search(&self, query: &[f32], top_k: usize) -> Vec<(String, f32)> {
    let mut scored: Vec<(String, f32)> = self
      .records
      .iter()
      .map(|record| (record.device_id.clone(), cosine(query, &record.vector)))
      .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).expect("cosine scores are finite"));
    scored.truncate(top_k);
    scored
  }

  /// Serialize to a single little-endian file: `{version, dimension, count}`
  /// header, then per record `{id_length, id_bytes, vector_bytes, digest}`.
  pub fn persist(&self, path: &Path) -> Result<(), IndexError> {
    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(INDEX_VERSION)?;
    out.write_u32::<LittleEndian>(self.dimension as u32)?;
    out.write_u32::<LittleEndian>(self.records.len() as u32)?;
    for record in &self.records {
      out.write_u32::<LittleEndian>(record.device_id.len() as u32)?;
      out.extend_from_slice(record.device_id.as_bytes());
      for v in &record.vector {
        out.write_f32::<LittleEndian>(*v)?;
      }
      out.extend_from_slice(&record.source_digest);
    }
    std::fs::write(path, out)?;
    Ok(())
  }

  pub fn load(path: &Path) -> Result<Self, IndexError> {
    let bytes = std::fs::read(path)?;
    let mut cursor = Cursor::new(bytes);
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != INDEX_VERSION {
      return Err(IndexError::Corrupt(format!("unsupported index version {version}")));
    }
    let dimension = cursor.read_u32::<LittleEndian>()? as usize;
    let count = cursor.read_u32::<LittleEndian>()? as usize;
    let mut index = Self::new(dimension);
    for _ in 0..count {
      let id_len = cursor.read_u32::<LittleEndian>()? as usize;
      let mut id_bytes = vec![0u8; id_len];
      cursor.read_exact(&mut id_bytes)?;
      let device_id = String::from_utf8(id_bytes)
        .map_err(|_| IndexError::Corrupt("device id is not UTF-8".to_owned()))?;
      let mut vector = vec![0.0f32; dimension];
      cursor.read_f32_into::<LittleEndian>(&mut vector)?;
      let mut source_digest = [0u8; 16];
      cursor.read_exact(&mut source_digest)?;
      index.insert(&device_id, vector, source_digest)?;
    }
    if cursor.position() != cursor.get_ref().len() as u64 {
      return Err(IndexError::Corrupt("trailing bytes after last record".to_owned()));
    }
    Ok(index)
  }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
  let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
  let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
  let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
  if norm_a == 0.0 || norm_b == 0.0 {
    return 0.0;
  }
  dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::embedding::HashEmbedder;
  use fieldgate_core::util::raw_digest;

  fn seeded_index() -> (VectorIndex, HashEmbedder) {
    let embedder = HashEmbedder::new(64);
    let mut index = VectorIndex::new(64);
    for (id, text) in [
      ("honeywell_t6_pro", "Honeywell T6 Pro thermostat BACnet temperature setpoint"),
      ("sensirion_sht40", "Sensirion SHT40 REST temperature humidity pressure sensor"),
      ("schneider_m580", "Schneider Modicon M580 PLC Modbus registers coils"),
    ] {
      index.insert(id, embedder.embed(text), raw_digest(text)).unwrap();
    }
    (index, embedder)
  }

  #[test]
  fn search_ranks_by_shared_vocabulary() {
    let (index, embedder) = seeded_index();
    let results = index.search(&embedder.embed("BACnet thermostat temperature"), 3);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, "honeywell_t6_pro");
    assert!(results[0].1 > results[2].1);
  }

  #[test]
  fn reinsert_same_digest_is_idempotent() {
    let (mut index, embedder) = seeded_index();
    let text = "Honeywell T6 Pro thermostat BACnet temperature setpoint";
    let inserted = index.insert("honeywell_t6_pro", embedder.embed(text), raw_digest(text)).unwrap();
    assert!(!inserted);
    assert_eq!(index.len(), 3);
  }

  #[test]
  fn reinsert_new_digest_replaces() {
    let (mut index, embedder) = seeded_index();
    let text = "Honeywell T6 Pro revision B documentation";
    let inserted = index.insert("honeywell_t6_pro", embedder.embed(text), raw_digest(text)).unwrap();
    assert!(inserted);
    assert_eq!(index.len(), 3);
  }

  #[test]
  fn dimension_mismatch_rejected() {
    let (mut index, _) = seeded_index();
    assert!(matches!(
      index.insert("bad", vec![0.0; 16], [0u8; 16]),
      Err(IndexError::DimensionMismatch { expected: 64, got: 16 })
    ));
  }

  #[test]
  fn persist_and_reload_bit_identical() {
    let (index, _) = seeded_index();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.bin");
    index.persist(&path).unwrap();
    let reloaded = VectorIndex::load(&path).unwrap();
    assert_eq!(reloaded, index);

    // Persisting the reloaded index reproduces the file byte-for-byte.
    let second = dir.path().join("index2.bin");
    reloaded.persist(&second).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&second).unwrap());
  }

  #[test]
  fn remove_then_search() {
    let (mut index, embedder) = seeded_index();
    assert!(index.remove("honeywell_t6_pro"));
    assert!(!index.remove("honeywell_t6_pro"));
    let results = index.search(&embedder.embed("thermostat"), 5);
    assert_eq!(results.len(), 2);
  }
}
