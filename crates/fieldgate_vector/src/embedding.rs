// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use fieldgate_descriptor::DeviceDescriptor;
use md5::{Digest, Md5};

/// Embedding dimension chosen at index initialization. Never changes for a
/// given index.
pub const DEFAULT_DIMENSION: usize = 128;

/// How much of a descriptor's raw document text participates in its summary.
const RAW_TEXT_PREFIX: usize = 1000;

/// Token-hashing text embedder.
///
/// Each word contributes weight 1.0 to one bucket and each word bigram
/// contributes 0.5 to another, with buckets picked by MD5. Texts sharing
/// vocabulary land in shared buckets, which is what cosine search needs;
/// there is no learned component and no network access.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
  dimension: usize,
}

impl HashEmbedder {
  pub fn new(dimension: usize) -> Self {
    Self { dimension }
  }

  pub fn dimension(&self) -> usize {
    self.dimension
  }

  pub fn embed(&self, text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; self.dimension];
    let tokens: Vec<String> = text
      .to_lowercase()
      .split(|c: char| !c.is_ascii_alphanumeric())
      .filter(|t| !t.is_empty())
      .map(|t| t.to_owned())
      .collect();
    for token in &tokens {
      vector[self.bucket(token)] += 1.0;
    }
    for pair in tokens.windows(2) {
      vector[self.bucket(&format!("{} {}", pair[0], pair[1]))] += 0.5;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
      for v in &mut vector {
        *v /= norm;
      }
    }
    vector
  }

  fn bucket(&self, token: &str) -> usize {
    let mut hasher = Md5::new();
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(head) % self.dimension as u64) as usize
  }
}

impl Default for HashEmbedder {
  fn default() -> Self {
    Self::new(DEFAULT_DIMENSION)
  }
}

/// Canonical text summary of a descriptor: identity, then parameters, then
/// errors, then troubleshooting, then a bounded prefix of the raw document.
/// This string is both the embedding input and the idempotency key.
pub fn descriptor_summary(descriptor: &DeviceDescriptor) -> String {
  let mut parts = Vec::new();
  parts.push(format!("Manufacturer: {}", descriptor.manufacturer()));
  parts.push(format!("Model: {}", descriptor.model()));
  parts.push(format!("Device type: {}", descriptor.device_type()));
  parts.push(format!("Protocol: {}", descriptor.protocol_name()));

  if !descriptor.parameters().is_empty() {
    parts.push("Parameters:".to_owned());
    for (name, parameter) in descriptor.parameters() {
      let mut line = format!("  - {name} ({})", parameter.kind());
      if !parameter.unit().is_empty() {
        line.push_str(&format!(" in {}", parameter.unit()));
      }
      parts.push(line);
    }
  }

  if !descriptor.error_codes().is_empty() {
    parts.push("Error codes:".to_owned());
    for (code, entry) in descriptor.error_codes() {
      parts.push(format!("  - {code}: {}", entry.description()));
    }
  }

  if !descriptor.troubleshooting_steps().is_empty() {
    parts.push("Troubleshooting:".to_owned());
    for step in descriptor.troubleshooting_steps() {
      parts.push(format!("  - {step}"));
    }
  }

  if !descriptor.raw_text().is_empty() {
    let prefix: String = descriptor.raw_text().chars().take(RAW_TEXT_PREFIX).collect();
    parts.push(format!("Documentation: {prefix}"));
  }

  parts.join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;
  use fieldgate_descriptor::builtin;

  #[test]
  fn embedding_is_deterministic_and_normalized() {
    let embedder = HashEmbedder::default();
    let a = embedder.embed("Honeywell T6 Pro thermostat BACnet");
    let b = embedder.embed("Honeywell T6 Pro thermostat BACnet");
    assert_eq!(a, b);
    assert_eq!(a.len(), DEFAULT_DIMENSION);
    let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5);
  }

  #[test]
  fn shared_vocabulary_scores_higher_than_disjoint() {
    let embedder = HashEmbedder::default();
    let thermostat = embedder.embed("Honeywell thermostat temperature setpoint");
    let similar = embedder.embed("Honeywell thermostat temperature control");
    let unrelated = embedder.embed("Schneider PLC register coil pump");
    let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    assert!(dot(&thermostat, &similar) > dot(&thermostat, &unrelated));
  }

  #[test]
  fn empty_text_embeds_to_zero() {
    let embedder = HashEmbedder::default();
    assert!(embedder.embed("").iter().all(|v| *v == 0.0));
  }

  #[test]
  fn summary_sections_appear_in_order() {
    let summary = descriptor_summary(&builtin::honeywell_t6_pro());
    let manufacturer = summary.find("Manufacturer:").unwrap();
    let parameters = summary.find("Parameters:").unwrap();
    let errors = summary.find("Error codes:").unwrap();
    let troubleshooting = summary.find("Troubleshooting:").unwrap();
    let documentation = summary.find("Documentation:").unwrap();
    assert!(manufacturer < parameters);
    assert!(parameters < errors);
    assert!(errors < troubleshooting);
    assert!(troubleshooting < documentation);
  }
}
