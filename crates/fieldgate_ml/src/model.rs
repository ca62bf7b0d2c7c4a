// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use displaydoc::Display;
use getset::{CopyGetters, Getters};
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;

/// `.fgm` file magic: "FGM" + format version 1.
const MODEL_MAGIC: [u8; 4] = *b"FGM1";

#[derive(Debug, Error, Display)]
pub enum ModelError {
  /// Model file I/O error: {0}
  Io(#[from] std::io::Error),
  /// Not a model file (bad magic)
  BadMagic,
  /// Model dimensions do not match payload length
  SizeMismatch,
}

/// A single dense linear layer, `y = Wx + b`.
///
/// Inference pads or truncates the input to `input_size`, so feature
/// extraction bugs degrade instead of panicking.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct LinearModel {
  #[getset(get = "pub")]
  name: String,
  #[getset(get_copy = "pub")]
  input_size: usize,
  #[getset(get_copy = "pub")]
  output_size: usize,
  /// Row-major `output_size × input_size`.
  weights: Vec<f32>,
  bias: Vec<f32>,
}

impl LinearModel {
  pub fn new(
    name: &str,
    input_size: usize,
    output_size: usize,
    weights: Vec<f32>,
    bias: Vec<f32>,
  ) -> Result<Self, ModelError> {
    if weights.len() != input_size * output_size || bias.len() != output_size {
      return Err(ModelError::SizeMismatch);
    }
    Ok(Self {
      name: name.to_owned(),
      input_size,
      output_size,
      weights,
      bias,
    })
  }

  pub fn predict(&self, inputs: &[f32]) -> Vec<f32> {
    let mut padded;
    let inputs = if inputs.len() == self.input_size {
      inputs
    } else {
      padded = vec![0.0; self.input_size];
      let n = inputs.len().min(self.input_size);
      padded[..n].copy_from_slice(&inputs[..n]);
      &padded[..]
    };
    let mut output = self.bias.clone();
    for (row, out) in output.iter_mut().enumerate() {
      let weights = &self.weights[row * self.input_size..(row + 1) * self.input_size];
      *out += weights.iter().zip(inputs).map(|(w, x)| w * x).sum::<f32>();
    }
    output
  }

  /// Parameter storage size in bytes (4 bytes per f32), for the startup
  /// banner and the ≤8 KB budget check.
  pub fn size_bytes(&self) -> usize {
    (self.weights.len() + self.bias.len()) * 4
  }

  pub fn save(&self, path: &Path) -> Result<(), ModelError> {
    let mut out = Vec::with_capacity(12 + self.size_bytes());
    out.extend_from_slice(&MODEL_MAGIC);
    out.write_u32::<LittleEndian>(self.input_size as u32)?;
    out.write_u32::<LittleEndian>(self.output_size as u32)?;
    for w in &self.weights {
      out.write_f32::<LittleEndian>(*w)?;
    }
    for b in &self.bias {
      out.write_f32::<LittleEndian>(*b)?;
    }
    std::fs::write(path, out)?;
    Ok(())
  }

  pub fn load(name: &str, path: &Path) -> Result<Self, ModelError> {
    let bytes = std::fs::read(path)?;
    let mut cursor = Cursor::new(bytes);
    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if magic != MODEL_MAGIC {
      return Err(ModelError::BadMagic);
    }
    let input_size = cursor.read_u32::<LittleEndian>()? as usize;
    let output_size = cursor.read_u32::<LittleEndian>()? as usize;
    let mut weights = vec![0.0f32; input_size * output_size];
    cursor.read_f32_into::<LittleEndian>(&mut weights)?;
    let mut bias = vec![0.0f32; output_size];
    cursor.read_f32_into::<LittleEndian>(&mut bias)?;
    // Trailing bytes mean a corrupt or mislabeled file.
    if cursor.position() != cursor.get_ref().len() as u64 {
      return Err(ModelError::SizeMismatch);
    }
    Self::new(name, input_size, output_size, weights, bias)
  }
}

/// Numerically stable softmax.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
  let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|e| e / sum).collect()
}

/// Logistic squash used by the scalar anomaly scorer.
pub(crate) fn logistic(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn predict_is_a_plain_affine_map() {
    let model = LinearModel::new("t", 2, 2, vec![1.0, 0.0, 0.0, 2.0], vec![0.5, -0.5]).unwrap();
    assert_eq!(model.predict(&[3.0, 4.0]), vec![3.5, 7.5]);
  }

  #[test]
  fn short_input_is_zero_padded() {
    let model = LinearModel::new("t", 3, 1, vec![1.0, 1.0, 1.0], vec![0.0]).unwrap();
    assert_eq!(model.predict(&[2.0]), vec![2.0]);
    assert_eq!(model.predict(&[2.0, 1.0, 1.0, 9.0]), vec![4.0]);
  }

  #[test]
  fn mismatched_dimensions_rejected() {
    assert!(LinearModel::new("t", 2, 2, vec![0.0; 3], vec![0.0; 2]).is_err());
    assert!(LinearModel::new("t", 2, 2, vec![0.0; 4], vec![0.0; 1]).is_err());
  }

  #[test]
  fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scorer.fgm");
    let model = LinearModel::new("scorer", 4, 2, (0..8).map(|i| i as f32).collect(), vec![0.25, -0.25]).unwrap();
    model.save(&path).unwrap();
    let loaded = LinearModel::load("scorer", &path).unwrap();
    assert_eq!(loaded, model);
  }

  #[test]
  fn garbage_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bogus.fgm");
    std::fs::write(&path, b"not a model").unwrap();
    assert!(matches!(LinearModel::load("bogus", &path), Err(ModelError::BadMagic)));
  }

  #[test]
  fn softmax_sums_to_one() {
    let probs = softmax(&[1.0, 2.0, 3.0]);
    assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    assert!(probs[2] > probs[1] && probs[1] > probs[0]);
  }
}
