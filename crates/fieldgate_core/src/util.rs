// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use md5::{Digest, Md5};

/// Hex MD5 digest of a text blob. Used as the idempotency key for embeddings
/// and as the fingerprint cache key; not a security boundary.
pub fn text_digest(text: &str) -> String {
  let mut hasher = Md5::new();
  hasher.update(text.as_bytes());
  let digest = hasher.finalize();
  let mut out = String::with_capacity(32);
  for byte in digest {
    out.push_str(&format!("{byte:02x}"));
  }
  out
}

/// Raw 16-byte MD5 digest, for callers that persist the digest verbatim.
pub fn raw_digest(text: &str) -> [u8; 16] {
  let mut hasher = Md5::new();
  hasher.update(text.as_bytes());
  hasher.finalize().into()
}
