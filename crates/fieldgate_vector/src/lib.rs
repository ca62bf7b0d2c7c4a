// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Dense embeddings and cosine-similarity search over device descriptors.
//!
//! The embedder is deterministic and fully offline: words and word bigrams
//! are hashed into a fixed number of buckets and the resulting vector is
//! L2-normalized. Re-embedding the same text always yields the same vector,
//! which is what makes index insertion idempotent. The index persists to a
//! single little-endian file and reloads bit-identically.

mod embedding;
mod index;

pub use embedding::{DEFAULT_DIMENSION, HashEmbedder, descriptor_summary};
pub use index::{EmbeddingRecord, IndexStats, VectorIndex};
