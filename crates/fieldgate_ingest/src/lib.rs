// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Documentation ingestion: vendor document → [`DeviceDescriptor`].
//!
//! The pipeline is text extraction (layout-preserving PDF extractor with a
//! simpler fallback, plain text passthrough) followed by regex structuring
//! into identity, parameters, error table, troubleshooting text, and
//! maintenance schedule. Ingestion is deterministic for a given input and
//! never invents parameters the document does not support; a document that
//! leaves fields unknown produces a descriptor marked partial.

mod extract;
mod structurer;

use fieldgate_core::errors::GatewayResult;
use fieldgate_descriptor::DeviceDescriptor;
use std::path::Path;

pub use extract::extract_text;
pub use structurer::structure_text;

/// Ingest one document from disk.
pub fn ingest_document(path: &Path) -> GatewayResult<DeviceDescriptor> {
  let text = extract::extract_text(path)?;
  structurer::structure_text(&text)
}
