// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use fieldgate_core::errors::{GatewayError, GatewayResult, ValidationError};
use std::path::Path;
use tracing::{info, warn};

/// Below this yield the layout-preserving extractor is considered to have
/// failed and the simpler one runs.
const FALLBACK_THRESHOLD: usize = 100;
/// Below this final yield the document is rejected outright.
const YIELD_FLOOR: usize = 50;

fn reject(message: String) -> GatewayError {
  GatewayError::Validation(ValidationError::InvariantViolation(message))
}

/// Extract the text of a vendor document. PDFs go through a layout-preserving
/// extractor first, then a page-by-page fallback; `.txt` and `.md` files are
/// read as-is. No network access in any path.
pub fn extract_text(path: &Path) -> GatewayResult<String> {
  let extension = path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| e.to_lowercase())
    .unwrap_or_default();

  let text = match extension.as_str() {
    "txt" | "md" | "text" => std::fs::read_to_string(path)
      .map_err(|e| reject(format!("cannot read document {}: {e}", path.display())))?,
    "pdf" => extract_pdf(path)?,
    other => {
      return Err(reject(format!(
        "unsupported document type \".{other}\" for {}",
        path.display()
      )));
    }
  };

  if text.chars().count() < YIELD_FLOOR {
    return Err(reject(format!(
      "could not extract meaningful text from {} ({} chars)",
      path.display(),
      text.chars().count()
    )));
  }
  Ok(text)
}

fn extract_pdf(path: &Path) -> GatewayResult<String> {
  // Layout-preserving extractor first.
  let mut text = match pdf_extract::extract_text(path) {
    Ok(text) => {
      info!("extracted {} chars (layout-preserving)", text.chars().count());
      text
    }
    Err(e) => {
      warn!("layout-preserving extraction failed for {}: {e}", path.display());
      String::new()
    }
  };

  // Page-by-page fallback when the first pass came up short.
  if text.chars().count() < FALLBACK_THRESHOLD {
    match extract_pdf_fallback(path) {
      Ok(fallback) if fallback.chars().count() > text.chars().count() => {
        info!("extracted {} chars (fallback)", fallback.chars().count());
        text = fallback;
      }
      Ok(_) => {}
      Err(e) => warn!("fallback extraction failed for {}: {e}", path.display()),
    }
  }

  Ok(text)
}

fn extract_pdf_fallback(path: &Path) -> Result<String, lopdf::Error> {
  let document = lopdf::Document::load(path)?;
  let pages: Vec<u32> = document.get_pages().keys().copied().collect();
  document.extract_text(&pages)
}
