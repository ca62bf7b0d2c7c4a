// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::errors::{GatewayError, GatewayResult};
use std::future::Future;
use std::time::{Duration, Instant};

/// Caller-supplied deadline for one blocking operation.
///
/// A deadline bounds exactly one call: expiry fails that call with
/// [`GatewayError::Cancelled`] and leaves the session itself untouched. A
/// zero-duration deadline is already expired and fails before any I/O is
/// issued.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
  expires_at: Option<Instant>,
}

impl Deadline {
  /// Deadline `timeout` from now.
  pub fn after(timeout: Duration) -> Self {
    Self {
      expires_at: Some(Instant::now() + timeout),
    }
  }

  /// Unbounded; used by callers that manage their own timing.
  pub fn unbounded() -> Self {
    Self { expires_at: None }
  }

  pub fn expired(&self) -> bool {
    self
      .expires_at
      .map(|at| Instant::now() >= at)
      .unwrap_or(false)
  }

  /// Time left, `None` when unbounded.
  pub fn remaining(&self) -> Option<Duration> {
    self.expires_at.map(|at| at.saturating_duration_since(Instant::now()))
  }

  /// Run `fut` under this deadline. Checks expiry before polling, so an
  /// already-expired deadline never reaches the transport.
  pub async fn bound<T, F>(&self, fut: F) -> GatewayResult<T>
  where
    F: Future<Output = GatewayResult<T>>,
  {
    match self.remaining() {
      None => fut.await,
      Some(left) if left.is_zero() => Err(GatewayError::Cancelled),
      Some(left) => match tokio::time::timeout(left, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Cancelled),
      },
    }
  }
}
