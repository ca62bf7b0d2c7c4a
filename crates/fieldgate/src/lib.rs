// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The gateway root.
//!
//! [`Gateway`] owns every component with explicit lifetime: the protocol
//! registry, descriptor store, vector index, model bundle, resolver,
//! connection manager, anomaly detector, and query dispatcher. Collaborators
//! receive handles; there is no process-wide state. The public methods are
//! the gateway's tool surface — the operations an operator console or an
//! external orchestrator drives.

mod gateway;

pub use gateway::{Gateway, GatewayBuilder, QueryOutcome, QueryResult};

pub use fieldgate_anomaly::{AnomalyReport, AnomalySummary, AnomalyType, Severity};
pub use fieldgate_core::{
  Deadline, Fingerprint, GatewayError, GatewayResult, ProtocolRegistry, Reading, Transport, TypedValue,
};
pub use fieldgate_descriptor::{DescriptorStore, DeviceDescriptor, builtin};
pub use fieldgate_server::{RawAddress, SessionState};
