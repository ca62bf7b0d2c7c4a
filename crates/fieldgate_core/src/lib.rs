// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Core types shared across the Fieldgate gateway.
//!
//! This crate carries the pieces every other layer speaks in: the error
//! taxonomy, typed parameter values, device fingerprints, operation deadlines,
//! and the immutable [`ProtocolRegistry`](protocol_spec::ProtocolRegistry)
//! that the protocol clients are parameterized over. Nothing in here performs
//! I/O; the heavier layers (descriptor store, protocol clients, anomaly
//! detection) build on these types.

pub mod deadline;
pub mod errors;
pub mod fingerprint;
pub mod protocol_spec;
pub mod util;
pub mod value;

pub use deadline::Deadline;
pub use errors::{GatewayError, GatewayResult};
pub use fingerprint::{Fingerprint, Transport};
pub use protocol_spec::{DiscoveryMethod, ProtocolRegistry, ProtocolSpec};
pub use value::{Reading, TypedValue};
