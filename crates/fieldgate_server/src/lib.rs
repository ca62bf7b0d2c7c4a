// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Session handling, device resolution, and query planning.
//!
//! This crate owns the runtime side of the gateway: the
//! [`ConnectionManager`] drives every [`DeviceSession`] through its state
//! machine and serializes operations per session, the [`DeviceResolver`]
//! turns fingerprints into descriptors via the coarse classifier and the
//! vector index, and the [`QueryDispatcher`] turns operator text into an
//! ordered operation plan. Protocol clients plug in through the traits in
//! [`transport`]; the concrete REST/BACnet/Modbus clients live in their own
//! crates and are registered by the gateway root at startup.

mod connection_manager;
mod dispatcher;
mod resolver;
mod session;
pub mod transport;

pub use connection_manager::ConnectionManager;
pub use dispatcher::{Intent, PlanOperation, Plan, QueryDispatcher, SessionCandidate};
pub use resolver::DeviceResolver;
pub use session::{DeviceSession, ReadingRecord, SessionState};
pub use transport::{ProbeInfo, ProtocolClient, ProtocolConnector, RawAddress};
