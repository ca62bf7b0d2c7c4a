// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The learned "truth" about device models.
//!
//! A [`DeviceDescriptor`] is what the gateway knows about one device model:
//! its parameters with documentation-derived ranges, its error-code table,
//! troubleshooting text, and maintenance schedule, plus a protocol-specific
//! addressing extension (Modbus register map, BACnet object map, or REST
//! endpoint map). Descriptors come out of the ingestion pipeline or the
//! built-in corpus, are validated on construction, and live in a
//! [`DescriptorStore`] that persists one deterministic JSON file per
//! descriptor.

pub mod builtin;
mod descriptor;
mod parameter;
mod store;

pub use descriptor::{DeviceDescriptor, ErrorCode, ObjectRef, ProtocolExtension, RegisterEntry};
pub use parameter::{Addressing, Interval, ObjectType, ParameterSpec, ValueKind};
pub use store::DescriptorStore;
