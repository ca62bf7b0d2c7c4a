// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Modbus/TCP protocol client.
//!
//! [`frame`] is the pure codec: MBAP headers, request/response PDUs for
//! function codes 0x01-0x06, logical-to-wire address translation, and the
//! two-register scaled float convention. [`ModbusClient`] owns the TCP
//! stream and the session-local transaction counter.

pub mod frame;
mod client;

pub use client::{ModbusClient, ModbusConnector};
