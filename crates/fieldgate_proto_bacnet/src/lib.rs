// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! BACnet/IP protocol client.
//!
//! [`frame`] carries the bit-accurate frame layer: BVLC framing, the NPDU,
//! and the APDU encodings for Who-Is/I-Am discovery and confirmed
//! ReadProperty/WriteProperty with their acknowledgements. [`BacnetClient`]
//! owns the UDP socket and the session-local invoke-id counter.

pub mod frame;
mod client;

pub use client::{BacnetClient, BacnetConnector};
