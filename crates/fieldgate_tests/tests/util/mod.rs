// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! In-process device simulators for the integration tests.

#![allow(dead_code)]

pub mod bacnet_sim;
pub mod modbus_sim;
pub mod rest_sim;
