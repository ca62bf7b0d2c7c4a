// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Edge-sized models for the gateway.
//!
//! Three fixed-weight linear models run on-device: an intent classifier
//! (64 features → 8 classes), a device-type classifier (16 features → 5
//! classes), and an anomaly scorer (32 features → 1 scalar). Together they
//! fit in well under 8 KB and load from local `.fgm` files with no network
//! access. A missing model file is not an error: every consumer has a
//! deterministic rule path that produces the same decisions for the golden
//! inputs.

mod bundle;
pub mod features;
mod model;

pub use bundle::{DeviceClass, IntentClass, ModelBundle, ModelInfo};
pub use model::{LinearModel, ModelError, softmax};
