// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! REST/HTTP protocol client.
//!
//! Reads map to `GET base_url + path`, writes to `POST` with a small
//! `{"value": …}` body. JSON responses decode into typed values,
//! `text/plain` is tolerated, and non-2xx statuses surface as protocol
//! exceptions. Redirects and keep-alive are the HTTP library's business.

mod client;

pub use client::{AuthMode, RestClient, RestConnector};
