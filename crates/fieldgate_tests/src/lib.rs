// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Integration tests for the fieldgate workspace live in `tests/`; the
//! in-process device simulators they drive are under `tests/util/`.
