// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use argh::FromArgs;
use getset::{CopyGetters, Getters};

/// edge-to-cloud industrial protocol gateway.
#[derive(FromArgs)]
pub struct FieldgateArgs {
  /// print version and exit.
  #[argh(switch)]
  pub version: bool,

  /// set log level for output (trace, debug, info, warn, error).
  #[argh(option, default = "\"info\".to_owned()")]
  pub log: String,

  #[argh(subcommand)]
  pub command: Option<Command>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
pub enum Command {
  Serve(ServeArgs),
  Ingest(IngestArgs),
}

/// start the gateway and serve until interrupted.
#[derive(FromArgs, Getters, CopyGetters)]
#[argh(subcommand, name = "serve")]
pub struct ServeArgs {
  /// interface to bind operator-facing servers on.
  #[argh(option, default = "\"0.0.0.0\".to_owned()")]
  #[getset(get = "pub")]
  host: String,

  /// operator/dashboard port.
  #[argh(option, default = "8000")]
  #[getset(get_copy = "pub")]
  listen_port: u16,

  /// orchestrator (tool surface) port.
  #[argh(option, default = "3000")]
  #[getset(get_copy = "pub")]
  mcp_port: u16,

  /// port for BACnet/IP.
  #[argh(option, default = "47808")]
  #[getset(get_copy = "pub")]
  bacnet_port: u16,

  /// port for Modbus/TCP.
  #[argh(option, default = "502")]
  #[getset(get_copy = "pub")]
  modbus_port: u16,

  /// discovery timeout in milliseconds.
  #[argh(option, default = "10000")]
  #[getset(get_copy = "pub")]
  discovery_timeout_ms: u64,

  /// discovery retry budget.
  #[argh(option, default = "3")]
  #[getset(get_copy = "pub")]
  max_discovery_attempts: u32,

  /// directory for descriptors, the vector index, and model files.
  #[argh(option, default = "\"fieldgate-data\".to_owned()")]
  #[getset(get = "pub")]
  storage_dir: String,

  /// write the shipped model weights into the storage dir before starting.
  #[argh(switch)]
  #[getset(get_copy = "pub")]
  write_default_models: bool,
}

/// ingest one vendor document and report whether it was accepted.
#[derive(FromArgs, Getters)]
#[argh(subcommand, name = "ingest")]
pub struct IngestArgs {
  /// path to the document (.pdf or .txt).
  #[argh(positional)]
  #[getset(get = "pub")]
  path: String,

  /// directory for descriptors, the vector index, and model files.
  #[argh(option, default = "\"fieldgate-data\".to_owned()")]
  #[getset(get = "pub")]
  storage_dir: String,
}
