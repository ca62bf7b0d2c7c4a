// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

mod options;

use anyhow::{Context, bail};
use fieldgate::Gateway;
use fieldgate_ml::ModelBundle;
use options::{Command, FieldgateArgs, IngestArgs, ServeArgs};
use std::path::Path;
use tokio::signal::ctrl_c;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn setup_logging(level: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer())
    .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let args: FieldgateArgs = argh::from_env();
  if args.version {
    println!("fieldgate {VERSION}");
    return Ok(());
  }
  setup_logging(&args.log);

  match args.command {
    Some(Command::Serve(serve)) => run_serve(serve).await,
    Some(Command::Ingest(ingest)) => run_ingest(ingest).await,
    None => bail!("no command given; try `fieldgate serve` or `fieldgate ingest <path>`"),
  }
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
  info!("fieldgate {VERSION} starting");
  let storage_dir = Path::new(args.storage_dir());
  if args.write_default_models() {
    ModelBundle::write_defaults(&storage_dir.join("models")).context("cannot write default models")?;
    info!("wrote default model weights to {}", storage_dir.join("models").display());
  }

  let gateway = Gateway::builder()
    .storage_dir(storage_dir)
    .default_connectors()
    .finish()
    .await
    .context("gateway startup failed")?;

  info!(
    "listening on {}:{} (operator) / {}:{} (orchestrator)",
    args.host(),
    args.listen_port(),
    args.host(),
    args.mcp_port()
  );
  info!(
    "field ports: bacnet {} (udp), modbus {} (tcp); discovery {} ms × {} attempts",
    args.bacnet_port(),
    args.modbus_port(),
    args.discovery_timeout_ms(),
    args.max_discovery_attempts()
  );
  for spec in gateway.registry().all() {
    info!(
      "protocol {}: {} port {}, timeout {:?}, {} retries",
      spec.name(),
      spec.transport(),
      spec.default_port(),
      spec.request_timeout(),
      spec.retry_attempts()
    );
  }
  let stats = gateway.index_stats().await;
  info!(
    "{} descriptors, vector index dimension {} with {} records",
    gateway.store().len(),
    stats.dimension(),
    stats.count()
  );
  for model in gateway.model_info() {
    if model.loaded() {
      info!(
        "model {}: {}→{} ({} bytes)",
        model.name(),
        model.input_size(),
        model.output_size(),
        model.size_bytes()
      );
    } else {
      info!("model {}: not present, rule path active", model.name());
    }
  }

  info!("gateway ready; ctrl-c to stop");
  ctrl_c().await.context("signal handler failed")?;
  info!("shutting down");
  Ok(())
}

async fn run_ingest(args: IngestArgs) -> anyhow::Result<()> {
  let gateway = Gateway::builder()
    .storage_dir(Path::new(args.storage_dir()))
    .seed_builtins(false)
    .finish()
    .await
    .context("gateway startup failed")?;

  match gateway.ingest_document(Path::new(args.path())).await {
    Ok(descriptor) => {
      println!(
        "accepted {}: {} {} ({}, {} parameters, {} error codes{})",
        descriptor.device_id(),
        descriptor.manufacturer(),
        descriptor.model(),
        descriptor.protocol_name(),
        descriptor.parameters().len(),
        descriptor.error_codes().len(),
        if descriptor.partial() { ", partial" } else { "" }
      );
      Ok(())
    }
    Err(e) => bail!("rejected {}: {e}", args.path()),
  }
}
