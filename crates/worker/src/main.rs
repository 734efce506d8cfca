// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use nexus_worker::config::WorkerConfig;

#[tokio::main]
async fn main() {
    let config = WorkerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    if let Err(err) = nexus_worker::run(config).await {
        error!("fatal: {err:#}");
        std::process::exit(1);
    }
}
