// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! cabinet - containerized pipeline stage runner
//!
//! Validates a parameter document and runs its stages one at a time.

use clap::Parser;
use miette::Result;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cabinet::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Status stream goes to stderr so stage output on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cabinet=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    cabinet::cli::run::run(cli.parameter_json, cli.dryrun, cli.verbose).await
}
