// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! CLI definition and handlers
//!
//! Defines the command-line interface for cabinet.

pub mod run;

use clap::Parser;
use std::fs::File;
use std::path::PathBuf;

use crate::pipeline::DocumentFormat;

/// Sequential runner for containerized pipeline stages
///
/// Validates a parameter document and runs each requested stage through
/// Docker or Singularity, one at a time.
#[derive(Parser, Debug)]
#[clap(
    name = "cabinet",
    version,
    about = "Run containerized pipeline stages described by a parameter document",
    long_about = None,
    after_help = "Examples:\n\
        cabinet params.json              Validate and run every requested stage\n\
        cabinet params.json --dryrun     Validate only and show the stage commands\n\n\
        Set RUST_LOG=cabinet=debug for more detail on the status stream."
)]
pub struct Cli {
    /// Path to an existing, readable parameter document (.json, .yaml, .yml, .toml)
    #[clap(value_parser = parse_parameter_path, env = "CABINET_PARAMETER_JSON")]
    pub parameter_json: PathBuf,

    /// Validate the parameter document without running any stage
    #[clap(long)]
    pub dryrun: bool,

    /// Enable verbose output (same as `cabinet.verbose: true`)
    #[clap(short, long)]
    pub verbose: bool,
}

/// Accept only readable files with a recognized structured-data extension
pub fn parse_parameter_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);

    if DocumentFormat::from_path(&path).is_none() {
        return Err(format!(
            "{} is not a path to a readable .json, .yaml, .yml or .toml file",
            value
        ));
    }

    if !path.is_file() || File::open(&path).is_err() {
        return Err(format!("{} is not a path to a readable file", value));
    }

    Ok(path)
}
