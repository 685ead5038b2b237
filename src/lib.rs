// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! # cabinet - containerized pipeline stage runner
//!
//! `cabinet` reads a parameter document describing a list of stages, checks
//! it against its option schema, and runs every requested stage through
//! Docker or Singularity, strictly in order.
//!
//! ## Quick Start
//!
//! ```bash
//! # Validate and show the commands that would run
//! cabinet params.json --dryrun
//!
//! # Run every stage listed in cabinet.stages
//! cabinet params.json
//! ```
//!
//! ## Parameter document
//!
//! ```json
//! {
//!   "cabinet": {
//!     "container_type": "docker",
//!     "stages": ["echo"],
//!     "log_directory": "logs"
//!   },
//!   "stages": {
//!     "echo": {
//!       "image_name": "alpine",
//!       "positional_args": ["echo", "hi"]
//!     }
//!   }
//! }
//! ```

pub mod cli;
pub mod errors;
pub mod executors;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use errors::{CabinetError, CabinetResult};
pub use executors::{ContainerRunner, StageOutcome, StageRunner};
pub use pipeline::{Sequencer, StageSpec, ValidatedConfig, Validator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
