// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Pipeline definitions, validation, and sequencing
//!
//! This module holds the core of cabinet: the parameter document model, the
//! schema validator, bind handling, command synthesis, and the sequencer.

pub mod binds;
pub mod command;
mod definition;
mod report;
pub mod schema;
mod sequencer;
mod validation;

pub use command::{build_command, flatten_options, render_command};
pub use definition::*;
pub use report::Reporter;
pub use sequencer::{RunSummary, Sequencer, StageRecord, StageState};
pub use validation::{ValidationResult, Validator};
