// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Stage runners
//!
//! A [`StageRunner`] launches one synthesized command and reports a
//! [`StageOutcome`]. Failures never surface as errors: a runtime that cannot be
//! started and a container that exits non-zero are both just failed outcomes.

mod container;

pub use container::ContainerRunner;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One stage invocation handed to a runner
#[derive(Debug, Clone)]
pub struct StageInvocation<'a> {
    pub stage_name: &'a str,
    pub argv: &'a [String],
    /// Directory for the stage log; `None` inherits stdout/stderr
    pub log_directory: Option<&'a Path>,
    pub job_id: &'a str,
}

impl StageInvocation<'_> {
    /// `{log_directory}/{job_id}_{stage_name}.log`, when logging to files
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_directory
            .map(|dir| dir.join(format!("{}_{}.log", self.job_id, self.stage_name)))
    }
}

/// Result of running a stage
#[derive(Debug, Clone)]
pub struct StageOutcome {
    /// Whether the stage succeeded
    pub success: bool,

    /// Exit code, when the process ran and exited normally
    pub exit_code: Option<i32>,

    /// Why the stage failed, for the status stream only
    pub diagnostic: Option<String>,

    /// Log file the output went to
    pub log_file: Option<PathBuf>,

    /// Execution duration
    pub duration: Duration,
}

impl StageOutcome {
    /// Create a successful outcome
    pub fn success(duration: Duration) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            diagnostic: None,
            log_file: None,
            duration,
        }
    }

    /// Create a failed outcome
    pub fn failure(diagnostic: impl Into<String>, exit_code: Option<i32>, duration: Duration) -> Self {
        Self {
            success: false,
            exit_code,
            diagnostic: Some(diagnostic.into()),
            log_file: None,
            duration,
        }
    }

    pub fn with_log_file(mut self, log_file: Option<PathBuf>) -> Self {
        self.log_file = log_file;
        self
    }
}

/// Executes synthesized stage commands
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Run one stage to completion. Must not return before the child exits.
    async fn run(&self, invocation: &StageInvocation<'_>) -> StageOutcome;
}
