// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Container runtime executor
//!
//! Launches `docker` or `singularity` with a prepared argument vector.

use async_trait::async_trait;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

use super::{StageInvocation, StageOutcome, StageRunner};
use crate::errors::CabinetError;
use crate::pipeline::ContainerType;
use crate::utils::create_spinner;

/// Runs stage commands as child processes
pub struct ContainerRunner {
    /// Show a spinner while output goes to a log file
    show_progress: bool,
}

impl ContainerRunner {
    /// Create a new container runner
    pub fn new() -> Self {
        Self { show_progress: true }
    }

    /// Never draw a spinner
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Open the stage log, returning stdout and stderr handles to the same file
    fn open_log(path: &Path) -> std::io::Result<(Stdio, Stdio)> {
        let file = File::create(path)?;
        let err = file.try_clone()?;
        Ok((Stdio::from(file), Stdio::from(err)))
    }

    fn spawn_diagnostic(program: &str, error: &std::io::Error) -> String {
        let runtime = match program {
            "docker" => Some(ContainerType::Docker),
            "singularity" => Some(ContainerType::Singularity),
            _ => None,
        };

        match (error.kind(), runtime) {
            (ErrorKind::NotFound, Some(runtime)) => format!(
                "'{}' could not be started: {}. {}",
                program,
                error,
                CabinetError::runtime_help(runtime)
            ),
            _ => format!("'{}' could not be started: {}", program, error),
        }
    }
}

impl Default for ContainerRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageRunner for ContainerRunner {
    async fn run(&self, invocation: &StageInvocation<'_>) -> StageOutcome {
        let start = Instant::now();

        let Some((program, args)) = invocation.argv.split_first() else {
            return StageOutcome::failure("empty command", None, start.elapsed());
        };

        let log_file = invocation.log_file();

        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(ref path) = log_file {
            match Self::open_log(path) {
                Ok((stdout, stderr)) => {
                    cmd.stdout(stdout).stderr(stderr);
                }
                Err(e) => {
                    return StageOutcome::failure(
                        format!("Failed to open log file {}: {}", path.display(), e),
                        None,
                        start.elapsed(),
                    );
                }
            }
        }

        let spinner = log_file
            .as_ref()
            .filter(|_| self.show_progress)
            .map(|path| {
                create_spinner(&format!(
                    "{} (logging to {})",
                    invocation.stage_name,
                    path.display()
                ))
            });

        let status = cmd.status().await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        // The command owns the log handles; dropping it closes the file.
        drop(cmd);

        let duration = start.elapsed();
        let outcome = match status {
            Ok(status) if status.success() => StageOutcome::success(duration),
            Ok(status) => {
                let diagnostic = match status.code() {
                    Some(code) => format!("'{}' exited with status {}", program, code),
                    None => format!("'{}' was terminated by a signal", program),
                };
                StageOutcome::failure(diagnostic, status.code(), duration)
            }
            Err(e) => StageOutcome::failure(Self::spawn_diagnostic(program, &e), None, duration),
        };

        outcome.with_log_file(log_file)
    }
}
