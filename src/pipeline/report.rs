// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Run-scoped status reporting
//!
//! Every status line of a run goes through one [`Reporter`], created for that
//! run and dropped with it. Messages are emitted inside a `run{job_id}` span.

use tracing::{error, info, info_span, warn, Span};

use crate::executors::StageOutcome;
use crate::pipeline::command::render_command;
use crate::pipeline::CabinetOptions;

/// Status reporter for a single run
#[derive(Debug, Clone)]
pub struct Reporter {
    verbose: bool,
    job_id: String,
}

impl Reporter {
    pub fn new(job_id: impl Into<String>, verbose: bool) -> Self {
        Self {
            verbose,
            job_id: job_id.into(),
        }
    }

    /// Reporter for the run described by `options`; `force_verbose` comes from the CLI
    pub fn for_run(options: &CabinetOptions, force_verbose: bool) -> Self {
        Self::new(options.job_id.clone(), options.verbose || force_verbose)
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Span wrapping everything logged during the run
    pub fn span(&self) -> Span {
        info_span!("run", job_id = %self.job_id)
    }

    pub fn stages_identified(&self, stages: &[String]) {
        info!("Identified stages to be run: {}", stages.join(", "));
    }

    pub fn stage_started(&self, stage: &str) {
        if self.verbose {
            info!("Now running stage: {}", stage);
        }
    }

    pub fn stage_command(&self, stage: &str, argv: &[String]) {
        if self.verbose {
            info!("Run command for {}: {}", stage, render_command(argv));
        }
    }

    pub fn stage_finished(&self, stage: &str, outcome: &StageOutcome) {
        let elapsed = outcome.duration.as_secs_f64();

        if outcome.success {
            info!(
                "{} finished. Time elapsed since {} started: {:.2}s",
                stage, stage, elapsed
            );
            return;
        }

        match outcome.diagnostic {
            Some(ref diagnostic) => error!("Error running {}: {}", stage, diagnostic),
            None => error!("Error running {}", stage),
        }
        if let Some(ref log_file) = outcome.log_file {
            error!("See {} for the output of {}", log_file.display(), stage);
        }
        error!(
            "{} failed. Time elapsed since {} started: {:.2}s",
            stage, stage, elapsed
        );
    }

    /// The run is ending early after `stage` failed
    pub fn run_stopped(&self, stage: &str, remaining: usize) {
        if remaining > 0 {
            warn!(
                "Stopping after {} failed; {} remaining stage(s) will not run",
                stage, remaining
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ContainerType, MissingHostPathPolicy};

    fn options(verbose: bool) -> CabinetOptions {
        CabinetOptions {
            container_type: ContainerType::Docker,
            stages: vec!["a".into()],
            verbose,
            log_directory: String::new(),
            job_id: "job-1".into(),
            handle_missing_host_paths: MissingHostPathPolicy::Stop,
            stop_on_stage_fail: true,
        }
    }

    #[test]
    fn test_verbosity_from_document_or_cli() {
        assert!(!Reporter::for_run(&options(false), false).is_verbose());
        assert!(Reporter::for_run(&options(true), false).is_verbose());
        assert!(Reporter::for_run(&options(false), true).is_verbose());
    }
}
