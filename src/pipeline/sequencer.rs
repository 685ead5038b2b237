// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Stage sequencer
//!
//! Runs the requested stages strictly one after another, in declared order.

use std::time::{Duration, Instant};

use tracing::Instrument;

use crate::executors::{StageInvocation, StageOutcome, StageRunner};
use crate::pipeline::command::build_command;
use crate::pipeline::{Reporter, ValidatedConfig};

/// Lifecycle of one stage within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// What happened to one entry of `cabinet.stages`
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub name: String,
    pub state: StageState,
    /// `None` while the stage never ran
    pub outcome: Option<StageOutcome>,
}

impl StageRecord {
    fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: StageState::Pending,
            outcome: None,
        }
    }
}

/// Result of a whole run
#[derive(Debug)]
pub struct RunSummary {
    /// Whether every stage that ran succeeded and none were cut off
    pub success: bool,
    /// One record per requested stage, in order
    pub stages: Vec<StageRecord>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn failed(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages.iter().filter(|s| s.state == StageState::Failed)
    }

    pub fn not_run(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages.iter().filter(|s| s.state == StageState::Pending)
    }
}

/// Sequential stage executor
pub struct Sequencer<'a> {
    runner: &'a dyn StageRunner,
    reporter: Reporter,
}

impl<'a> Sequencer<'a> {
    pub fn new(runner: &'a dyn StageRunner, reporter: Reporter) -> Self {
        Self { runner, reporter }
    }

    /// Run every requested stage.
    ///
    /// With `stop_on_stage_fail` the run ends at the first failure and the
    /// remaining stages stay [`StageState::Pending`].
    pub async fn run(&self, config: &ValidatedConfig) -> RunSummary {
        let span = self.reporter.span();
        self.run_stages(config).instrument(span).await
    }

    async fn run_stages(&self, config: &ValidatedConfig) -> RunSummary {
        let start = Instant::now();
        let cabinet = &config.cabinet;

        let mut records: Vec<StageRecord> =
            cabinet.stages.iter().map(|name| StageRecord::pending(name)).collect();
        let mut success = true;

        for idx in 0..records.len() {
            let name = records[idx].name.clone();
            records[idx].state = StageState::Running;

            let outcome = self.run_stage(&name, config).await;
            let failed = !outcome.success;

            records[idx].state = if failed {
                StageState::Failed
            } else {
                StageState::Succeeded
            };
            records[idx].outcome = Some(outcome);

            if failed {
                success = false;
                if cabinet.stop_on_stage_fail {
                    self.reporter.run_stopped(&name, records.len() - idx - 1);
                    break;
                }
            }
        }

        RunSummary {
            success,
            stages: records,
            duration: start.elapsed(),
        }
    }

    async fn run_stage(&self, name: &str, config: &ValidatedConfig) -> StageOutcome {
        let start = Instant::now();
        self.reporter.stage_started(name);

        let Some(stage) = config.stage(name) else {
            let outcome = StageOutcome::failure(
                format!("no parameters for stage '{}'", name),
                None,
                start.elapsed(),
            );
            self.reporter.stage_finished(name, &outcome);
            return outcome;
        };

        let argv = build_command(stage);
        self.reporter.stage_command(name, &argv);

        let invocation = StageInvocation {
            stage_name: name,
            argv: &argv,
            log_directory: config.cabinet.log_directory(),
            job_id: &config.cabinet.job_id,
        };

        let mut outcome = self.runner.run(&invocation).await;
        outcome.duration = start.elapsed();

        self.reporter.stage_finished(name, &outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{
        Action, CabinetOptions, ContainerTarget, ContainerType, MissingHostPathPolicy, OptionMap,
        StageSpec,
    };
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records every invocation and fails the configured stages
    struct RecordingRunner {
        fail: HashSet<String>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl RecordingRunner {
        fn failing(names: &[&str]) -> Self {
            Self {
                fail: names.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn called(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
        }
    }

    #[async_trait]
    impl StageRunner for RecordingRunner {
        async fn run(&self, invocation: &StageInvocation<'_>) -> StageOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((invocation.stage_name.to_string(), invocation.argv.to_vec()));

            if self.fail.contains(invocation.stage_name) {
                StageOutcome::failure("stub failure", Some(1), Duration::ZERO)
            } else {
                StageOutcome::success(Duration::ZERO)
            }
        }
    }

    fn config(stages: &[&str], stop_on_stage_fail: bool) -> ValidatedConfig {
        let mut specs = IndexMap::new();
        for name in stages {
            specs.insert(
                name.to_string(),
                StageSpec {
                    action: Action::Run,
                    positional_args: vec![name.to_string()],
                    flags: OptionMap::new(),
                    container_args: OptionMap::new(),
                    target: ContainerTarget::Docker {
                        image_name: "alpine".into(),
                        mounts: vec![],
                    },
                },
            );
        }

        ValidatedConfig {
            cabinet: CabinetOptions {
                container_type: ContainerType::Docker,
                stages: stages.iter().map(|s| s.to_string()).collect(),
                verbose: false,
                log_directory: String::new(),
                job_id: "test".into(),
                handle_missing_host_paths: MissingHostPathPolicy::Stop,
                stop_on_stage_fail,
            },
            stages: specs,
        }
    }

    fn reporter() -> Reporter {
        Reporter::new("test", false)
    }

    #[tokio::test]
    async fn test_all_stages_succeed() {
        let runner = RecordingRunner::failing(&[]);
        let summary = Sequencer::new(&runner, reporter())
            .run(&config(&["A", "B", "C"], true))
            .await;

        assert!(summary.success);
        assert_eq!(runner.called(), vec!["A", "B", "C"]);
        assert!(summary.stages.iter().all(|s| s.state == StageState::Succeeded));
    }

    #[tokio::test]
    async fn test_stop_on_stage_fail_skips_remaining() {
        let runner = RecordingRunner::failing(&["A"]);
        let summary = Sequencer::new(&runner, reporter())
            .run(&config(&["A", "B", "C"], true))
            .await;

        assert!(!summary.success);
        assert_eq!(runner.called(), vec!["A"]);
        assert_eq!(summary.failed().count(), 1);

        let not_run: Vec<_> = summary.not_run().map(|s| s.name.as_str()).collect();
        assert_eq!(not_run, vec!["B", "C"]);
        assert!(summary.not_run().all(|s| s.outcome.is_none()));
    }

    #[tokio::test]
    async fn test_continue_after_failure() {
        let runner = RecordingRunner::failing(&["A"]);
        let summary = Sequencer::new(&runner, reporter())
            .run(&config(&["A", "B", "C"], false))
            .await;

        assert!(!summary.success);
        assert_eq!(runner.called(), vec!["A", "B", "C"]);
        assert_eq!(summary.stages[0].state, StageState::Failed);
        assert_eq!(summary.stages[1].state, StageState::Succeeded);
        assert_eq!(summary.stages[2].state, StageState::Succeeded);
    }

    #[tokio::test]
    async fn test_middle_failure_with_continue_still_fails_run() {
        let runner = RecordingRunner::failing(&["B"]);
        let summary = Sequencer::new(&runner, reporter())
            .run(&config(&["A", "B", "C"], false))
            .await;

        assert!(!summary.success);
        assert_eq!(runner.called(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_runner_receives_synthesized_command() {
        let runner = RecordingRunner::failing(&[]);
        Sequencer::new(&runner, reporter())
            .run(&config(&["echo"], true))
            .await;

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].1, vec!["docker", "run", "alpine", "echo"]);
    }

    #[tokio::test]
    async fn test_repeated_stage_runs_each_time() {
        let runner = RecordingRunner::failing(&[]);
        let mut cfg = config(&["A"], true);
        cfg.cabinet.stages = vec!["A".into(), "A".into()];

        let summary = Sequencer::new(&runner, reporter()).run(&cfg).await;
        assert!(summary.success);
        assert_eq!(runner.called(), vec!["A", "A"]);
        assert_eq!(summary.stages.len(), 2);
    }
}
