// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Run command - validate the parameter document, then run its stages

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::errors::CabinetError;
use crate::executors::{ContainerRunner, StageInvocation};
use crate::pipeline::{
    build_command, render_command, ConfigDocument, Reporter, RunSummary, Sequencer,
    ValidatedConfig, ValidationResult, Validator,
};
use crate::utils::{
    print_detail, print_error, print_header, print_numbered, print_success, print_warning,
};

/// Validate `parameter_json` and, unless `dryrun`, run every requested stage.
///
/// Validation failures are returned as errors; a failed stage is reported
/// through the exit code.
pub async fn run(parameter_json: PathBuf, dryrun: bool, verbose: bool) -> Result<ExitCode> {
    let start = Instant::now();

    info!("Getting arguments from parameter document: {}", parameter_json.display());
    let document = ConfigDocument::from_file(&parameter_json)?;

    info!("Validating parameter document");
    let validation = Validator::new().validate(document.root);
    log_validation(&validation);

    let validated_document = validation.document.clone();
    let config = match validation.into_config(&parameter_json) {
        Ok(config) => config,
        Err(e) => {
            error!(
                "Parameter document {} is invalid. No stage was started.",
                parameter_json.display()
            );
            return Err(e.into());
        }
    };

    let reporter = Reporter::for_run(&config.cabinet, verbose);
    if reporter.is_verbose() {
        info!(
            "Parameter document {} is valid. Validated document:\n{}",
            parameter_json.display(),
            serde_json::to_string_pretty(&validated_document).unwrap_or_default()
        );
    }

    if dryrun {
        print_plan(&config);
        println!();
        println!("{}", "Parameter document is valid!".green().bold());
        return Ok(ExitCode::SUCCESS);
    }

    reporter.stages_identified(&config.cabinet.stages);

    let runner = ContainerRunner::new();
    let summary = Sequencer::new(&runner, reporter).run(&config).await;

    print_summary(&summary, start);

    Ok(if summary.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn log_validation(validation: &ValidationResult) {
    for note in &validation.notes {
        info!("{}", note);
    }
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    for err in &validation.errors {
        error!("{}", err);
    }
}

/// Print the commands a real run would execute
fn print_plan(config: &ValidatedConfig) {
    let stages = &config.cabinet.stages;

    println!();
    print_header(&format!(
        "Execution plan ({} stage{}, {})",
        stages.len(),
        if stages.len() == 1 { "" } else { "s" },
        config.cabinet.container_type
    ));

    for (i, name) in stages.iter().enumerate() {
        let Some(stage) = config.stage(name) else {
            continue;
        };
        let argv = build_command(stage);

        print_numbered(i + 1, &format!("{} ({})", name.bold(), stage.action));
        print_detail(&render_command(&argv));

        let invocation = StageInvocation {
            stage_name: name,
            argv: &argv,
            log_directory: config.cabinet.log_directory(),
            job_id: &config.cabinet.job_id,
        };
        if let Some(log_file) = invocation.log_file() {
            print_detail(&format!("log: {}", log_file.display()));
        }
    }

    println!();
    let program = config.cabinet.container_type.program();
    match which::which(program) {
        Ok(path) => print_success(&format!("{} found at {}", program, path.display())),
        Err(_) => {
            print_warning(&format!("'{}' was not found in PATH; stages will fail to start", program));
            print_detail(&CabinetError::runtime_help(config.cabinet.container_type));
        }
    }

    if config.cabinet.stop_on_stage_fail {
        print_detail("The run stops at the first failed stage");
    } else {
        print_detail("Remaining stages run even if a stage fails");
    }
}

fn print_summary(summary: &RunSummary, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();

    println!();
    if summary.success {
        println!(
            "{}",
            format!(
                "cabinet took this long to run all stages successfully: {:.2}s",
                elapsed
            )
            .green()
        );
        return;
    }

    println!(
        "{}",
        format!(
            "cabinet ran for this long but some stages were not successful: {:.2}s",
            elapsed
        )
        .red()
    );
    for record in summary.failed() {
        print_error(&format!("{} failed", record.name));
        if let Some(log_file) = record.outcome.as_ref().and_then(|o| o.log_file.as_deref()) {
            print_detail(&format!("log: {}", log_file.display()));
        }
    }
    for record in summary.not_run() {
        print_warning(&format!("{} was not run", record.name));
    }
}
