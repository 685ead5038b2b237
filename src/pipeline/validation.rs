// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Parameter document validation
//!
//! Validation runs in three phases: cabinet options, requested stages, then
//! binds/mounts. A phase only runs when every earlier phase passed. Within a
//! phase every problem is collected rather than stopping at the first one.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::{CabinetError, CabinetResult};
use crate::pipeline::binds::{enforce_host_path, HostPathStatus};
use crate::pipeline::schema::{apply_rule, runtime_rules, stage_rules, CABINET_RULES};
use crate::pipeline::{ContainerType, MissingHostPathPolicy, ValidatedConfig};

/// Parameter document validator
#[derive(Debug, Default)]
pub struct Validator {
    /// Fixed default `job_id`; `None` takes the time at each validation
    run_timestamp: Option<String>,
}

impl Validator {
    /// Create a validator whose default `job_id` is the time of each call
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with a fixed default `job_id`
    pub fn with_run_timestamp(run_timestamp: impl Into<String>) -> Self {
        Self {
            run_timestamp: Some(run_timestamp.into()),
        }
    }

    /// Validate a document, filling in defaults.
    ///
    /// The default `job_id` is taken once per call. Creates `log_directory`
    /// when set, and host directories under the `make_directories` policy.
    pub fn validate(&self, mut document: Value) -> ValidationResult {
        let run_timestamp = self
            .run_timestamp
            .clone()
            .unwrap_or_else(current_timestamp);

        let mut result = ValidationResult::new();
        Self::validate_document(&mut document, &run_timestamp, &mut result);
        result.document = document;
        result
    }

    fn validate_document(
        document: &mut Value,
        run_timestamp: &str,
        result: &mut ValidationResult,
    ) {
        let Some(root) = document.as_object_mut() else {
            result.add_error("Parameter document must be a mapping with 'cabinet' and 'stages' keys");
            return;
        };

        let Some(cabinet) = root.get_mut("cabinet") else {
            result.add_error("Missing key in parameter document: 'cabinet'");
            return;
        };
        let Some(cabinet) = cabinet.as_object_mut() else {
            result.add_error("Invalid key in parameter document: 'cabinet'. Must be of type mapping");
            return;
        };

        if !Self::validate_cabinet_options(cabinet, run_timestamp, result) {
            return;
        }

        let Some(plan) = RunPlan::from_cabinet(cabinet) else {
            result.add_error("Cabinet options could not be read after validation");
            return;
        };

        let stages = match root.get_mut("stages") {
            None => {
                result.add_error("Missing key in parameter document: 'stages'");
                return;
            }
            Some(Value::Object(stages)) => stages,
            Some(_) => {
                result.add_error("Invalid key in parameter document: 'stages'. Must be of type mapping");
                return;
            }
        };

        let before = result.errors.len();
        for name in &plan.requested {
            match stages.get_mut(name) {
                Some(stage) => {
                    Self::validate_stage(name, stage, plan.container_type, run_timestamp, result)
                }
                None => result.add_error(&format!(
                    "Parameters for {name} not found. Please add parameters for {name} to 'stages'."
                )),
            }
        }
        if result.errors.len() > before {
            return;
        }

        for name in &plan.requested {
            if let Some(stage) = stages.get(name) {
                Self::validate_binds(name, stage, plan.container_type, plan.policy, result);
            }
        }
    }

    /// Validate the `cabinet` section; returns whether it is valid
    fn validate_cabinet_options(
        cabinet: &mut Map<String, Value>,
        run_timestamp: &str,
        result: &mut ValidationResult,
    ) -> bool {
        let before = result.errors.len();

        for rule in CABINET_RULES {
            if let Err(e) = apply_rule(cabinet, rule, run_timestamp) {
                result.add_error(&e.describe("cabinet", rule.key));
            }
        }

        if let Some(Value::Array(names)) = cabinet.get("stages") {
            for name in names.iter().filter(|n| !n.is_string()) {
                result.add_error(&format!(
                    "Invalid cabinet option: stages. Entry {} is not a stage name string",
                    name
                ));
            }
        }

        if let Some(dir) = cabinet.get("log_directory").and_then(Value::as_str) {
            if !dir.is_empty() {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    result.add_error(&format!("Could not create log directory {}: {}", dir, e));
                }
            }
        }

        result.errors.len() == before
    }

    /// Validate one requested stage against the schema for its runtime
    fn validate_stage(
        name: &str,
        stage: &mut Value,
        container_type: ContainerType,
        run_timestamp: &str,
        result: &mut ValidationResult,
    ) {
        let Some(stage) = stage.as_object_mut() else {
            result.add_error(&format!(
                "Invalid stage options: {}. Must be of type mapping",
                name
            ));
            return;
        };

        let section = format!("stage '{}'", name);
        let mut failed_keys = HashSet::new();
        for rule in stage_rules(container_type) {
            if let Err(e) = apply_rule(stage, rule, run_timestamp) {
                result.add_error(&e.describe(&section, rule.key));
                failed_keys.insert(rule.key);
            }
        }

        if !failed_keys.contains("positional_args") {
            if let Some(Value::Array(args)) = stage.get("positional_args") {
                for arg in args.iter().filter(|a| !a.is_string()) {
                    result.add_error(&format!(
                        "Invalid {} option: positional_args. Entry {} is not a string",
                        section, arg
                    ));
                }
            }
        }

        for key in ["flags", "container_args"] {
            if failed_keys.contains(key) {
                continue;
            }
            if let Some(Value::Object(options)) = stage.get(key) {
                for (flag, value) in options {
                    if !is_flag_value(value) {
                        result.add_error(&format!(
                            "Invalid {} option: {}.{}. Must be a string, number, boolean, or list of those",
                            section, key, flag
                        ));
                    }
                }
            }
        }

        let other = container_type.other();
        for rule in runtime_rules(other) {
            if stage.contains_key(rule.key) {
                result.add_warning(&format!(
                    "Stage '{}': '{}' only applies to {} stages and is ignored",
                    name, rule.key, other
                ));
            }
        }

        if container_type == ContainerType::Singularity && !failed_keys.contains("container_filepath") {
            if let Some(path) = stage.get("container_filepath").and_then(Value::as_str) {
                Self::validate_container_file(Path::new(path), result);
            }
        }
    }

    fn validate_container_file(path: &Path, result: &mut ValidationResult) {
        if !path.is_file() {
            result.add_error(&format!("File does not exist at {}", path.display()));
        } else if let Err(e) = std::fs::File::open(path) {
            result.add_error(&format!("File is not readable at {}: {}", path.display(), e));
        }
    }

    /// Validate binds or mounts of one stage, applying the host path policy
    fn validate_binds(
        name: &str,
        stage: &Value,
        container_type: ContainerType,
        policy: MissingHostPathPolicy,
        result: &mut ValidationResult,
    ) {
        let key = container_type.binds_key();
        let Some(pairs) = stage.get(key).and_then(Value::as_array) else {
            return;
        };

        for pair in pairs {
            let host_path = pair.get("host_path").and_then(Value::as_str);
            let container_path = pair.get("container_path").and_then(Value::as_str);
            let Some((host_path, _)) = host_path.zip(container_path) else {
                result.add_error(&format!(
                    "Invalid bind in {}. 'host_path' and 'container_path' are required strings for all {}.",
                    name, key
                ));
                continue;
            };

            let host_path = PathBuf::from(host_path);
            match enforce_host_path(&host_path, policy) {
                HostPathStatus::Exists => {}
                HostPathStatus::MissingAllowed => result.add_warning(&format!(
                    "Host filepath in stage {} does not exist: {}",
                    name,
                    host_path.display()
                )),
                HostPathStatus::Created => {
                    result.add_note(&format!("Made directory {}", host_path.display()))
                }
                HostPathStatus::Missing => result.add_error(&format!(
                    "Host filepath in stage {} does not exist: {}",
                    name,
                    host_path.display()
                )),
                HostPathStatus::CreateFailed(e) => result.add_error(&format!(
                    "Could not create host directory {} for stage {}: {}",
                    host_path.display(),
                    name,
                    e
                )),
            }
        }
    }
}

/// Seconds and microseconds since the epoch, e.g. `1700000000.123456`
fn current_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Cabinet values later phases depend on
struct RunPlan {
    container_type: ContainerType,
    policy: MissingHostPathPolicy,
    /// Requested stage names, first occurrence only
    requested: Vec<String>,
}

impl RunPlan {
    fn from_cabinet(cabinet: &Map<String, Value>) -> Option<Self> {
        let container_type = serde_json::from_value(cabinet.get("container_type")?.clone()).ok()?;
        let policy = serde_json::from_value(cabinet.get("handle_missing_host_paths")?.clone()).ok()?;

        let mut seen = HashSet::new();
        let requested = cabinet
            .get("stages")?
            .as_array()?
            .iter()
            .filter_map(Value::as_str)
            .filter(|name| seen.insert(*name))
            .map(str::to_string)
            .collect();

        Some(Self {
            container_type,
            policy,
            requested,
        })
    }
}

fn is_flag_value(value: &Value) -> bool {
    match value {
        Value::Null | Value::String(_) | Value::Number(_) | Value::Bool(_) => true,
        Value::Array(items) => items
            .iter()
            .all(|v| v.is_string() || v.is_number() || v.is_boolean()),
        Value::Object(_) => false,
    }
}

/// Result of validating a parameter document
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// The document with defaults filled in
    pub document: Value,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Filesystem actions taken while validating
    pub notes: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn add_note(&mut self, message: &str) {
        self.notes.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into the typed configuration, or fail with the error count
    pub fn into_config(self, path: &Path) -> CabinetResult<ValidatedConfig> {
        if !self.is_valid() {
            return Err(CabinetError::InvalidConfig {
                path: path.to_path_buf(),
                count: self.errors.len(),
            });
        }
        ValidatedConfig::from_document(&self.document)
    }
}
