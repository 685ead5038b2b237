// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Parameter document definitions
//!
//! The raw document is an untyped `serde_json::Value` tree until it has been
//! validated. After validation it converts into a [`ValidatedConfig`].

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::errors::{CabinetError, CabinetResult};

/// Structured-data formats accepted for the parameter document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Toml,
}

impl DocumentFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Parameter document as loaded from disk
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    /// Where the document was read from
    pub path: PathBuf,
    /// Untyped document tree
    pub root: Value,
}

impl ConfigDocument {
    /// Load a parameter document, picking the parser from the extension
    pub fn from_file(path: &Path) -> CabinetResult<Self> {
        let format = DocumentFormat::from_path(path).ok_or_else(|| {
            CabinetError::UnsupportedFormat {
                path: path.to_path_buf(),
            }
        })?;

        if !path.exists() {
            return Err(CabinetError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CabinetError::ConfigRead {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            root: Self::parse(&content, format)?,
        })
    }

    /// Parse document text into a value tree
    pub fn parse(content: &str, format: DocumentFormat) -> CabinetResult<Value> {
        match format {
            DocumentFormat::Json => serde_json::from_str(content).map_err(Into::into),
            DocumentFormat::Yaml => serde_yaml::from_str(content).map_err(Into::into),
            DocumentFormat::Toml => toml::from_str(content).map_err(Into::into),
        }
    }
}

/// Container runtime used for every stage of a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContainerType {
    Singularity,
    Docker,
}

impl ContainerType {
    /// Executable invoked for this runtime
    pub fn program(&self) -> &'static str {
        match self {
            Self::Singularity => "singularity",
            Self::Docker => "docker",
        }
    }

    /// Stage key holding host/container path pairs
    pub fn binds_key(&self) -> &'static str {
        match self {
            Self::Singularity => "binds",
            Self::Docker => "mounts",
        }
    }

    /// The runtime whose fields are foreign to this one
    pub fn other(&self) -> Self {
        match self {
            Self::Singularity => Self::Docker,
            Self::Docker => Self::Singularity,
        }
    }
}

impl std::fmt::Display for ContainerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program())
    }
}

/// What to do when a bind's host path does not exist
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingHostPathPolicy {
    /// Report a validation error
    #[default]
    Stop,
    /// Leave it to the runtime
    Allow,
    /// Create the host directory tree
    MakeDirectories,
}

/// Runtime subcommand for a stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Run,
    Exec,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::Exec => write!(f, "exec"),
        }
    }
}

/// Global run options (the `cabinet` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CabinetOptions {
    pub container_type: ContainerType,

    /// Stage names in execution order
    pub stages: Vec<String>,

    pub verbose: bool,

    /// Empty means stages inherit stdout/stderr
    pub log_directory: String,

    pub job_id: String,

    pub handle_missing_host_paths: MissingHostPathPolicy,

    pub stop_on_stage_fail: bool,
}

impl CabinetOptions {
    /// Directory for per-stage log files, if configured
    pub fn log_directory(&self) -> Option<&Path> {
        if self.log_directory.is_empty() {
            None
        } else {
            Some(Path::new(&self.log_directory))
        }
    }
}

/// A host path exposed inside the container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathPair {
    pub host_path: PathBuf,
    pub container_path: String,
}

impl PathPair {
    pub fn new(host_path: impl Into<PathBuf>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
        }
    }
}

/// Value of a flag or container argument
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum FlagValue {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    List(Vec<String>),
}

impl FlagValue {
    /// Whether the flag is emitted at all
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::String(s) => !s.is_empty(),
            Self::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Self::Bool(b) => *b,
            Self::List(items) => !items.is_empty(),
        }
    }

    /// Render a list element as one command-line token.
    ///
    /// Booleans are capitalized (`True`/`False`), numbers keep their
    /// document form.
    fn list_element(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(true) => Some("True".to_string()),
            Value::Bool(false) => Some("False".to_string()),
            _ => None,
        }
    }
}

impl TryFrom<Value> for FlagValue {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(Self::String(s)),
            Value::Number(n) => Ok(Self::Number(n)),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    Self::list_element(item)
                        .ok_or_else(|| format!("list element {} is not a scalar", item))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Null => Err("null is not a flag value".to_string()),
            Value::Object(_) => Err("a mapping is not a flag value".to_string()),
        }
    }
}

/// Ordered flag name to value mapping
pub type OptionMap = IndexMap<String, FlagValue>;

/// Runtime-specific half of a stage
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerTarget {
    Singularity {
        container_filepath: PathBuf,
        binds: Vec<PathPair>,
    },
    Docker {
        image_name: String,
        mounts: Vec<PathPair>,
    },
}

impl ContainerTarget {
    pub fn container_type(&self) -> ContainerType {
        match self {
            Self::Singularity { .. } => ContainerType::Singularity,
            Self::Docker { .. } => ContainerType::Docker,
        }
    }

    /// Image reference placed after the container arguments
    pub fn reference(&self) -> String {
        match self {
            Self::Singularity {
                container_filepath, ..
            } => container_filepath.display().to_string(),
            Self::Docker { image_name, .. } => image_name.clone(),
        }
    }

    /// Bind or mount pairs for this stage
    pub fn path_pairs(&self) -> &[PathPair] {
        match self {
            Self::Singularity { binds, .. } => binds,
            Self::Docker { mounts, .. } => mounts,
        }
    }
}

/// A single validated stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    pub action: Action,
    pub positional_args: Vec<String>,
    pub flags: OptionMap,
    pub container_args: OptionMap,
    pub target: ContainerTarget,
}

/// Runtime-independent stage fields, once defaults are filled in
#[derive(Debug, Deserialize)]
struct CommonStage {
    action: Action,
    positional_args: Vec<String>,
    flags: IndexMap<String, Option<FlagValue>>,
    container_args: IndexMap<String, Option<FlagValue>>,
}

fn drop_unset(map: IndexMap<String, Option<FlagValue>>) -> OptionMap {
    map.into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
}

fn stage_field<T: DeserializeOwned>(name: &str, stage: &Value, key: &str) -> CabinetResult<T> {
    let value = stage.get(key).ok_or_else(|| CabinetError::ConfigShape {
        reason: format!("stage '{}': missing '{}'", name, key),
    })?;
    serde_json::from_value(value.clone()).map_err(|e| CabinetError::ConfigShape {
        reason: format!("stage '{}': '{}': {}", name, key, e),
    })
}

impl StageSpec {
    /// Convert a validated stage mapping into its typed form.
    ///
    /// Only the fields of `container_type` are read; the other runtime's
    /// fields are ignored.
    pub fn from_value(
        name: &str,
        value: &Value,
        container_type: ContainerType,
    ) -> CabinetResult<Self> {
        let common: CommonStage =
            serde_json::from_value(value.clone()).map_err(|e| CabinetError::ConfigShape {
                reason: format!("stage '{}': {}", name, e),
            })?;

        let target = match container_type {
            ContainerType::Singularity => ContainerTarget::Singularity {
                container_filepath: stage_field(name, value, "container_filepath")?,
                binds: stage_field(name, value, "binds")?,
            },
            ContainerType::Docker => ContainerTarget::Docker {
                image_name: stage_field(name, value, "image_name")?,
                mounts: stage_field(name, value, "mounts")?,
            },
        };

        Ok(Self {
            action: common.action,
            positional_args: common.positional_args,
            flags: drop_unset(common.flags),
            container_args: drop_unset(common.container_args),
            target,
        })
    }
}

/// Fully validated parameter document
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub cabinet: CabinetOptions,
    /// Requested stages, keyed by name, in first-requested order
    pub stages: IndexMap<String, StageSpec>,
}

impl ValidatedConfig {
    /// Build the typed configuration from a document the validator accepted
    pub fn from_document(document: &Value) -> CabinetResult<Self> {
        let cabinet_value = document.get("cabinet").ok_or_else(|| CabinetError::ConfigShape {
            reason: "missing 'cabinet' section".to_string(),
        })?;
        let cabinet: CabinetOptions = serde_json::from_value(cabinet_value.clone()).map_err(|e| {
            CabinetError::ConfigShape {
                reason: format!("cabinet options: {}", e),
            }
        })?;

        let mut stages = IndexMap::new();
        for name in &cabinet.stages {
            if stages.contains_key(name) {
                continue;
            }
            let value = document
                .get("stages")
                .and_then(|s| s.get(name))
                .ok_or_else(|| CabinetError::ConfigShape {
                    reason: format!("stage '{}' has no parameters", name),
                })?;
            let spec = StageSpec::from_value(name, value, cabinet.container_type)?;
            stages.insert(name.clone(), spec);
        }

        Ok(Self { cabinet, stages })
    }

    /// Get a stage by name
    pub fn stage(&self, name: &str) -> Option<&StageSpec> {
        self.stages.get(name)
    }
}
