// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Error types
//!
//! Fatal errors stop the run before any stage is launched. Stage failures are
//! not errors: they come back as a failed [`StageOutcome`](crate::executors::StageOutcome).

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::ContainerType;

/// Result type for cabinet operations
pub type CabinetResult<T> = Result<T, CabinetError>;

/// Main error type for cabinet
#[derive(Error, Debug, Diagnostic)]
pub enum CabinetError {
    // ─────────────────────────────────────────────────────────────────────────
    // Parameter document errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Parameter document not found: {path}")]
    #[diagnostic(
        code(cabinet::config_not_found),
        help("Pass the path of an existing, readable parameter document")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Unsupported parameter document format: {path}")]
    #[diagnostic(
        code(cabinet::unsupported_format),
        help("Supported extensions: .json, .yaml, .yml, .toml")
    )]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to read parameter document '{path}': {error}")]
    #[diagnostic(code(cabinet::config_read_error))]
    ConfigRead { path: PathBuf, error: String },

    #[error("Parameter document '{path}' is invalid: {count} validation error(s)")]
    #[diagnostic(
        code(cabinet::invalid_config),
        help("Fix the errors listed above; no stage was started")
    )]
    InvalidConfig { path: PathBuf, count: usize },

    #[error("Validated document does not match the stage model: {reason}")]
    #[diagnostic(code(cabinet::config_shape))]
    ConfigShape { reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Parse errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(cabinet::json_error))]
    Json { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(cabinet::yaml_error))]
    Yaml { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(cabinet::toml_error))]
    Toml { message: String },
}

impl From<serde_json::Error> for CabinetError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for CabinetError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<toml::de::Error> for CabinetError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl CabinetError {
    /// Installation hint for a container runtime that could not be started
    pub fn runtime_help(container_type: ContainerType) -> String {
        match container_type {
            ContainerType::Docker => {
                "Install Docker (https://docs.docker.com/engine/install/) and ensure 'docker' is in your PATH".to_string()
            }
            ContainerType::Singularity => {
                "Install SingularityCE or Apptainer and ensure 'singularity' is in your PATH".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let err = CabinetError::InvalidConfig {
            path: PathBuf::from("p.json"),
            count: 3,
        };

        assert_eq!(
            err.to_string(),
            "Parameter document 'p.json' is invalid: 3 validation error(s)"
        );
    }

    #[test]
    fn test_runtime_help_names_executable() {
        assert!(CabinetError::runtime_help(ContainerType::Docker).contains("'docker'"));
        assert!(CabinetError::runtime_help(ContainerType::Singularity).contains("'singularity'"));
    }
}
