// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Option schemas for the parameter document
//!
//! Each section is described by a table of [`OptionRule`]s. A single routine,
//! [`apply_rule`], checks one field against one rule and fills in defaults.

use serde_json::{Map, Value};

use crate::pipeline::ContainerType;

/// JSON type an option must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Bool,
    List,
    Mapping,
}

impl ValueKind {
    /// Exact type check; booleans never pass as strings or numbers
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Mapping => value.is_object(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "boolean",
            Self::List => "list",
            Self::Mapping => "mapping",
        }
    }
}

/// Default filled in when an optional key is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Bool(bool),
    Str(&'static str),
    EmptyList,
    EmptyMapping,
    /// Timestamp taken when validation started
    RunTimestamp,
}

impl DefaultValue {
    pub fn resolve(&self, run_timestamp: &str) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Str(s) => Value::String((*s).to_string()),
            Self::EmptyList => Value::Array(Vec::new()),
            Self::EmptyMapping => Value::Object(Map::new()),
            Self::RunTimestamp => Value::String(run_timestamp.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional(DefaultValue),
}

/// Declarative rule for one option key
#[derive(Debug, Clone, Copy)]
pub struct OptionRule {
    pub key: &'static str,
    pub kind: ValueKind,
    pub requirement: Requirement,
    pub allowed: Option<&'static [&'static str]>,
}

impl OptionRule {
    const fn required(key: &'static str, kind: ValueKind) -> Self {
        Self {
            key,
            kind,
            requirement: Requirement::Required,
            allowed: None,
        }
    }

    const fn optional(key: &'static str, kind: ValueKind, default: DefaultValue) -> Self {
        Self {
            key,
            kind,
            requirement: Requirement::Optional(default),
            allowed: None,
        }
    }

    const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

/// Why a field failed its rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Missing,
    WrongType { expected: ValueKind },
    NotAllowed { allowed: &'static [&'static str] },
}

impl FieldError {
    /// Human-readable message; `section` names where the key lives
    pub fn describe(&self, section: &str, key: &str) -> String {
        match self {
            Self::Missing => format!("Missing required key in {} options: {}", section, key),
            Self::WrongType { expected } => format!(
                "Invalid {} option: {}. Must be of type {}",
                section,
                key,
                expected.name()
            ),
            Self::NotAllowed { allowed } => format!(
                "Invalid {} option: {}. Must be one of [{}]",
                section,
                key,
                allowed.join(", ")
            ),
        }
    }
}

/// Check one key of `section` against `rule`, filling its default if absent
pub fn apply_rule(
    section: &mut Map<String, Value>,
    rule: &OptionRule,
    run_timestamp: &str,
) -> Result<(), FieldError> {
    let Some(value) = section.get(rule.key) else {
        return match rule.requirement {
            Requirement::Required => Err(FieldError::Missing),
            Requirement::Optional(default) => {
                section.insert(rule.key.to_string(), default.resolve(run_timestamp));
                Ok(())
            }
        };
    };

    if !rule.kind.matches(value) {
        return Err(FieldError::WrongType {
            expected: rule.kind,
        });
    }

    if let Some(allowed) = rule.allowed {
        let in_set = value.as_str().is_some_and(|s| allowed.contains(&s));
        if !in_set {
            return Err(FieldError::NotAllowed { allowed });
        }
    }

    Ok(())
}

pub const CONTAINER_TYPES: &[&str] = &["singularity", "docker"];
pub const MISSING_HOST_PATH_POLICIES: &[&str] = &["stop", "allow", "make_directories"];
pub const ACTIONS: &[&str] = &["run", "exec"];

/// Rules for the `cabinet` section
pub const CABINET_RULES: &[OptionRule] = &[
    OptionRule::required("container_type", ValueKind::String).one_of(CONTAINER_TYPES),
    OptionRule::required("stages", ValueKind::List),
    OptionRule::optional("verbose", ValueKind::Bool, DefaultValue::Bool(false)),
    OptionRule::optional("log_directory", ValueKind::String, DefaultValue::Str("")),
    OptionRule::optional("job_id", ValueKind::String, DefaultValue::RunTimestamp),
    OptionRule::optional(
        "handle_missing_host_paths",
        ValueKind::String,
        DefaultValue::Str("stop"),
    )
    .one_of(MISSING_HOST_PATH_POLICIES),
    OptionRule::optional("stop_on_stage_fail", ValueKind::Bool, DefaultValue::Bool(true)),
];

/// Rules shared by every stage regardless of runtime
pub const STAGE_RULES: &[OptionRule] = &[
    OptionRule::optional("action", ValueKind::String, DefaultValue::Str("run")).one_of(ACTIONS),
    OptionRule::optional("positional_args", ValueKind::List, DefaultValue::EmptyList),
    OptionRule::optional("flags", ValueKind::Mapping, DefaultValue::EmptyMapping),
    OptionRule::optional("container_args", ValueKind::Mapping, DefaultValue::EmptyMapping),
];

const SINGULARITY_RULES: &[OptionRule] = &[
    OptionRule::required("container_filepath", ValueKind::String),
    OptionRule::optional("binds", ValueKind::List, DefaultValue::EmptyList),
];

const DOCKER_RULES: &[OptionRule] = &[
    OptionRule::required("image_name", ValueKind::String),
    OptionRule::optional("mounts", ValueKind::List, DefaultValue::EmptyList),
];

/// Rules that only apply to stages of the given runtime
pub fn runtime_rules(container_type: ContainerType) -> &'static [OptionRule] {
    match container_type {
        ContainerType::Singularity => SINGULARITY_RULES,
        ContainerType::Docker => DOCKER_RULES,
    }
}

/// Full rule set for a stage of the given runtime
pub fn stage_rules(container_type: ContainerType) -> impl Iterator<Item = &'static OptionRule> {
    STAGE_RULES.iter().chain(runtime_rules(container_type))
}
