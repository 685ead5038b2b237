// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Stage command construction
//!
//! Builds the exact argument vector handed to the container runtime. The
//! vector is never joined into a shell string for execution.

use crate::pipeline::binds::bind_tokens;
use crate::pipeline::{FlagValue, OptionMap, StageSpec};

/// Flatten a flag mapping into tokens, in document order.
///
/// Falsy values (`false`, `""`, `0`, `[]`) drop the key entirely. `true`
/// emits the key alone; lists emit the key followed by every element.
pub fn flatten_options(options: &OptionMap) -> Vec<String> {
    let mut tokens = Vec::new();

    for (key, value) in options {
        if !value.is_truthy() {
            continue;
        }

        tokens.push(key.clone());
        match value {
            FlagValue::Bool(_) => {}
            FlagValue::String(s) => tokens.push(s.clone()),
            FlagValue::Number(n) => tokens.push(n.to_string()),
            FlagValue::List(items) => tokens.extend(items.iter().cloned()),
        }
    }

    tokens
}

/// Build the runtime invocation for one stage.
///
/// Layout: `program action binds container_args reference positional_args flags`
pub fn build_command(stage: &StageSpec) -> Vec<String> {
    let container_type = stage.target.container_type();

    let mut argv = vec![
        container_type.program().to_string(),
        stage.action.to_string(),
    ];
    argv.extend(bind_tokens(container_type, stage.target.path_pairs()));
    argv.extend(flatten_options(&stage.container_args));
    argv.push(stage.target.reference());
    argv.extend(stage.positional_args.iter().cloned());
    argv.extend(flatten_options(&stage.flags));

    argv
}

/// Render an argument vector for display only
pub fn render_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
                format!("'{}'", arg.replace('\'', r"'\''"))
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
