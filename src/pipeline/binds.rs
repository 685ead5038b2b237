// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! Bind and mount handling
//!
//! Host path policy is enforced while validating; the flags themselves are
//! produced when the stage command is built.

use std::path::Path;

use crate::pipeline::{ContainerType, MissingHostPathPolicy, PathPair};

/// Runtime flags exposing every pair inside the container
pub fn bind_tokens(container_type: ContainerType, pairs: &[PathPair]) -> Vec<String> {
    let mut tokens = Vec::with_capacity(pairs.len() * 2);

    for pair in pairs {
        match container_type {
            ContainerType::Singularity => {
                tokens.push("-B".to_string());
                tokens.push(format!(
                    "{}:{}",
                    pair.host_path.display(),
                    pair.container_path
                ));
            }
            ContainerType::Docker => {
                tokens.push("--mount".to_string());
                tokens.push(format!(
                    "type=bind,src={},dst={}",
                    pair.host_path.display(),
                    pair.container_path
                ));
            }
        }
    }

    tokens
}

/// Result of applying the missing-host-path policy to one pair
#[derive(Debug)]
pub enum HostPathStatus {
    Exists,
    /// Missing, but the policy lets the runtime deal with it
    MissingAllowed,
    /// Missing and created on the host
    Created,
    /// Missing under the `stop` policy
    Missing,
    CreateFailed(std::io::Error),
}

/// Apply `policy` to a host path. Only the host side is ever created.
pub fn enforce_host_path(host_path: &Path, policy: MissingHostPathPolicy) -> HostPathStatus {
    if host_path.exists() {
        return HostPathStatus::Exists;
    }

    match policy {
        MissingHostPathPolicy::Stop => HostPathStatus::Missing,
        MissingHostPathPolicy::Allow => HostPathStatus::MissingAllowed,
        MissingHostPathPolicy::MakeDirectories => match std::fs::create_dir_all(host_path) {
            Ok(()) => HostPathStatus::Created,
            Err(e) => HostPathStatus::CreateFailed(e),
        },
    }
}
