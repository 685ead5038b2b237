// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cabinet contributors

//! End-to-end tests for the cabinet binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_params(dir: &Path, name: &str, params: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(params).unwrap()).unwrap();
    path
}

fn cabinet() -> Command {
    let mut cmd = Command::cargo_bin("cabinet").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("CABINET_PARAMETER_JSON");
    cmd
}

fn echo_params() -> Value {
    json!({
        "cabinet": {"container_type": "docker", "stages": ["echo"]},
        "stages": {
            "echo": {
                "image_name": "alpine",
                "action": "run",
                "positional_args": ["echo", "hi"]
            }
        }
    })
}

#[test]
fn test_dryrun_prints_plan() {
    let dir = TempDir::new().unwrap();
    let params = write_params(dir.path(), "params.json", &echo_params());

    cabinet()
        .arg(&params)
        .arg("--dryrun")
        .assert()
        .success()
        .stdout(predicate::str::contains("docker run alpine echo hi"))
        .stdout(predicate::str::contains("Parameter document is valid!"));
}

#[test]
fn test_dryrun_accepts_yaml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("params.yaml");
    std::fs::write(
        &path,
        r#"
cabinet:
  container_type: docker
  stages: [echo]
stages:
  echo:
    image_name: alpine
    positional_args: [echo, hi]
    flags:
      --quiet: false
      --count: 2
"#,
    )
    .unwrap();

    cabinet()
        .arg(&path)
        .arg("--dryrun")
        .assert()
        .success()
        .stdout(predicate::str::contains("docker run alpine echo hi --count 2"))
        .stdout(predicate::str::contains("--quiet").not());
}

#[test]
fn test_unknown_extension_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let params = write_params(dir.path(), "params.txt", &echo_params());

    cabinet()
        .arg(&params)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a path to a readable"));
}

#[test]
fn test_missing_parameter_file_is_usage_error() {
    cabinet().arg("/no/such/params.json").assert().code(2);
}

#[cfg(unix)]
mod stub_runtime {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// A fake runtime that records its arguments and fails when asked to
    const STUB: &str = r#"#!/bin/sh
echo "$@" >> "$CABINET_STUB_CALLS"
case "$*" in
  *fail*) echo "stub failing" 1>&2; exit 3 ;;
esac
echo "stub output: $*"
"#;

    struct Stub {
        dir: TempDir,
    }

    impl Stub {
        fn install(program: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let bin = dir.path().join("bin");
            std::fs::create_dir(&bin).unwrap();

            let exe = bin.join(program);
            std::fs::write(&exe, STUB).unwrap();
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

            Self { dir }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn calls_file(&self) -> PathBuf {
            self.dir.path().join("calls.txt")
        }

        fn calls(&self) -> Vec<String> {
            std::fs::read_to_string(self.calls_file())
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }

        fn command(&self) -> Command {
            let path = format!(
                "{}:{}",
                self.dir.path().join("bin").display(),
                std::env::var("PATH").unwrap_or_default()
            );
            let mut cmd = cabinet();
            cmd.env("PATH", path).env("CABINET_STUB_CALLS", self.calls_file());
            cmd
        }
    }

    fn three_stages(stop_on_stage_fail: bool) -> Value {
        json!({
            "cabinet": {
                "container_type": "docker",
                "stages": ["A", "B", "C"],
                "stop_on_stage_fail": stop_on_stage_fail
            },
            "stages": {
                "A": {"image_name": "alpine", "positional_args": ["fail"]},
                "B": {"image_name": "alpine", "positional_args": ["b"]},
                "C": {"image_name": "alpine", "positional_args": ["c"]}
            }
        })
    }

    #[test]
    fn test_echo_stage_runs() {
        let stub = Stub::install("docker");
        let params = write_params(stub.path(), "params.json", &echo_params());

        stub.command()
            .arg(&params)
            .assert()
            .success()
            .stdout(predicate::str::contains("stub output: run alpine echo hi"))
            .stdout(predicate::str::contains("took this long to run all stages successfully"));

        assert_eq!(stub.calls(), vec!["run alpine echo hi"]);
    }

    #[test]
    fn test_dryrun_never_invokes_runtime() {
        let stub = Stub::install("docker");
        let params = write_params(stub.path(), "params.json", &echo_params());

        stub.command().arg(&params).arg("--dryrun").assert().success();
        assert!(stub.calls().is_empty());
    }

    #[test]
    fn test_stop_on_stage_fail() {
        let stub = Stub::install("docker");
        let params = write_params(stub.path(), "params.json", &three_stages(true));

        stub.command()
            .arg(&params)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("some stages were not successful"));

        assert_eq!(stub.calls(), vec!["run alpine fail"]);
    }

    #[test]
    fn test_continue_on_stage_fail() {
        let stub = Stub::install("docker");
        let params = write_params(stub.path(), "params.json", &three_stages(false));

        stub.command().arg(&params).assert().code(1);

        assert_eq!(
            stub.calls(),
            vec!["run alpine fail", "run alpine b", "run alpine c"]
        );
    }

    #[test]
    fn test_stage_output_goes_to_log_directory() {
        let stub = Stub::install("docker");
        let logs = stub.path().join("logs");
        let mut params = echo_params();
        params["cabinet"]["log_directory"] = json!(logs.to_str().unwrap());
        params["cabinet"]["job_id"] = json!("job1");
        let params = write_params(stub.path(), "params.json", &params);

        stub.command()
            .arg(&params)
            .assert()
            .success()
            .stdout(predicate::str::contains("stub output").not());

        let log = std::fs::read_to_string(logs.join("job1_echo.log")).unwrap();
        assert!(log.contains("stub output: run alpine echo hi"));
    }

    #[test]
    fn test_missing_container_type_fails_before_any_stage() {
        let stub = Stub::install("docker");
        let mut params = echo_params();
        params["cabinet"].as_object_mut().unwrap().remove("container_type");
        let params = write_params(stub.path(), "params.json", &params);

        stub.command()
            .arg(&params)
            .assert()
            .code(1)
            .stderr(predicate::str::contains(
                "Missing required key in cabinet options: container_type",
            ));

        assert!(stub.calls().is_empty());
    }

    #[test]
    fn test_missing_singularity_image_never_spawns() {
        let stub = Stub::install("singularity");
        let params = write_params(
            stub.path(),
            "params.json",
            &json!({
                "cabinet": {"container_type": "singularity", "stages": ["s"]},
                "stages": {"s": {"container_filepath": "/no/such/tool.sif"}}
            }),
        );

        stub.command()
            .arg(&params)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("File does not exist at /no/such/tool.sif"));

        assert!(stub.calls().is_empty());
    }

    #[test]
    fn test_singularity_binds_and_make_directories() {
        let stub = Stub::install("singularity");
        let image = stub.path().join("tool.sif");
        std::fs::write(&image, b"sif").unwrap();
        let host = stub.path().join("made/by/cabinet");

        let params = write_params(
            stub.path(),
            "params.json",
            &json!({
                "cabinet": {
                    "container_type": "singularity",
                    "stages": ["s"],
                    "handle_missing_host_paths": "make_directories"
                },
                "stages": {
                    "s": {
                        "action": "exec",
                        "container_filepath": image.to_str().unwrap(),
                        "binds": [{"host_path": host.to_str().unwrap(), "container_path": "/out"}],
                        "container_args": {"--cleanenv": true},
                        "flags": {"--threads": 4}
                    }
                }
            }),
        );

        stub.command().arg(&params).assert().success();

        assert!(host.is_dir());
        assert_eq!(
            stub.calls(),
            vec![format!(
                "exec -B {}:/out --cleanenv {} --threads 4",
                host.display(),
                image.display()
            )]
        );
    }
}
