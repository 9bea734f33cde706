//! End-to-end checks of the command line surface that need no container engine

use std::path::Path;
use std::process::{Command, Output};

fn honeypot_deploy(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_honeypot-deploy"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run honeypot-deploy")
}

fn write_config(dir: &Path, extra: &str) -> String {
    let path = dir.join("deploy.yaml");
    let yaml = format!(
        "version: \"1.0\"\nproject_dir: \"{}\"\n{}",
        dir.display(),
        extra
    );
    std::fs::write(&path, yaml).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_help_lists_modes() {
    let dir = tempfile::tempdir().unwrap();
    let output = honeypot_deploy(dir.path(), &["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for mode in ["full", "elk-only", "honeypots-only", "webapp-only", "status", "shutdown"] {
        assert!(stdout.contains(mode), "--help does not mention {}", mode);
    }
}

#[test]
fn test_unknown_mode_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = honeypot_deploy(dir.path(), &["--mode", "everything"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_invalid_config_exits_with_configuration_code() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "services:\n  grafana:\n    max_wait: 10\n");

    let output = honeypot_deploy(dir.path(), &["--config", &config, "--mode", "elk-only"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("grafana"));
}

#[test]
fn test_non_honeypot_selection_exits_before_touching_engine() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = honeypot_deploy(
        dir.path(),
        &[
            "--config",
            &config,
            "--mode",
            "honeypots-only",
            "--honeypots",
            "cowrie,webapp",
        ],
    );
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a honeypot"));
    assert!(dir.path().join("deployment.log").exists());
}

/// A `docker` stand-in that answers version queries and rejects everything else
#[cfg(unix)]
fn fake_docker(dir: &Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let docker = bin.join("docker");
    std::fs::write(
        &docker,
        "#!/bin/sh\n\
         for arg in \"$@\"; do\n\
           case \"$arg\" in version|--version) echo \"Docker version 27.0.0\"; exit 0;; esac\n\
         done\n\
         echo \"Error response from daemon: pull access denied\" >&2\n\
         exit 1\n",
    )
    .unwrap();
    std::fs::set_permissions(&docker, std::fs::Permissions::from_mode(0o755)).unwrap();
    bin
}

#[cfg(unix)]
#[test]
fn test_json_output_is_not_mixed_with_prompts() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let bin = fake_docker(dir.path());
    let path = format!(
        "{}:{}",
        bin.display(),
        std::env::var("PATH").unwrap_or_default()
    );

    let output = Command::new(env!("CARGO_BIN_EXE_honeypot-deploy"))
        .args(["--config", &config, "--mode", "elk-only", "--format", "json"])
        .current_dir(dir.path())
        .env("PATH", path)
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Continue anyway"), "{}", stdout);
    match output.status.code() {
        // Requirements unmet: the prompt went to stderr and EOF declined it
        Some(1) => {
            assert!(stdout.trim().is_empty(), "{}", stdout);
            assert!(String::from_utf8_lossy(&output.stderr).contains("Continue anyway"));
        }
        // Requirements met: every start was rejected and stdout is the report
        Some(4) => {
            let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
            assert_eq!(report["outcomes"][0]["state"], "start_failed");
            assert_eq!(report["outcomes"][1]["state"], "skipped_dependency_failed");
        }
        other => panic!("unexpected exit {:?}: {}", other, stdout),
    }
}
