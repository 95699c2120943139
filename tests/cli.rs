use assert_cmd::Command;
use predicates::prelude::*;

fn hostwarden() -> Command {
    Command::cargo_bin("hostwarden").unwrap()
}

#[test]
fn version_flag_prints_name_and_version() {
    hostwarden()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "hostwarden v{}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn build_info_lists_profile() {
    hostwarden()
        .arg("--build-info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile:"));
}

#[test]
fn check_config_prints_effective_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "network:\n  failure_threshold: 7\n").unwrap();

    hostwarden()
        .args(["--config", path.to_str().unwrap(), "check-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("failure_threshold: 7"))
        .stdout(predicate::str::contains("dns_host: google.com"));
}

#[test]
fn check_config_rejects_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "raid: [1, 2").unwrap();

    hostwarden()
        .args(["--config", path.to_str().unwrap(), "check-config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn unknown_subcommand_fails() {
    hostwarden().arg("explode").assert().failure();
}
