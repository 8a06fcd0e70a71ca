use assert_cmd::Command;
use predicates::prelude::*;

/// A command isolated from any real prockit installation: runtime/state dirs
/// under a scratch dir, config pointed at a file that does not exist.
fn prockit(temp: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("prockit").unwrap();
    cmd.env("PROCKIT_RUNTIME", temp.path().join("run"))
        .env("PROCKIT_STATE", temp.path().join("state"))
        .env("PROCKIT_CONFIG", temp.path().join("absent-config.toml"));
    cmd
}

#[test]
fn no_verb_prints_hint_and_succeeds() {
    let temp = tempfile::tempdir().unwrap();
    prockit(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("--start"));
}

#[test]
fn verbs_are_mutually_exclusive() {
    let temp = tempfile::tempdir().unwrap();
    prockit(&temp).args(["--start", "--stop"]).assert().failure();
}

#[test]
fn unknown_flag_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    prockit(&temp).arg("--restart").assert().failure();
}

#[test]
#[cfg(unix)]
fn status_reports_not_running_without_pid_file() {
    let temp = tempfile::tempdir().unwrap();
    prockit(&temp)
        .arg("--status")
        .assert()
        .success()
        .stdout(predicate::str::contains("process is not running"));
}

#[test]
#[cfg(unix)]
fn status_reports_running_pid_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let run_dir = temp.path().join("run");
    std::fs::create_dir_all(&run_dir).unwrap();
    // Status trusts the file; the pid does not need to be alive.
    std::fs::write(run_dir.join("prockit.pid"), "12345").unwrap();

    prockit(&temp)
        .arg("--status")
        .assert()
        .success()
        .stdout(predicate::str::contains("process is running (pid 12345)"));
}

#[test]
#[cfg(unix)]
fn status_json_reports_machine_readable_state() {
    let temp = tempfile::tempdir().unwrap();
    let run_dir = temp.path().join("run");
    std::fs::create_dir_all(&run_dir).unwrap();
    std::fs::write(run_dir.join("prockit.pid"), "12345").unwrap();

    prockit(&temp)
        .args(["--status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"running\":true"))
        .stdout(predicate::str::contains("\"pid\":12345"));
}

#[test]
#[cfg(unix)]
fn stop_without_instance_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    prockit(&temp)
        .arg("--stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("stop requested"));
}

#[test]
#[cfg(unix)]
fn start_rejects_invalid_config() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("config.toml");
    std::fs::write(&config_path, "[pool]\nkill_signal = \"SIGDANCE\"\n").unwrap();

    prockit(&temp)
        .env("PROCKIT_CONFIG", &config_path)
        .arg("--start")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SIGDANCE"));
}
