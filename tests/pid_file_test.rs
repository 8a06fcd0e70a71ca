#![cfg(unix)]

use std::env;
use std::fs;
use std::process;
use std::sync::Mutex;

use prockit::daemon::pid::{PidError, PidFile};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn set_env_var(key: &str, value: impl AsRef<std::ffi::OsStr>) {
    unsafe {
        env::set_var(key, value);
    }
}

fn remove_env_var(key: &str) {
    unsafe {
        env::remove_var(key);
    }
}

#[test]
fn test_write_read_remove_lifecycle() {
    let temp = tempfile::tempdir().unwrap();
    let pid_file = PidFile::at(temp.path().join("prockit.pid"));

    pid_file.write(process::id()).unwrap();
    assert!(pid_file.exists());

    let contents = fs::read_to_string(pid_file.path()).unwrap();
    assert_eq!(contents.trim().parse::<u32>().unwrap(), process::id());

    pid_file.remove().unwrap();
    assert!(!pid_file.exists());
}

#[test]
fn test_default_location_honors_runtime_override() {
    let _lock = ENV_LOCK.lock().unwrap();
    let temp = tempfile::tempdir().unwrap();
    set_env_var("PROCKIT_RUNTIME", temp.path());

    let pid_file = PidFile::new();
    pid_file.write(process::id()).unwrap();
    assert!(temp.path().join("prockit.pid").exists());

    pid_file.remove().unwrap();
    remove_env_var("PROCKIT_RUNTIME");
}

#[test]
fn test_garbled_contents_surface_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("prockit.pid");
    fs::write(&path, "so many pids").unwrap();

    let pid_file = PidFile::at(&path);
    match pid_file.read().unwrap_err() {
        PidError::Parse(content) => assert_eq!(content, "so many pids"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_read_surrounding_whitespace_is_tolerated() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("prockit.pid");
    fs::write(&path, "  8080\n").unwrap();

    let pid_file = PidFile::at(&path);
    assert_eq!(pid_file.read().unwrap(), 8080);
}

#[test]
fn test_remove_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let pid_file = PidFile::at(temp.path().join("prockit.pid"));

    pid_file.remove().unwrap();
    pid_file.write(1).unwrap();
    pid_file.remove().unwrap();
    pid_file.remove().unwrap();
}
