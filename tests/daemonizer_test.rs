#![cfg(unix)]

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use prockit::daemon::{DaemonError, DaemonStatus, Daemonizer, PidFile};
use prockit::hooks::HookKind;

fn daemonizer_at(dir: &std::path::Path) -> Daemonizer {
    Daemonizer::new()
        .unwrap()
        .pid_file(PidFile::at(dir.join("prockit.pid")))
}

#[test]
fn second_start_fails_with_already_running_and_recorded_pid() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("prockit.pid"), "31337").unwrap();

    let mut daemonizer = daemonizer_at(temp.path());
    match daemonizer.start(|| {}).unwrap_err() {
        DaemonError::AlreadyRunning { pid } => assert_eq!(pid, 31337),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn status_trusts_the_pid_file_alone() {
    let temp = tempfile::tempdir().unwrap();
    let daemonizer = daemonizer_at(temp.path());
    assert_eq!(daemonizer.status(), DaemonStatus::NotRunning);

    // No liveness check: a pid that cannot exist is still "running".
    fs::write(temp.path().join("prockit.pid"), "4294967294").unwrap();
    assert_eq!(
        daemonizer.status(),
        DaemonStatus::Running {
            pid: Some(4294967294)
        }
    );
}

#[test]
fn stop_without_pid_file_is_idempotent_and_emits_hooks() {
    let temp = tempfile::tempdir().unwrap();
    let mut daemonizer = daemonizer_at(temp.path());

    let stopping = Arc::new(AtomicUsize::new(0));
    let stopped = Arc::new(AtomicUsize::new(0));
    let stopping_count = Arc::clone(&stopping);
    let stopped_count = Arc::clone(&stopped);
    daemonizer.hooks_mut().on(HookKind::Stopping, move |_| {
        stopping_count.fetch_add(1, Ordering::SeqCst);
    });
    daemonizer.hooks_mut().on(HookKind::Stopped, move |_| {
        stopped_count.fetch_add(1, Ordering::SeqCst);
    });

    daemonizer.stop().unwrap();
    daemonizer.stop().unwrap();

    assert_eq!(stopping.load(Ordering::SeqCst), 2);
    assert_eq!(stopped.load(Ordering::SeqCst), 2);
}

#[test]
fn once_hook_fires_a_single_time_across_stops() {
    let temp = tempfile::tempdir().unwrap();
    let mut daemonizer = daemonizer_at(temp.path());

    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    daemonizer.hooks_mut().once(HookKind::Stopping, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    daemonizer.stop().unwrap();
    daemonizer.stop().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
