//! Handlers behind the four command verbs.

use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use nix::sys::signal::Signal;
use tracing::{debug, error, warn};

use crate::config::{Config, PoolConfig, validate_config};
use crate::daemon::{DaemonStatus, Daemonizer, PidFile};
use crate::pool::{WorkerContext, WorkerPool};
use crate::telemetry::{TracingConfig, init_tracing};

fn build_daemonizer(config: &Config) -> anyhow::Result<Daemonizer> {
    let mut daemonizer = Daemonizer::new()?.workdir(&config.daemon.workdir);
    if let Some(path) = &config.daemon.pid_file {
        daemonizer = daemonizer.pid_file(PidFile::at(path));
    }
    Ok(daemonizer)
}

/// Detach and run the configured unit of work. The calling process exits at
/// the first fork point; this function only returns in the background
/// process, once the work is done.
pub fn handle_start(config: &Config) -> anyhow::Result<()> {
    let report = validate_config(config)?;

    // The tracing guard must outlive the daemonized task; the log file stays
    // open across the forks.
    let _guard = init_tracing(&TracingConfig::for_daemon(&config.daemon))?;
    for warning in &report.warnings {
        warn!(warning = %warning.message, "configuration warning");
    }

    let mut daemonizer = build_daemonizer(config)?;
    let pool_config = config.pool.clone();
    daemonizer.start(move || run_unit_of_work(pool_config))?;
    Ok(())
}

pub fn handle_stop(config: &Config) -> anyhow::Result<()> {
    let _guard = init_tracing(&TracingConfig::default())?;
    let mut daemonizer = build_daemonizer(config)?;
    daemonizer.stop()?;
    println!("stop requested");
    Ok(())
}

pub fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let daemonizer = build_daemonizer(config)?;
    match daemonizer.status() {
        DaemonStatus::Running { pid } => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "running": true, "pid": pid })
                );
            } else {
                match pid {
                    Some(pid) => println!("process is running (pid {pid})"),
                    None => println!("process is running"),
                }
            }
        }
        DaemonStatus::NotRunning => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "running": false, "pid": null })
                );
            } else {
                println!("process is not running");
            }
        }
    }
    Ok(())
}

pub fn handle_reload(config: &Config) -> anyhow::Result<()> {
    let report = validate_config(config)?;

    let _guard = init_tracing(&TracingConfig::for_daemon(&config.daemon))?;
    for warning in &report.warnings {
        warn!(warning = %warning.message, "configuration warning");
    }

    let mut daemonizer = build_daemonizer(config)?;
    let pool_config = config.pool.clone();
    daemonizer.reload(move || run_unit_of_work(pool_config))?;
    Ok(())
}

/// The daemonized task: supervise the configured command through a worker
/// pool, or idle until a termination signal when none is configured.
fn run_unit_of_work(config: PoolConfig) {
    if config.command.is_empty() {
        debug!("no pool command configured; idling");
        loop {
            thread::sleep(Duration::from_secs(3600));
        }
    }

    let mut pool = match build_pool(&config) {
        Ok(pool) => pool,
        Err(err) => {
            error!(error = %err, "failed to configure worker pool");
            std::process::exit(2);
        }
    };
    if let Err(err) = pool.run() {
        error!(error = %err, "worker pool failed");
        std::process::exit(2);
    }
}

fn build_pool(config: &PoolConfig) -> anyhow::Result<WorkerPool> {
    let kill_signal: Signal = config
        .kill_signal
        .parse()
        .with_context(|| format!("unknown kill signal '{}'", config.kill_signal))?;

    let mut pool = WorkerPool::new()?
        .total(config.total)
        .max(config.max)
        .title(&config.title)
        .kill_signal(kill_signal)
        .poll_interval(Duration::from_millis(config.poll_interval_ms));

    let command = config.command.clone();
    pool.bind_task(Arc::new(move |ctx| run_command(&command, ctx)));
    Ok(pool)
}

fn run_command(command: &[String], ctx: &WorkerContext) {
    let mut child = Command::new(&command[0]);
    child.args(&command[1..]);
    match child.status() {
        Ok(status) if status.success() => {
            debug!(pid = ctx.pid(), "worker command completed")
        }
        Ok(status) => {
            warn!(pid = ctx.pid(), code = status.code(), "worker command failed")
        }
        Err(err) => {
            warn!(pid = ctx.pid(), error = %err, "failed to spawn worker command")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_pool_applies_config() {
        let config = PoolConfig {
            total: 7,
            max: 3,
            kill_signal: "SIGTERM".into(),
            command: vec!["true".into()],
            ..PoolConfig::default()
        };
        let pool = build_pool(&config).unwrap();
        assert_eq!(pool.spawned(), 0);
        assert_eq!(pool.worker_count(), 0);
    }

    #[test]
    fn build_pool_rejects_unknown_signal() {
        let config = PoolConfig {
            kill_signal: "SIGDANCE".into(),
            command: vec!["true".into()],
            ..PoolConfig::default()
        };
        assert!(build_pool(&config).is_err());
    }

    #[test]
    fn build_daemonizer_honors_configured_pid_file() {
        let temp = tempfile::tempdir().unwrap();
        let pid_path = temp.path().join("prockit.pid");

        let mut config = Config::default();
        config.daemon.pid_file = Some(pid_path.clone());
        let daemonizer = build_daemonizer(&config).unwrap();
        assert_eq!(daemonizer.status(), DaemonStatus::NotRunning);

        std::fs::write(&pid_path, "555").unwrap();
        assert_eq!(
            daemonizer.status(),
            DaemonStatus::Running { pid: Some(555) }
        );
    }
}
