use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// Process-lifecycle toolkit: daemonize a task and supervise forked workers.
///
/// The four verbs are mutually exclusive boolean flags; invoking with none of
/// them performs no operation.
#[derive(Parser, Debug)]
#[command(name = "prockit", author, version, about, long_about = None)]
#[command(group(ArgGroup::new("verb").args(["start", "stop", "status", "reload"])))]
pub struct Cli {
    /// Start the daemon
    #[arg(long)]
    pub start: bool,

    /// Stop the running daemon
    #[arg(long)]
    pub stop: bool,

    /// Report whether a daemon instance is running
    #[arg(long)]
    pub status: bool,

    /// Stop the running daemon, then start a new one
    #[arg(long)]
    pub reload: bool,

    /// Path to the configuration file
    #[arg(long, value_name = "PATH", env = "PROCKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output status as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Was any verb selected at all?
    pub fn has_verb(&self) -> bool {
        self.start || self.stop || self.status || self.reload
    }
}
