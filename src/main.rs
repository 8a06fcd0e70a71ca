use clap::Parser;

use prockit::cli::Cli;
use prockit::process;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !cli.has_verb() {
        println!("prockit - process lifecycle toolkit");
        println!("Use --start, --stop, --status or --reload (see --help)");
        return Ok(());
    }

    process::ensure_supported()?;
    dispatch(cli)
}

#[cfg(unix)]
fn dispatch(cli: Cli) -> anyhow::Result<()> {
    use prockit::cli::commands::daemon;
    use prockit::config::Config;

    let config = Config::load_or_default(cli.config.as_deref())?;
    if cli.start {
        daemon::handle_start(&config)
    } else if cli.stop {
        daemon::handle_stop(&config)
    } else if cli.status {
        daemon::handle_status(&config, cli.json)
    } else {
        daemon::handle_reload(&config)
    }
}

#[cfg(not(unix))]
fn dispatch(_cli: Cli) -> anyhow::Result<()> {
    unreachable!("ensure_supported rejects non-unix platforms")
}
