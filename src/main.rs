//! Script Debugger CLI - interactive debugger for replayed script executions
//!
//! Replays recorded execution traces through the debugger core so it can be
//! driven from a terminal, and runs YAML test scenarios against it.

use clap::Parser;
use scriptdbg::cli;
use scriptdbg::commands::Commands;
use scriptdbg::common::{logging, paths};

#[derive(Parser)]
#[command(name = "scriptdbg", about = "Interactive script debugger")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_file = match &cli.command {
        Commands::Replay {
            log_file: Some(path),
            ..
        } => path.clone().or_else(paths::default_log_file),
        _ => None,
    };
    match log_file {
        Some(path) => {
            if let Err(e) = logging::init_with_file(&path) {
                eprintln!("Error: cannot open log file '{}': {e}", path.display());
                std::process::exit(1);
            }
        }
        None => logging::init_cli(),
    }

    if let Err(e) = cli::dispatch(cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
