//! CLI command definitions
//!
//! Defines the clap commands for the `scriptdbg` binary.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Replay an execution trace under the interactive debugger
    Replay {
        /// Path to the YAML trace file
        trace: PathBuf,

        /// Set initial breakpoint(s) before the trace runs (file:line or function name)
        /// Can be specified multiple times: --break add --break main.js:42
        #[arg(long = "break", short = 'b')]
        breakpoints: Vec<String>,

        /// Stop at the first statement
        #[arg(long)]
        stop_on_entry: bool,

        /// Configuration file to use instead of the default one
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also write diagnostics to a log file (the default one if no path is given)
        #[arg(long, num_args = 0..=1)]
        log_file: Option<Option<PathBuf>>,
    },

    /// Execute test scenarios defined in YAML files
    Test {
        /// Paths to the YAML test scenario files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Show the debugger transcript of each scenario
        #[arg(long, short)]
        verbose: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration and log file locations
    Paths {
        /// Create the configuration directory if it is missing
        #[arg(long)]
        create: bool,
    },
}
