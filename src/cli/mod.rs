//! CLI command handling
//!
//! Runs the debugger against trace files and reports scenario results.

use std::path::Path;
use std::rc::Rc;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{paths, Error, Result};
use crate::debugger::ScriptDebugger;
use crate::replay::{ReplayRuntime, Trace};
use crate::testing;

/// Dispatch a CLI command
pub fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Replay {
            trace,
            breakpoints,
            stop_on_entry,
            config,
            log_file: _,
        } => {
            let config = match config {
                Some(path) => Config::load_from(&path)?,
                None => Config::load()?,
            };
            replay(&trace, &breakpoints, stop_on_entry, config)
        }

        Commands::Test {
            paths,
            verbose,
            json,
        } => {
            let mut results = Vec::with_capacity(paths.len());
            for path in &paths {
                let result = if json {
                    let scenario = testing::TestScenario::load(path)?;
                    let base_dir = path.parent().unwrap_or(Path::new("."));
                    testing::execute_scenario(&scenario, base_dir)?.0
                } else {
                    testing::run_scenario(path, verbose)?
                };
                results.push(result);
            }

            let failed = results.iter().filter(|r| !r.passed).count();
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.len() > 1 {
                let summary = format!("{} passed, {} failed", results.len() - failed, failed);
                if failed == 0 {
                    println!("{}", summary.green().bold());
                } else {
                    println!("{}", summary.red().bold());
                }
            }

            if failed > 0 {
                return Err(Error::TestAssertion(format!(
                    "{} of {} scenarios failed",
                    failed,
                    results.len()
                )));
            }
            Ok(())
        }

        Commands::Paths { create } => {
            if create {
                if let Some(dir) = paths::ensure_config_dir()? {
                    println!("Config directory ready: {}", dir.display());
                }
            }
            let show = |label: &str, path: Option<std::path::PathBuf>| match path {
                Some(path) => println!("{label}: {}", path.display()),
                None => println!("{label}: (unavailable)"),
            };
            show("Config file", paths::config_path());
            show("Log directory", paths::log_dir());
            show("Default log file", paths::default_log_file());
            Ok(())
        }
    }
}

/// Run a trace with the debugger on the process's standard streams
fn replay(trace: &Path, breakpoints: &[String], stop_on_entry: bool, config: Config) -> Result<()> {
    let trace = Trace::load(trace)?;
    let runtime = Rc::new(ReplayRuntime::new(trace)?);

    let mut debugger = ScriptDebugger::new(config);
    debugger.attach(runtime.clone());

    for location in breakpoints {
        let id = debugger.set_breakpoint_at(location)?;
        println!("Breakpoint {} at {}", id, location);
    }
    if stop_on_entry {
        debugger.break_at_next_statement();
    }

    runtime.run()?;
    debugger.detach();

    if let Some(exception) = runtime.pending_exception() {
        println!("Trace ended with uncaught exception: {}", exception);
    } else {
        println!("Trace finished");
    }
    Ok(())
}
