//! Scenario test runner
//!
//! Reads YAML test scenarios, replays their traces under a debugger fed
//! with scripted input, and asserts on the text the debugger printed.

mod config;
mod runner;

pub use config::*;
pub use runner::{execute_scenario, run_scenario, TestResult, Transcript};
