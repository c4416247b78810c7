//! Test runner implementation
//!
//! Replays a scenario's trace under a debugger whose streams are captured
//! in memory, then checks the captured text against the expectations.

use std::io::Cursor;
use std::path::Path;
use std::rc::Rc;

use colored::Colorize;
use serde::Serialize;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::debugger::{ScriptDebugger, SharedBuffer};
use crate::replay::ReplayRuntime;

use super::config::{OutputExpectation, TestScenario};

/// Result of a test run
#[derive(Debug, Serialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub checks_run: usize,
    pub checks_total: usize,
    pub error: Option<String>,
}

/// What the debugger printed while a scenario ran
#[derive(Debug, Default)]
pub struct Transcript {
    pub output: String,
    pub error: String,
}

/// Run a test scenario from a YAML file, reporting progress on stdout
pub fn run_scenario(path: &Path, verbose: bool) -> Result<TestResult> {
    let scenario = TestScenario::load(path)?;
    let base_dir = path.parent().unwrap_or(Path::new("."));

    println!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        scenario.name.white().bold()
    );
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    let (result, transcript) = execute_scenario(&scenario, base_dir)?;

    if verbose {
        println!("\n{}", "Output:".cyan());
        for line in transcript.output.lines() {
            println!("  {}", line.dimmed());
        }
        if !transcript.error.is_empty() {
            println!("\n{}", "Errors:".cyan());
            for line in transcript.error.lines() {
                println!("  {}", line.dimmed());
            }
        }
    }

    match &result.error {
        None => println!(
            "\n{} {}\n",
            "✓".green().bold(),
            "Test Passed".green().bold()
        ),
        Some(e) => println!(
            "\n{} {} ({}/{} checks)\n  {}\n",
            "✗".red().bold(),
            "Test Failed".red().bold(),
            result.checks_run,
            result.checks_total,
            e
        ),
    }

    Ok(result)
}

/// Run a scenario without printing anything
///
/// Errors loading the trace are returned as `Err`; anything that goes wrong
/// while replaying it is a test failure.
pub fn execute_scenario(scenario: &TestScenario, base_dir: &Path) -> Result<(TestResult, Transcript)> {
    let trace = scenario.resolve_trace(base_dir)?;
    let runtime = Rc::new(ReplayRuntime::new(trace)?);
    let checks_total = scenario.expect.len();

    let output = SharedBuffer::new();
    let error = SharedBuffer::new();
    let mut debugger = ScriptDebugger::new(Config::default());
    debugger.set_input_stream(Box::new(Cursor::new(scenario.input.clone().into_bytes())));
    debugger.set_output_stream(Box::new(output.clone()));
    debugger.set_error_stream(Box::new(error.clone()));
    debugger.attach(runtime.clone());

    let failure = |error: String, checks_run: usize| TestResult {
        name: scenario.name.clone(),
        passed: false,
        checks_run,
        checks_total,
        error: Some(error),
    };

    for location in &scenario.breakpoints {
        if let Err(e) = debugger.set_breakpoint_at(location) {
            return Ok((failure(e.to_string(), 0), Transcript::default()));
        }
    }
    if scenario.stop_on_entry {
        debugger.break_at_next_statement();
    }

    let replayed = runtime.run();
    debugger.detach();
    let transcript = Transcript {
        output: output.contents(),
        error: error.contents(),
    };
    if let Err(e) = replayed {
        return Ok((failure(e.to_string(), 0), transcript));
    }

    let result = match check_expectations(&scenario.expect, &transcript) {
        Ok(()) => TestResult {
            name: scenario.name.clone(),
            passed: true,
            checks_run: checks_total,
            checks_total,
            error: None,
        },
        Err((e, checks_run)) => failure(e.to_string(), checks_run),
    };
    Ok((result, transcript))
}

/// Check every expectation, returning the first failure and how many checks ran
fn check_expectations(
    expect: &OutputExpectation,
    transcript: &Transcript,
) -> std::result::Result<(), (Error, usize)> {
    let mut checks_run = 0;
    let mut check = |ok: bool, message: String| {
        checks_run += 1;
        if ok {
            Ok(())
        } else {
            Err((Error::TestAssertion(message), checks_run))
        }
    };

    if let Some(expected) = &expect.output_equals {
        check(
            transcript.output == *expected,
            format!(
                "Expected output {:?}, got {:?}",
                expected, transcript.output
            ),
        )?;
    }
    for needle in &expect.output_contains {
        check(
            transcript.output.contains(needle.as_str()),
            format!("Expected output to contain {:?}", needle),
        )?;
    }
    for needle in &expect.output_not_contains {
        check(
            !transcript.output.contains(needle.as_str()),
            format!("Expected output not to contain {:?}", needle),
        )?;
    }
    for needle in &expect.error_contains {
        check(
            transcript.error.contains(needle.as_str()),
            format!("Expected errors to contain {:?}", needle),
        )?;
    }
    Ok(())
}
