//! Test scenario configuration types
//!
//! Defines the data structures for deserializing YAML test scenarios.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::{Error, Result};
use crate::replay::Trace;

/// A complete test scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    pub description: Option<String>,
    /// Inline execution trace
    pub trace: Option<Trace>,
    /// Trace file, relative to the scenario file
    pub trace_file: Option<PathBuf>,
    /// Stop at the first statement
    #[serde(default)]
    pub stop_on_entry: bool,
    /// Breakpoints set before the trace runs (`file:line` or a global function name)
    #[serde(default)]
    pub breakpoints: Vec<String>,
    /// Text typed at the debugger prompt
    #[serde(default)]
    pub input: String,
    /// Assertions on what the debugger printed
    #[serde(default)]
    pub expect: OutputExpectation,
}

/// Expectations for the debugger's output and error streams
#[derive(Deserialize, Debug, Default)]
pub struct OutputExpectation {
    /// Exact output stream contents
    pub output_equals: Option<String>,
    /// Substrings that must appear in the output stream
    #[serde(default)]
    pub output_contains: Vec<String>,
    /// Substrings that must not appear in the output stream
    #[serde(default)]
    pub output_not_contains: Vec<String>,
    /// Substrings that must appear in the error stream
    #[serde(default)]
    pub error_contains: Vec<String>,
}

impl OutputExpectation {
    /// Number of individual checks
    pub fn len(&self) -> usize {
        usize::from(self.output_equals.is_some())
            + self.output_contains.len()
            + self.output_not_contains.len()
            + self.error_contains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TestScenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read test scenario '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse test scenario: {}", e)))
    }

    /// The scenario's trace, reading `trace_file` relative to `base_dir`
    pub fn resolve_trace(&self, base_dir: &Path) -> Result<Trace> {
        match (&self.trace, &self.trace_file) {
            (Some(trace), None) => Ok(trace.clone()),
            (None, Some(file)) => {
                let path = if file.is_relative() {
                    base_dir.join(file)
                } else {
                    file.clone()
                };
                Trace::load(&path)
            }
            (Some(_), Some(_)) => Err(Error::Config(format!(
                "Scenario '{}' has both trace and trace_file",
                self.name
            ))),
            (None, None) => Err(Error::Config(format!(
                "Scenario '{}' needs a trace or a trace_file",
                self.name
            ))),
        }
    }
}
