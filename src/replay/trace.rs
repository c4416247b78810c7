//! Execution trace file format
//!
//! A trace lists the scripts and functions of a recorded run plus the
//! sequence of execution events to replay through the debugger hooks.

use std::path::Path;

use serde::Deserialize;

use crate::common::{Error, Result};
use crate::runtime::ScriptId;

/// A complete trace loaded from YAML
#[derive(Deserialize, Debug, Clone)]
pub struct Trace {
    /// Scripts that `load` events refer to
    #[serde(default)]
    pub scripts: Vec<TraceScript>,
    /// Functions that `call` events and `&name` values refer to
    #[serde(default)]
    pub functions: Vec<TraceFunction>,
    /// Properties of the global object
    #[serde(default)]
    pub globals: serde_yaml::Mapping,
    pub events: Vec<TraceEvent>,
}

/// Source of a script
#[derive(Deserialize, Debug, Clone)]
pub struct TraceScript {
    pub id: ScriptId,
    pub file: String,
    /// Line number of the first line of `source`
    #[serde(default = "default_start_line")]
    pub start_line: u32,
    #[serde(default)]
    pub source: String,
}

fn default_start_line() -> u32 {
    1
}

/// A function that can be called during the trace
#[derive(Deserialize, Debug, Clone)]
pub struct TraceFunction {
    pub name: String,
    /// Declaring script; required unless `native`
    pub script: Option<ScriptId>,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub native: bool,
}

/// One execution event
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// The runtime compiled a script
    Load { script: ScriptId },
    /// The runtime discarded a script
    Unload { script: ScriptId },
    /// A script's top-level program starts in the current context
    Enter { script: ScriptId },
    /// The innermost program of the current context finishes
    Exit { value: Option<serde_yaml::Value> },
    /// A function is called, creating a new context
    Call {
        function: String,
        #[serde(default)]
        args: Vec<serde_yaml::Value>,
        /// Local bindings; defaults to the parameters bound to `args`
        locals: Option<serde_yaml::Mapping>,
    },
    /// The innermost function returns, removing its context
    Return { value: Option<serde_yaml::Value> },
    /// Execution reaches a line of the current script
    Line {
        line: u32,
        #[serde(default)]
        column: u32,
    },
    /// A binding in the current context changes
    Set { name: String, value: serde_yaml::Value },
    /// An exception is thrown in the current script
    Throw {
        message: String,
        #[serde(default)]
        handled: bool,
    },
}

impl Trace {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::TraceParse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        Self::from_yaml(&content)
    }
}
