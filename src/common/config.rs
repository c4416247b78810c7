//! Configuration file handling

use serde::Deserialize;
use std::path::Path;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Prompt strings shown by the command loop
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Source listing settings
    #[serde(default)]
    pub list: ListConfig,

    /// REPL evaluation settings
    #[serde(default)]
    pub eval: EvalConfig,
}

/// Prompt settings
#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    /// Prompt printed while waiting for a command
    #[serde(default = "default_command_prompt")]
    pub command: String,

    /// Prompt printed while an expression is incomplete
    #[serde(default = "default_continuation_prompt")]
    pub continuation: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            command: default_command_prompt(),
            continuation: default_continuation_prompt(),
        }
    }
}

fn default_command_prompt() -> String {
    "(qsdbg) ".to_string()
}
fn default_continuation_prompt() -> String {
    ".... ".to_string()
}

/// Source listing settings
#[derive(Debug, Deserialize, Clone)]
pub struct ListConfig {
    /// Number of lines printed by each `list` command
    #[serde(default = "default_list_window")]
    pub window: u32,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            window: default_list_window(),
        }
    }
}

fn default_list_window() -> u32 {
    10
}

/// REPL evaluation settings
#[derive(Debug, Deserialize, Clone)]
pub struct EvalConfig {
    /// File name the runtime reports for typed-in snippets
    #[serde(default = "default_eval_label")]
    pub label: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            label: default_eval_label(),
        }
    }
}

fn default_eval_label() -> String {
    "typein".to_string()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.list.window == 0 {
            return Err(Error::Config("list.window must be at least 1".to_string()));
        }
        Ok(())
    }
}
