//! Script Debugger - an interactive debugger core for embedded script runtimes
//!
//! The debugger attaches to a host runtime through the hook interface in
//! [`runtime`], stops at breakpoints or while stepping, and serves a small
//! textual command protocol on injectable streams. The [`replay`] runtime
//! drives it from recorded traces for the CLI and the test suite.

pub mod breakpoints;
pub mod cli;
pub mod commands;
pub mod common;
pub mod debugger;
pub mod replay;
pub mod runtime;
pub mod source;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use debugger::{Mode, ScriptDebugger, SharedBuffer};
pub use replay::{ReplayRuntime, ReplayValue};
pub use runtime::{Agent, Runtime, ScriptValue};
