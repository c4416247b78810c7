//! Interactive debugger attached to a script runtime
//!
//! [`ScriptDebugger`] is the embedding API: attach it to a runtime, set
//! breakpoints, optionally redirect its streams, then let the runtime run.
//! Whenever execution stops the debugger takes over its streams and runs
//! the command loop until a resume command is given.

pub mod command;
pub mod frames;
mod handler;
mod repl;
pub mod session;
pub mod streams;

use std::io::{BufRead, Write};
use std::rc::Rc;

use crate::breakpoints::{Breakpoint, BreakpointId};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::runtime::{Agent, Runtime, ScriptValue};

pub use command::{BreakpointSpec, CommandError, DebuggerCommand};
pub use frames::FrameNavigator;
pub use session::{DebuggerCore, Mode};
pub use streams::{SharedBuffer, Streams};

/// Debugger facade owned by the embedding application
pub struct ScriptDebugger<R: Runtime + 'static> {
    core: Rc<DebuggerCore<R>>,
    runtime: Option<Rc<R>>,
}

impl<R: Runtime + 'static> ScriptDebugger<R> {
    pub fn new(config: Config) -> Self {
        Self {
            core: Rc::new(DebuggerCore::new(config)),
            runtime: None,
        }
    }

    /// Install this debugger as the runtime's agent
    ///
    /// A previously attached runtime is detached first.
    pub fn attach(&mut self, runtime: Rc<R>) {
        self.detach();
        tracing::info!("Attaching debugger");
        let agent: Rc<dyn Agent<R>> = self.core.clone();
        runtime.set_agent(Some(agent));
        self.runtime = Some(runtime);
    }

    /// Remove this debugger from its runtime, if attached
    pub fn detach(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            tracing::info!("Detaching debugger");
            runtime.set_agent(None);
        }
    }

    pub fn runtime(&self) -> Option<&Rc<R>> {
        self.runtime.as_ref()
    }

    /// Stop at the next statement executed, at any depth
    pub fn break_at_next_statement(&self) {
        self.core.set_mode(Mode::StepInto);
    }

    /// Break at `file:line`
    pub fn set_breakpoint(&self, file: &str, line: u32) -> BreakpointId {
        self.core
            .state
            .borrow_mut()
            .breakpoints
            .set_location(file, line)
    }

    /// Break in every function declared as `name` in `file`
    pub fn set_function_breakpoint(&self, name: &str, file: &str) -> BreakpointId {
        self.core
            .state
            .borrow_mut()
            .breakpoints
            .set_named_function(name, file)
    }

    /// Break in a specific function object
    pub fn set_callable_breakpoint(&self, function: &R::Value) -> Result<BreakpointId> {
        let callable = function
            .callable_id()
            .ok_or_else(|| Error::NotCallable(function.to_string()))?;
        Ok(self.core.state.borrow_mut().breakpoints.set_callable(callable))
    }

    /// Set a breakpoint from `file:line` or a global function name
    ///
    /// Function names are looked up in the attached runtime now; a function
    /// defined later is not picked up.
    pub fn set_breakpoint_at(&self, location: &str) -> Result<BreakpointId> {
        let spec = BreakpointSpec::parse(location)
            .map_err(|e| Error::InvalidLocation(format!("{location}: {e}")))?;
        match spec {
            BreakpointSpec::Line { file, line } => Ok(self.set_breakpoint(&file, line)),
            BreakpointSpec::Function { name } => {
                let function = self
                    .runtime
                    .as_ref()
                    .and_then(|runtime| runtime.global_property(&name))
                    .ok_or(Error::NotCallable(name))?;
                self.set_callable_breakpoint(&function)
            }
        }
    }

    pub fn remove_breakpoint(&self, id: BreakpointId) -> bool {
        self.core.state.borrow_mut().breakpoints.remove(id).is_some()
    }

    pub fn set_breakpoint_enabled(&self, id: BreakpointId, enabled: bool) -> bool {
        self.core
            .state
            .borrow_mut()
            .breakpoints
            .set_enabled(id, enabled)
    }

    pub fn set_breakpoint_single_shot(&self, id: BreakpointId, single_shot: bool) -> bool {
        self.core
            .state
            .borrow_mut()
            .breakpoints
            .set_single_shot(id, single_shot)
    }

    /// Snapshot of all breakpoints, ordered by id
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.core.state.borrow().breakpoints.iter().cloned().collect()
    }

    pub fn mode(&self) -> Mode {
        self.core.mode()
    }

    pub fn step_depth(&self) -> i32 {
        self.core.step_depth()
    }

    pub fn current_frame_index(&self) -> usize {
        self.core.current_frame_index()
    }

    /// Replace the command input stream, returning the previous one
    pub fn set_input_stream(&self, input: Box<dyn BufRead>) -> Box<dyn BufRead> {
        std::mem::replace(&mut self.core.streams.borrow_mut().input, input)
    }

    /// Replace the output stream, returning the previous one
    pub fn set_output_stream(&self, output: Box<dyn Write>) -> Box<dyn Write> {
        std::mem::replace(&mut self.core.streams.borrow_mut().output, output)
    }

    /// Replace the error stream, returning the previous one
    pub fn set_error_stream(&self, error: Box<dyn Write>) -> Box<dyn Write> {
        std::mem::replace(&mut self.core.streams.borrow_mut().error, error)
    }
}

impl<R: Runtime + 'static> Drop for ScriptDebugger<R> {
    fn drop(&mut self) {
        self.detach();
    }
}
