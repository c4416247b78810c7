//! Debugger core: execution-mode state machine and instrumentation hooks
//!
//! One [`DebuggerCore`] exists per attached runtime. It receives the agent
//! hooks, decides whether execution should stop, and runs the interactive
//! command loop on the runtime's own stack when it does.
//!
//! State lives behind a `RefCell` and no borrow is held across a call that
//! can re-enter the runtime, so hooks fired while a REPL snippet is being
//! evaluated find the state available.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use crate::breakpoints::{BreakpointHit, BreakpointManager, MatchTier, PositionQuery};
use crate::common::config::Config;
use crate::runtime::{Agent, Runtime, ScriptId, ScriptValue};
use crate::source::ScriptSource;

use super::streams::Streams;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Stop only at breakpoints and unhandled exceptions
    #[default]
    Run,
    /// Stop at the next statement at any depth
    StepInto,
    /// Stop at the next statement at or above the depth stepping began at
    StepOver,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::StepInto => write!(f, "step-into"),
            Self::StepOver => write!(f, "step-over"),
        }
    }
}

/// Mutable state of a debugger instance
pub(crate) struct SessionState<C> {
    pub(crate) mode: Mode,
    /// Calls entered minus calls exited since `next`; negative once the
    /// frame `next` was issued in has returned
    pub(crate) step_depth: i32,
    /// REPL evaluations in progress; hooks never stop while non-zero
    pub(crate) eval_depth: u32,
    pub(crate) scripts: HashMap<ScriptId, ScriptSource>,
    /// Scripts executing in each live context, innermost last
    pub(crate) active_scripts: HashMap<C, Vec<ScriptId>>,
    pub(crate) breakpoints: BreakpointManager,
    pub(crate) current_frame_index: usize,
    /// Where a bare `list` resumes
    pub(crate) list_cursor: Option<u32>,
    pub(crate) last_command: String,
}

impl<C> Default for SessionState<C> {
    fn default() -> Self {
        Self {
            mode: Mode::Run,
            step_depth: 0,
            eval_depth: 0,
            scripts: HashMap::new(),
            active_scripts: HashMap::new(),
            breakpoints: BreakpointManager::new(),
            current_frame_index: 0,
            list_cursor: None,
            last_command: String::new(),
        }
    }
}

impl<C> SessionState<C> {
    /// Select a frame; a fresh selection restarts `list`
    pub(crate) fn select_frame(&mut self, index: usize) {
        self.current_frame_index = index;
        self.list_cursor = None;
    }
}

/// Debugger instance bound to one runtime
pub struct DebuggerCore<R: Runtime> {
    pub(crate) config: Config,
    pub(crate) state: RefCell<SessionState<R::Context>>,
    pub(crate) streams: RefCell<Streams>,
}

impl<R: Runtime> DebuggerCore<R> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: RefCell::new(SessionState::default()),
            streams: RefCell::new(Streams::stdio()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.state.borrow().mode
    }

    pub fn set_mode(&self, mode: Mode) {
        let mut state = self.state.borrow_mut();
        tracing::debug!(from = %state.mode, to = %mode, "Mode change");
        state.mode = mode;
    }

    pub fn step_depth(&self) -> i32 {
        self.state.borrow().step_depth
    }

    pub fn current_frame_index(&self) -> usize {
        self.state.borrow().current_frame_index
    }

    pub(crate) fn message(&self, text: &str) {
        self.streams.borrow_mut().message(text);
    }

    pub(crate) fn error_message(&self, text: &str) {
        self.streams.borrow_mut().error_message(text);
    }

    /// Text announced when a breakpoint stops execution
    fn hit_message(
        hit: &BreakpointHit,
        file: Option<&str>,
        line: u32,
        function_name: Option<&str>,
        function_file: Option<&str>,
    ) -> String {
        let number = hit.id.number();
        let function = function_name.unwrap_or_default();
        match hit.tier {
            MatchTier::Location => {
                format!("Breakpoint {number} at {}:{line}", file.unwrap_or_default())
            }
            MatchTier::Callable => format!("Breakpoint {number}, {function}()"),
            MatchTier::NamedFunction => format!(
                "Breakpoint {number}, {function}():{}",
                function_file.unwrap_or_default()
            ),
        }
    }
}

impl<R: Runtime> Agent<R> for DebuggerCore<R> {
    fn script_load(&self, _runtime: &R, id: ScriptId, program: &str, file_name: &str, base_line: u32) {
        tracing::debug!(script = id, file = file_name, base_line, "Script loaded");
        self.state
            .borrow_mut()
            .scripts
            .insert(id, ScriptSource::new(program, file_name, base_line));
    }

    fn script_unload(&self, _runtime: &R, id: ScriptId) {
        tracing::debug!(script = id, "Script unloaded");
        self.state.borrow_mut().scripts.remove(&id);
    }

    fn function_entry(&self, runtime: &R, script_id: Option<ScriptId>) {
        let context = runtime.current_context();
        let mut state = self.state.borrow_mut();
        if let Some(id) = script_id {
            state.active_scripts.entry(context).or_default().push(id);
        }
        if state.mode == Mode::StepOver {
            state.step_depth += 1;
        }
        tracing::trace!(?context, script = ?script_id, depth = state.step_depth, "Function entry");
    }

    fn function_exit(&self, runtime: &R, script_id: Option<ScriptId>, _return_value: &R::Value) {
        let context = runtime.current_context();
        let mut state = self.state.borrow_mut();
        if let Some(id) = script_id {
            let top = state.active_scripts.get_mut(&context).and_then(Vec::pop);
            if top != Some(id) {
                tracing::error!(
                    ?context,
                    script = id,
                    top = ?top,
                    "Function exit does not match the active script of its context"
                );
                debug_assert_eq!(top, Some(id), "unpaired function exit");
            }
            if state.active_scripts.get(&context).is_some_and(Vec::is_empty) {
                state.active_scripts.remove(&context);
            }
        }
        if state.mode == Mode::StepOver {
            state.step_depth -= 1;
        }
        tracing::trace!(?context, script = ?script_id, depth = state.step_depth, "Function exit");
    }

    fn position_change(&self, runtime: &R, script_id: ScriptId, line: u32, _column: u32) {
        let (hit_message, source_line) = {
            let mut state = self.state.borrow_mut();
            if state.eval_depth > 0 {
                return;
            }

            let mut hit_message = None;
            if state.breakpoints.has_breakpoints() {
                let context = runtime.current_context();
                let info = runtime.context_info(context);
                let callee = runtime.callee(context).callable_id();
                let file = state
                    .scripts
                    .get(&script_id)
                    .map(|script| script.file_name().to_string());
                let query = PositionQuery {
                    file: file.as_deref(),
                    line,
                    callee,
                    function_name: info.function_name.as_deref(),
                    function_file: info.file_name.as_deref(),
                };
                if let Some(hit) = state.breakpoints.check(&query) {
                    tracing::info!(breakpoint = %hit.id, tier = ?hit.tier, line, "Breakpoint hit");
                    hit_message = Some(Self::hit_message(
                        &hit,
                        query.file,
                        line,
                        query.function_name,
                        query.function_file,
                    ));
                }
            }

            let interrupt = match state.mode {
                Mode::Run => false,
                Mode::StepInto => true,
                Mode::StepOver => state.step_depth <= 0,
            } || hit_message.is_some();
            if !interrupt {
                return;
            }

            let source_line = match state.scripts.get_mut(&script_id) {
                Some(script) => script.line_text(line).map(str::to_string),
                None => {
                    tracing::warn!(script = script_id, "Stopped in a script that was never loaded");
                    None
                }
            };
            (hit_message, source_line)
        };

        if let Some(message) = hit_message {
            self.message(&message);
        }
        // The line number is printed even without source text
        self.message(&format!("{line}\t{}", source_line.as_deref().unwrap_or_default()));
        if source_line.is_none() {
            self.error_message(&format!("No source text available for line {line}."));
        }
        self.interactive(runtime);
    }

    fn exception_throw(&self, runtime: &R, script_id: ScriptId, exception: &R::Value, has_handler: bool) {
        if has_handler || self.state.borrow().eval_depth > 0 {
            return;
        }
        tracing::info!(script = script_id, "Uncaught exception");
        self.error_message(&format!("uncaught exception: {exception}"));
        self.interactive(runtime);
    }
}
