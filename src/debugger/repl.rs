//! Interactive command loop
//!
//! Runs while execution is suspended. A line starting with the command sigil
//! is a debugger command; anything else is accumulated as script code and
//! evaluated once the runtime reports it complete.

use crate::runtime::{Runtime, ScriptValue};

use super::command::COMMAND_SIGIL;
use super::handler::Flow;
use super::session::{DebuggerCore, Mode};

impl<R: Runtime> DebuggerCore<R> {
    /// Prompt and execute commands until one resumes the runtime
    pub(crate) fn interactive(&self, runtime: &R) {
        self.state.borrow_mut().select_frame(0);

        let mut code = String::new();
        loop {
            let prompt = if code.is_empty() {
                &self.config.prompt.command
            } else {
                &self.config.prompt.continuation
            };
            let line = {
                let mut streams = self.streams.borrow_mut();
                streams.output(prompt);
                streams.read_line()
            };
            let Some(line) = line else {
                tracing::warn!("Debugger input closed, continuing execution");
                self.set_mode(Mode::Run);
                return;
            };

            if code.is_empty() && (line.is_empty() || line.starts_with(COMMAND_SIGIL)) {
                if self.run_command_line(runtime, line) == Flow::Resume {
                    return;
                }
                continue;
            }

            if line.is_empty() {
                continue;
            }
            code.push_str(&line);
            code.push('\n');
            if line.trim().is_empty() || !runtime.can_evaluate(&code) {
                continue;
            }

            self.evaluate(runtime, &code);
            code.clear();
        }
    }

    /// Execute a command line, or repeat the last one for an empty line
    fn run_command_line(&self, runtime: &R, line: String) -> Flow {
        let line = {
            let mut state = self.state.borrow_mut();
            if line.is_empty() {
                state.last_command.clone()
            } else {
                state.last_command.clone_from(&line);
                line
            }
        };

        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Flow::Stay;
        };
        let name = name.strip_prefix(COMMAND_SIGIL).unwrap_or(name);
        let args: Vec<&str> = parts.collect();
        self.handle_command(runtime, name, &args)
    }

    /// Evaluate a complete snippet in the current context
    ///
    /// Hooks fired by the evaluation never stop, and the mode is left at
    /// `Run` so execution continues freely once the loop is exited.
    fn evaluate(&self, runtime: &R, code: &str) {
        self.set_mode(Mode::Run);
        self.state.borrow_mut().eval_depth += 1;
        tracing::debug!(code = code.trim_end(), "Evaluating");
        let result = runtime.evaluate(code, &self.config.eval.label);
        self.state.borrow_mut().eval_depth -= 1;

        match result {
            Ok(value) if value.is_undefined() => {}
            Ok(value) => self.error_message(&value.to_string()),
            Err(exception) => self.error_message(&exception.to_string()),
        }
        runtime.clear_exceptions();
    }
}
