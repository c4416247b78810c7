//! Command handler for the interactive loop
//!
//! Translates parsed commands into mode changes, frame selection, breakpoint
//! operations and inspection output.

use crate::breakpoints::BreakpointId;
use crate::runtime::{display_value, Runtime, ScriptValue};

use super::command::{BreakpointSpec, CommandError, DebuggerCommand, HELP_TEXT};
use super::frames::FrameNavigator;
use super::session::{DebuggerCore, Mode};

/// What the command loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Keep prompting
    Stay,
    /// Leave the loop and let the runtime continue
    Resume,
}

impl<R: Runtime> DebuggerCore<R> {
    /// Run one command line (sigil already stripped)
    ///
    /// Failures are reported on the error stream and never leave the loop.
    pub(crate) fn handle_command(&self, runtime: &R, name: &str, args: &[&str]) -> Flow {
        let result = DebuggerCommand::parse(name, args)
            .and_then(|command| self.execute_command(runtime, command));
        match result {
            Ok(flow) => flow,
            Err(e) => {
                tracing::debug!(command = name, error = %e, "Command failed");
                self.error_message(&e.to_string());
                Flow::Stay
            }
        }
    }

    pub(crate) fn execute_command(
        &self,
        runtime: &R,
        command: DebuggerCommand,
    ) -> Result<Flow, CommandError> {
        match command {
            // === Execution Control ===
            DebuggerCommand::Continue => {
                self.set_mode(Mode::Run);
                Ok(Flow::Resume)
            }

            DebuggerCommand::Step => {
                self.set_mode(Mode::StepInto);
                Ok(Flow::Resume)
            }

            DebuggerCommand::Next => {
                self.set_mode(Mode::StepOver);
                self.state.borrow_mut().step_depth = 0;
                Ok(Flow::Resume)
            }

            // === Stack Navigation ===
            DebuggerCommand::Frame(index) => {
                let index = index.unwrap_or_else(|| self.current_frame_index());
                self.select_and_describe(runtime, index, CommandError::NoSuchFrame)?;
                Ok(Flow::Stay)
            }

            DebuggerCommand::Backtrace => {
                let frames = FrameNavigator::new(runtime);
                for (index, context) in frames.contexts().enumerate() {
                    self.message(&format!("#{index}  {}", frames.describe(context)));
                }
                Ok(Flow::Stay)
            }

            DebuggerCommand::Up => {
                let index = self.current_frame_index() + 1;
                self.select_and_describe(runtime, index, CommandError::InitialFrame)?;
                Ok(Flow::Stay)
            }

            DebuggerCommand::Down => {
                let index = self
                    .current_frame_index()
                    .checked_sub(1)
                    .ok_or(CommandError::BottomFrame)?;
                self.select_and_describe(runtime, index, CommandError::BottomFrame)?;
                Ok(Flow::Stay)
            }

            // === Breakpoints ===
            DebuggerCommand::Break {
                location,
                single_shot,
            } => {
                let message = match location {
                    BreakpointSpec::Line { file, line } => {
                        let id = {
                            let mut state = self.state.borrow_mut();
                            let id = state.breakpoints.set_location(&file, line);
                            state.breakpoints.set_single_shot(id, single_shot);
                            id
                        };
                        format!("Breakpoint {id} at {file}, line {line}.")
                    }
                    BreakpointSpec::Function { name } => {
                        let callable = runtime
                            .global_property(&name)
                            .and_then(|value| value.callable_id())
                            .ok_or_else(|| CommandError::FunctionNotDefined(name.clone()))?;
                        let id = {
                            let mut state = self.state.borrow_mut();
                            let id = state.breakpoints.set_callable(callable);
                            state.breakpoints.set_single_shot(id, single_shot);
                            id
                        };
                        format!("Breakpoint {id} at {name}().")
                    }
                };
                self.message(&message);
                Ok(Flow::Stay)
            }

            DebuggerCommand::Delete(id) => {
                self.state
                    .borrow_mut()
                    .breakpoints
                    .remove(id)
                    .ok_or_else(|| CommandError::NoBreakpoint(id.to_string()))?;
                Ok(Flow::Stay)
            }

            DebuggerCommand::Disable(id) => {
                self.set_breakpoint_enabled(id, false)?;
                Ok(Flow::Stay)
            }

            DebuggerCommand::Enable(id) => {
                self.set_breakpoint_enabled(id, true)?;
                Ok(Flow::Stay)
            }

            DebuggerCommand::InfoBreakpoints => {
                let rows: Vec<String> = self
                    .state
                    .borrow()
                    .breakpoints
                    .iter()
                    .map(|bp| {
                        format!(
                            "{:<4} {:<4} {:<3} {}",
                            bp.id.number(),
                            if bp.single_shot { "del" } else { "keep" },
                            if bp.enabled { "y" } else { "n" },
                            bp.kind
                        )
                    })
                    .collect();
                if rows.is_empty() {
                    self.message("No breakpoints.");
                } else {
                    self.message("Num  Disp Enb What");
                    for row in rows {
                        self.message(&row);
                    }
                }
                Ok(Flow::Stay)
            }

            // === Inspection ===
            DebuggerCommand::List(around) => {
                let lines = self.list_source(runtime, around)?;
                for line in lines {
                    self.message(&line);
                }
                Ok(Flow::Stay)
            }

            DebuggerCommand::InfoLocals => {
                let context = self.current_frame_context(runtime)?;
                for (name, value) in runtime.locals(context) {
                    self.message(&format!("{name} = {}", display_value(&value)));
                }
                Ok(Flow::Stay)
            }

            DebuggerCommand::Help => {
                self.message(HELP_TEXT);
                Ok(Flow::Stay)
            }
        }
    }

    fn set_breakpoint_enabled(&self, id: BreakpointId, enabled: bool) -> Result<(), CommandError> {
        if self.state.borrow_mut().breakpoints.set_enabled(id, enabled) {
            Ok(())
        } else {
            Err(CommandError::NoBreakpoint(id.to_string()))
        }
    }

    fn current_frame_context(&self, runtime: &R) -> Result<R::Context, CommandError> {
        FrameNavigator::new(runtime)
            .frame_context(self.current_frame_index())
            .ok_or(CommandError::NoSuchFrame)
    }

    /// Select frame `index` and print `#index  description`
    fn select_and_describe(
        &self,
        runtime: &R,
        index: usize,
        out_of_range: CommandError,
    ) -> Result<(), CommandError> {
        let frames = FrameNavigator::new(runtime);
        let context = frames.frame_context(index).ok_or(out_of_range)?;
        self.state.borrow_mut().select_frame(index);
        self.message(&format!("#{index}  {}", frames.describe(context)));
        Ok(())
    }

    /// Numbered source lines for `list`, advancing the list cursor
    fn list_source(&self, runtime: &R, around: Option<i64>) -> Result<Vec<String>, CommandError> {
        let context = self.current_frame_context(runtime)?;
        let frame_line = runtime.context_info(context).line;
        let window = self.config.list.window;

        let mut state = self.state.borrow_mut();
        let script_id = state
            .active_scripts
            .get(&context)
            .and_then(|stack| stack.last().copied())
            .ok_or(CommandError::NoSource)?;
        let cursor = state.list_cursor;
        let script = state.scripts.get_mut(&script_id).ok_or(CommandError::NoSource)?;

        let start = match (around, cursor) {
            (Some(line), _) => {
                let start = line.saturating_sub(5).max(1);
                u32::try_from(start).map_err(|_| CommandError::LineOutOfRange(line))?
            }
            (None, Some(cursor)) => cursor,
            (None, None) => {
                let line = frame_line.unwrap_or_else(|| script.base_line());
                script.base_line().max(line.saturating_sub(5))
            }
        };

        let lines: Vec<String> = (start..start.saturating_add(window))
            .map_while(|line| script.line_text(line).map(|text| format!("{line}\t{text}")))
            .collect();
        if lines.is_empty() {
            return Err(CommandError::LineOutOfRange(i64::from(start)));
        }

        state.list_cursor = Some(start.saturating_add(window));
        Ok(lines)
    }
}
