//! Runtime that replays a recorded trace through the agent hooks
//!
//! Each trace event updates the simulated call stack and then fires the
//! matching hook. No state borrow is held while a hook runs, so the
//! debugger is free to query the runtime or evaluate code from inside it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::common::{Error, Result};
use crate::runtime::{Agent, CallableId, ContextInfo, FunctionKind, Runtime, ScriptId};

use super::eval::{self, Environment};
use super::trace::{Trace, TraceEvent, TraceScript};
use super::value::{yaml_key, ReplayValue};

/// Handle of a simulated execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplayContext(u64);

#[derive(Debug, Clone)]
struct Function {
    name: String,
    script: Option<ScriptId>,
    params: Vec<String>,
    native: bool,
}

/// An event with its values resolved
#[derive(Debug, Clone)]
enum Step {
    Load(ScriptId),
    Unload(ScriptId),
    Enter(ScriptId),
    Exit(ReplayValue),
    Call {
        function: CallableId,
        args: Vec<ReplayValue>,
        locals: Option<Vec<(String, ReplayValue)>>,
    },
    Return(ReplayValue),
    Line { line: u32, column: u32 },
    Set { name: String, value: ReplayValue },
    Throw { message: String, handled: bool },
}

#[derive(Debug)]
struct Frame {
    context: ReplayContext,
    /// `None` for the global frame
    function: Option<CallableId>,
    args: Vec<ReplayValue>,
    locals: Vec<(String, ReplayValue)>,
    /// Programs running in this frame, innermost last
    scripts: Vec<ScriptId>,
    line: Option<u32>,
}

impl Frame {
    fn new(context: ReplayContext, function: Option<CallableId>) -> Self {
        Self {
            context,
            function,
            args: Vec::new(),
            locals: Vec::new(),
            scripts: Vec::new(),
            line: None,
        }
    }
}

#[derive(Debug)]
struct State {
    /// Call stack, outermost (global) first
    frames: Vec<Frame>,
    globals: Vec<(String, ReplayValue)>,
    next_context: u64,
    next_eval_script: ScriptId,
    pending_exception: Option<ReplayValue>,
}

impl State {
    fn current(&self) -> &Frame {
        // The global frame is never popped
        &self.frames[self.frames.len() - 1]
    }

    fn current_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn frame(&self, context: ReplayContext) -> Option<(usize, &Frame)> {
        self.frames
            .iter()
            .enumerate()
            .find(|(_, frame)| frame.context == context)
    }
}

impl Environment for State {
    fn lookup(&self, name: &str) -> Option<ReplayValue> {
        let frame = self.current();
        if frame.function.is_some() {
            if let Some((_, value)) = frame.locals.iter().find(|(n, _)| n == name) {
                return Some(value.clone());
            }
        }
        self.globals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.clone())
    }

    fn assign(&mut self, name: &str, value: ReplayValue) {
        let in_function = self.current().function.is_some();
        if in_function {
            if let Some(slot) = self.current_mut().locals.iter_mut().find(|(n, _)| n == name) {
                slot.1 = value;
                return;
            }
        }
        set_binding(&mut self.globals, name, value);
    }
}

fn set_binding(bindings: &mut Vec<(String, ReplayValue)>, name: &str, value: ReplayValue) {
    match bindings.iter_mut().find(|(n, _)| n == name) {
        Some(slot) => slot.1 = value,
        None => bindings.push((name.to_string(), value)),
    }
}

/// A [`Runtime`] driven by a [`Trace`]
pub struct ReplayRuntime {
    scripts: HashMap<ScriptId, TraceScript>,
    /// Indexed by `CallableId - 1`
    functions: Vec<Function>,
    steps: Vec<Step>,
    state: RefCell<State>,
    agent: RefCell<Option<Rc<dyn Agent<ReplayRuntime>>>>,
    position: Cell<usize>,
}

impl ReplayRuntime {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::new(Trace::from_yaml(content)?)
    }

    /// Validate a trace and resolve its values
    pub fn new(trace: Trace) -> Result<Self> {
        let mut scripts = HashMap::new();
        for script in trace.scripts {
            let id = script.id;
            if scripts.insert(id, script).is_some() {
                return Err(Error::invalid_trace(format!("duplicate script id {id}")));
            }
        }

        let mut function_ids = HashMap::new();
        let mut functions = Vec::with_capacity(trace.functions.len());
        for (index, function) in trace.functions.into_iter().enumerate() {
            match function.script {
                Some(id) if !scripts.contains_key(&id) => return Err(Error::UnknownScript(id)),
                None if !function.native => {
                    return Err(Error::invalid_trace(format!(
                        "function {} needs a script unless it is native",
                        function.name
                    )))
                }
                _ => {}
            }
            function_ids.insert(function.name.clone(), CallableId(index as u64 + 1));
            functions.push(Function {
                name: function.name,
                script: function.script,
                params: function.params,
                native: function.native,
            });
        }

        let globals = trace
            .globals
            .iter()
            .map(|(key, value)| Ok((yaml_key(key)?, ReplayValue::from_yaml(value, &function_ids)?)))
            .collect::<Result<Vec<_>>>()?;

        let script_exists = |id: ScriptId| {
            if scripts.contains_key(&id) {
                Ok(id)
            } else {
                Err(Error::UnknownScript(id))
            }
        };
        let mut steps = Vec::with_capacity(trace.events.len());
        for event in trace.events {
            let step = match event {
                TraceEvent::Load { script } => Step::Load(script_exists(script)?),
                TraceEvent::Unload { script } => Step::Unload(script_exists(script)?),
                TraceEvent::Enter { script } => Step::Enter(script_exists(script)?),
                TraceEvent::Exit { value } => {
                    Step::Exit(ReplayValue::from_optional_yaml(value.as_ref(), &function_ids)?)
                }
                TraceEvent::Call {
                    function,
                    args,
                    locals,
                } => {
                    let id = *function_ids
                        .get(&function)
                        .ok_or_else(|| Error::UnknownFunction(function.clone()))?;
                    let args = args
                        .iter()
                        .map(|arg| ReplayValue::from_yaml(arg, &function_ids))
                        .collect::<Result<Vec<_>>>()?;
                    let locals = locals
                        .map(|locals| {
                            locals
                                .iter()
                                .map(|(key, value)| {
                                    Ok((yaml_key(key)?, ReplayValue::from_yaml(value, &function_ids)?))
                                })
                                .collect::<Result<Vec<_>>>()
                        })
                        .transpose()?;
                    Step::Call {
                        function: id,
                        args,
                        locals,
                    }
                }
                TraceEvent::Return { value } => {
                    Step::Return(ReplayValue::from_optional_yaml(value.as_ref(), &function_ids)?)
                }
                TraceEvent::Line { line, column } => Step::Line { line, column },
                TraceEvent::Set { name, value } => Step::Set {
                    name,
                    value: ReplayValue::from_yaml(&value, &function_ids)?,
                },
                TraceEvent::Throw { message, handled } => Step::Throw { message, handled },
            };
            steps.push(step);
        }

        let next_eval_script = scripts.keys().copied().max().unwrap_or(0) + 1;
        tracing::debug!(
            scripts = scripts.len(),
            functions = functions.len(),
            events = steps.len(),
            "Trace loaded"
        );

        Ok(Self {
            scripts,
            functions,
            steps,
            state: RefCell::new(State {
                frames: vec![Frame::new(ReplayContext(0), None)],
                globals,
                next_context: 1,
                next_eval_script,
                pending_exception: None,
            }),
            agent: RefCell::new(None),
            position: Cell::new(0),
        })
    }

    fn agent(&self) -> Option<Rc<dyn Agent<Self>>> {
        self.agent.borrow().clone()
    }

    fn function(&self, id: CallableId) -> Option<&Function> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.functions.get(index)
    }

    /// Replay every remaining event
    pub fn run(&self) -> Result<()> {
        while let Some(step) = self.steps.get(self.position.get()) {
            self.position.set(self.position.get() + 1);
            self.replay(step)?;
        }
        Ok(())
    }

    /// Index of the next event to replay
    pub fn position(&self) -> usize {
        self.position.get()
    }

    fn replay(&self, step: &Step) -> Result<()> {
        let agent = self.agent();
        match step {
            Step::Load(id) => {
                if let (Some(agent), Some(script)) = (agent, self.scripts.get(id)) {
                    agent.script_load(self, *id, &script.source, &script.file, script.start_line);
                }
            }

            Step::Unload(id) => {
                if let Some(agent) = agent {
                    agent.script_unload(self, *id);
                }
            }

            Step::Enter(id) => {
                self.state.borrow_mut().current_mut().scripts.push(*id);
                if let Some(agent) = agent {
                    agent.function_entry(self, Some(*id));
                }
            }

            Step::Exit(value) => {
                let id = self
                    .state
                    .borrow()
                    .current()
                    .scripts
                    .last()
                    .copied()
                    .ok_or_else(|| Error::invalid_trace("exit without a running program"))?;
                if let Some(agent) = agent {
                    agent.function_exit(self, Some(id), value);
                }
                self.state.borrow_mut().current_mut().scripts.pop();
            }

            Step::Call {
                function,
                args,
                locals,
            } => {
                let callee = self
                    .function(*function)
                    .ok_or_else(|| Error::Internal(format!("unresolved {function}")))?;
                {
                    let mut state = self.state.borrow_mut();
                    let context = ReplayContext(state.next_context);
                    state.next_context += 1;
                    let mut frame = Frame::new(context, Some(*function));
                    frame.args = args.clone();
                    frame.locals = locals.clone().unwrap_or_else(|| {
                        callee
                            .params
                            .iter()
                            .enumerate()
                            .map(|(i, param)| {
                                (param.clone(), args.get(i).cloned().unwrap_or(ReplayValue::Undefined))
                            })
                            .collect()
                    });
                    frame.scripts.extend(self.native_aware_script(callee));
                    state.frames.push(frame);
                }
                tracing::trace!(function = %callee.name, "Call");
                if let Some(agent) = agent {
                    agent.function_entry(self, self.native_aware_script(callee));
                }
            }

            Step::Return(value) => {
                let script = {
                    let state = self.state.borrow();
                    if state.frames.len() < 2 {
                        return Err(Error::invalid_trace("return from the global frame"));
                    }
                    state.current().scripts.last().copied()
                };
                if let Some(agent) = agent {
                    agent.function_exit(self, script, value);
                }
                self.state.borrow_mut().frames.pop();
            }

            Step::Line { line, column } => {
                let script = {
                    let mut state = self.state.borrow_mut();
                    let frame = state.current_mut();
                    frame.line = Some(*line);
                    frame.scripts.last().copied()
                };
                let script = script
                    .ok_or_else(|| Error::invalid_trace(format!("line {line} outside any script")))?;
                if let Some(agent) = agent {
                    agent.position_change(self, script, *line, *column);
                }
            }

            Step::Set { name, value } => {
                let mut state = self.state.borrow_mut();
                if state.current().function.is_some() {
                    set_binding(&mut state.current_mut().locals, name, value.clone());
                } else {
                    set_binding(&mut state.globals, name, value.clone());
                }
            }

            Step::Throw { message, handled } => {
                let script = self
                    .state
                    .borrow()
                    .current()
                    .scripts
                    .last()
                    .copied()
                    .ok_or_else(|| Error::invalid_trace("throw outside any script"))?;
                let exception = ReplayValue::Error(message.clone());
                if !handled {
                    self.state.borrow_mut().pending_exception = Some(exception.clone());
                }
                if let Some(agent) = agent {
                    agent.exception_throw(self, script, &exception, *handled);
                }
            }
        }
        Ok(())
    }

    fn native_aware_script(&self, function: &Function) -> Option<ScriptId> {
        if function.native {
            None
        } else {
            function.script
        }
    }

    /// Exception left by the last unhandled throw or failed evaluation
    pub fn pending_exception(&self) -> Option<ReplayValue> {
        self.state.borrow().pending_exception.clone()
    }
}

impl Runtime for ReplayRuntime {
    type Context = ReplayContext;
    type Value = ReplayValue;

    fn current_context(&self) -> ReplayContext {
        self.state.borrow().current().context
    }

    fn parent_context(&self, context: ReplayContext) -> Option<ReplayContext> {
        let state = self.state.borrow();
        let (index, _) = state.frame(context)?;
        index
            .checked_sub(1)
            .map(|parent| state.frames[parent].context)
    }

    fn context_info(&self, context: ReplayContext) -> ContextInfo {
        let state = self.state.borrow();
        let Some((_, frame)) = state.frame(context) else {
            return ContextInfo::default();
        };
        let function = frame.function.and_then(|id| self.function(id));
        let script = match function {
            Some(function) => function.script,
            None => frame.scripts.last().copied(),
        };
        ContextInfo {
            function_name: function.map(|f| f.name.clone()),
            function_kind: match function {
                Some(f) if f.native => FunctionKind::Native,
                _ => FunctionKind::Script,
            },
            file_name: script
                .and_then(|id| self.scripts.get(&id))
                .map(|script| script.file.clone()),
            line: frame.line,
            parameter_names: function.map(|f| f.params.clone()).unwrap_or_default(),
        }
    }

    fn argument_count(&self, context: ReplayContext) -> usize {
        self.state
            .borrow()
            .frame(context)
            .map_or(0, |(_, frame)| frame.args.len())
    }

    fn argument(&self, context: ReplayContext, index: usize) -> ReplayValue {
        self.state
            .borrow()
            .frame(context)
            .and_then(|(_, frame)| frame.args.get(index).cloned())
            .unwrap_or(ReplayValue::Undefined)
    }

    fn callee(&self, context: ReplayContext) -> ReplayValue {
        let state = self.state.borrow();
        state
            .frame(context)
            .and_then(|(_, frame)| frame.function)
            .and_then(|id| {
                self.function(id).map(|function| ReplayValue::Function {
                    id,
                    name: function.name.clone(),
                })
            })
            .unwrap_or(ReplayValue::Undefined)
    }

    fn locals(&self, context: ReplayContext) -> Vec<(String, ReplayValue)> {
        let state = self.state.borrow();
        match state.frame(context) {
            Some((_, frame)) if frame.function.is_some() => frame.locals.clone(),
            Some(_) => state.globals.clone(),
            None => Vec::new(),
        }
    }

    fn can_evaluate(&self, program: &str) -> bool {
        eval::can_evaluate(program)
    }

    fn evaluate(&self, program: &str, file_name: &str) -> std::result::Result<ReplayValue, ReplayValue> {
        let agent = self.agent();
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_eval_script;
            state.next_eval_script += 1;
            id
        };

        if let Some(agent) = &agent {
            agent.script_load(self, id, program, file_name, 1);
            agent.function_entry(self, Some(id));
            agent.position_change(self, id, 1, 0);
        }

        let result = {
            let mut state = self.state.borrow_mut();
            let result = eval::evaluate(program, &mut *state);
            if let Err(exception) = &result {
                state.pending_exception = Some(exception.clone());
            }
            result
        };
        tracing::debug!(script = id, ok = result.is_ok(), "Evaluated");

        if let Some(agent) = &agent {
            if let Err(exception) = &result {
                agent.exception_throw(self, id, exception, false);
            }
            let value = result.as_ref().unwrap_or_else(|e| e);
            agent.function_exit(self, Some(id), value);
            agent.script_unload(self, id);
        }
        result
    }

    fn clear_exceptions(&self) {
        self.state.borrow_mut().pending_exception = None;
    }

    fn global_property(&self, name: &str) -> Option<ReplayValue> {
        self.state
            .borrow()
            .globals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.clone())
    }

    fn set_agent(&self, agent: Option<Rc<dyn Agent<Self>>>) {
        *self.agent.borrow_mut() = agent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ScriptValue;
    use std::cell::RefCell;

    /// Records hook calls as strings
    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl Agent<ReplayRuntime> for Recorder {
        fn script_load(&self, _: &ReplayRuntime, id: ScriptId, _: &str, file: &str, base_line: u32) {
            self.0.borrow_mut().push(format!("load {id} {file}:{base_line}"));
        }

        fn script_unload(&self, _: &ReplayRuntime, id: ScriptId) {
            self.0.borrow_mut().push(format!("unload {id}"));
        }

        fn function_entry(&self, runtime: &ReplayRuntime, id: Option<ScriptId>) {
            let context = runtime.current_context();
            self.0.borrow_mut().push(format!("entry {id:?} {context:?}"));
        }

        fn function_exit(&self, _: &ReplayRuntime, id: Option<ScriptId>, value: &ReplayValue) {
            self.0.borrow_mut().push(format!("exit {id:?} {value}"));
        }

        fn position_change(&self, runtime: &ReplayRuntime, id: ScriptId, line: u32, _: u32) {
            let frames = std::iter::successors(Some(runtime.current_context()), |c| {
                runtime.parent_context(*c)
            })
            .count();
            self.0.borrow_mut().push(format!("line {id}:{line} depth {frames}"));
        }

        fn exception_throw(&self, _: &ReplayRuntime, id: ScriptId, e: &ReplayValue, handled: bool) {
            self.0.borrow_mut().push(format!("throw {id} {e} {handled}"));
        }
    }

    const TRACE: &str = r#"
scripts:
  - id: 1
    file: t.js
    source: "function add(a, b) {\n  return a + b;\n}\nvar c = add(1, 2);\n"
functions:
  - name: add
    script: 1
    params: [a, b]
  - name: print
    native: true
globals:
  add: "&add"
events:
  - {event: load, script: 1}
  - {event: enter, script: 1}
  - {event: line, line: 4}
  - {event: call, function: add, args: [1, 2]}
  - {event: line, line: 2}
  - {event: return, value: 3}
  - {event: call, function: print, args: [3]}
  - {event: return}
  - {event: set, name: c, value: 3}
  - {event: throw, message: "Error: boom"}
  - {event: exit}
  - {event: unload, script: 1}
"#;

    #[test]
    fn test_replay_fires_hooks_in_order() {
        let runtime = ReplayRuntime::from_yaml(TRACE).unwrap();
        let recorder = Rc::new(Recorder::default());
        runtime.set_agent(Some(recorder.clone()));
        runtime.run().unwrap();

        assert_eq!(
            *recorder.0.borrow(),
            vec![
                "load 1 t.js:1",
                "entry Some(1) ReplayContext(0)",
                "line 1:4 depth 1",
                "entry Some(1) ReplayContext(1)",
                "line 1:2 depth 2",
                "exit Some(1) 3",
                "entry None ReplayContext(2)",
                "exit None undefined",
                "throw 1 Error: boom false",
                "exit Some(1) undefined",
                "unload 1",
            ]
        );
        assert_eq!(runtime.global_property("c"), Some(ReplayValue::Number(3.0)));
        assert!(runtime.pending_exception().is_some());
    }

    #[test]
    fn test_context_info_of_call_frame() {
        let runtime = ReplayRuntime::from_yaml(TRACE).unwrap();
        for _ in 0..5 {
            let step = runtime.steps[runtime.position()].clone();
            runtime.position.set(runtime.position() + 1);
            runtime.replay(&step).unwrap();
        }

        let context = runtime.current_context();
        let info = runtime.context_info(context);
        assert_eq!(info.function_name.as_deref(), Some("add"));
        assert_eq!(info.file_name.as_deref(), Some("t.js"));
        assert_eq!(info.line, Some(2));
        assert_eq!(info.parameter_names, vec!["a", "b"]);
        assert_eq!(runtime.argument(context, 1), ReplayValue::Number(2.0));
        assert_eq!(runtime.argument(context, 5), ReplayValue::Undefined);
        assert!(runtime.callee(context).callable_id().is_some());
        assert_eq!(runtime.locals(context)[0], ("a".to_string(), ReplayValue::Number(1.0)));
        assert_eq!(runtime.parent_context(context), Some(ReplayContext(0)));
    }

    #[test]
    fn test_evaluate_reads_current_frame() {
        let runtime = ReplayRuntime::from_yaml(TRACE).unwrap();
        for _ in 0..5 {
            let step = runtime.steps[runtime.position()].clone();
            runtime.position.set(runtime.position() + 1);
            runtime.replay(&step).unwrap();
        }
        assert_eq!(runtime.evaluate("a + b", "typein"), Ok(ReplayValue::Number(3.0)));
        assert!(runtime.evaluate("zzz", "typein").is_err());
        assert!(runtime.pending_exception().is_some());
        runtime.clear_exceptions();
        assert!(runtime.pending_exception().is_none());
    }

    #[test]
    fn test_unknown_script_rejected() {
        let result = ReplayRuntime::from_yaml("events:\n  - {event: load, script: 9}\n");
        assert!(matches!(result, Err(Error::UnknownScript(9))));
    }

    #[test]
    fn test_return_from_global_frame_rejected() {
        let runtime = ReplayRuntime::from_yaml("events:\n  - {event: return}\n").unwrap();
        assert!(matches!(runtime.run(), Err(Error::InvalidTrace(_))));
    }
}
