//! Frame navigation over the runtime's context chain
//!
//! Frame 0 is the innermost (current) context; frame `n` is reached by
//! following `n` parent links.

use crate::runtime::{display_value, FunctionKind, Runtime};

/// Resolves frame indexes to runtime contexts
pub struct FrameNavigator<'a, R: Runtime + ?Sized> {
    runtime: &'a R,
}

impl<'a, R: Runtime + ?Sized> FrameNavigator<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Number of contexts from the current one out to the outermost
    pub fn frame_count(&self) -> usize {
        self.contexts().count()
    }

    /// Context of frame `index`, or `None` if the chain is shorter
    pub fn frame_context(&self, index: usize) -> Option<R::Context> {
        self.contexts().nth(index)
    }

    /// Contexts innermost first
    pub fn contexts(&self) -> impl Iterator<Item = R::Context> + 'a {
        let runtime = self.runtime;
        std::iter::successors(Some(runtime.current_context()), move |&context| {
            runtime.parent_context(context)
        })
    }

    /// One-line description: `name (args) at file:line`
    pub fn describe(&self, context: R::Context) -> String {
        let info = self.runtime.context_info(context);

        let mut result = match info.function_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ if self.runtime.parent_context(context).is_none() => "<global>".to_string(),
            _ => match info.function_kind {
                FunctionKind::Script => "<anonymous>".to_string(),
                FunctionKind::Native => "<native>".to_string(),
            },
        };

        let args: Vec<String> = (0..self.runtime.argument_count(context))
            .map(|i| {
                let value = display_value(&self.runtime.argument(context, i));
                match info.parameter_names.get(i) {
                    Some(param) => format!("{param}={value}"),
                    None => value,
                }
            })
            .collect();
        result.push_str(&format!(" ({})", args.join(", ")));

        result.push_str(" at ");
        if let Some(file) = info.file_name.as_deref().filter(|f| !f.is_empty()) {
            result.push_str(file);
            result.push(':');
        }
        match info.line {
            Some(line) => result.push_str(&line.to_string()),
            None => result.push('?'),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::replay::{ReplayContext, ReplayRuntime, ReplayValue};
    use crate::runtime::{Agent, ScriptId};

    const TRACE: &str = r#"
scripts:
  - {id: 1, file: t.js, source: "function f(a) {\n  return a;\n}\nf(1);\n"}
functions:
  - {name: f, script: 1, params: [a]}
events:
  - {event: load, script: 1}
  - {event: enter, script: 1}
  - {event: line, line: 4}
  - {event: call, function: f, args: [1]}
  - {event: line, line: 2}
  - {event: return, value: 1}
  - {event: exit}
"#;

    /// Frame chain seen at each position change
    #[derive(Default)]
    struct ChainRecorder {
        stops: RefCell<Vec<(usize, Vec<Option<ReplayContext>>, Vec<String>)>>,
    }

    impl Agent<ReplayRuntime> for ChainRecorder {
        fn script_load(&self, _: &ReplayRuntime, _: ScriptId, _: &str, _: &str, _: u32) {}
        fn script_unload(&self, _: &ReplayRuntime, _: ScriptId) {}
        fn function_entry(&self, _: &ReplayRuntime, _: Option<ScriptId>) {}
        fn function_exit(&self, _: &ReplayRuntime, _: Option<ScriptId>, _: &ReplayValue) {}
        fn exception_throw(&self, _: &ReplayRuntime, _: ScriptId, _: &ReplayValue, _: bool) {}

        fn position_change(&self, runtime: &ReplayRuntime, _: ScriptId, _: u32, _: u32) {
            let frames = FrameNavigator::new(runtime);
            let count = frames.frame_count();
            let chain = (0..=count).map(|i| frames.frame_context(i)).collect();
            let descriptions = frames.contexts().map(|c| frames.describe(c)).collect();
            self.stops.borrow_mut().push((count, chain, descriptions));
        }
    }

    fn record() -> Vec<(usize, Vec<Option<ReplayContext>>, Vec<String>)> {
        let runtime = ReplayRuntime::from_yaml(TRACE).unwrap();
        let recorder = Rc::new(ChainRecorder::default());
        let agent: Rc<dyn Agent<ReplayRuntime>> = recorder.clone();
        runtime.set_agent(Some(agent));
        runtime.run().unwrap();
        runtime.set_agent(None);
        recorder.stops.take()
    }

    #[test]
    fn test_frame_count_matches_frame_contexts() {
        let stops = record();
        assert_eq!(stops.len(), 2);

        for (count, chain, _) in &stops {
            // Every index below the count resolves, the count itself does not
            assert!(chain[..*count].iter().all(Option::is_some));
            assert_eq!(chain[*count], None);
        }
        assert_eq!(stops[0].0, 1);
        assert_eq!(stops[1].0, 2);
        assert_ne!(stops[1].1[0], stops[1].1[1]);
    }

    #[test]
    fn test_describe_names_function_and_global() {
        let stops = record();
        assert_eq!(stops[0].2, vec!["<global> () at t.js:4"]);
        assert_eq!(stops[1].2, vec!["f (a=1) at t.js:2", "<global> () at t.js:4"]);
    }
}
