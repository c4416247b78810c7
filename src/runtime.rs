//! Runtime collaborator contract
//!
//! The debugger never executes script code itself. A host runtime drives it
//! by invoking the [`Agent`] hooks at execution events, and the debugger
//! answers its interactive commands by querying the [`Runtime`].
//!
//! Everything here is single-threaded: hooks are called synchronously on the
//! runtime's own stack, and the runtime makes no progress until a hook
//! returns.

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// Identifier the runtime assigns to a loaded script
pub type ScriptId = i64;

/// Stable identity of a callable value
///
/// Two values with the same identity refer to the same function object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallableId(pub u64);

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callable#{}", self.0)
    }
}

/// A value owned by the runtime, as seen by the debugger
pub trait ScriptValue: Clone + fmt::Display {
    /// Whether this is the "no value" sentinel
    fn is_undefined(&self) -> bool;

    /// Whether this is a compound value without a useful string form
    fn is_object(&self) -> bool;

    /// Identity of the function this value refers to, if it is callable
    fn callable_id(&self) -> Option<CallableId>;

    fn is_callable(&self) -> bool {
        self.callable_id().is_some()
    }
}

/// Render a value for backtraces and `info locals`
///
/// Compound values print a fixed placeholder.
pub fn display_value<V: ScriptValue>(value: &V) -> String {
    if value.is_object() {
        "[object Object]".to_string()
    } else {
        value.to_string()
    }
}

/// Kind of function executing in a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionKind {
    #[default]
    Script,
    Native,
}

/// Description of an execution context
#[derive(Debug, Clone, Default)]
pub struct ContextInfo {
    /// Declared name of the executing function, if any
    pub function_name: Option<String>,
    pub function_kind: FunctionKind,
    /// File the executing code was loaded from
    pub file_name: Option<String>,
    /// Line currently executing in this context
    pub line: Option<u32>,
    /// Declared parameter names, in order
    pub parameter_names: Vec<String>,
}

/// Introspection interface the debugger calls on the host runtime
pub trait Runtime {
    /// Handle identifying a live execution context
    type Context: Copy + Eq + Hash + fmt::Debug + 'static;
    type Value: ScriptValue;

    /// Innermost context of the current call chain
    fn current_context(&self) -> Self::Context;

    /// Calling context, or `None` for the outermost one
    fn parent_context(&self, context: Self::Context) -> Option<Self::Context>;

    fn context_info(&self, context: Self::Context) -> ContextInfo;

    fn argument_count(&self, context: Self::Context) -> usize;

    fn argument(&self, context: Self::Context, index: usize) -> Self::Value;

    /// Function executing in the context (undefined for the global context)
    fn callee(&self, context: Self::Context) -> Self::Value;

    /// Local bindings of the context, in declaration order
    fn locals(&self, context: Self::Context) -> Vec<(String, Self::Value)>;

    /// Whether `program` is a syntactically complete unit
    fn can_evaluate(&self, program: &str) -> bool;

    /// Evaluate `program` in the current context
    ///
    /// `file_name` labels the transient script the runtime creates for the
    /// snippet. A thrown exception is returned as `Err`.
    fn evaluate(&self, program: &str, file_name: &str) -> Result<Self::Value, Self::Value>;

    /// Drop any exception left pending by the last evaluation
    fn clear_exceptions(&self);

    /// Look up a property of the global object
    fn global_property(&self, name: &str) -> Option<Self::Value>;

    /// Install or remove the agent receiving instrumentation hooks
    fn set_agent(&self, agent: Option<Rc<dyn Agent<Self>>>);
}

/// Instrumentation hooks the runtime invokes on its agent
pub trait Agent<R: Runtime + ?Sized> {
    fn script_load(
        &self,
        runtime: &R,
        id: ScriptId,
        program: &str,
        file_name: &str,
        base_line: u32,
    );

    fn script_unload(&self, runtime: &R, id: ScriptId);

    /// A function (or top-level program) starts executing in the current context
    ///
    /// `script_id` is `None` for native functions.
    fn function_entry(&self, runtime: &R, script_id: Option<ScriptId>);

    fn function_exit(&self, runtime: &R, script_id: Option<ScriptId>, return_value: &R::Value);

    /// Execution is about to run `line` of `script_id`
    fn position_change(&self, runtime: &R, script_id: ScriptId, line: u32, column: u32);

    fn exception_throw(
        &self,
        runtime: &R,
        script_id: ScriptId,
        exception: &R::Value,
        has_handler: bool,
    );
}
