//! Trace replay runtime
//!
//! Drives the debugger through a recorded execution instead of a live
//! interpreter. Used by the `replay` command and by the scenario tests.

mod eval;
pub mod runtime;
pub mod trace;
pub mod value;

pub use runtime::{ReplayContext, ReplayRuntime};
pub use trace::{Trace, TraceEvent};
pub use value::ReplayValue;
