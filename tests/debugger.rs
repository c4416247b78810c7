//! End-to-end tests for the interactive debugger
//!
//! Each test replays a fixture trace under a debugger whose input is
//! scripted and whose output and error streams are captured, then checks
//! the transcript.

use std::fs;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::rc::Rc;

use scriptdbg::common::config::Config;
use scriptdbg::{Error, Mode, ReplayRuntime, ReplayValue, Runtime, ScriptDebugger, SharedBuffer};

const PROMPT: &str = "(qsdbg) ";

/// A debugger attached to a fixture trace with captured streams
struct TestContext {
    runtime: Rc<ReplayRuntime>,
    debugger: ScriptDebugger<ReplayRuntime>,
    output: SharedBuffer,
    error: SharedBuffer,
}

impl TestContext {
    fn new(fixture: &str, input: &str) -> Self {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(fixture);
        let trace = fs::read_to_string(&path).expect("Failed to read fixture");
        Self::from_yaml(&trace, input)
    }

    fn from_yaml(trace: &str, input: &str) -> Self {
        let runtime = Rc::new(ReplayRuntime::from_yaml(trace).expect("Invalid trace"));
        let output = SharedBuffer::new();
        let error = SharedBuffer::new();

        let mut debugger = ScriptDebugger::new(Config::default());
        debugger.set_input_stream(Box::new(Cursor::new(input.as_bytes().to_vec())));
        debugger.set_output_stream(Box::new(output.clone()));
        debugger.set_error_stream(Box::new(error.clone()));
        debugger.attach(runtime.clone());

        Self {
            runtime,
            debugger,
            output,
            error,
        }
    }

    fn run(&self) {
        self.runtime.run().expect("Replay failed");
    }

    /// Output with prompts removed
    fn output(&self) -> String {
        self.output.contents().replace(PROMPT, "")
    }

    fn errors(&self) -> String {
        self.error.contents()
    }
}

fn nested(input: &str) -> TestContext {
    TestContext::new("nested_calls.yaml", input)
}

// ============== Stopping and stepping ==============

#[test]
fn test_stop_on_entry_prints_line_and_prompts() {
    let ctx = nested("/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(ctx.output.contents(), "8\tvar r = f(3);\n(qsdbg) ");
    assert_eq!(ctx.errors(), "");
    assert_eq!(ctx.debugger.mode(), Mode::Run);
}

#[test]
fn test_step_into_stops_at_every_statement() {
    let ctx = nested("/s\n/s\n/s\n/s\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(
        ctx.output(),
        "8\tvar r = f(3);\n\
         5\t  var y = g(a);\n\
         2\t  return x * 2;\n\
         6\t  return y + 1;\n\
         9\tprint(r);\n"
    );
}

#[test]
fn test_next_skips_nested_call() {
    let ctx = nested("/n\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 5);
    ctx.run();

    let output = ctx.output();
    assert!(output.contains("Breakpoint 1 at t.js:5\n5\t  var y = g(a);\n"));
    assert!(output.contains("6\t  return y + 1;\n"));
    assert!(!output.contains("2\t  return x * 2;"));
}

#[test]
fn test_next_out_of_function_stops_in_caller() {
    let ctx = nested("/n\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 6);
    ctx.run();

    assert_eq!(
        ctx.output(),
        "Breakpoint 1 at t.js:6\n6\t  return y + 1;\n9\tprint(r);\n"
    );
    // f returned below the frame `next` started in; the call to print
    // afterwards runs in Run mode and leaves the depth alone
    assert_eq!(ctx.debugger.step_depth(), -1);
}

#[test]
fn test_next_stops_in_call_entered_right_after_return() {
    // h(g(1)): g returns straight into the call of h, with no statement of
    // the global code in between
    let trace = r#"
scripts:
  - id: 1
    file: p.js
    source: "function g(x) {\n  return x;\n}\nfunction h(y) {\n  return y;\n}\nvar r = h(g(1));\n"
functions:
  - {name: g, script: 1, params: [x]}
  - {name: h, script: 1, params: [y]}
events:
  - {event: load, script: 1}
  - {event: enter, script: 1}
  - {event: line, line: 7}
  - {event: call, function: g, args: [1]}
  - {event: line, line: 2}
  - {event: return, value: 1}
  - {event: call, function: h, args: [1]}
  - {event: line, line: 5}
  - {event: return, value: 1}
  - {event: exit}
"#;
    let ctx = TestContext::from_yaml(trace, "/n\n/c\n");
    ctx.debugger.set_breakpoint("p.js", 2);
    ctx.run();

    assert_eq!(
        ctx.output(),
        "Breakpoint 1 at p.js:2\n2\t  return x;\n5\t  return y;\n"
    );
    assert_eq!(ctx.debugger.step_depth(), 0);
}

#[test]
fn test_calls_in_run_mode_leave_step_depth_unchanged() {
    // next over g at line 5 balances to zero, then f and print enter and
    // exit after continue
    let ctx = nested("/n\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 5);
    ctx.run();

    assert!(ctx.output().contains("6\t  return y + 1;\n"));
    assert_eq!(ctx.debugger.mode(), Mode::Run);
    assert_eq!(ctx.debugger.step_depth(), 0);
}

#[test]
fn test_stepping_without_next_keeps_depth_at_zero() {
    let ctx = nested("/s\n/s\n/s\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(ctx.debugger.step_depth(), 0);
}

#[test]
fn test_empty_line_repeats_last_command() {
    let ctx = nested("/s\n\n\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(
        ctx.output(),
        "8\tvar r = f(3);\n\
         5\t  var y = g(a);\n\
         2\t  return x * 2;\n\
         6\t  return y + 1;\n"
    );
}

#[test]
fn test_end_of_input_continues() {
    let ctx = nested("");
    ctx.debugger.break_at_next_statement();
    ctx.debugger.set_breakpoint("t.js", 2);
    ctx.run();

    // The breakpoint still stops after input closed
    assert_eq!(
        ctx.output(),
        "8\tvar r = f(3);\nBreakpoint 1 at t.js:2\n2\t  return x * 2;\n"
    );
    assert_eq!(ctx.debugger.mode(), Mode::Run);
}

#[test]
fn test_unreadable_input_continues_with_message() {
    let ctx = nested("");
    ctx.debugger
        .set_input_stream(Box::new(Cursor::new(vec![b'/', 0xff, b'\n'])));
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(ctx.output(), "8\tvar r = f(3);\n");
    assert!(ctx.errors().starts_with("Cannot read debugger input: "));
    assert_eq!(ctx.debugger.mode(), Mode::Run);
}

#[test]
fn test_stop_without_source_text_reports_it() {
    let trace = r#"
scripts:
  - {id: 1, file: empty.js, source: ""}
events:
  - {event: load, script: 1}
  - {event: enter, script: 1}
  - {event: line, line: 1}
"#;
    let ctx = TestContext::from_yaml(trace, "/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(ctx.output(), "1\t\n");
    assert_eq!(ctx.errors(), "No source text available for line 1.\n");
}

#[test]
fn test_step_into_at_position_prints_source_line() {
    let trace = r#"
scripts:
  - {id: 1, file: t.js, source: "a=1;\nb=2;\nc=a+b;\n"}
events:
  - {event: load, script: 1}
  - {event: enter, script: 1}
  - {event: line, line: 3}
"#;
    let ctx = TestContext::from_yaml(trace, "/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(ctx.output(), "3\tc=a+b;\n");
}

// ============== Breakpoints ==============

#[test]
fn test_break_command_then_delete() {
    let ctx = nested("/break t.js:6\n/delete 1\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    let output = ctx.output();
    assert!(output.contains("Breakpoint 1 at t.js, line 6.\n"));
    assert!(!output.contains("6\t  return y + 1;"));
    assert!(ctx.debugger.breakpoints().is_empty());
}

#[test]
fn test_break_on_function_name() {
    let ctx = nested("/break g\n/c\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    let output = ctx.output();
    assert!(output.contains("Breakpoint 1 at g().\n"));
    assert!(output.contains("Breakpoint 1, g()\n2\t  return x * 2;\n"));
}

#[test]
fn test_break_on_undefined_function() {
    let ctx = nested("/break nope\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(ctx.errors(), "Function \"nope\" not defined.\n");
    assert!(ctx.debugger.breakpoints().is_empty());
}

#[test]
fn test_disabled_location_falls_through_to_callable() {
    let ctx = nested("/c\n");
    let location = ctx.debugger.set_breakpoint("t.js", 2);
    ctx.debugger.set_breakpoint_enabled(location, false);
    let g = ctx.runtime.global_property("g").unwrap();
    ctx.debugger.set_callable_breakpoint(&g).unwrap();
    ctx.run();

    let output = ctx.output();
    assert!(output.contains("Breakpoint 2, g()\n2\t  return x * 2;\n"));
    assert!(!output.contains("Breakpoint 1"));
}

#[test]
fn test_disabled_breakpoint_does_not_stop() {
    let ctx = nested("/c\n");
    let id = ctx.debugger.set_breakpoint("t.js", 2);
    ctx.debugger.set_breakpoint_enabled(id, false);
    ctx.run();

    assert_eq!(ctx.output(), "");
}

#[test]
fn test_named_function_breakpoint_stops_on_each_statement() {
    let ctx = nested("/c\n/c\n");
    ctx.debugger.set_function_breakpoint("f", "t.js");
    ctx.run();

    assert_eq!(
        ctx.output(),
        "Breakpoint 1, f():t.js\n5\t  var y = g(a);\n\
         Breakpoint 1, f():t.js\n6\t  return y + 1;\n"
    );
}

#[test]
fn test_location_breakpoint_wins_over_callable() {
    let ctx = nested("/c\n");
    let g = ctx.runtime.global_property("g").unwrap();
    ctx.debugger.set_callable_breakpoint(&g).unwrap();
    ctx.debugger.set_breakpoint("t.js", 2);
    ctx.run();

    assert!(ctx.output().starts_with("Breakpoint 2 at t.js:2\n"));
}

#[test]
fn test_temporary_breakpoint_is_removed_after_hit() {
    let ctx = nested("/tbreak t.js:2\n/c\n/info breakpoints\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    let output = ctx.output();
    assert!(output.contains("Breakpoint 1 at t.js, line 2.\n"));
    assert!(output.contains("Breakpoint 1 at t.js:2\n2\t  return x * 2;\nNo breakpoints.\n"));
}

#[test]
fn test_info_breakpoints_table() {
    let ctx = nested("/break t.js:6\n/tbreak g\n/disable 1\n/info breakpoints\n/enable 1\n/delete 2\n/c\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    let output = ctx.output();
    assert!(output.contains(
        "Num  Disp Enb What\n\
         1    keep n   t.js:6\n\
         2    del  y   callable#1\n"
    ));
    assert!(output.contains("Breakpoint 1 at t.js:6\n"));
    assert!(!output.contains("Breakpoint 2, g()"));
}

#[test]
fn test_unknown_breakpoint_number() {
    let ctx = nested("/delete 7\n/enable x\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(
        ctx.errors(),
        "No breakpoint number 7.\nNo breakpoint number x.\n"
    );
}

#[test]
fn test_callable_breakpoint_needs_function() {
    let ctx = nested("");
    let result = ctx
        .debugger
        .set_callable_breakpoint(&ReplayValue::Number(1.0));
    assert!(matches!(result, Err(Error::NotCallable(_))));
}

// ============== Frames ==============

#[test]
fn test_backtrace() {
    let ctx = nested("/bt\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 2);
    ctx.run();

    assert!(ctx.output().contains(
        "#0  g (x=3) at t.js:2\n\
         #1  f (a=3) at t.js:5\n\
         #2  <global> () at t.js:8\n"
    ));
}

#[test]
fn test_up_down_round_trip() {
    let ctx = nested("/up\n/down\n/down\n/up\n/up\n/up\n/frame\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 2);
    ctx.run();

    assert!(ctx.output().ends_with(
        "#1  f (a=3) at t.js:5\n\
         #0  g (x=3) at t.js:2\n\
         #1  f (a=3) at t.js:5\n\
         #2  <global> () at t.js:8\n\
         #2  <global> () at t.js:8\n"
    ));
    assert_eq!(
        ctx.errors(),
        "Bottom (innermost) frame selected; you cannot go down.\n\
         Initial frame selected; you cannot go up.\n"
    );
}

#[test]
fn test_frame_out_of_range_keeps_selection() {
    let ctx = nested("/frame 1\n/frame 5\n/frame\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 5);
    ctx.run();

    assert!(ctx.output().ends_with(
        "#1  <global> () at t.js:8\n\
         #1  <global> () at t.js:8\n"
    ));
    assert_eq!(ctx.errors(), "No such frame.\n");
}

#[test]
fn test_frame_selection_resets_on_next_stop() {
    let ctx = nested("/up\n/c\n/frame\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 2);
    ctx.debugger.set_breakpoint("t.js", 6);
    ctx.run();

    assert!(ctx.output().ends_with("#0  f (a=3) at t.js:6\n"));
    assert_eq!(ctx.debugger.current_frame_index(), 0);
}

#[test]
fn test_object_arguments_use_placeholder() {
    let trace = r#"
scripts:
  - {id: 1, file: o.js, source: "function h(o) {\n  return o;\n}\nh({});\n"}
functions:
  - {name: h, script: 1, params: [o]}
events:
  - {event: load, script: 1}
  - {event: enter, script: 1}
  - {event: line, line: 4}
  - {event: call, function: h, args: [{k: 1}, extra]}
  - {event: line, line: 2}
"#;
    let ctx = TestContext::from_yaml(trace, "/bt\n/info locals\n/c\n");
    ctx.debugger.set_breakpoint("o.js", 2);
    ctx.run();

    let output = ctx.output();
    assert!(output.contains("#0  h (o=[object Object], extra) at o.js:2\n"));
    assert!(output.contains("o = [object Object]\n"));
}

// ============== Source listing ==============

#[test]
fn test_list_around_frame_then_past_end() {
    let ctx = nested("/list\n/list\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 5);
    ctx.run();

    let output = ctx.output();
    assert!(output.contains(
        "1\tfunction g(x) {\n\
         2\t  return x * 2;\n\
         3\t}\n\
         4\tfunction f(a) {\n\
         5\t  var y = g(a);\n\
         6\t  return y + 1;\n\
         7\t}\n\
         8\tvar r = f(3);\n\
         9\tprint(r);\n"
    ));
    assert!(!output.contains("10\t"));
    assert_eq!(ctx.errors(), "Line number 11 out of range.\n");
}

#[test]
fn test_list_given_line() {
    let ctx = nested("/list 9\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(
        ctx.output(),
        "8\tvar r = f(3);\n\
         4\tfunction f(a) {\n\
         5\t  var y = g(a);\n\
         6\t  return y + 1;\n\
         7\t}\n\
         8\tvar r = f(3);\n\
         9\tprint(r);\n"
    );
}

#[test]
fn test_list_restarts_after_frame_change() {
    let ctx = nested("/list 2\n/up\n/list\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 2);
    ctx.run();

    // After `up` the listing is centered on f's line again, not continued
    let output = ctx.output();
    let after_up = output.split("#1  f (a=3) at t.js:5\n").nth(1).unwrap();
    assert!(after_up.starts_with("1\tfunction g(x) {\n"));
}

#[test]
fn test_list_after_script_unloaded() {
    let trace = r#"
scripts:
  - {id: 1, file: n.js, source: "print(1);\n"}
events:
  - {event: load, script: 1}
  - {event: enter, script: 1}
  - {event: unload, script: 1}
  - {event: line, line: 1}
"#;
    let ctx = TestContext::from_yaml(trace, "/list\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(ctx.output(), "1\t\n");
    assert_eq!(
        ctx.errors(),
        "No source text available for line 1.\nNo source text available for this frame.\n"
    );
}

// ============== Inspection and evaluation ==============

#[test]
fn test_info_locals() {
    let ctx = nested("/info locals\n/up\n/info locals\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 6);
    ctx.run();

    let output = ctx.output();
    assert!(output.contains("a = 3\ny = 6\n"));
    assert!(output.contains("g = [object Object]\nf = [object Object]\nprint = [object Object]\n"));
}

#[test]
fn test_evaluate_prints_result_on_error_stream() {
    let ctx = nested("x + 1\nnope\n'x=' + x\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 2);
    ctx.run();

    assert_eq!(
        ctx.errors(),
        "4\nReferenceError: nope is not defined\nx=3\n"
    );
    assert!(ctx.runtime.pending_exception().is_none());
}

#[test]
fn test_evaluate_multiline_uses_continuation_prompt() {
    let ctx = nested("(1 +\n2)\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert!(ctx.output.contents().contains("(qsdbg) .... (qsdbg) "));
    assert_eq!(ctx.errors(), "3\n");
}

#[test]
fn test_evaluation_does_not_hit_breakpoints() {
    let ctx = nested("1\n/list\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 2);
    ctx.debugger.set_breakpoint("typein", 1);
    ctx.run();

    let output = ctx.output();
    assert!(!output.contains("typein"));
    assert_eq!(ctx.errors(), "1\n");
    // The snippet's script is gone and listing still shows the frame's script
    assert!(output.contains("2\t  return x * 2;\n3\t}\n"));
}

#[test]
fn test_assignment_in_frame() {
    let ctx = nested("x = 10\n/c\n");
    ctx.debugger.set_breakpoint("t.js", 2);
    ctx.run();

    assert_eq!(ctx.errors(), "10\n");
}

// ============== Exceptions ==============

#[test]
fn test_unhandled_exception_interrupts_in_run_mode() {
    let ctx = TestContext::new("throws.yaml", "/bt\n/c\n");
    ctx.run();

    assert_eq!(ctx.errors(), "uncaught exception: TypeError: x\n");
    assert_eq!(ctx.output(), "#0  <global> () at t.js:2\n");
}

#[test]
fn test_handled_exception_does_not_interrupt() {
    let trace = fs::read_to_string(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/throws.yaml"),
    )
    .unwrap()
    .replace(
        "{event: throw, message: \"TypeError: x\"}",
        "{event: throw, message: \"TypeError: x\", handled: true}",
    );
    let ctx = TestContext::from_yaml(&trace, "/c\n");
    ctx.run();

    assert_eq!(ctx.output.contents(), "");
    assert_eq!(ctx.errors(), "");
}

// ============== Commands ==============

#[test]
fn test_unknown_command_stays_in_loop() {
    let ctx = nested("/frobnicate\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(ctx.errors(), "Undefined command \"frobnicate\". Try \"/help\".\n");
    assert_eq!(ctx.output.contents().matches(PROMPT).count(), 2);
}

#[test]
fn test_help() {
    let ctx = nested("/help\n/c\n");
    ctx.debugger.break_at_next_statement();
    ctx.run();

    let output = ctx.output();
    assert!(output.contains("/continue - continue execution\n"));
    assert!(output.contains("/info locals      - show local variables\n"));
}

// ============== Facade ==============

#[test]
fn test_detach_stops_hooks() {
    let mut ctx = nested("");
    ctx.debugger.break_at_next_statement();
    ctx.debugger.detach();
    ctx.run();

    assert!(ctx.debugger.runtime().is_none());
    assert_eq!(ctx.output.contents(), "");
}

#[test]
fn test_stream_setters_return_previous_stream() {
    let ctx = nested("/c\n");
    let replacement = SharedBuffer::new();
    let mut previous = ctx.debugger.set_output_stream(Box::new(replacement.clone()));
    previous.write_all(b"old").unwrap();

    ctx.debugger.break_at_next_statement();
    ctx.run();

    assert_eq!(ctx.output.contents(), "old");
    assert!(replacement.contents().starts_with("8\tvar r = f(3);\n"));
}
