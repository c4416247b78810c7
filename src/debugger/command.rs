//! Interactive command parsing
//!
//! Commands are typed at the prompt as `/name arg...`. The sigil is stripped
//! by the command loop before a line reaches [`DebuggerCommand::parse`].

use thiserror::Error;

use crate::breakpoints::BreakpointId;

/// Prefix that marks a prompt line as a debugger command
pub const COMMAND_SIGIL: char = '/';

/// Fixed command summary printed by `/help`
pub const HELP_TEXT: &str = "\
/continue - continue execution
/step     - step into statement
/next     - step over statement
/list     - show where you are

/break    - set breakpoint
/tbreak   - set temporary breakpoint
/delete   - remove breakpoint
/disable  - disable breakpoint
/enable   - enable breakpoint

/backtrace - show backtrace
/up       - one frame up
/down     - one frame down
/frame    - set frame

/info locals      - show local variables
/info breakpoints - show breakpoints";

/// A user-facing command failure
///
/// The `Display` text is exactly what gets printed on the error stream; the
/// command loop keeps running afterwards.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Undefined command \"{0}\". Try \"/help\".")]
    UndefinedCommand(String),

    #[error("Undefined info command: \"{0}\". Try \"/help\".")]
    UndefinedInfoCommand(String),

    #[error("Argument required ({0}).")]
    MissingArgument(&'static str),

    #[error("No such frame.")]
    NoSuchFrame,

    #[error("Initial frame selected; you cannot go up.")]
    InitialFrame,

    #[error("Bottom (innermost) frame selected; you cannot go down.")]
    BottomFrame,

    #[error("No breakpoint number {0}.")]
    NoBreakpoint(String),

    #[error("Function \"{0}\" not defined.")]
    FunctionNotDefined(String),

    #[error("Invalid line number \"{0}\".")]
    InvalidLineNumber(String),

    #[error("No source text available for this frame.")]
    NoSource,

    #[error("Line number {0} out of range.")]
    LineOutOfRange(i64),
}

/// Where a `break` command should stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointSpec {
    /// `file:line`
    Line { file: String, line: u32 },
    /// A global function name, resolved when the command runs
    Function { name: String },
}

impl BreakpointSpec {
    /// Parse `file:line` or a bare function name
    ///
    /// Anything containing a colon is a location; the line number follows the
    /// last colon so file names may contain colons themselves.
    pub fn parse(s: &str) -> Result<Self, CommandError> {
        if s.is_empty() {
            return Err(CommandError::MissingArgument("location"));
        }
        match s.rsplit_once(':') {
            Some((file, line)) => {
                let line = line
                    .parse::<u32>()
                    .map_err(|_| CommandError::InvalidLineNumber(line.to_string()))?;
                Ok(Self::Line {
                    file: file.to_string(),
                    line,
                })
            }
            None => Ok(Self::Function {
                name: s.to_string(),
            }),
        }
    }
}

/// A parsed interactive command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerCommand {
    Continue,
    Step,
    Next,
    /// Select a frame, or describe the selected one when no index is given
    Frame(Option<usize>),
    Backtrace,
    Up,
    Down,
    Break {
        location: BreakpointSpec,
        single_shot: bool,
    },
    Delete(BreakpointId),
    Disable(BreakpointId),
    Enable(BreakpointId),
    /// List source, centered on the given line if any
    List(Option<i64>),
    InfoLocals,
    InfoBreakpoints,
    Help,
}

impl DebuggerCommand {
    /// Parse a command name (without sigil) and its arguments
    pub fn parse(name: &str, args: &[&str]) -> Result<Self, CommandError> {
        let first = args.first().copied();
        let command = match name {
            "c" | "continue" => Self::Continue,
            "s" | "step" => Self::Step,
            "n" | "next" => Self::Next,
            "f" | "frame" => Self::Frame(
                first
                    .map(|index| index.parse::<usize>().map_err(|_| CommandError::NoSuchFrame))
                    .transpose()?,
            ),
            "bt" | "backtrace" => Self::Backtrace,
            "up" => Self::Up,
            "down" => Self::Down,
            "b" | "break" | "tbreak" => Self::Break {
                location: BreakpointSpec::parse(first.unwrap_or_default())?,
                single_shot: name == "tbreak",
            },
            "d" | "delete" => Self::Delete(parse_breakpoint_number(first)?),
            "disable" => Self::Disable(parse_breakpoint_number(first)?),
            "enable" => Self::Enable(parse_breakpoint_number(first)?),
            "list" => Self::List(
                first
                    .map(|line| {
                        line.parse::<i64>()
                            .map_err(|_| CommandError::InvalidLineNumber(line.to_string()))
                    })
                    .transpose()?,
            ),
            "info" => match first {
                Some("locals") => Self::InfoLocals,
                Some("breakpoints" | "break" | "b") => Self::InfoBreakpoints,
                Some(other) => return Err(CommandError::UndefinedInfoCommand(other.to_string())),
                None => return Err(CommandError::MissingArgument("what to show")),
            },
            "help" => Self::Help,
            other => return Err(CommandError::UndefinedCommand(other.to_string())),
        };
        Ok(command)
    }
}

fn parse_breakpoint_number(arg: Option<&str>) -> Result<BreakpointId, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument("breakpoint number"))?;
    arg.parse::<u64>()
        .ok()
        .and_then(BreakpointId::from_number)
        .ok_or_else(|| CommandError::NoBreakpoint(arg.to_string()))
}
