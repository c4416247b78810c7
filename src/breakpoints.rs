//! Breakpoint registry and matching
//!
//! Breakpoint ids are allocated from a monotonically increasing counter and
//! are never reused, so deleting a breakpoint never renumbers the others.
//! Users see `id + 1` (see [`BreakpointId::number`]).

use std::collections::BTreeMap;
use std::fmt;

use crate::runtime::CallableId;

/// Stable internal breakpoint id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakpointId(u64);

impl BreakpointId {
    /// 1-based number shown to users
    pub fn number(self) -> u64 {
        self.0 + 1
    }

    /// Id for a user-facing breakpoint number (`None` for 0)
    pub fn from_number(number: u64) -> Option<Self> {
        number.checked_sub(1).map(Self)
    }
}

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// What a breakpoint matches against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointKind {
    /// An exact source position
    Location { file: String, line: u32 },
    /// Any statement executed by a specific function object
    Callable(CallableId),
    /// Any statement of a function declared with this name in this file
    NamedFunction { name: String, file: String },
}

impl fmt::Display for BreakpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Location { file, line } => write!(f, "{file}:{line}"),
            Self::Callable(id) => write!(f, "{id}"),
            Self::NamedFunction { name, file } => write!(f, "{name}() in {file}"),
        }
    }
}

/// A registered breakpoint
#[derive(Debug, Clone)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub kind: BreakpointKind,
    pub enabled: bool,
    /// Removed automatically after its first hit
    pub single_shot: bool,
}

/// Which matching tier produced a hit, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Location,
    Callable,
    NamedFunction,
}

/// The execution event a breakpoint is matched against
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionQuery<'a> {
    /// File of the script whose position changed
    pub file: Option<&'a str>,
    pub line: u32,
    /// Identity of the executing callee
    pub callee: Option<CallableId>,
    /// Declared name of the executing function
    pub function_name: Option<&'a str>,
    /// File the executing function was declared in
    pub function_file: Option<&'a str>,
}

/// A reported breakpoint hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointHit {
    pub id: BreakpointId,
    pub tier: MatchTier,
    /// The breakpoint was single-shot and has been removed
    pub removed: bool,
}

/// Owns every breakpoint of a debugger instance
#[derive(Debug, Default)]
pub struct BreakpointManager {
    breakpoints: BTreeMap<BreakpointId, Breakpoint>,
    next_id: u64,
}

impl BreakpointManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: BreakpointKind) -> BreakpointId {
        let id = BreakpointId(self.next_id);
        self.next_id += 1;
        tracing::info!(breakpoint = %id, location = %kind, "Breakpoint added");
        self.breakpoints.insert(
            id,
            Breakpoint {
                id,
                kind,
                enabled: true,
                single_shot: false,
            },
        );
        id
    }

    /// Break at `file:line`
    pub fn set_location(&mut self, file: &str, line: u32) -> BreakpointId {
        self.insert(BreakpointKind::Location {
            file: file.to_string(),
            line,
        })
    }

    /// Break in any function declared as `name` in `file`
    pub fn set_named_function(&mut self, name: &str, file: &str) -> BreakpointId {
        self.insert(BreakpointKind::NamedFunction {
            name: name.to_string(),
            file: file.to_string(),
        })
    }

    /// Break in a specific function object
    pub fn set_callable(&mut self, callable: CallableId) -> BreakpointId {
        self.insert(BreakpointKind::Callable(callable))
    }

    pub fn remove(&mut self, id: BreakpointId) -> Option<Breakpoint> {
        let removed = self.breakpoints.remove(&id);
        if removed.is_some() {
            tracing::info!(breakpoint = %id, "Breakpoint removed");
        }
        removed
    }

    /// Returns `false` if no such breakpoint exists
    pub fn set_enabled(&mut self, id: BreakpointId, enabled: bool) -> bool {
        match self.breakpoints.get_mut(&id) {
            Some(bp) => {
                bp.enabled = enabled;
                tracing::debug!(breakpoint = %id, enabled, "Breakpoint toggled");
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: BreakpointId) -> bool {
        self.breakpoints.get(&id).is_some_and(|bp| bp.enabled)
    }

    /// Returns `false` if no such breakpoint exists
    pub fn set_single_shot(&mut self, id: BreakpointId, single_shot: bool) -> bool {
        match self.breakpoints.get_mut(&id) {
            Some(bp) => {
                bp.single_shot = single_shot;
                true
            }
            None => false,
        }
    }

    pub fn is_single_shot(&self, id: BreakpointId) -> bool {
        self.breakpoints.get(&id).is_some_and(|bp| bp.single_shot)
    }

    pub fn get(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.breakpoints.get(&id)
    }

    /// Constant-time check letting the hot path skip matching entirely
    pub fn has_breakpoints(&self) -> bool {
        !self.breakpoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// All breakpoints in id order
    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    pub fn find_location(&self, file: &str, line: u32) -> Option<BreakpointId> {
        self.find(|kind| matches!(kind, BreakpointKind::Location { file: f, line: l } if f == file && *l == line))
    }

    pub fn find_callable(&self, callable: CallableId) -> Option<BreakpointId> {
        self.find(|kind| *kind == BreakpointKind::Callable(callable))
    }

    pub fn find_named_function(&self, name: &str, file: &str) -> Option<BreakpointId> {
        self.find(|kind| matches!(kind, BreakpointKind::NamedFunction { name: n, file: f } if n == name && f == file))
    }

    fn find(&self, predicate: impl Fn(&BreakpointKind) -> bool) -> Option<BreakpointId> {
        self.breakpoints
            .values()
            .find(|bp| predicate(&bp.kind))
            .map(|bp| bp.id)
    }

    fn find_enabled(&self, predicate: impl Fn(&BreakpointKind) -> bool) -> Option<BreakpointId> {
        self.breakpoints
            .values()
            .find(|bp| bp.enabled && predicate(&bp.kind))
            .map(|bp| bp.id)
    }

    /// Match a position change against every tier
    ///
    /// Tiers are checked independently: a disabled breakpoint in a higher
    /// tier does not hide an enabled one in a lower tier. The highest tier
    /// with an enabled match is reported. A reported single-shot breakpoint
    /// is removed before this returns.
    pub fn check(&mut self, query: &PositionQuery<'_>) -> Option<BreakpointHit> {
        let location = query.file.and_then(|file| {
            self.find_enabled(|kind| {
                matches!(kind, BreakpointKind::Location { file: f, line } if f == file && *line == query.line)
            })
        });
        let callable = || {
            query
                .callee
                .and_then(|callee| self.find_enabled(|kind| *kind == BreakpointKind::Callable(callee)))
        };
        let named = || match (query.function_name, query.function_file) {
            (Some(name), Some(file)) if !name.is_empty() => self.find_enabled(|kind| {
                matches!(kind, BreakpointKind::NamedFunction { name: n, file: f } if n == name && f == file)
            }),
            _ => None,
        };

        let (id, tier) = location
            .map(|id| (id, MatchTier::Location))
            .or_else(|| callable().map(|id| (id, MatchTier::Callable)))
            .or_else(|| named().map(|id| (id, MatchTier::NamedFunction)))?;

        let removed = self.is_single_shot(id);
        if removed {
            self.remove(id);
        }
        Some(BreakpointHit { id, tier, removed })
    }
}
