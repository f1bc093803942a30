//! Table encoding errors.

use fsmc_ir::{CondSpaceId, IrError, Key, Loc, StateId, TransId};
use thiserror::Error;

/// Errors raised while encoding tables.
///
/// Configuration errors (no states, a value no host integer type holds, a
/// key span too wide to flatten) and consistency errors (a broken
/// transition-id space, a condition space whose declared width disagrees
/// with its guards, a state range that leaves keys unresolved) both abort
/// encoding before any table is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("invalid automaton: {0}")]
    Ir(#[from] IrError),
    #[error("automaton has no states")]
    NoStates,
    #[error("automaton has no start state")]
    NoStartState,
    #[error("{table}: value {value} exceeds every available integer type")]
    ValueTooWide { table: &'static str, value: i128 },
    #[error("state {state}: key span [{low}, {high}] is too wide to flatten")]
    SpanTooWide { state: StateId, low: Key, high: Key },
    #[error("transition id {0} is outside the transition-id space")]
    TransIdOutOfRange(TransId),
    #[error("transition id {0} is assigned twice")]
    DuplicateTransId(TransId),
    #[error("transition id {0} is never assigned")]
    MissingTransId(TransId),
    #[error("state {state}: key {key} is not covered and the state has no default transition")]
    GapWithoutDefault { state: StateId, key: Key },
    #[error("state {state}: keys outside [{low}, {high}] have no default transition")]
    MissingDefault { state: StateId, low: Key, high: Key },
    #[error("{}condition space {space}: declares {bits} bits but has {guards} guards", loc_prefix(.loc))]
    CondWidthMismatch {
        space: CondSpaceId,
        bits: u32,
        guards: usize,
        loc: Option<Loc>,
    },
    #[error("condition space {0}: wide keys overflow the key domain")]
    CondSpaceOverflow(CondSpaceId),
    #[error("encoding invariant violated: {0}")]
    Invariant(String),
}

/// `"file:line:col: "` when a location is known, empty otherwise.
#[must_use]
pub fn loc_prefix(loc: &Option<Loc>) -> String {
    loc.as_ref().map(|l| format!("{l}: ")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, TableError>;
