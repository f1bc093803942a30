//! IR validation errors.

use thiserror::Error;

use crate::action::{ActionId, ActionTableId};
use crate::cond::CondSpaceId;
use crate::key::Key;
use crate::state::StateId;
use crate::trans::TransId;

/// Structural problems in a reduced automaton.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("state at index {index} has id {id}")]
    StateIdMismatch { index: usize, id: StateId },
    #[error("action at index {index} has id {id}")]
    ActionIdMismatch { index: usize, id: ActionId },
    #[error("action table at index {index} has id {id}")]
    ActionTableIdMismatch { index: usize, id: ActionTableId },
    #[error("condition space at index {index} has id {id}")]
    CondSpaceIdMismatch { index: usize, id: CondSpaceId },
    #[error("state {state}: ranges unsorted or overlapping at key {key}")]
    RangesOverlap { state: StateId, key: Key },
    #[error("state {state}: condition ranges unsorted or overlapping at key {key}")]
    CondRangesOverlap { state: StateId, key: Key },
    #[error("state {state}: range [{low}, {high}] is inverted")]
    InvertedRange { state: StateId, low: Key, high: Key },
    #[error("{referrer} references unknown state {state}")]
    UnknownState { referrer: String, state: StateId },
    #[error("state {state} references unknown transition {trans}")]
    UnknownTrans { state: StateId, trans: TransId },
    #[error("{referrer} references unknown action table {table}")]
    UnknownActionTable { referrer: String, table: ActionTableId },
    #[error("action table {table} references unknown action {action}")]
    UnknownAction { table: ActionTableId, action: ActionId },
    #[error("unknown condition space {0}")]
    NoSuchCondSpace(CondSpaceId),
    #[error("condition space {space}: wide key for {key} does not fit the key domain")]
    WideKeyOverflow { space: CondSpaceId, key: Key },
    #[error("state {state} references unknown condition space {space}")]
    UnknownCondSpace { state: StateId, space: CondSpaceId },
    #[error("final state {state} precedes non-final state {next}")]
    FinalStatesNotTrailing { state: StateId, next: StateId },
}

pub type Result<T> = std::result::Result<T, IrError>;
