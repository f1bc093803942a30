//! Reduced states.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::ActionTableId;
use crate::cond::CondSpaceId;
use crate::key::Key;
use crate::trans::TransId;

/// Dense state identifier (index into [`crate::ReducedFsm::states`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(pub u32);

impl StateId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Keys `[low, high]` lead through `trans`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransRange {
    pub low: Key,
    pub high: Key,
    pub trans: TransId,
}

impl TransRange {
    #[must_use]
    pub const fn new(low: Key, high: Key, trans: TransId) -> Self {
        Self { low, high, trans }
    }

    #[must_use]
    pub fn contains(&self, key: Key) -> bool {
        self.low <= key && key <= self.high
    }
}

/// Raw keys `[low, high]` are widened through condition space `space`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondRange {
    pub low: Key,
    pub high: Key,
    pub space: CondSpaceId,
}

/// A state of the reduced automaton.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    /// Outgoing ranges, sorted and non-overlapping.
    #[serde(default)]
    pub ranges: Vec<TransRange>,
    /// Taken for keys no range covers.
    #[serde(default)]
    pub default_trans: Option<TransId>,
    /// Taken at end of input.
    #[serde(default)]
    pub eof_trans: Option<TransId>,
    #[serde(default)]
    pub to_state_action: Option<ActionTableId>,
    #[serde(default)]
    pub from_state_action: Option<ActionTableId>,
    #[serde(default)]
    pub eof_action: Option<ActionTableId>,
    /// Condition guard list, sorted and non-overlapping.
    #[serde(default)]
    pub cond_ranges: Vec<CondRange>,
    #[serde(default)]
    pub is_final: bool,
}

impl State {
    #[must_use]
    pub fn new(id: StateId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Lowest and highest key covered by the ranges.
    #[must_use]
    pub fn key_bounds(&self) -> Option<(Key, Key)> {
        Some((self.ranges.first()?.low, self.ranges.last()?.high))
    }

    /// Lowest and highest key covered by the condition list.
    #[must_use]
    pub fn cond_bounds(&self) -> Option<(Key, Key)> {
        Some((self.cond_ranges.first()?.low, self.cond_ranges.last()?.high))
    }

    /// Transition taken on `key`, falling back to the default.
    #[must_use]
    pub fn trans_for(&self, key: Key) -> Option<TransId> {
        self.ranges
            .iter()
            .find(|r| r.contains(key))
            .map(|r| r.trans)
            .or(self.default_trans)
    }

    /// Condition space applying to raw `key`, if any.
    #[must_use]
    pub fn cond_for(&self, key: Key) -> Option<CondSpaceId> {
        self.cond_ranges
            .iter()
            .find(|r| r.low <= key && key <= r.high)
            .map(|r| r.space)
    }
}
