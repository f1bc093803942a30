//! Transitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::ActionTableId;
use crate::state::StateId;

/// Globally assigned dense transition id.
///
/// Ids order the shared transition-target and transition-action tables.
/// They are independent of the position a transition occupies in
/// [`crate::ReducedFsm::transitions`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransId(pub u32);

impl TransId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TransId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A distinct (target, action) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub id: TransId,
    /// Target state, looked up by id.
    pub target: StateId,
    #[serde(default)]
    pub action: Option<ActionTableId>,
}

impl Transition {
    #[must_use]
    pub const fn new(id: TransId, target: StateId, action: Option<ActionTableId>) -> Self {
        Self { id, target, action }
    }
}
