//! The reduced automaton consumed by code generation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionId, ActionNode, ActionTable, ActionTableId};
use crate::cond::{CondSpace, CondSpaceId};
use crate::error::{IrError, Result};
use crate::key::{Key, KeyOps};
use crate::state::{State, StateId};
use crate::trans::{TransId, Transition};

/// A named entry point into the machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub state: StateId,
}

/// A named alphabet key exported as a constant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    pub key: Key,
}

/// Deterministic, minimized automaton with embedded actions.
///
/// `states[i].id == i` for every state; actions, action tables and
/// condition spaces are indexed the same way. Transitions live in an arena
/// in no particular order and are identified by their [`TransId`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducedFsm {
    #[serde(default)]
    pub key_ops: KeyOps,
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub action_tables: Vec<ActionTable>,
    #[serde(default)]
    pub cond_spaces: Vec<CondSpace>,
    #[serde(default)]
    pub start_state: Option<StateId>,
    #[serde(default)]
    pub error_state: Option<StateId>,
    #[serde(default)]
    pub entry_points: Vec<EntryPoint>,
    #[serde(default)]
    pub exports: Vec<Export>,
    /// Errors recorded by earlier compilation stages.
    #[serde(default)]
    pub upstream_errors: usize,
}

impl ReducedFsm {
    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id.index())
    }

    #[must_use]
    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(id.index())
    }

    #[must_use]
    pub fn action_table(&self, id: ActionTableId) -> Option<&ActionTable> {
        self.action_tables.get(id.index())
    }

    #[must_use]
    pub fn cond_space(&self, id: CondSpaceId) -> Option<&CondSpace> {
        self.cond_spaces.get(id.index())
    }

    /// Id the next added state would get.
    #[must_use]
    pub fn next_state_id(&self) -> u32 {
        u32::try_from(self.states.len()).unwrap_or(u32::MAX)
    }

    /// Lowest final state id.
    #[must_use]
    pub fn first_final(&self) -> Option<StateId> {
        self.states.iter().find(|s| s.is_final).map(|s| s.id)
    }

    /// Any transition, state or EOF action table referenced at all.
    #[must_use]
    pub fn any_actions(&self) -> bool {
        self.any_trans_actions()
            || self.any_to_state_actions()
            || self.any_from_state_actions()
            || self.any_eof_actions()
    }

    /// Any transition carrying an action table.
    #[must_use]
    pub fn any_trans_actions(&self) -> bool {
        self.transitions.iter().any(|t| t.action.is_some())
    }

    #[must_use]
    pub fn any_to_state_actions(&self) -> bool {
        self.states.iter().any(|s| s.to_state_action.is_some())
    }

    #[must_use]
    pub fn any_from_state_actions(&self) -> bool {
        self.states.iter().any(|s| s.from_state_action.is_some())
    }

    #[must_use]
    pub fn any_eof_actions(&self) -> bool {
        self.states.iter().any(|s| s.eof_action.is_some())
    }

    #[must_use]
    pub fn any_eof_trans(&self) -> bool {
        self.states.iter().any(|s| s.eof_trans.is_some())
    }

    /// Any state with a condition guard list.
    #[must_use]
    pub fn any_conditions(&self) -> bool {
        self.states.iter().any(|s| !s.cond_ranges.is_empty())
    }

    fn any_node(&self, pred: impl Fn(&ActionNode) -> bool) -> bool {
        self.actions.iter().any(|a| a.tree.any(&pred))
    }

    #[must_use]
    pub fn any_calls(&self) -> bool {
        self.any_node(|n| matches!(n, ActionNode::Call(_) | ActionNode::CallExpr(_)))
    }

    #[must_use]
    pub fn any_rets(&self) -> bool {
        self.any_node(|n| matches!(n, ActionNode::Ret))
    }

    /// Any action reads the state before the current transition.
    #[must_use]
    pub fn any_curs_ref(&self) -> bool {
        self.any_node(|n| matches!(n, ActionNode::Curs))
    }

    /// Any longest-match bookkeeping primitive is present.
    #[must_use]
    pub fn has_longest_match(&self) -> bool {
        self.any_node(|n| {
            matches!(
                n,
                ActionNode::LmSwitch(_)
                    | ActionNode::LmSetActId(_)
                    | ActionNode::LmSetTokEnd(_)
                    | ActionNode::LmGetTokEnd
                    | ActionNode::LmInitTokStart
                    | ActionNode::LmInitAct
                    | ActionNode::LmSetTokStart
            )
        })
    }

    /// Check ids, references and range ordering.
    ///
    /// Transition-id density is not checked here; it is a property of the
    /// table encoding and is verified when the tables are built.
    pub fn validate(&self) -> Result<()> {
        self.validate_ids()?;

        let trans_ids: HashSet<TransId> = self.transitions.iter().map(|t| t.id).collect();
        for state in &self.states {
            self.validate_state(state, &trans_ids)?;
        }

        for trans in &self.transitions {
            let referrer = format!("transition {}", trans.id);
            self.check_state_ref(&referrer, trans.target)?;
            if let Some(table) = trans.action {
                self.check_table_ref(&referrer, table)?;
            }
        }

        for table in &self.action_tables {
            for &action in &table.actions {
                if self.action(action).is_none() {
                    return Err(IrError::UnknownAction {
                        table: table.id,
                        action,
                    });
                }
            }
        }

        for action in &self.actions {
            let referrer = format!("action {}", action.id.0);
            for state in action.tree.state_refs() {
                self.check_state_ref(&referrer, state)?;
            }
        }

        for (referrer, state) in self
            .start_state
            .map(|s| ("start state".to_string(), s))
            .into_iter()
            .chain(self.error_state.map(|s| ("error state".to_string(), s)))
            .chain(
                self.entry_points
                    .iter()
                    .map(|e| (format!("entry point {}", e.name), e.state)),
            )
        {
            self.check_state_ref(&referrer, state)?;
        }

        self.validate_final_order()
    }

    fn validate_ids(&self) -> Result<()> {
        for (index, state) in self.states.iter().enumerate() {
            if state.id.index() != index {
                return Err(IrError::StateIdMismatch { index, id: state.id });
            }
        }
        for (index, action) in self.actions.iter().enumerate() {
            if action.id.index() != index {
                return Err(IrError::ActionIdMismatch { index, id: action.id });
            }
        }
        for (index, table) in self.action_tables.iter().enumerate() {
            if table.id.index() != index {
                return Err(IrError::ActionTableIdMismatch { index, id: table.id });
            }
        }
        for (index, space) in self.cond_spaces.iter().enumerate() {
            if space.id.index() != index {
                return Err(IrError::CondSpaceIdMismatch { index, id: space.id });
            }
        }
        Ok(())
    }

    fn validate_state(&self, state: &State, trans_ids: &HashSet<TransId>) -> Result<()> {
        let mut prev_high: Option<Key> = None;
        for range in &state.ranges {
            if range.low > range.high {
                return Err(IrError::InvertedRange {
                    state: state.id,
                    low: range.low,
                    high: range.high,
                });
            }
            if prev_high.is_some_and(|h| range.low <= h) {
                return Err(IrError::RangesOverlap {
                    state: state.id,
                    key: range.low,
                });
            }
            prev_high = Some(range.high);
        }

        let mut prev_high: Option<Key> = None;
        for range in &state.cond_ranges {
            if range.low > range.high {
                return Err(IrError::InvertedRange {
                    state: state.id,
                    low: range.low,
                    high: range.high,
                });
            }
            if prev_high.is_some_and(|h| range.low <= h) {
                return Err(IrError::CondRangesOverlap {
                    state: state.id,
                    key: range.low,
                });
            }
            if self.cond_space(range.space).is_none() {
                return Err(IrError::UnknownCondSpace {
                    state: state.id,
                    space: range.space,
                });
            }
            prev_high = Some(range.high);
        }

        let referenced = state
            .ranges
            .iter()
            .map(|r| r.trans)
            .chain(state.default_trans)
            .chain(state.eof_trans);
        for trans in referenced {
            if !trans_ids.contains(&trans) {
                return Err(IrError::UnknownTrans {
                    state: state.id,
                    trans,
                });
            }
        }

        let referrer = format!("state {}", state.id);
        for table in [state.to_state_action, state.from_state_action, state.eof_action]
            .into_iter()
            .flatten()
        {
            self.check_table_ref(&referrer, table)?;
        }
        Ok(())
    }

    /// Final states must form a suffix of the state list so that
    /// `cs >= first_final` tests acceptance.
    fn validate_final_order(&self) -> Result<()> {
        for pair in self.states.windows(2) {
            if pair[0].is_final && !pair[1].is_final {
                return Err(IrError::FinalStatesNotTrailing {
                    state: pair[0].id,
                    next: pair[1].id,
                });
            }
        }
        Ok(())
    }

    fn check_state_ref(&self, referrer: &str, state: StateId) -> Result<()> {
        if self.state(state).is_none() {
            return Err(IrError::UnknownState {
                referrer: referrer.to_string(),
                state,
            });
        }
        Ok(())
    }

    fn check_table_ref(&self, referrer: &str, table: ActionTableId) -> Result<()> {
        if self.action_table(table).is_none() {
            return Err(IrError::UnknownActionTable {
                referrer: referrer.to_string(),
                table,
            });
        }
        Ok(())
    }
}
