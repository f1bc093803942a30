//! Fluent construction of reduced automata.
//!
//! Used by tests and tools that need an automaton without running a front
//! end. Transitions are deduplicated on (target, action) and receive their
//! ids in a separate pass at [`FsmBuilder::build`], ordered by target and
//! then action, independent of the order they were created in.

use std::collections::{BTreeMap, HashMap};

use crate::action::{Action, ActionId, ActionTable, ActionTableId, ActionTree};
use crate::cond::{CondSpace, CondSpaceId};
use crate::error::{IrError, Result};
use crate::fsm::{EntryPoint, Export, ReducedFsm};
use crate::key::{Key, KeyOps};
use crate::loc::Loc;
use crate::state::{CondRange, State, StateId, TransRange};
use crate::trans::{TransId, Transition};

type TransKey = (StateId, Option<ActionTableId>);

#[derive(Clone, Copy)]
struct PendingRange {
    state: StateId,
    low: Key,
    high: Key,
    trans: TransKey,
}

/// Builder for [`ReducedFsm`].
pub struct FsmBuilder {
    key_ops: KeyOps,
    states: Vec<State>,
    ranges: Vec<PendingRange>,
    defaults: BTreeMap<StateId, TransKey>,
    eof_trans: BTreeMap<StateId, TransKey>,
    /// Distinct transitions in creation order.
    trans_arena: Vec<TransKey>,
    actions: Vec<Action>,
    tables: Vec<ActionTable>,
    table_lookup: HashMap<Vec<ActionId>, ActionTableId>,
    cond_spaces: Vec<CondSpace>,
    next_cond_base: Key,
    start: Option<StateId>,
    error: Option<StateId>,
    entry_points: Vec<EntryPoint>,
    exports: Vec<Export>,
    upstream_errors: usize,
}

impl FsmBuilder {
    /// Create a builder over the given alphabet.
    #[must_use]
    pub fn new(key_ops: KeyOps) -> Self {
        let next_cond_base = Key(key_ops.max_key().0.saturating_add(1));
        Self {
            key_ops,
            states: Vec::new(),
            ranges: Vec::new(),
            defaults: BTreeMap::new(),
            eof_trans: BTreeMap::new(),
            trans_arena: Vec::new(),
            actions: Vec::new(),
            tables: Vec::new(),
            table_lookup: HashMap::new(),
            cond_spaces: Vec::new(),
            next_cond_base,
            start: None,
            error: None,
            entry_points: Vec::new(),
            exports: Vec::new(),
            upstream_errors: 0,
        }
    }

    /// Add a state; the first state added becomes the start state unless
    /// [`FsmBuilder::start`] says otherwise.
    pub fn add_state(&mut self) -> StateId {
        let id = StateId(u32::try_from(self.states.len()).unwrap_or(u32::MAX));
        self.states.push(State::new(id));
        if self.start.is_none() {
            self.start = Some(id);
        }
        id
    }

    /// Add (or return) the error state. States whose ranges leave keys
    /// uncovered and which have no default get a default into it at build.
    pub fn error_state(&mut self) -> StateId {
        if let Some(err) = self.error {
            return err;
        }
        let id = self.add_state();
        self.error = Some(id);
        id
    }

    pub fn start(&mut self, state: StateId) -> &mut Self {
        self.start = Some(state);
        self
    }

    pub fn set_final(&mut self, state: StateId) -> &mut Self {
        if let Some(s) = self.states.get_mut(state.index()) {
            s.is_final = true;
        }
        self
    }

    /// Register an action body.
    pub fn action(&mut self, tree: impl Into<ActionTree>) -> ActionId {
        let id = ActionId(u32::try_from(self.actions.len()).unwrap_or(u32::MAX));
        self.actions.push(Action::new(id, tree.into()));
        id
    }

    /// Register a named action with a source location.
    pub fn named_action(
        &mut self,
        name: &str,
        loc: Option<Loc>,
        tree: impl Into<ActionTree>,
    ) -> ActionId {
        let id = self.action(tree);
        let action = &mut self.actions[id.index()];
        action.name = Some(name.to_string());
        action.loc = loc;
        id
    }

    /// Action table for the given ordered action list (deduplicated).
    pub fn table(&mut self, actions: &[ActionId]) -> ActionTableId {
        if let Some(&id) = self.table_lookup.get(actions) {
            return id;
        }
        let id = ActionTableId(u32::try_from(self.tables.len()).unwrap_or(u32::MAX));
        self.tables.push(ActionTable {
            id,
            actions: actions.to_vec(),
        });
        self.table_lookup.insert(actions.to_vec(), id);
        id
    }

    fn intern_trans(&mut self, key: TransKey) -> TransKey {
        if !self.trans_arena.contains(&key) {
            self.trans_arena.push(key);
        }
        key
    }

    /// Keys `[low, high]` of `state` lead to `target`.
    pub fn range(
        &mut self,
        state: StateId,
        low: impl Into<Key>,
        high: impl Into<Key>,
        target: StateId,
        action: Option<ActionTableId>,
    ) -> &mut Self {
        let trans = self.intern_trans((target, action));
        self.ranges.push(PendingRange {
            state,
            low: low.into(),
            high: high.into(),
            trans,
        });
        self
    }

    /// Single-key transition.
    pub fn on(
        &mut self,
        state: StateId,
        key: impl Into<Key>,
        target: StateId,
        action: Option<ActionTableId>,
    ) -> &mut Self {
        let key = key.into();
        self.range(state, key, key, target, action)
    }

    /// Transition for keys no range of `state` covers.
    pub fn default(
        &mut self,
        state: StateId,
        target: StateId,
        action: Option<ActionTableId>,
    ) -> &mut Self {
        let trans = self.intern_trans((target, action));
        self.defaults.insert(state, trans);
        self
    }

    /// Transition taken when input ends in `state`.
    pub fn eof_trans(
        &mut self,
        state: StateId,
        target: StateId,
        action: Option<ActionTableId>,
    ) -> &mut Self {
        let trans = self.intern_trans((target, action));
        self.eof_trans.insert(state, trans);
        self
    }

    pub fn to_state_action(&mut self, state: StateId, table: ActionTableId) -> &mut Self {
        if let Some(s) = self.states.get_mut(state.index()) {
            s.to_state_action = Some(table);
        }
        self
    }

    pub fn from_state_action(&mut self, state: StateId, table: ActionTableId) -> &mut Self {
        if let Some(s) = self.states.get_mut(state.index()) {
            s.from_state_action = Some(table);
        }
        self
    }

    pub fn eof_action(&mut self, state: StateId, table: ActionTableId) -> &mut Self {
        if let Some(s) = self.states.get_mut(state.index()) {
            s.eof_action = Some(table);
        }
        self
    }

    /// Create a condition space over `guards`; its wide-key block is placed
    /// directly after the previous one.
    pub fn cond_space(&mut self, guards: &[ActionId]) -> CondSpaceId {
        let id = CondSpaceId(u32::try_from(self.cond_spaces.len()).unwrap_or(u32::MAX));
        let space = CondSpace::new(id, self.next_cond_base, guards.to_vec());
        let size = space.wide_size(self.key_ops.alph_size()).unwrap_or(u64::MAX);
        let size = i64::try_from(size).unwrap_or(i64::MAX);
        self.next_cond_base = Key(self.next_cond_base.0.saturating_add(size));
        self.cond_spaces.push(space);
        id
    }

    /// Raw keys `[low, high]` of `state` are widened through `space`.
    pub fn cond_range(
        &mut self,
        state: StateId,
        low: impl Into<Key>,
        high: impl Into<Key>,
        space: CondSpaceId,
    ) -> &mut Self {
        if let Some(s) = self.states.get_mut(state.index()) {
            s.cond_ranges.push(CondRange {
                low: low.into(),
                high: high.into(),
                space,
            });
        }
        self
    }

    /// Wide key for raw `key` in `space` with the guards in `mask` true.
    pub fn wide_key(&self, space: CondSpaceId, key: impl Into<Key>, mask: u64) -> Result<Key> {
        let key = key.into();
        let base = self
            .cond_spaces
            .get(space.index())
            .ok_or(IrError::NoSuchCondSpace(space))?
            .base_key;
        let alph = self.key_ops.alph_size();
        let offset = key.0.checked_sub(self.key_ops.min_key().0);
        let bits = mask
            .checked_mul(alph)
            .and_then(|b| i64::try_from(b).ok());
        offset
            .zip(bits)
            .and_then(|(offset, bits)| base.0.checked_add(offset)?.checked_add(bits))
            .map(Key)
            .ok_or(IrError::WideKeyOverflow { space, key })
    }

    pub fn entry(&mut self, name: &str, state: StateId) -> &mut Self {
        self.entry_points.push(EntryPoint {
            name: name.to_string(),
            state,
        });
        self
    }

    pub fn export(&mut self, name: &str, key: impl Into<Key>) -> &mut Self {
        self.exports.push(Export {
            name: name.to_string(),
            key: key.into(),
        });
        self
    }

    /// Record errors from an earlier stage; generation will refuse to run.
    pub fn upstream_errors(&mut self, count: usize) -> &mut Self {
        self.upstream_errors = count;
        self
    }

    fn covers_alphabet(&self, ranges: &[TransRange]) -> bool {
        let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
            return false;
        };
        if first.low > self.key_ops.min_key() || last.high < self.key_ops.max_key() {
            return false;
        }
        ranges
            .windows(2)
            .all(|w| w[0].high.0.checked_add(1) == Some(w[1].low.0))
    }

    /// Assign transition ids, complete coverage with the error state, and
    /// validate.
    pub fn build(mut self) -> Result<ReducedFsm> {
        if let Some(err) = self.error {
            let missing: Vec<StateId> = self
                .states
                .iter()
                .map(|s| s.id)
                .filter(|id| !self.defaults.contains_key(id))
                .filter(|id| {
                    let mut ranges: Vec<TransRange> = self
                        .ranges
                        .iter()
                        .filter(|r| r.state == *id)
                        .map(|r| TransRange::new(r.low, r.high, TransId(0)))
                        .collect();
                    ranges.sort_by_key(|r| r.low);
                    !self.covers_alphabet(&ranges)
                })
                .collect();
            for state in missing {
                self.default(state, err, None);
            }
        }

        // Ids follow (target, action) order.
        let mut ordered = self.trans_arena.clone();
        ordered.sort_unstable();
        let ids: HashMap<TransKey, TransId> = ordered
            .iter()
            .enumerate()
            .map(|(i, key)| (*key, TransId(u32::try_from(i).unwrap_or(u32::MAX))))
            .collect();

        let transitions = self
            .trans_arena
            .iter()
            .map(|key| Transition::new(ids[key], key.0, key.1))
            .collect();

        for range in &self.ranges {
            if let Some(state) = self.states.get_mut(range.state.index()) {
                state
                    .ranges
                    .push(TransRange::new(range.low, range.high, ids[&range.trans]));
            }
        }
        for state in &mut self.states {
            state.ranges.sort_by_key(|r| r.low);
            state.cond_ranges.sort_by_key(|r| r.low);
            state.default_trans = self.defaults.get(&state.id).map(|k| ids[k]);
            state.eof_trans = self.eof_trans.get(&state.id).map(|k| ids[k]);
        }

        let fsm = ReducedFsm {
            key_ops: self.key_ops,
            states: self.states,
            transitions,
            actions: self.actions,
            action_tables: self.tables,
            cond_spaces: self.cond_spaces,
            start_state: self.start,
            error_state: self.error,
            entry_points: self.entry_points,
            exports: self.exports,
            upstream_errors: self.upstream_errors,
        };
        fsm.validate()?;
        Ok(fsm)
    }
}
