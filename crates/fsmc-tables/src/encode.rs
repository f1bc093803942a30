//! Key/table encoder.
//!
//! One [`Encoder`] is created per encoding run. It owns the running
//! counters (action locations, slot offsets, the transition-to-slot map of
//! the direct layout) and is consumed by [`Encoder::finish`].

use fsmc_ir::{ActionTableId, IntType, ReducedFsm, State, TransId};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::by_id::TransIndex;
use crate::conds::{CondTables, build_cond_tables, check_cond_spaces};
use crate::error::{Result, TableError};
use crate::flat::{FlatState, flatten};
use crate::plan::{Layout, LayoutPlan, PlanInputs};
use crate::width::{ArrayTable, TableKind};

/// Every array and constant the generated scanner needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedTables {
    pub plan: LayoutPlan,
    /// Element type of the key arrays (the wide alphabet type when any
    /// state has conditions).
    pub key_type: IntType,
    pub actions: Option<ArrayTable>,
    pub conds: Option<CondTables>,
    pub keys: ArrayTable,
    pub key_spans: ArrayTable,
    pub index_offsets: ArrayTable,
    /// Present only in the indexed layout.
    pub indices: Option<ArrayTable>,
    pub trans_targs: ArrayTable,
    pub trans_actions: Option<ArrayTable>,
    pub to_state_actions: Option<ArrayTable>,
    pub from_state_actions: Option<ArrayTable>,
    pub eof_actions: Option<ArrayTable>,
    pub eof_trans: Option<ArrayTable>,
    /// Location of each action table in `actions`, by table id.
    pub action_locs: Vec<i64>,
    pub start_state: i64,
    /// Lowest final state, or the state count when there is none.
    pub first_final: i64,
    /// Error state, or -1 when there is none.
    pub error_state: i64,
    pub entry_points: Vec<(String, i64)>,
    /// Number of states with a default slot.
    pub default_count: usize,
    /// Slots appended after the last state block for EOF transitions
    /// (direct layout only).
    pub eof_slots: usize,
}

impl EncodedTables {
    #[must_use]
    pub const fn layout(&self) -> Layout {
        self.plan.layout
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.key_spans.len()
    }

    /// Location of `table` in the actions array, 0 for none.
    #[must_use]
    pub fn action_loc(&self, table: Option<ActionTableId>) -> i64 {
        table
            .and_then(|t| self.action_locs.get(t.index()).copied())
            .unwrap_or(0)
    }

    /// All arrays in emission order.
    #[must_use]
    pub fn arrays(&self) -> Vec<&ArrayTable> {
        let mut out = Vec::with_capacity(16);
        out.extend(&self.actions);
        if let Some(conds) = &self.conds {
            out.extend([
                &conds.cond_keys,
                &conds.cond_key_spans,
                &conds.conds,
                &conds.cond_index_offsets,
            ]);
        }
        out.extend([&self.keys, &self.key_spans, &self.index_offsets]);
        out.extend(&self.indices);
        out.push(&self.trans_targs);
        out.extend(&self.trans_actions);
        out.extend(&self.to_state_actions);
        out.extend(&self.from_state_actions);
        out.extend(&self.eof_actions);
        out.extend(&self.eof_trans);
        out
    }

    /// Total bytes of every emitted array.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        self.arrays().iter().map(|a| a.byte_size()).sum()
    }

    /// Check the structural properties every valid encoding has.
    pub fn check_invariants(&self) -> Result<()> {
        let span_sum: i64 = self.key_spans.values.iter().sum();
        let slot_total = match &self.indices {
            Some(indices) => indices.len(),
            None => self.trans_targs.len() - self.eof_slots,
        };
        if span_sum as usize + self.default_count != slot_total {
            return Err(TableError::Invariant(format!(
                "spans sum to {span_sum} with {} default slots but the index array holds {slot_total}",
                self.default_count
            )));
        }

        if let Some(indices) = &self.indices {
            let count = self.trans_targs.len() as i64;
            if let Some(bad) = indices.values.iter().find(|&&i| i < 0 || i >= count) {
                return Err(TableError::Invariant(format!(
                    "index {bad} outside the transition-id space of {count}"
                )));
            }
        }
        let actions_len = self.trans_actions.as_ref().map(ArrayTable::len);
        if actions_len.is_some_and(|len| len != self.trans_targs.len()) {
            return Err(TableError::Invariant(format!(
                "{} transition targets but {} transition actions",
                self.trans_targs.len(),
                actions_len.unwrap_or(0)
            )));
        }

        for array in self.arrays() {
            if let Some(v) = array
                .values
                .iter()
                .find(|&&v| {
                    i128::from(v) < array.ty.min_value() || i128::from(v) > array.ty.max_value()
                })
            {
                return Err(TableError::Invariant(format!(
                    "{}: value {v} does not fit {}",
                    array.kind.base_name(),
                    array.ty
                )));
            }
        }
        Ok(())
    }
}

/// Encoding context for one run.
pub struct Encoder<'a> {
    fsm: &'a ReducedFsm,
    trans: TransIndex<'a>,
    flat: Vec<FlatState>,
    key_type: IntType,
    action_locs: Vec<i64>,
    actions: Vec<i64>,
}

impl<'a> Encoder<'a> {
    /// Validate the automaton and flatten its states.
    pub fn new(fsm: &'a ReducedFsm) -> Result<Self> {
        if fsm.states.is_empty() {
            return Err(TableError::NoStates);
        }
        if fsm.start_state.is_none() {
            return Err(TableError::NoStartState);
        }
        fsm.validate()?;
        check_cond_spaces(fsm)?;

        let trans = TransIndex::new(fsm)?;
        let key_type = wide_key_type(fsm)?;
        let flat = flatten(fsm)?;

        let mut encoder = Self {
            fsm,
            trans,
            flat,
            key_type,
            action_locs: Vec::with_capacity(fsm.action_tables.len()),
            actions: vec![0],
        };
        encoder.lay_out_actions();
        Ok(encoder)
    }

    /// `[0, len, ids…, len, ids…]`; a table's location is the index of its
    /// length entry.
    fn lay_out_actions(&mut self) {
        for table in &self.fsm.action_tables {
            self.action_locs.push(self.actions.len() as i64);
            self.actions.push(table.actions.len() as i64);
            self.actions
                .extend(table.actions.iter().map(|a| i64::from(a.0)));
        }
    }

    fn loc(&self, table: Option<ActionTableId>) -> i64 {
        table
            .and_then(|t| self.action_locs.get(t.index()).copied())
            .unwrap_or(0)
    }

    fn target_of(&self, id: TransId) -> Result<i64> {
        Ok(i64::from(self.trans.get(id)?.target.0))
    }

    fn action_of(&self, id: TransId) -> Result<i64> {
        Ok(self.loc(self.trans.get(id)?.action))
    }

    #[must_use]
    pub fn plan_inputs(&self) -> PlanInputs {
        let mut inputs = PlanInputs::new(&self.flat, self.trans.len());
        inputs.max_state = self
            .trans
            .iter()
            .map(|t| i128::from(t.target.0))
            .max()
            .unwrap_or(0);
        inputs.max_action_loc = self
            .action_locs
            .iter()
            .copied()
            .max()
            .map_or(0, i128::from);
        inputs.any_actions = self.fsm.any_actions();
        inputs
    }

    /// Build every array under the planned (or forced) layout.
    pub fn finish(self, force: Option<Layout>) -> Result<EncodedTables> {
        let fsm = self.fsm;
        let plan = LayoutPlan::compute(&self.plan_inputs(), force)?;

        let mut keys = Vec::with_capacity(self.flat.len() * 2);
        let mut spans = Vec::with_capacity(self.flat.len());
        let mut offsets = Vec::with_capacity(self.flat.len());
        let mut offset = 0i64;
        for flat in &self.flat {
            keys.extend([flat.low.0, flat.high.0]);
            spans.push(flat.span as i64);
            offsets.push(offset);
            offset += flat.slot_count() as i64;
        }

        let default_count = self.flat.iter().filter(|f| f.default.is_some()).count();
        let any_actions = fsm.any_actions();

        let (indices, targs, trans_actions, eof_trans, eof_slots) = match plan.layout {
            Layout::Indexed => self.indexed_arrays(any_actions)?,
            Layout::Direct => self.direct_arrays(any_actions)?,
        };

        let state_actions = |kind: TableKind, get: fn(&State) -> Option<ActionTableId>| {
            let values = fsm.states.iter().map(|s| self.loc(get(s))).collect();
            ArrayTable::new(kind, values)
        };
        let to_state_actions = fsm
            .any_to_state_actions()
            .then(|| state_actions(TableKind::ToStateActions, |s| s.to_state_action))
            .transpose()?;
        let from_state_actions = fsm
            .any_from_state_actions()
            .then(|| state_actions(TableKind::FromStateActions, |s| s.from_state_action))
            .transpose()?;
        let eof_actions = fsm
            .any_eof_actions()
            .then(|| state_actions(TableKind::EofActions, |s| s.eof_action))
            .transpose()?;

        let actions = any_actions
            .then(|| ArrayTable::new(TableKind::Actions, self.actions.clone()))
            .transpose()?;
        let conds = build_cond_tables(fsm, self.key_type)?;

        let state_count = fsm.states.len() as i64;
        let tables = EncodedTables {
            plan,
            key_type: self.key_type,
            actions,
            conds,
            keys: ArrayTable::with_type(TableKind::Keys, self.key_type, keys),
            key_spans: ArrayTable::new(TableKind::KeySpans, spans)?,
            index_offsets: ArrayTable::new(TableKind::IndexOffsets, offsets)?,
            indices,
            trans_targs: targs,
            trans_actions,
            to_state_actions,
            from_state_actions,
            eof_actions,
            eof_trans,
            action_locs: self.action_locs,
            start_state: fsm.start_state.map_or(0, |s| i64::from(s.0)),
            first_final: fsm.first_final().map_or(state_count, |s| i64::from(s.0)),
            error_state: fsm.error_state.map_or(-1, |s| i64::from(s.0)),
            entry_points: fsm
                .entry_points
                .iter()
                .map(|e| (e.name.clone(), i64::from(e.state.0)))
                .collect(),
            default_count,
            eof_slots,
        };

        for array in tables.arrays() {
            trace!(
                array = array.kind.base_name(),
                ty = %array.ty,
                len = array.len(),
                "encoded array"
            );
        }
        tables.check_invariants()?;
        Ok(tables)
    }

    /// Slots hold transition ids; targets and actions are by id.
    fn indexed_arrays(&self, any_actions: bool) -> Result<LayoutArrays> {
        let mut indices = Vec::new();
        for flat in &self.flat {
            indices.extend(flat.slots.iter().chain(&flat.default).map(|t| i64::from(t.0)));
        }

        let targs = self
            .trans
            .iter()
            .map(|t| i64::from(t.target.0))
            .collect();
        let actions = any_actions
            .then(|| {
                let values = self.trans.iter().map(|t| self.loc(t.action)).collect();
                ArrayTable::new(TableKind::TransActions, values)
            })
            .transpose()?;

        let eof_trans = self
            .fsm
            .any_eof_trans()
            .then(|| {
                let values = self
                    .fsm
                    .states
                    .iter()
                    .map(|s| s.eof_trans.map_or(0, |t| i64::from(t.0) + 1))
                    .collect();
                ArrayTable::new(TableKind::EofTrans, values)
            })
            .transpose()?;

        Ok((
            Some(ArrayTable::new(TableKind::Indices, indices)?),
            ArrayTable::new(TableKind::TransTargs, targs)?,
            actions,
            eof_trans,
            0,
        ))
    }

    /// Slots hold targets and actions directly. EOF transitions reuse the
    /// first slot holding the same transition, or get one appended.
    fn direct_arrays(&self, any_actions: bool) -> Result<LayoutArrays> {
        let mut slot_of: FxHashMap<TransId, i64> = FxHashMap::default();
        let mut targs = Vec::new();
        let mut actions = Vec::new();
        for flat in &self.flat {
            for &id in flat.slots.iter().chain(&flat.default) {
                slot_of.entry(id).or_insert(targs.len() as i64);
                targs.push(self.target_of(id)?);
                actions.push(self.action_of(id)?);
            }
        }

        let mut eof_slots = 0;
        let mut eof_values = Vec::with_capacity(self.fsm.states.len());
        for state in &self.fsm.states {
            let Some(id) = state.eof_trans else {
                eof_values.push(0);
                continue;
            };
            let slot = if let Some(&slot) = slot_of.get(&id) {
                slot
            } else {
                let slot = targs.len() as i64;
                targs.push(self.target_of(id)?);
                actions.push(self.action_of(id)?);
                slot_of.insert(id, slot);
                eof_slots += 1;
                slot
            };
            eof_values.push(slot + 1);
        }

        let eof_trans = self
            .fsm
            .any_eof_trans()
            .then(|| ArrayTable::new(TableKind::EofTrans, eof_values))
            .transpose()?;
        let actions = any_actions
            .then(|| ArrayTable::new(TableKind::TransActions, actions))
            .transpose()?;

        Ok((
            None,
            ArrayTable::new(TableKind::TransTargs, targs)?,
            actions,
            eof_trans,
            eof_slots,
        ))
    }
}

type LayoutArrays = (
    Option<ArrayTable>,
    ArrayTable,
    Option<ArrayTable>,
    Option<ArrayTable>,
    usize,
);

/// Key array type: the alphabet type, widened to hold every condition
/// space's wide keys.
fn wide_key_type(fsm: &ReducedFsm) -> Result<IntType> {
    let ops = fsm.key_ops;
    if !fsm.any_conditions() {
        return Ok(ops.alph_type);
    }
    let mut max = i128::from(ops.max_key().0);
    for space in &fsm.cond_spaces {
        let size = space
            .wide_size(ops.alph_size())
            .ok_or(TableError::CondSpaceOverflow(space.id))?;
        max = max.max(i128::from(space.base_key.0) + i128::from(size) - 1);
    }
    IntType::subsuming_signed(ops.is_signed(), max).ok_or(TableError::ValueTooWide {
        table: TableKind::Keys.base_name(),
        value: max,
    })
}

/// Encode `fsm` into flat tables, choosing the layout by cost unless
/// `force` names one.
pub fn encode(fsm: &ReducedFsm, force: Option<Layout>) -> Result<EncodedTables> {
    Encoder::new(fsm)?.finish(force)
}
