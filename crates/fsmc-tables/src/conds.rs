//! Condition tables.
//!
//! Each state with a guard list gets a flat block mapping raw keys in
//! `[cond_low, cond_high]` to `space id + 1`, or 0 where the raw key is
//! used unchanged. The block layout mirrors the transition keys: a key
//! pair per state, a span per state, and prefix-sum offsets into the
//! shared block array.

use fsmc_ir::{IntType, KeyOps, ReducedFsm};

use crate::error::{Result, TableError};
use crate::flat::MAX_FLAT_SPAN;
use crate::width::{ArrayTable, TableKind};

/// The four condition arrays, in emission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CondTables {
    pub cond_keys: ArrayTable,
    pub cond_key_spans: ArrayTable,
    pub conds: ArrayTable,
    pub cond_index_offsets: ArrayTable,
}

/// Every space's declared width must match its guard list.
pub fn check_cond_spaces(fsm: &ReducedFsm) -> Result<()> {
    for space in &fsm.cond_spaces {
        if space.bits as usize != space.guards.len() {
            let loc = space
                .guards
                .iter()
                .find_map(|g| fsm.action(*g).and_then(|a| a.loc.clone()));
            return Err(TableError::CondWidthMismatch {
                space: space.id,
                bits: space.bits,
                guards: space.guards.len(),
                loc,
            });
        }
        // A full 64-bit alphabet has no room for wide keys.
        let alph = fsm.key_ops.alph_size();
        let fits = space
            .wide_size(alph)
            .filter(|_| alph > 0)
            .and_then(|size| i64::try_from(size).ok())
            .and_then(|size| space.base_key.0.checked_add(size - 1))
            .is_some();
        if !fits {
            return Err(TableError::CondSpaceOverflow(space.id));
        }
    }
    Ok(())
}

/// Build the condition arrays, or `None` when no state has a guard list.
pub fn build_cond_tables(fsm: &ReducedFsm, key_type: IntType) -> Result<Option<CondTables>> {
    if !fsm.any_conditions() {
        return Ok(None);
    }
    check_cond_spaces(fsm)?;

    let mut keys = Vec::with_capacity(fsm.states.len() * 2);
    let mut spans = Vec::with_capacity(fsm.states.len());
    let mut offsets = Vec::with_capacity(fsm.states.len());
    let mut conds = Vec::new();

    for state in &fsm.states {
        offsets.push(conds.len() as i64);
        let Some((low, high)) = state.cond_bounds() else {
            keys.extend([0, 0]);
            spans.push(0);
            continue;
        };
        let span = KeyOps::span(low, high);
        if span == 0 || span > MAX_FLAT_SPAN {
            return Err(TableError::SpanTooWide {
                state: state.id,
                low,
                high,
            });
        }
        keys.extend([low.0, high.0]);
        spans.push(span as i64);

        let mut next = low.0;
        for range in &state.cond_ranges {
            while next < range.low.0 {
                conds.push(0);
                next += 1;
            }
            let id = i64::from(range.space.0) + 1;
            let n = KeyOps::span(range.low, range.high);
            conds.extend(std::iter::repeat_n(id, usize::try_from(n).unwrap_or(0)));
            next = range.high.0.wrapping_add(1);
        }
    }

    Ok(Some(CondTables {
        cond_keys: ArrayTable::with_type(TableKind::CondKeys, key_type, keys),
        cond_key_spans: ArrayTable::new(TableKind::CondKeySpans, spans)?,
        conds: ArrayTable::new(TableKind::Conds, conds)?,
        cond_index_offsets: ArrayTable::new(TableKind::CondIndexOffsets, offsets)?,
    }))
}
