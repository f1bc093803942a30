//! Decoding the encoded arrays, exactly as the generated scanner does.

use fsmc_ir::{CondSpace, Key, ReducedFsm};

use crate::encode::EncodedTables;

fn at(values: &[i64], index: i64) -> i64 {
    usize::try_from(index)
        .ok()
        .and_then(|i| values.get(i).copied())
        .unwrap_or(0)
}

impl EncodedTables {
    /// Position in the transition-target array of the transition `state`
    /// takes on `wide`.
    #[must_use]
    pub fn locate(&self, state: usize, wide: i64) -> i64 {
        let cs = state as i64;
        let keys = cs << 1;
        let inds = at(&self.index_offsets.values, cs);
        let slen = at(&self.key_spans.values, cs);
        let low = at(&self.keys.values, keys);
        let high = at(&self.keys.values, keys + 1);
        let slot = if slen > 0 && low <= wide && wide <= high {
            inds + wide - low
        } else {
            inds + slen
        };
        match &self.indices {
            Some(indices) => at(&indices.values, slot),
            None => slot,
        }
    }

    /// Target state stored at transition position `pos`.
    #[must_use]
    pub fn target(&self, pos: i64) -> i64 {
        at(&self.trans_targs.values, pos)
    }

    /// Action location stored at transition position `pos`.
    #[must_use]
    pub fn trans_action(&self, pos: i64) -> i64 {
        self.trans_actions
            .as_ref()
            .map_or(0, |ta| at(&ta.values, pos))
    }

    /// Action ids of the action table at location `loc`.
    #[must_use]
    pub fn action_ids(&self, loc: i64) -> &[i64] {
        let Some(actions) = &self.actions else {
            return &[];
        };
        let len = at(&actions.values, loc);
        let start = usize::try_from(loc + 1).unwrap_or(0);
        let end = start + usize::try_from(len).unwrap_or(0);
        actions.values.get(start..end).unwrap_or(&[])
    }

    /// Condition space id + 1 for raw key `raw` in `state`, 0 for none.
    #[must_use]
    pub fn cond_at(&self, state: usize, raw: i64) -> i64 {
        let Some(conds) = &self.conds else {
            return 0;
        };
        let cs = state as i64;
        let keys = cs << 1;
        let offset = at(&conds.cond_index_offsets.values, cs);
        let slen = at(&conds.cond_key_spans.values, cs);
        let low = at(&conds.cond_keys.values, keys);
        let high = at(&conds.cond_keys.values, keys + 1);
        if slen > 0 && low <= raw && raw <= high {
            at(&conds.conds.values, offset + raw - low)
        } else {
            0
        }
    }

    /// Fold the guards of the condition space applying to `raw` into a
    /// wide key. Every guard of the space is evaluated, in order.
    pub fn widen(
        &self,
        fsm: &ReducedFsm,
        state: usize,
        raw: Key,
        mut guard: impl FnMut(&CondSpace, usize) -> bool,
    ) -> Key {
        let cond = self.cond_at(state, raw.0);
        let Some(space) = usize::try_from(cond - 1)
            .ok()
            .and_then(|i| fsm.cond_spaces.get(i))
        else {
            return raw;
        };
        let ops = fsm.key_ops;
        let alph = ops.alph_size();
        // Encoding checked that the whole block fits, so wrapping is exact
        // for in-alphabet keys.
        let offset = (raw.0 as u64).wrapping_sub(ops.min_key().0 as u64);
        let mut wide = (space.base_key.0 as u64).wrapping_add(offset);
        for pos in 0..space.guards.len() {
            if guard(space, pos) {
                let bit = u32::try_from(pos).unwrap_or(u32::MAX);
                wide = wide.wrapping_add(CondSpace::guard_offset(bit, alph));
            }
        }
        Key(wide as i64)
    }
}
