//! Per-state flattening of transition ranges.

use fsmc_ir::{Key, KeyOps, ReducedFsm, State, TransId};

use crate::error::{Result, TableError};

/// Largest per-state key span the flat layout accepts.
pub const MAX_FLAT_SPAN: u64 = 1 << 24;

/// One state's flattened transition block.
///
/// `slots[k]` is the transition for key `low + k`; when the state has a
/// default transition it occupies one extra slot at `slots[span]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatState {
    pub low: Key,
    pub high: Key,
    pub span: u64,
    pub slots: Vec<TransId>,
    pub default: Option<TransId>,
}

impl FlatState {
    /// Number of slots the state occupies in the shared index array.
    #[must_use]
    pub fn slot_count(&self) -> u64 {
        self.span + u64::from(self.default.is_some())
    }
}

/// Keys a state may be asked to look up: the raw alphabet plus every
/// wide-key block of the condition spaces its guard list uses.
fn lookup_domain(fsm: &ReducedFsm, state: &State) -> Result<(Key, Key)> {
    let ops = fsm.key_ops;
    let mut high = ops.max_key();
    for range in &state.cond_ranges {
        let Some(space) = fsm.cond_space(range.space) else {
            continue;
        };
        let last = space
            .wide_size(ops.alph_size())
            .and_then(|size| i64::try_from(size).ok())
            .and_then(|size| space.base_key.0.checked_add(size - 1))
            .ok_or(TableError::CondSpaceOverflow(space.id))?;
        high = high.max(Key(last));
    }
    Ok((ops.min_key(), high))
}

/// Flatten one state's sorted ranges into a dense slot block.
pub fn flatten_state(fsm: &ReducedFsm, state: &State) -> Result<FlatState> {
    let (domain_low, domain_high) = lookup_domain(fsm, state)?;
    let default = state.default_trans;

    let Some((low, high)) = state.key_bounds() else {
        // No ranges: every key takes the default.
        return match default {
            Some(_) => Ok(FlatState {
                low: Key(0),
                high: Key(0),
                span: 0,
                slots: Vec::new(),
                default,
            }),
            None => Err(TableError::GapWithoutDefault {
                state: state.id,
                key: domain_low,
            }),
        };
    };

    if default.is_none() && (low > domain_low || high < domain_high) {
        return Err(TableError::MissingDefault {
            state: state.id,
            low,
            high,
        });
    }

    let span = KeyOps::span(low, high);
    if span == 0 || span > MAX_FLAT_SPAN {
        return Err(TableError::SpanTooWide {
            state: state.id,
            low,
            high,
        });
    }

    let mut slots = Vec::with_capacity(usize::try_from(span).unwrap_or(0));
    let mut next = low;
    for range in &state.ranges {
        if range.low > next {
            let fill = default.ok_or(TableError::GapWithoutDefault {
                state: state.id,
                key: next,
            })?;
            push_n(&mut slots, fill, KeyOps::span(next, Key(range.low.0 - 1)));
        }
        push_n(&mut slots, range.trans, KeyOps::span(range.low, range.high));
        next = Key(range.high.0.wrapping_add(1));
    }

    Ok(FlatState {
        low,
        high,
        span,
        slots,
        default,
    })
}

fn push_n(slots: &mut Vec<TransId>, trans: TransId, n: u64) {
    slots.extend(std::iter::repeat_n(trans, usize::try_from(n).unwrap_or(0)));
}

/// Flatten every state, in id order.
pub fn flatten(fsm: &ReducedFsm) -> Result<Vec<FlatState>> {
    fsm.states.iter().map(|s| flatten_state(fsm, s)).collect()
}
