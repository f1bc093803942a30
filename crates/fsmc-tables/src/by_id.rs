//! By-id projection of the transition arena.

use fsmc_ir::{ReducedFsm, TransId, Transition};

use crate::error::{Result, TableError};

/// Transitions ordered by their dense id.
///
/// Built once per encoding. Building fails unless every id in
/// `[0, transitions.len())` is assigned to exactly one transition.
#[derive(Debug)]
pub struct TransIndex<'a> {
    by_id: Vec<&'a Transition>,
}

impl<'a> TransIndex<'a> {
    pub fn new(fsm: &'a ReducedFsm) -> Result<Self> {
        let count = fsm.transitions.len();
        let mut slots: Vec<Option<&'a Transition>> = vec![None; count];
        for trans in &fsm.transitions {
            let slot = slots
                .get_mut(trans.id.index())
                .ok_or(TableError::TransIdOutOfRange(trans.id))?;
            if slot.is_some() {
                return Err(TableError::DuplicateTransId(trans.id));
            }
            *slot = Some(trans);
        }

        let by_id = slots
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                t.ok_or(TableError::MissingTransId(TransId(
                    u32::try_from(i).unwrap_or(u32::MAX),
                )))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { by_id })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, id: TransId) -> Result<&'a Transition> {
        self.by_id
            .get(id.index())
            .copied()
            .ok_or(TableError::TransIdOutOfRange(id))
    }

    /// Transitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Transition> + '_ {
        self.by_id.iter().copied()
    }
}
