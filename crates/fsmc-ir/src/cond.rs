//! Condition spaces.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::ActionId;
use crate::key::Key;

/// Dense condition-space identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CondSpaceId(pub u32);

impl CondSpaceId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CondSpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered set of guard predicates sharing one wide-key block.
///
/// With `N` guards the space owns wide keys
/// `[base_key, base_key + 2^N * alphabet_size)`. Guard `i` contributes
/// `2^i * alphabet_size` when it holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondSpace {
    pub id: CondSpaceId,
    pub base_key: Key,
    /// Guards in evaluation order. Each is an action whose body is a
    /// side-effect-free host expression.
    pub guards: Vec<ActionId>,
    /// Declared number of condition bits. Must equal `guards.len()`.
    pub bits: u32,
}

impl CondSpace {
    #[must_use]
    pub fn new(id: CondSpaceId, base_key: Key, guards: Vec<ActionId>) -> Self {
        let bits = u32::try_from(guards.len()).unwrap_or(u32::MAX);
        Self {
            id,
            base_key,
            guards,
            bits,
        }
    }

    /// Amount guard number `pos` adds to the wide key.
    #[must_use]
    pub const fn guard_offset(pos: u32, alph_size: u64) -> u64 {
        (1u64 << pos) * alph_size
    }

    /// Number of wide keys the space covers, if it fits in 64 bits.
    #[must_use]
    pub fn wide_size(&self, alph_size: u64) -> Option<u64> {
        1u64.checked_shl(self.bits)?.checked_mul(alph_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_size() {
        let space = CondSpace::new(CondSpaceId(0), Key(256), vec![ActionId(0), ActionId(1)]);
        assert_eq!(space.bits, 2);
        assert_eq!(space.wide_size(256), Some(1024));
        assert_eq!(CondSpace::guard_offset(1, 256), 512);
    }

    #[test]
    fn test_wide_size_overflow() {
        let mut space = CondSpace::new(CondSpaceId(0), Key(0), vec![ActionId(0)]);
        space.bits = 64;
        assert_eq!(space.wide_size(256), None);
    }
}
