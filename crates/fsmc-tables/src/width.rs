//! Array kinds and integer width selection.

use fsmc_ir::IntType;

use crate::error::{Result, TableError};

/// The arrays a flat encoding can contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableKind {
    Actions,
    CondKeys,
    CondKeySpans,
    Conds,
    CondIndexOffsets,
    Keys,
    KeySpans,
    IndexOffsets,
    Indices,
    TransTargs,
    TransActions,
    ToStateActions,
    FromStateActions,
    EofActions,
    EofTrans,
}

impl TableKind {
    /// Unprefixed array name.
    #[must_use]
    pub const fn base_name(self) -> &'static str {
        match self {
            Self::Actions => "actions",
            Self::CondKeys => "cond_keys",
            Self::CondKeySpans => "cond_key_spans",
            Self::Conds => "conds",
            Self::CondIndexOffsets => "cond_index_offsets",
            Self::Keys => "trans_keys",
            Self::KeySpans => "key_spans",
            Self::IndexOffsets => "index_offsets",
            Self::Indices => "indices",
            Self::TransTargs => "trans_targs",
            Self::TransActions => "trans_actions",
            Self::ToStateActions => "to_state_actions",
            Self::FromStateActions => "from_state_actions",
            Self::EofActions => "eof_actions",
            Self::EofTrans => "eof_trans",
        }
    }
}

/// Narrowest host type able to hold `max_value`.
pub fn array_type(table: &'static str, max_value: i128) -> Result<IntType> {
    IntType::subsuming(max_value).ok_or(TableError::ValueTooWide {
        table,
        value: max_value,
    })
}

/// Size in bytes of the array type chosen for `max_value`.
pub fn array_type_size(table: &'static str, max_value: i128) -> Result<u64> {
    array_type(table, max_value).map(|t| u64::from(t.size()))
}

/// One emitted array: its kind, element type, and values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayTable {
    pub kind: TableKind,
    pub ty: IntType,
    pub values: Vec<i64>,
}

impl ArrayTable {
    /// Build an array whose element type is the narrowest type holding
    /// every value.
    pub fn new(kind: TableKind, values: Vec<i64>) -> Result<Self> {
        let max = values.iter().copied().max().unwrap_or(0);
        let min = values.iter().copied().min().unwrap_or(0);
        let ty = array_type(kind.base_name(), i128::from(max))?;
        // Negative entries only appear in key arrays, which use `with_type`.
        if i128::from(min) < ty.min_value() {
            return Err(TableError::ValueTooWide {
                table: kind.base_name(),
                value: i128::from(min),
            });
        }
        Ok(Self { kind, ty, values })
    }

    /// Build an array with an explicitly chosen element type.
    #[must_use]
    pub const fn with_type(kind: TableKind, ty: IntType, values: Vec<i64>) -> Self {
        Self { kind, ty, values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Element at `index` (0 past the end, matching an absent optional table).
    #[must_use]
    pub fn get(&self, index: usize) -> i64 {
        self.values.get(index).copied().unwrap_or(0)
    }

    /// Total size in bytes.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        u64::from(self.ty.size()) * self.values.len() as u64
    }
}
