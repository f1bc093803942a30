//! Alphabet keys and host integer types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An alphabet key (input symbol, or wide key once conditions are folded in).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(pub i64);

impl Key {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Self(i64::from(u32::from(c)))
    }
}

impl From<u8> for Key {
    fn from(b: u8) -> Self {
        Self(i64::from(b))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integer types available in the target language, narrowest first.
///
/// The order matters: [`IntType::subsuming`] picks the first entry whose
/// range covers a value, so a signed type is preferred over the unsigned
/// type of the same width only when it actually fits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl IntType {
    /// All host types in selection order.
    pub const ALL: [Self; 8] = [
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
    ];

    /// Target-language type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "Int8",
            Self::UInt8 => "UInt8",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
        }
    }

    /// Size in bytes.
    #[must_use]
    pub const fn size(self) -> u32 {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 => 4,
            Self::Int64 | Self::UInt64 => 8,
        }
    }

    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Smallest representable value.
    #[must_use]
    pub const fn min_value(self) -> i128 {
        match self {
            Self::Int8 => i8::MIN as i128,
            Self::Int16 => i16::MIN as i128,
            Self::Int32 => i32::MIN as i128,
            Self::Int64 => i64::MIN as i128,
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64 => 0,
        }
    }

    /// Largest representable value.
    #[must_use]
    pub const fn max_value(self) -> i128 {
        match self {
            Self::Int8 => i8::MAX as i128,
            Self::UInt8 => u8::MAX as i128,
            Self::Int16 => i16::MAX as i128,
            Self::UInt16 => u16::MAX as i128,
            Self::Int32 => i32::MAX as i128,
            Self::UInt32 => u32::MAX as i128,
            Self::Int64 => i64::MAX as i128,
            Self::UInt64 => u64::MAX as i128,
        }
    }

    /// First host type (in selection order) whose range includes `value`.
    #[must_use]
    pub fn subsuming(value: i128) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.min_value() <= value && value <= t.max_value())
    }

    /// First host type of the given signedness whose range includes `value`.
    #[must_use]
    pub fn subsuming_signed(signed: bool, value: i128) -> Option<Self> {
        Self::ALL
            .into_iter()
            .filter(|t| t.is_signed() == signed)
            .find(|t| t.min_value() <= value && value <= t.max_value())
    }

    /// Look up a type by its target-language name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for IntType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operations on keys of one alphabet type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOps {
    /// Alphabet type of raw input symbols.
    pub alph_type: IntType,
}

impl Default for KeyOps {
    fn default() -> Self {
        Self::new(IntType::Int8)
    }
}

impl KeyOps {
    #[must_use]
    pub const fn new(alph_type: IntType) -> Self {
        Self { alph_type }
    }

    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.alph_type.is_signed()
    }

    /// Smallest raw key.
    #[must_use]
    pub fn min_key(&self) -> Key {
        Key(i64::try_from(self.alph_type.min_value()).unwrap_or(i64::MIN))
    }

    /// Largest raw key.
    #[must_use]
    pub fn max_key(&self) -> Key {
        Key(i64::try_from(self.alph_type.max_value()).unwrap_or(i64::MAX))
    }

    /// Number of keys in `[low, high]`, computed in wrapping unsigned
    /// arithmetic.
    ///
    /// The result is exact whenever the range holds fewer than 2^64 keys.
    /// A range covering the entire 64-bit domain wraps to 0.
    #[must_use]
    pub const fn span(low: Key, high: Key) -> u64 {
        (high.0 as u64).wrapping_sub(low.0 as u64).wrapping_add(1)
    }

    /// Number of raw keys in the alphabet.
    #[must_use]
    pub fn alph_size(&self) -> u64 {
        Self::span(self.min_key(), self.max_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_inclusive() {
        assert_eq!(KeyOps::span(Key::from('a'), Key::from('z')), 26);
        assert_eq!(KeyOps::span(Key(5), Key(5)), 1);
        assert_eq!(KeyOps::span(Key(-128), Key(127)), 256);
    }

    #[test]
    fn test_span_wraps_full_domain() {
        assert_eq!(KeyOps::span(Key(i64::MIN), Key(i64::MAX)), 0);
        assert_eq!(KeyOps::span(Key(i64::MIN), Key(i64::MAX - 1)), u64::MAX);
    }

    #[test]
    fn test_alph_size() {
        assert_eq!(KeyOps::new(IntType::Int8).alph_size(), 256);
        assert_eq!(KeyOps::new(IntType::UInt16).alph_size(), 65536);
    }

    #[test]
    fn test_subsuming_picks_narrowest() {
        assert_eq!(IntType::subsuming(0), Some(IntType::Int8));
        assert_eq!(IntType::subsuming(127), Some(IntType::Int8));
        assert_eq!(IntType::subsuming(200), Some(IntType::UInt8));
        assert_eq!(IntType::subsuming(40_000), Some(IntType::UInt16));
        assert_eq!(IntType::subsuming(-1), Some(IntType::Int8));
        assert_eq!(IntType::subsuming(i128::from(u64::MAX) + 1), None);
    }

    #[test]
    fn test_subsuming_signed() {
        assert_eq!(IntType::subsuming_signed(false, 300), Some(IntType::UInt16));
        assert_eq!(IntType::subsuming_signed(true, 300), Some(IntType::Int16));
        assert_eq!(IntType::subsuming_signed(false, -1), None);
    }

    #[test]
    fn test_subsuming_at_64_bit_bounds() {
        assert_eq!(IntType::subsuming(i128::from(i64::MIN)), Some(IntType::Int64));
        assert_eq!(IntType::subsuming(i128::from(i64::MIN) - 1), None);
        assert_eq!(IntType::subsuming(i128::from(i64::MAX)), Some(IntType::Int64));
        assert_eq!(IntType::subsuming(i128::from(u64::MAX)), Some(IntType::UInt64));
        assert_eq!(
            IntType::subsuming_signed(false, i128::from(u64::MAX)),
            Some(IntType::UInt64)
        );
        assert_eq!(IntType::subsuming_signed(true, i128::from(u64::MAX)), None);
        assert_eq!(IntType::Int64.min_value(), i128::from(i64::MIN));
        assert_eq!(IntType::UInt64.max_value(), i128::from(u64::MAX));
    }
}
