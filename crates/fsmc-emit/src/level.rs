//! Resumption levels of the scan loop.

/// A logical label of the emitted loop.
///
/// The loop body is a sequence of sections guarded by
/// `if _goto_level <= LEVEL`; jumping to a label means storing its level
/// and restarting the loop, which skips every lower section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Buffer-end and error-state checks before the first lookup.
    Entry,
    /// From-state actions and transition lookup.
    Resume,
    /// Taking a transition (also entered from the EOF check).
    EofTrans,
    /// To-state actions and the advance.
    Again,
    TestEof,
    Out,
}

impl Level {
    pub const ALL: [Self; 6] = [
        Self::Entry,
        Self::Resume,
        Self::EofTrans,
        Self::Again,
        Self::TestEof,
        Self::Out,
    ];

    /// Numeric value stored in `_goto_level`.
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Entry => 0,
            Self::Resume => 10,
            Self::EofTrans => 15,
            Self::Again => 20,
            Self::TestEof => 30,
            Self::Out => 40,
        }
    }

    /// Loop-local variable holding the level, `None` for the entry level.
    #[must_use]
    pub const fn var(self) -> Option<&'static str> {
        match self {
            Self::Entry => None,
            Self::Resume => Some("_resume"),
            Self::EofTrans => Some("_eof_trans"),
            Self::Again => Some("_again"),
            Self::TestEof => Some("_test_eof"),
            Self::Out => Some("_out"),
        }
    }

    /// Right-hand side of a level comparison or assignment.
    #[must_use]
    pub fn operand(self) -> String {
        self.var()
            .map_or_else(|| self.value().to_string(), str::to_string)
    }

    /// Level a jump made from an action lands on.
    #[must_use]
    pub const fn jump_target(in_finish: bool) -> Self {
        if in_finish { Self::Out } else { Self::Again }
    }
}
