//! Code generation errors.

use fsmc_ir::{ActionId, Loc, StateId};
use fsmc_tables::{TableError, loc_prefix};
use thiserror::Error;

/// Errors raised while generating code or replaying a machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("{0} error(s) reported by an earlier stage; no code generated")]
    UpstreamErrors(usize),
    #[error("{}reference to unknown state {state}", loc_prefix(.loc))]
    UnknownState { state: StateId, loc: Option<Loc> },
    #[error("reference to unknown action {0}")]
    UnknownAction(ActionId),
    #[error("{}malformed action: {reason}", loc_prefix(.loc))]
    MalformedAction { reason: String, loc: Option<Loc> },
    #[error("call stack overflow at depth {0}")]
    CallStackOverflow(usize),
    #[error("return with an empty call stack")]
    CallStackUnderflow,
    #[error("scan position {0} is outside the input")]
    InputOverrun(i64),
}

impl EmitError {
    pub(crate) fn malformed(reason: impl Into<String>, loc: Option<&Loc>) -> Self {
        Self::MalformedAction {
            reason: reason.into(),
            loc: loc.cloned(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EmitError>;
