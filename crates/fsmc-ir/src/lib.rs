//! Intermediate representation for the fsmc code generator.
//!
//! This crate holds the read-only reduced automaton consumed by code
//! generation: alphabet keys and host integer types, the transition arena,
//! states, condition spaces and the embedded action-tree language. Nothing
//! here knows about table layouts or the target language.

mod action;
mod builder;
mod cond;
mod error;
mod fsm;
mod key;
mod loc;
mod state;
mod trans;

pub use action::*;
pub use builder::*;
pub use cond::*;
pub use error::*;
pub use fsm::*;
pub use key::*;
pub use loc::*;
pub use state::*;
pub use trans::*;
