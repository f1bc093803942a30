//! Flat table encoding for reduced automata.
//!
//! Turns a [`fsmc_ir::ReducedFsm`] into the parallel numeric arrays the
//! generated scanner indexes: per-state key bounds and spans, index
//! offsets, the shared index (or direct slot) arrays, transition targets
//! and actions, state and EOF action locations, and the condition tables
//! used to build wide keys.

mod by_id;
mod conds;
mod encode;
mod error;
mod flat;
mod lookup;
mod plan;
mod width;

pub use by_id::*;
pub use conds::*;
pub use encode::*;
pub use error::*;
pub use flat::*;
pub use plan::*;
pub use width::*;
