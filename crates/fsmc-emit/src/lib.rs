//! Goto-free scanner emission.
//!
//! Compiles a reduced automaton and its embedded actions into a Crystal
//! scan routine: constant tables, an init block and a single `while true`
//! loop that emulates labels with an integer resumption level.
//!
//! ```ignore
//! let code = fsmc_emit::generate(&fsm, &GenOptions::new("scanner"))?;
//! std::fs::write("scanner.cr", code.source())?;
//! ```

mod action;
mod codegen;
mod data;
mod driver;
mod error;
mod host;
mod level;
mod machine;
mod options;
mod widen;
mod writer;

pub use action::{ActionCompiler, ActionCtx, node_name};
pub use codegen::{CodeGen, GeneratedCode, generate};
pub use data::write_array;
pub use error::{EmitError, Result};
pub use host::{ConstNames, HostNames, line_directive};
pub use level::Level;
pub use machine::{DEFAULT_STACK_LIMIT, GuardFn, Machine};
pub use options::{GenOptions, HostExprs};
pub use writer::{CodeWriter, INDENT};

#[cfg(test)]
mod tests;
