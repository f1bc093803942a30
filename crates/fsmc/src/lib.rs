//! fsmc - flat-table scanner generator
//!
//! Loads a reduced automaton, encodes it into flat transition tables and
//! emits a goto-free Crystal scan routine.
//!
//! # Example
//!
//! ```ignore
//! use fsmc::{GenOptions, generate_file};
//!
//! let opts = GenOptions::new("scanner");
//! generate_file("scanner.json", "scanner.cr", &opts)?;
//! ```

mod error;

pub use error::{Error, Result};
pub use fsmc_emit::{CodeGen, EmitError, GenOptions, GeneratedCode, HostExprs, Machine};
pub use fsmc_ir::{FsmBuilder, IrError, ReducedFsm};
pub use fsmc_tables::{EncodedTables, Layout, TableError, encode};

use std::fs;
use std::path::Path;

use tracing::{debug, info};

/// Parse an automaton from its JSON form and check its internal
/// references.
pub fn load_fsm_str(json: &str) -> Result<ReducedFsm> {
    let fsm: ReducedFsm = serde_json::from_str(json)?;
    fsm.validate()?;
    Ok(fsm)
}

/// Read and validate an automaton file.
pub fn load_fsm(path: impl AsRef<Path>) -> Result<ReducedFsm> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let fsm = load_fsm_str(&json)?;
    debug!(
        path = %path.display(),
        states = fsm.states.len(),
        transitions = fsm.transitions.len(),
        actions = fsm.actions.len(),
        "loaded automaton"
    );
    Ok(fsm)
}

/// Generate the scanner source for an in-memory automaton.
pub fn generate(fsm: &ReducedFsm, opts: &GenOptions) -> Result<GeneratedCode> {
    Ok(fsmc_emit::generate(fsm, opts)?)
}

/// Generate from an automaton file and write the source to `output`.
///
/// The output file is only created once generation has succeeded.
pub fn generate_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    opts: &GenOptions,
) -> Result<GeneratedCode> {
    let output = output.as_ref();
    let fsm = load_fsm(input)?;
    let code = generate(&fsm, opts)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, code.source())?;
    info!(output = %output.display(), bytes = code.source().len(), "wrote scanner");
    Ok(code)
}

/// Encode the tables without emitting code.
pub fn plan(fsm: &ReducedFsm, layout: Option<Layout>) -> Result<EncodedTables> {
    Ok(encode(fsm, layout)?)
}
