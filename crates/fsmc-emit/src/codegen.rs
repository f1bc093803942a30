//! Generation entry point.

use fsmc_ir::ReducedFsm;
use fsmc_tables::{EncodedTables, encode};
use tracing::{debug, info};

use crate::data::{write_data, write_exports, write_init};
use crate::driver::Driver;
use crate::error::{EmitError, Result};
use crate::host::{ConstNames, HostNames};
use crate::options::GenOptions;
use crate::writer::CodeWriter;

/// The emitted source, split the way a host file embeds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedCode {
    /// Arrays and state-id constants.
    pub data: String,
    /// Exported key constants.
    pub exports: String,
    /// Register initialization.
    pub init: String,
    /// The scan loop.
    pub exec: String,
    /// Tables the source was generated from.
    pub tables: EncodedTables,
}

impl GeneratedCode {
    /// Every section concatenated, data first.
    #[must_use]
    pub fn source(&self) -> String {
        let mut out = String::with_capacity(
            self.data.len() + self.exports.len() + self.init.len() + self.exec.len() + 2,
        );
        out.push_str(&self.data);
        out.push_str(&self.exports);
        out.push_str(&self.init);
        out.push('\n');
        out.push_str(&self.exec);
        out
    }
}

/// One generation run over an automaton.
pub struct CodeGen<'a> {
    fsm: &'a ReducedFsm,
    opts: &'a GenOptions,
    tables: EncodedTables,
    names: HostNames,
    consts: ConstNames,
}

impl<'a> CodeGen<'a> {
    /// Encode the tables and resolve host names. Refuses to run when an
    /// earlier stage reported errors.
    pub fn new(fsm: &'a ReducedFsm, opts: &'a GenOptions) -> Result<Self> {
        if fsm.upstream_errors > 0 {
            return Err(EmitError::UpstreamErrors(fsm.upstream_errors));
        }
        let tables = encode(fsm, opts.layout)?;
        let names = HostNames::resolve(fsm, opts)?;
        debug!(
            states = fsm.states.len(),
            transitions = fsm.transitions.len(),
            layout = %tables.layout(),
            conditions = fsm.any_conditions(),
            "encoded tables"
        );
        Ok(Self {
            fsm,
            opts,
            tables,
            names,
            consts: ConstNames::new(opts),
        })
    }

    #[must_use]
    pub const fn tables(&self) -> &EncodedTables {
        &self.tables
    }

    #[must_use]
    pub fn write_data(&self) -> String {
        let mut w = CodeWriter::new();
        write_data(&mut w, &self.tables, &self.consts, self.opts);
        w.take_output()
    }

    #[must_use]
    pub fn write_exports(&self) -> String {
        let mut w = CodeWriter::new();
        write_exports(&mut w, self.fsm, &self.consts);
        w.take_output()
    }

    #[must_use]
    pub fn write_init(&self) -> String {
        let mut w = CodeWriter::new();
        write_init(&mut w, self.fsm, &self.names, &self.consts, self.opts);
        w.take_output()
    }

    pub fn write_exec(&self) -> Result<String> {
        let mut w = CodeWriter::new();
        Driver::new(self.fsm, &self.tables, self.opts, &self.names, &self.consts).write(&mut w)?;
        Ok(w.take_output())
    }

    /// Render every section. Nothing is returned unless all of them
    /// succeed.
    pub fn finish(self) -> Result<GeneratedCode> {
        let exec = self.write_exec()?;
        let code = GeneratedCode {
            data: self.write_data(),
            exports: self.write_exports(),
            init: self.write_init(),
            exec,
            tables: self.tables,
        };
        info!(
            fsm = %self.opts.fsm_name,
            states = self.fsm.states.len(),
            layout = %code.tables.layout(),
            table_bytes = code.tables.byte_size(),
            source_bytes = code.data.len() + code.exec.len(),
            "generated scanner"
        );
        Ok(code)
    }
}

/// Generate the complete scanner for `fsm`.
pub fn generate(fsm: &ReducedFsm, opts: &GenOptions) -> Result<GeneratedCode> {
    CodeGen::new(fsm, opts)?.finish()
}
