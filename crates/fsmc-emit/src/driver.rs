//! The goto-free scan loop.
//!
//! Control labels are emulated by one `while true` loop whose body is a
//! series of sections, each guarded by `if _goto_level <= LEVEL`. A jump
//! stores the target level and restarts the loop with `next`, skipping
//! every section below the target.

use std::collections::BTreeSet;

use fsmc_ir::{ActionId, ActionTableId, ReducedFsm};
use fsmc_tables::{EncodedTables, TableKind};

use crate::action::{ActionCompiler, ActionCtx};
use crate::error::{EmitError, Result};
use crate::host::{ConstNames, HostNames};
use crate::level::Level;
use crate::options::GenOptions;
use crate::widen::CondWidener;
use crate::writer::CodeWriter;

/// Where an action dispatch reads its action-table location from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DispatchSite {
    FromState,
    Trans,
    ToState,
    Eof,
}

impl DispatchSite {
    const fn table(self) -> TableKind {
        match self {
            Self::FromState => TableKind::FromStateActions,
            Self::Trans => TableKind::TransActions,
            Self::ToState => TableKind::ToStateActions,
            Self::Eof => TableKind::EofActions,
        }
    }
}

/// Emits the `write exec` block.
pub struct Driver<'a> {
    fsm: &'a ReducedFsm,
    tables: &'a EncodedTables,
    opts: &'a GenOptions,
    names: &'a HostNames,
    consts: &'a ConstNames,
    compiler: ActionCompiler<'a>,
}

impl<'a> Driver<'a> {
    #[must_use]
    pub const fn new(
        fsm: &'a ReducedFsm,
        tables: &'a EncodedTables,
        opts: &'a GenOptions,
        names: &'a HostNames,
        consts: &'a ConstNames,
    ) -> Self {
        Self {
            fsm,
            tables,
            opts,
            names,
            consts,
            compiler: ActionCompiler::new(fsm, names, opts),
        }
    }

    pub fn write(&self, w: &mut CodeWriter) -> Result<()> {
        w.open("begin");
        self.write_locals(w);
        w.open("while true");
        w.line("_trigger_goto = false");

        Self::section(w, Level::Entry, |w| {
            self.write_entry_checks(w);
            Ok(())
        })?;

        let eof_split = self.fsm.any_eof_trans();
        w.open(&section_header(Level::Resume));
        self.write_dispatch(w, DispatchSite::FromState)?;
        if self.fsm.any_conditions() {
            CondWidener::new(
                self.fsm,
                &self.compiler,
                self.names,
                self.consts,
                self.opts.line_directives,
            )
            .write(w)?;
        }
        self.write_locate(w);
        if eof_split {
            w.close();
            w.open(&section_header(Level::EofTrans));
        }
        self.write_take_transition(w)?;
        w.close();

        Self::section(w, Level::Again, |w| self.write_again(w))?;
        Self::section(w, Level::TestEof, |w| self.write_test_eof(w))?;
        Self::section(w, Level::Out, |w| {
            w.line("break");
            Ok(())
        })?;

        w.close();
        w.close();
        Ok(())
    }

    fn section(
        w: &mut CodeWriter,
        level: Level,
        body: impl FnOnce(&mut CodeWriter) -> Result<()>,
    ) -> Result<()> {
        w.open(&section_header(level));
        body(w)?;
        w.close();
        Ok(())
    }

    fn write_locals(&self, w: &mut CodeWriter) {
        let fsm = self.fsm;
        for var in ["_slen", "_trans", "_keys", "_inds", "_wide"] {
            w.line(&format!("{var} = 0"));
        }
        if fsm.any_curs_ref() {
            w.line("_ps = 0");
        }
        if fsm.any_conditions() {
            for var in ["_cond", "_conds", "_widec"] {
                w.line(&format!("{var} = 0"));
            }
        }
        if fsm.any_actions() {
            w.line("_acts = 0");
            w.line("_nacts = 0");
        }
        w.line("_trigger_goto = false");
        w.line("_goto_level = 0");
        for level in Level::ALL {
            if let Some(var) = level.var() {
                w.line(&format!("{var} = {}", level.value()));
            }
        }
    }

    /// Jump to `level` from straight-line loop code.
    fn jump(w: &mut CodeWriter, level: Level) {
        w.line(&format!("_goto_level = {}", level.operand()));
        w.line("next");
    }

    fn write_error_check(&self, w: &mut CodeWriter) {
        if let Some(err) = self.fsm.error_state {
            w.open(&format!("if {} == {err}", self.names.cs));
            Self::jump(w, Level::Out);
            w.close();
        }
    }

    fn write_entry_checks(&self, w: &mut CodeWriter) {
        if !self.opts.no_end {
            w.open(&format!("if {} == {}", self.names.p, self.names.pe));
            Self::jump(w, Level::TestEof);
            w.close();
        }
        self.write_error_check(w);
    }

    fn write_locate(&self, w: &mut CodeWriter) {
        let cs = &self.names.cs;
        let keys = self.consts.array(TableKind::Keys);
        let wide = if self.fsm.any_conditions() {
            "_widec"
        } else {
            self.names.get_key.as_str()
        };
        w.line(&format!("_keys = {cs} << 1"));
        w.line(&format!("_inds = {}[{cs}]", self.consts.array(TableKind::IndexOffsets)));
        w.line(&format!("_slen = {}[{cs}]", self.consts.array(TableKind::KeySpans)));
        w.line(&format!("_wide = {wide}"));

        let in_span = format!("_inds + _wide - {keys}[_keys]");
        let index = |slot: &str| {
            if self.tables.indices.is_some() {
                format!("{}[{slot}]", self.consts.array(TableKind::Indices))
            } else {
                slot.to_string()
            }
        };
        w.open(&format!(
            "_trans = if _slen > 0 && {keys}[_keys] <= _wide && _wide <= {keys}[_keys + 1]"
        ));
        w.line(&index(&in_span));
        w.middle("else");
        w.line(&index("_inds + _slen"));
        w.close();
    }

    fn write_take_transition(&self, w: &mut CodeWriter) -> Result<()> {
        let cs = &self.names.cs;
        if self.fsm.any_curs_ref() {
            w.line(&format!("_ps = {cs}"));
        }
        w.line(&format!(
            "{cs} = {}[_trans]",
            self.consts.array(TableKind::TransTargs)
        ));
        self.write_dispatch(w, DispatchSite::Trans)
    }

    fn write_again(&self, w: &mut CodeWriter) -> Result<()> {
        self.write_dispatch(w, DispatchSite::ToState)?;
        self.write_error_check(w);
        let p = &self.names.p;
        w.line(&format!("{p} += 1"));
        if self.opts.no_end {
            Self::jump(w, Level::Resume);
        } else {
            w.open(&format!("if {p} != {}", self.names.pe));
            Self::jump(w, Level::Resume);
            w.close();
        }
        Ok(())
    }

    fn write_test_eof(&self, w: &mut CodeWriter) -> Result<()> {
        let fsm = self.fsm;
        if !fsm.any_eof_trans() && !fsm.any_eof_actions() {
            return Ok(());
        }
        let cs = &self.names.cs;
        w.open(&format!("if {} == {}", self.names.p, self.names.eof));
        if fsm.any_eof_trans() {
            let et = self.consts.array(TableKind::EofTrans);
            w.open(&format!("if {et}[{cs}] > 0"));
            w.line(&format!("_trans = {et}[{cs}] - 1"));
            Self::jump(w, Level::EofTrans);
            w.close();
        }
        self.write_dispatch(w, DispatchSite::Eof)?;
        w.close();
        Ok(())
    }

    /// Tables referenced from `site`.
    fn site_tables(&self, site: DispatchSite) -> Vec<ActionTableId> {
        let states = self.fsm.states.iter();
        match site {
            DispatchSite::Trans => self.fsm.transitions.iter().filter_map(|t| t.action).collect(),
            DispatchSite::ToState => states.filter_map(|s| s.to_state_action).collect(),
            DispatchSite::FromState => states.filter_map(|s| s.from_state_action).collect(),
            DispatchSite::Eof => states.filter_map(|s| s.eof_action).collect(),
        }
    }

    /// Actions reachable from `site`, in id order.
    fn site_actions(&self, site: DispatchSite) -> BTreeSet<ActionId> {
        self.site_tables(site)
            .into_iter()
            .filter_map(|t| self.fsm.action_table(t))
            .flat_map(|t| t.actions.iter().copied())
            .collect()
    }

    fn write_dispatch(&self, w: &mut CodeWriter, site: DispatchSite) -> Result<()> {
        let ids = self.site_actions(site);
        if ids.is_empty() {
            return Ok(());
        }
        let actions = self.consts.array(TableKind::Actions);
        let locs = self.consts.array(site.table());
        let ctx = if site == DispatchSite::Eof {
            ActionCtx::finish()
        } else {
            ActionCtx::default()
        };

        let guarded = site == DispatchSite::Trans;
        if guarded {
            w.open(&format!("if {locs}[_trans] != 0"));
            w.line(&format!("_acts = {locs}[_trans]"));
        } else {
            w.line(&format!("_acts = {locs}[{}]", self.names.cs));
        }
        w.line(&format!("_nacts = {actions}[_acts]"));
        w.line("_acts += 1");
        w.open("while _nacts > 0");
        w.line("_nacts -= 1");
        w.line("_acts += 1");
        w.line(&format!("case {actions}[_acts - 1]"));
        for id in ids {
            let action = self.fsm.action(id).ok_or(EmitError::UnknownAction(id))?;
            w.open(&format!("when {id} then"));
            w.block(&self.compiler.action_body(action, ctx)?);
            w.dedent();
        }
        w.line("end");
        w.close();
        if guarded {
            w.close();
        }
        w.open("if _trigger_goto");
        w.line("next");
        w.close();
        Ok(())
    }
}

fn section_header(level: Level) -> String {
    format!("if _goto_level <= {}", level.operand())
}
