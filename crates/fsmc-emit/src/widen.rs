//! Condition translation: folding guard results into the wide key.

use fsmc_ir::{CondSpace, ReducedFsm};
use fsmc_tables::TableKind;

use crate::action::ActionCompiler;
use crate::error::{EmitError, Result};
use crate::host::{ConstNames, HostNames, line_directive};
use crate::writer::CodeWriter;

/// Emits the per-state condition lookup and the guard fold for every
/// condition space.
pub struct CondWidener<'a> {
    fsm: &'a ReducedFsm,
    compiler: &'a ActionCompiler<'a>,
    names: &'a HostNames,
    consts: &'a ConstNames,
    line_directives: bool,
}

impl<'a> CondWidener<'a> {
    #[must_use]
    pub const fn new(
        fsm: &'a ReducedFsm,
        compiler: &'a ActionCompiler<'a>,
        names: &'a HostNames,
        consts: &'a ConstNames,
        line_directives: bool,
    ) -> Self {
        Self {
            fsm,
            compiler,
            names,
            consts,
            line_directives,
        }
    }

    /// Leaves the wide key in `_widec`.
    pub fn write(&self, w: &mut CodeWriter) -> Result<()> {
        let cs = &self.names.cs;
        let ck = self.consts.array(TableKind::CondKeys);
        w.line(&format!("_widec = {}", self.names.get_key));
        w.line(&format!("_keys = {cs} << 1"));
        w.line(&format!(
            "_conds = {}[{cs}]",
            self.consts.array(TableKind::CondIndexOffsets)
        ));
        w.line(&format!(
            "_slen = {}[{cs}]",
            self.consts.array(TableKind::CondKeySpans)
        ));
        w.open(&format!(
            "_cond = if _slen > 0 && {ck}[_keys] <= _widec && _widec <= {ck}[_keys + 1]"
        ));
        w.line(&format!(
            "{}[_conds + _widec - {ck}[_keys]]",
            self.consts.array(TableKind::Conds)
        ));
        w.middle("else");
        w.line("0");
        w.close();

        w.line("case _cond");
        for space in &self.fsm.cond_spaces {
            w.open(&format!("when {} then", space.id.0 + 1));
            self.write_space(w, space)?;
            w.dedent();
        }
        w.line("end");
        Ok(())
    }

    fn write_space(&self, w: &mut CodeWriter, space: &CondSpace) -> Result<()> {
        let ops = self.fsm.key_ops;
        let alph = ops.alph_size();
        w.line(&format!(
            "_widec = ({} + ({} - {}))",
            space.base_key,
            self.names.get_key,
            ops.min_key()
        ));
        for (pos, &guard) in space.guards.iter().enumerate() {
            let action = self.fsm.action(guard).ok_or(EmitError::UnknownAction(guard))?;
            let expr = self.compiler.condition(action)?;
            if let Some(loc) = action.loc.as_ref().filter(|_| self.line_directives) {
                w.line(&line_directive(loc));
            }
            let bit = u32::try_from(pos).unwrap_or(u32::MAX);
            w.open(&format!("if ({expr}) then"));
            w.line(&format!("_widec += {}", CondSpace::guard_offset(bit, alph)));
            w.close();
        }
        Ok(())
    }
}
