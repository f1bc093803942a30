//! Table and constant emission.

use fsmc_ir::ReducedFsm;
use fsmc_tables::{ArrayTable, EncodedTables};

use crate::host::{ConstNames, HostNames};
use crate::options::GenOptions;
use crate::writer::CodeWriter;

/// Write one array as `NAME = [ ... ] of Type`.
pub fn write_array(w: &mut CodeWriter, name: &str, array: &ArrayTable, items_per_line: usize) {
    let ty = array.ty.name();
    if array.is_empty() {
        w.line(&format!("{name} = [] of {ty}"));
        return;
    }
    w.open(&format!("{name} = ["));
    let chunks: Vec<&[i64]> = array.values.chunks(items_per_line.max(1)).collect();
    for (i, chunk) in chunks.iter().enumerate() {
        let mut line = chunk
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        if i + 1 < chunks.len() {
            line.push(',');
        }
        w.line(&line);
    }
    w.close_with(&format!("] of {ty}"));
}

/// Every array, then the state-id constants and entry points.
pub fn write_data(w: &mut CodeWriter, tables: &EncodedTables, consts: &ConstNames, opts: &GenOptions) {
    for array in tables.arrays() {
        write_array(w, &consts.array(array.kind), array, opts.items_per_line);
        w.blank();
    }

    w.line(&format!("{} = {}", consts.start(), tables.start_state));
    if !opts.no_final {
        w.line(&format!("{} = {}", consts.first_final(), tables.first_final));
    }
    if !opts.no_error {
        w.line(&format!("{} = {}", consts.error(), tables.error_state));
    }
    w.blank();

    if !opts.no_entry && !tables.entry_points.is_empty() {
        for (name, id) in &tables.entry_points {
            w.line(&format!("{} = {id}", consts.entry(name)));
        }
        w.blank();
    }
}

/// Exported keys as named constants.
pub fn write_exports(w: &mut CodeWriter, fsm: &ReducedFsm, consts: &ConstNames) {
    if fsm.exports.is_empty() {
        return;
    }
    for export in &fsm.exports {
        w.line(&format!("{} = {}", consts.export(&export.name), export.key));
    }
    w.blank();
}

/// Register initialization before the first scan call.
pub fn write_init(
    w: &mut CodeWriter,
    fsm: &ReducedFsm,
    names: &HostNames,
    consts: &ConstNames,
    opts: &GenOptions,
) {
    w.open("begin");
    w.line(&format!("{} ||= 0", names.p));
    if !opts.no_end {
        w.line(&format!("{} ||= {}.size", names.pe, names.data));
    }
    if !opts.no_cs_init {
        w.line(&format!("{} = {}", names.cs, consts.start()));
    }
    if fsm.any_calls() || fsm.any_rets() {
        w.line(&format!("{} = 0", names.top));
    }
    if fsm.has_longest_match() {
        w.line(&format!("{} = nil", names.ts));
        w.line(&format!("{} = nil", names.te));
        w.line(&format!("{} = 0", names.act));
    }
    w.close();
}

#[cfg(test)]
mod tests {
    use fsmc_ir::IntType;
    use fsmc_tables::TableKind;

    use super::*;

    #[test]
    fn test_array_wraps_lines() {
        let mut w = CodeWriter::new();
        let array = ArrayTable::with_type(TableKind::KeySpans, IntType::Int8, vec![1, 2, 3, 4, 5]);
        write_array(&mut w, "FSM_KEY_SPANS", &array, 2);
        assert_eq!(
            w.output(),
            "FSM_KEY_SPANS = [\n  1, 2,\n  3, 4,\n  5\n] of Int8\n"
        );
    }

    #[test]
    fn test_empty_array() {
        let mut w = CodeWriter::new();
        let array = ArrayTable::with_type(TableKind::Conds, IntType::UInt8, Vec::new());
        write_array(&mut w, "CONDS", &array, 8);
        assert_eq!(w.output(), "CONDS = [] of UInt8\n");
    }
}
