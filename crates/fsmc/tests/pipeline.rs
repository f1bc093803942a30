//! End-to-end tests: automaton JSON in, scanner source out.

use std::fs;
use std::path::Path;

use fsmc::{
    EmitError, Error, FsmBuilder, GenOptions, IrError, Layout, Machine, ReducedFsm, generate,
    generate_file, load_fsm, load_fsm_str,
};
use fsmc_ir::{ActionTree, IntType, KeyOps, Loc, StateId};
use tempfile::TempDir;

/// Lower-case words: `start` on the first letter, `emit` at end of input.
fn word_fsm() -> ReducedFsm {
    let mut b = FsmBuilder::new(KeyOps::new(IntType::Int8));
    let s0 = b.add_state();
    b.error_state();
    let word = b.add_state();
    b.set_final(word);
    let start = b.named_action(
        "start",
        Some(Loc::new("words.rl", 3, 9)),
        ActionTree::text("start"),
    );
    let emit = b.named_action("emit", Some(Loc::new("words.rl", 4, 9)), ActionTree::text("emit"));
    let t_start = b.table(&[start]);
    let t_emit = b.table(&[emit]);
    b.range(s0, 'a', 'z', word, Some(t_start))
        .range(word, 'a', 'z', word, None)
        .eof_action(word, t_emit)
        .entry("main", s0);
    b.build().unwrap()
}

fn write_json(dir: &Path, name: &str, fsm: &ReducedFsm) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(fsm).unwrap()).unwrap();
    path
}

fn keys(s: &str) -> Vec<i64> {
    s.bytes().map(i64::from).collect()
}

#[test]
fn test_generate_file_writes_source() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "words.json", &word_fsm());
    let output = dir.path().join("out").join("words.cr");

    let code = generate_file(&input, &output, &GenOptions::new("words")).unwrap();
    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(text, code.source());
    assert!(text.starts_with("WORDS_ACTIONS = [\n"));
    assert!(text.contains("WORDS_START = 0\n"));
    assert!(text.contains("WORDS_FIRST_FINAL = 2\n"));
    assert!(text.contains("WORDS_ERROR = 1\n"));
    assert!(text.contains("WORDS_EN_MAIN = 0\n"));
    assert!(text.contains("# line 3 \"words.rl\"\n"));
    assert!(text.contains("while true\n"));
    assert!(text.ends_with("end\n"));
}

#[test]
fn test_loaded_automaton_matches_built_one() {
    let dir = TempDir::new().unwrap();
    let fsm = word_fsm();
    let input = write_json(dir.path(), "words.json", &fsm);
    assert_eq!(load_fsm(&input).unwrap(), fsm);
}

#[test]
fn test_generated_tables_drive_the_machine() {
    let fsm = word_fsm();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("abc"), true).unwrap();
    assert_eq!(m.trace, ["start", "emit"]);
    assert!(m.accepted());
    assert_eq!(m.p, 3);

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("ab1"), true).unwrap();
    assert!(m.in_error());
    assert_eq!(m.p, 2);
    assert_eq!(m.trace, ["start"]);
}

#[test]
fn test_forced_layouts_generate() {
    let fsm = word_fsm();
    for layout in [Layout::Indexed, Layout::Direct] {
        let opts = GenOptions::default().with_layout(Some(layout));
        let code = generate(&fsm, &opts).unwrap();
        assert_eq!(code.tables.layout(), layout);
        assert!(code.tables.plan.forced);
        assert_eq!(code.exec.contains("FSM_INDICES["), layout == Layout::Indexed);
    }
}

#[test]
fn test_no_output_on_failure() {
    let dir = TempDir::new().unwrap();
    let mut fsm = word_fsm();
    fsm.upstream_errors = 2;
    let input = write_json(dir.path(), "bad.json", &fsm);
    let output = dir.path().join("bad.cr");

    let err = generate_file(&input, &output, &GenOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Emit(EmitError::UpstreamErrors(2))));
    assert!(!output.exists());
}

#[test]
fn test_dangling_reference_rejected_on_load() {
    let mut fsm = word_fsm();
    fsm.start_state = Some(StateId(9));
    let json = serde_json::to_string(&fsm).unwrap();
    let err = load_fsm_str(&json).unwrap_err();
    assert!(matches!(
        err,
        Error::Ir(IrError::UnknownState { state: StateId(9), .. })
    ));
}

#[test]
fn test_malformed_json() {
    assert!(matches!(load_fsm_str("{\"states\": 3}"), Err(Error::Json(_))));
}

#[test]
fn test_missing_input() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");
    let err = load_fsm(&missing).unwrap_err();
    assert!(matches!(&err, Error::Read { path, .. } if path == &missing));
    assert!(err.to_string().contains("nope.json"));
}
