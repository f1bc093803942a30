use std::cell::RefCell;

use fsmc_ir::{
    ActionNode, ActionTree, FsmBuilder, IntType, Key, KeyOps, LmBranch, Loc, ReducedFsm, StateId,
};
use fsmc_tables::Layout;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

fn keys(s: &str) -> Vec<i64> {
    s.bytes().map(i64::from).collect()
}

/// States {0, 1}; 0 on ['a', 'z'] to 1; everything else to the error state.
fn two_state_fsm() -> ReducedFsm {
    let mut b = FsmBuilder::new(KeyOps::new(IntType::Int8));
    let s0 = b.add_state();
    let s1 = b.add_state();
    b.error_state();
    b.range(s0, 'a', 'z', s1, None);
    b.build().unwrap()
}

/// Main state calls into a sub state on 'c'; the sub state returns on 'r'
/// and calls itself on 'c'. 'a' loops in both.
fn call_fsm() -> (ReducedFsm, StateId, StateId) {
    let mut b = FsmBuilder::new(KeyOps::new(IntType::Int8));
    let main = b.add_state();
    let sub = b.add_state();
    b.error_state();
    let call = b.action(vec![ActionNode::Call(sub)]);
    let ret = b.action(vec![ActionNode::Ret]);
    let t_call = b.table(&[call]);
    let t_ret = b.table(&[ret]);
    b.on(main, 'a', main, None)
        .on(main, 'c', main, Some(t_call))
        .on(sub, 'a', sub, None)
        .on(sub, 'c', sub, Some(t_call))
        .on(sub, 'r', sub, Some(t_ret));
    (b.build().unwrap(), main, sub)
}

/// An automaton exercising every section of the loop: state actions,
/// conditions, EOF transitions and EOF actions, calls, longest-match
/// bookkeeping and entry points.
fn rich_fsm() -> ReducedFsm {
    let mut b = FsmBuilder::new(KeyOps::new(IntType::Int8));
    let s0 = b.add_state();
    let s1 = b.add_state();
    let s2 = b.add_state();
    b.error_state();
    let fin = b.add_state();
    b.set_final(fin);

    let guard = b.named_action("ok", Some(Loc::new("scan.rl", 4, 2)), ActionTree::text("ok?"));
    let space = b.cond_space(&[guard]);
    b.cond_range(s0, 'g', 'g', space);
    let plain = b.wide_key(space, 'g', 0).unwrap();
    let guarded = b.wide_key(space, 'g', 1).unwrap();

    let tok = b.named_action(
        "tok",
        Some(Loc::new("scan.rl", 9, 5)),
        vec![
            ActionNode::LmSetTokStart,
            ActionNode::LmSetActId(2),
            ActionNode::LmSetTokEnd(1),
        ],
    );
    let emit = b.action(vec![ActionNode::LmSwitch(vec![
        LmBranch {
            id: Some(1),
            body: ActionTree::text("one"),
        },
        LmBranch {
            id: Some(2),
            body: ActionTree::text("two"),
        },
        LmBranch {
            id: None,
            body: ActionTree::text("other"),
        },
    ])]);
    let call = b.action(vec![ActionNode::Call(s2)]);
    let ret = b.action(vec![ActionNode::Ret]);
    let enter = b.action(ActionTree::text("enter"));
    let leave = b.action(ActionTree::text("leave"));
    let hold = b.action(vec![ActionNode::text("eof_tok"), ActionNode::Hold]);
    let done = b.action(vec![ActionNode::text("done"), ActionNode::Goto(s0)]);
    let curs = b.action(vec![ActionNode::text("from "), ActionNode::Curs]);

    let t_tok = b.table(&[tok, emit]);
    let t_call = b.table(&[call]);
    let t_ret = b.table(&[ret]);
    let t_enter = b.table(&[enter]);
    let t_leave = b.table(&[leave]);
    let t_hold = b.table(&[hold]);
    let t_done = b.table(&[done]);
    let t_curs = b.table(&[curs]);

    b.range(s0, 'a', 'f', s1, Some(t_tok))
        .on(s0, plain, s1, None)
        .on(s0, guarded, fin, Some(t_curs))
        .on(s0, '(', s0, Some(t_call))
        .on(s1, 'a', s1, None)
        .on(s2, ')', s2, Some(t_ret))
        .default(s2, s2, None)
        .eof_trans(s1, fin, Some(t_hold))
        .to_state_action(s1, t_enter)
        .from_state_action(s1, t_leave)
        .eof_action(fin, t_done)
        .entry("main", s0)
        .entry("nested", s2)
        .export("lparen", '(');
    b.build().unwrap()
}

fn exec_body(code: &GeneratedCode) -> Vec<String> {
    code.exec
        .lines()
        .skip_while(|l| l.trim() != "while true")
        .map(|l| l.trim().to_string())
        .collect()
}

fn level_of(operand: &str) -> Level {
    Level::ALL
        .into_iter()
        .find(|l| l.operand() == operand)
        .unwrap_or_else(|| panic!("unknown level operand {operand}"))
}

#[test]
fn test_two_state_scenario_in_range() {
    let fsm = two_state_fsm();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("m"), false).unwrap();
    assert_eq!(m.cs, 1);
    assert_eq!(m.p, 1);
    assert!(m.trace.is_empty());
    assert_eq!(m.cs_trace, vec![1]);

    // No action dispatch is emitted at all.
    assert!(!code.exec.contains("_acts"));
    assert!(code.data.contains("FSM_START = 0\n"));
    assert!(code.data.contains("FSM_FIRST_FINAL = 3\n"));
    assert!(code.data.contains("FSM_ERROR = 2\n"));
}

#[test]
fn test_two_state_scenario_out_of_range() {
    let fsm = two_state_fsm();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("5"), false).unwrap();
    assert_eq!(m.cs, 2);
    assert!(m.in_error());
    assert_eq!(m.p, 0);
    assert_eq!(m.levels, vec![Level::Entry, Level::Out]);

    let body = exec_body(&code);
    let check = body.iter().position(|l| l == "if cs == 2").unwrap();
    assert_eq!(body[check + 1], "_goto_level = _out");
    assert_eq!(body[check + 2], "next");
}

#[test]
fn test_longest_match_default_branch() {
    let mut b = FsmBuilder::new(KeyOps::new(IntType::Int8));
    let s0 = b.add_state();
    let s1 = b.add_state();
    b.error_state();
    let set = b.action(vec![ActionNode::LmSetActId(3)]);
    let switch = b.action(vec![ActionNode::LmSwitch(vec![
        LmBranch {
            id: Some(1),
            body: ActionTree::text("A"),
        },
        LmBranch {
            id: Some(2),
            body: ActionTree::text("B"),
        },
        LmBranch {
            id: None,
            body: ActionTree::text("C"),
        },
    ])]);
    let table = b.table(&[set, switch]);
    b.on(s0, 'x', s1, Some(table));
    let fsm = b.build().unwrap();

    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();
    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("x"), false).unwrap();
    assert_eq!(m.act, 3);
    assert_eq!(m.trace, vec!["C".to_string()]);

    let body = exec_body(&code);
    let case = body.iter().position(|l| l == "case act").unwrap();
    assert_eq!(body[case + 1], "when 1 then");
    let default = body[case..].iter().position(|l| l == "else").unwrap() + case;
    assert_eq!(body[default + 2], "C");
    assert!(code.init.contains("act = 0"));
}

#[test]
fn test_call_return_matches_stack_model() {
    let (fsm, main, sub) = call_fsm();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();

    let (main, sub) = (i64::from(main.0), i64::from(sub.0));
    let mut rng = StdRng::seed_from_u64(0x2545_f491);
    for depth_limit in 1..=6usize {
        let mut m = Machine::new(&fsm, &code.tables, &opts).with_stack_limit(depth_limit);
        let mut cs = main;
        let mut stack: Vec<i64> = Vec::new();
        let mut input = String::new();
        for _ in 0..40 {
            let key = match rng.random_range(0..3) {
                0 if stack.len() < depth_limit => 'c',
                1 if !stack.is_empty() => 'r',
                _ => 'a',
            };
            input.push(key);
            match key {
                // The pushed state is the transition's target.
                'c' => {
                    stack.push(cs);
                    cs = sub;
                }
                'r' => cs = stack.pop().unwrap(),
                _ => {}
            }

            m.exec(&keys(&key.to_string()), false).unwrap();
            assert_eq!(m.cs, cs, "after {input}");
            assert_eq!(m.top, stack.len(), "after {input}");
        }
    }
}

#[test]
fn test_call_stack_limits() {
    let (fsm, _, sub) = call_fsm();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();

    let mut m = Machine::new(&fsm, &code.tables, &opts).with_stack_limit(2);
    let err = m.exec(&keys("ccc"), false).unwrap_err();
    assert_eq!(err, EmitError::CallStackOverflow(2));

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.cs = i64::from(sub.0);
    assert_eq!(m.exec(&keys("r"), false), Err(EmitError::CallStackUnderflow));
}

#[test]
fn test_call_emission() {
    let (fsm, ..) = call_fsm();
    let code = generate(&fsm, &GenOptions::default()).unwrap();
    assert!(code.exec.contains("stack[top] = cs\n"));
    assert!(code.exec.contains("top += 1\n"));
    assert!(code.exec.contains("top -= 1\n"));
    assert!(code.exec.contains("cs = stack[top]\n"));
    assert!(code.init.contains("top = 0"));
    assert!(!code.init.contains("ts = nil"));
}

#[test]
fn test_level_sections_are_monotonic() {
    for fsm in [two_state_fsm(), call_fsm().0, rich_fsm()] {
        for layout in [Layout::Indexed, Layout::Direct] {
            let opts = GenOptions::default().with_layout(Some(layout));
            let code = generate(&fsm, &opts).unwrap();
            let body = exec_body(&code);

            let sections: Vec<Level> = body
                .iter()
                .filter_map(|l| l.strip_prefix("if _goto_level <= "))
                .map(level_of)
                .collect();
            assert!(sections.windows(2).all(|w| w[0] < w[1]), "{sections:?}");
            assert_eq!(sections.first(), Some(&Level::Entry));
            assert_eq!(sections.last(), Some(&Level::Out));

            // Every level change restarts the loop or leaves the dispatch.
            for (i, line) in body.iter().enumerate() {
                if let Some(target) = line.strip_prefix("_goto_level = ") {
                    level_of(target);
                    let next = body[i + 1].as_str();
                    assert!(next == "next" || next == "break", "{line} followed by {next}");
                }
            }
        }
    }
}

#[test]
fn test_eof_trans_section_only_when_needed() {
    let code = generate(&two_state_fsm(), &GenOptions::default()).unwrap();
    assert!(!code.exec.contains("if _goto_level <= _eof_trans"));
    assert!(!code.exec.contains("if p == eof"));

    let code = generate(&rich_fsm(), &GenOptions::default()).unwrap();
    assert!(code.exec.contains("if _goto_level <= _eof_trans\n"));
    assert!(code.exec.contains("_trans = FSM_EOF_TRANS[cs] - 1\n"));
    assert!(code.exec.contains("if p == eof\n"));
}

#[test]
fn test_conditions_widen_key() {
    let fsm = rich_fsm();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();

    let body = exec_body(&code);
    assert!(body.contains(&"case _cond".to_string()));
    assert!(body.contains(&"_widec = (128 + (data[p].ord - -128))".to_string()));
    let guard = body.iter().position(|l| l == "if (ok?) then").unwrap();
    assert_eq!(body[guard - 1], "# line 4 \"scan.rl\"");
    assert_eq!(body[guard + 1], "_widec += 256");
    assert!(body.contains(&"_wide = _widec".to_string()));

    for (holds, expected) in [(false, 1), (true, 4)] {
        let mut m = Machine::new(&fsm, &code.tables, &opts).with_guard(move |_, _| holds);
        m.exec(&keys("g"), false).unwrap();
        assert_eq!(m.cs_trace, vec![expected]);
    }
}

#[test]
fn test_state_actions_and_longest_match() {
    let fsm = rich_fsm();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("ba"), false).unwrap();
    // s0 -b-> s1 (token, then enter), s1 -a-> s1 (leave, enter).
    assert_eq!(m.trace, ["two", "enter", "leave", "enter"]);
    assert_eq!(m.ts, Some(0));
    assert_eq!(m.te, 1);
    assert_eq!(m.cs, 1);

    assert!(code.exec.contains("FSM_FROM_STATE_ACTIONS[cs]"));
    assert!(code.exec.contains("FSM_TO_STATE_ACTIONS[cs]"));
    assert!(code.exec.contains("ts = p\n"));
    assert!(code.exec.contains("te = p + 1\n"));
}

#[test]
fn test_eof_transition_and_eof_actions() {
    let fsm = rich_fsm();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("b"), true).unwrap();
    // The EOF transition holds, lands on the final state and runs its EOF
    // action, whose goto leaves the loop.
    assert_eq!(
        m.trace,
        ["two", "enter", "eof_tok", "done"]
    );
    assert_eq!(m.cs, 0);
    assert_eq!(m.p, 1);
    assert_eq!(m.levels.last(), Some(&Level::Out));

    let body = exec_body(&code);
    let done = body.iter().position(|l| l == "done").unwrap();
    assert_eq!(body[done + 2], "cs = 0");
    assert_eq!(body[done + 4], "_goto_level = _out");
}

#[test]
fn test_current_state_reference() {
    let fsm = rich_fsm();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();
    assert!(code.exec.contains("_ps = 0\n"));
    assert!(code.exec.contains("_ps = cs\n"));

    let mut m = Machine::new(&fsm, &code.tables, &opts).with_guard(|_, _| true);
    m.exec(&keys("g"), false).unwrap();
    assert_eq!(m.trace, ["from ", "0"]);
}

#[test]
fn test_computed_jumps_and_next() {
    let mut b = FsmBuilder::new(KeyOps::new(IntType::Int8));
    let s0 = b.add_state();
    let s1 = b.add_state();
    let s2 = b.add_state();
    b.error_state();
    let mark = b.action(ActionTree::text("after"));
    let goto = b.action(vec![ActionNode::GotoExpr(ActionTree::text("2"))]);
    let next = b.action(vec![ActionNode::Next(s2)]);
    let call = b.action(vec![ActionNode::CallExpr(ActionTree::new(vec![
        ActionNode::text("1 + "),
        ActionNode::Entry(s1),
    ]))]);
    let next_expr = b.action(vec![ActionNode::NextExpr(ActionTree::text("1"))]);
    let t_goto = b.table(&[goto, mark]);
    let t_next = b.table(&[next, mark]);
    let t_call = b.table(&[call]);
    let t_next_expr = b.table(&[next_expr]);
    b.on(s0, 'g', s1, Some(t_goto))
        .on(s0, 'n', s1, Some(t_next))
        .on(s0, 'c', s0, Some(t_call))
        .on(s0, 'x', s0, Some(t_next_expr));
    let fsm = b.build().unwrap();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();
    assert!(code.exec.contains("cs = (2)\n"));
    assert!(code.exec.contains("cs = (1 + 1)\n"));
    assert!(code.exec.contains("cs = 2\n"));
    assert!(code.exec.contains("cs = (1)\n"));

    // A goto abandons the rest of the action table and restarts the loop.
    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("g"), false).unwrap();
    assert_eq!(m.cs, 2);
    assert!(m.trace.is_empty());
    assert_eq!(m.levels, [Level::Entry, Level::Again]);

    // Next only changes the state; the table keeps running.
    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("n"), false).unwrap();
    assert_eq!(m.cs, 2);
    assert_eq!(m.cs_trace, [1]);
    assert_eq!(m.trace, ["after"]);
    assert_eq!(m.levels, [Level::Entry]);

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("c"), false).unwrap();
    assert_eq!(m.cs, 2);
    assert_eq!(m.top, 1);
    assert_eq!(m.stack[0], 0);

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("x"), false).unwrap();
    assert_eq!(m.cs, 1);
    assert_eq!(m.levels, [Level::Entry]);
}

#[test]
fn test_two_guards_fold_into_distinct_keys() {
    let mut b = FsmBuilder::new(KeyOps::new(IntType::Int8));
    let s0 = b.add_state();
    let targets: Vec<StateId> = (0..4).map(|_| b.add_state()).collect();
    b.error_state();
    let first = b.named_action("first", Some(Loc::new("scan.rl", 7, 3)), ActionTree::text("a?"));
    let second = b.action(ActionTree::text("b?"));
    let space = b.cond_space(&[first, second]);
    b.cond_range(s0, 'k', 'k', space);
    for (mask, &target) in targets.iter().enumerate() {
        let wide = b.wide_key(space, 'k', mask as u64).unwrap();
        b.on(s0, wide, target, None);
    }
    let fsm = b.build().unwrap();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();

    let body = exec_body(&code);
    let start = body
        .iter()
        .position(|l| l == "_widec = (128 + (data[p].ord - -128))")
        .unwrap();
    assert_eq!(
        body[start + 1..start + 8],
        [
            "# line 7 \"scan.rl\"",
            "if (a?) then",
            "_widec += 256",
            "end",
            "if (b?) then",
            "_widec += 512",
            "end",
        ]
    );

    for (mask, target) in targets.iter().enumerate() {
        let seen = RefCell::new(Vec::new());
        let mut m = Machine::new(&fsm, &code.tables, &opts).with_guard(|g, _| {
            seen.borrow_mut().push(g);
            let pos = if g == first { 0 } else { 1 };
            mask & (1 << pos) != 0
        });
        m.exec(&keys("k"), false).unwrap();
        assert_eq!(m.cs, i64::from(target.0), "mask {mask}");
        drop(m);
        assert_eq!(*seen.borrow(), [first, second], "mask {mask}");
    }
}

#[test]
fn test_break_and_exec() {
    let mut b = FsmBuilder::new(KeyOps::new(IntType::Int8));
    let s0 = b.add_state();
    let s1 = b.add_state();
    b.error_state();
    let jump = b.action(vec![ActionNode::Exec(ActionTree::text("3"))]);
    let seen = b.action(ActionTree::text("d"));
    let stop = b.action(vec![ActionNode::Break]);
    let t_jump = b.table(&[jump]);
    let t_seen = b.table(&[seen]);
    let t_stop = b.table(&[stop]);
    b.on(s0, 'a', s1, Some(t_jump))
        .on(s0, 'b', s1, None)
        .on(s1, 'd', s1, Some(t_seen))
        .on(s1, 'x', s0, Some(t_stop));
    let fsm = b.build().unwrap();

    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();
    assert!(code.exec.contains("p = ((3)) - 1\n"));

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("abcdd"), false).unwrap();
    assert_eq!(m.trace, ["d", "d"]);
    assert_eq!(m.p, 5);

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("bxaaa"), false).unwrap();
    assert_eq!(m.p, 2);
    assert_eq!(m.cs, 0);
    assert_eq!(m.levels.last(), Some(&Level::Out));
}

#[test]
fn test_input_overrun() {
    let mut b = FsmBuilder::new(KeyOps::new(IntType::Int8));
    let s0 = b.add_state();
    b.error_state();
    let skip = b.action(vec![ActionNode::Exec(ActionTree::text("9"))]);
    let table = b.table(&[skip]);
    b.on(s0, 'a', s0, Some(table));
    let fsm = b.build().unwrap();

    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();
    let mut m = Machine::new(&fsm, &code.tables, &opts);
    assert_eq!(m.exec(&keys("aa"), false), Err(EmitError::InputOverrun(9)));
}

#[test]
fn test_registers_persist_across_buffers() {
    let fsm = rich_fsm();
    let opts = GenOptions::default();
    let code = generate(&fsm, &opts).unwrap();

    let mut m = Machine::new(&fsm, &code.tables, &opts);
    m.exec(&keys("("), false).unwrap();
    assert_eq!((m.cs, m.top), (2, 1));
    m.exec(&keys("zz"), false).unwrap();
    assert_eq!(m.cs, 2);
    m.exec(&keys(")"), false).unwrap();
    assert_eq!((m.cs, m.top), (0, 0));
}

#[test]
fn test_generation_is_deterministic() {
    for layout in [None, Some(Layout::Indexed), Some(Layout::Direct)] {
        let opts = GenOptions::new("scanner").with_layout(layout);
        let first = generate(&rich_fsm(), &opts).unwrap();
        let second = generate(&rich_fsm(), &opts).unwrap();
        assert_eq!(first.source(), second.source());
        assert_eq!(first.tables, second.tables);
    }
}

#[test]
fn test_upstream_errors_block_generation() {
    let mut b = FsmBuilder::new(KeyOps::default());
    let s0 = b.add_state();
    b.on(s0, 'a', s0, None).default(s0, s0, None).upstream_errors(3);
    let fsm = b.build().unwrap();
    assert_eq!(
        generate(&fsm, &GenOptions::default()),
        Err(EmitError::UpstreamErrors(3))
    );
}

#[test]
fn test_unknown_goto_target() {
    let mut fsm = two_state_fsm();
    fsm.actions.push(fsmc_ir::Action::new(
        fsmc_ir::ActionId(0),
        vec![ActionNode::Goto(StateId(40))].into(),
    ));
    let err = generate(&fsm, &GenOptions::default()).unwrap_err();
    assert!(matches!(err, EmitError::Table(_)), "{err}");
}

#[test]
fn test_data_section() {
    let code = generate(&rich_fsm(), &GenOptions::new("scanner")).unwrap();
    assert!(code.data.starts_with("SCANNER_ACTIONS = [\n"));
    assert!(code.data.contains("SCANNER_EN_MAIN = 0\n"));
    assert!(code.data.contains("SCANNER_EN_NESTED = 2\n"));
    assert!(code.data.contains("SCANNER_FIRST_FINAL = 4\n"));
    assert!(code.data.contains("] of Int16\n"));
    assert_eq!(code.exports, "SCANNER_EX_LPAREN = 40\n\n");

    let opts = GenOptions {
        no_final: true,
        no_error: true,
        no_entry: true,
        ..GenOptions::new("scanner")
    };
    let code = generate(&rich_fsm(), &opts).unwrap();
    assert!(!code.data.contains("FIRST_FINAL"));
    assert!(!code.data.contains("SCANNER_ERROR"));
    assert!(!code.data.contains("_EN_"));
}

#[test]
fn test_init_and_no_end() {
    let fsm = two_state_fsm();
    let code = generate(&fsm, &GenOptions::default()).unwrap();
    assert_eq!(code.init, "begin\n  p ||= 0\n  pe ||= data.size\n  cs = FSM_START\nend\n");
    assert!(code.exec.contains("if p == pe\n"));
    assert!(code.exec.contains("if p != pe\n"));

    let opts = GenOptions {
        no_cs_init: true,
        ..GenOptions::default().with_no_end(true)
    };
    let code = generate(&fsm, &opts).unwrap();
    assert_eq!(code.init, "begin\n  p ||= 0\nend\n");
    assert!(!code.exec.contains("p == pe"));
    assert!(!code.exec.contains("p != pe"));
    let body = exec_body(&code);
    let advance = body.iter().position(|l| l == "p += 1").unwrap();
    assert_eq!(body[advance + 1], "_goto_level = _resume");
}

#[test]
fn test_host_overrides_reach_the_loop() {
    let opts = GenOptions::default()
        .with_line_directives(false)
        .with_host(HostExprs {
            access: Some(ActionTree::text("@")),
            get_key: Some(ActionTree::text("buf[pos]")),
            p: Some(ActionTree::text("pos")),
            ..HostExprs::default()
        });
    let code = generate(&rich_fsm(), &opts).unwrap();
    assert!(code.exec.contains("_keys = @cs << 1\n"));
    assert!(code.exec.contains("(pos) += 1\n"));
    assert!(code.exec.contains("_widec = (buf[pos])\n"));
    assert!(code.exec.contains("@stack[@top] = @cs\n"));
    assert!(!code.exec.contains("# line"));
    assert!(code.init.contains("(pos) ||= 0"));
}

#[test]
fn test_layouts_agree_on_behavior() {
    let fsm = rich_fsm();
    let mut traces = Vec::new();
    for layout in [Layout::Indexed, Layout::Direct] {
        let opts = GenOptions::default().with_layout(Some(layout));
        let code = generate(&fsm, &opts).unwrap();
        assert_eq!(code.tables.layout(), layout);
        assert_eq!(code.exec.contains("FSM_INDICES["), layout == Layout::Indexed);

        let mut m = Machine::new(&fsm, &code.tables, &opts).with_guard(|_, raw| raw % 2 == 1);
        m.exec(&keys("(zz)baa"), true).unwrap();
        traces.push((m.trace.clone(), m.cs, m.p, m.cs_trace.clone()));
    }
    assert_eq!(traces[0], traces[1]);
}

#[test]
fn test_key_type_follows_alphabet() {
    let mut b = FsmBuilder::new(KeyOps::new(IntType::UInt16));
    let s0 = b.add_state();
    b.error_state();
    b.range(s0, Key(1000), Key(2000), s0, None);
    let code = generate(&b.build().unwrap(), &GenOptions::default()).unwrap();
    assert!(code.data.contains("FSM_TRANS_KEYS = [\n  1000, 2000,"));
    assert!(code.data.contains("] of UInt16\n"));
}
