//! Reference machine.
//!
//! Runs encoded tables with the same level-structured loop the driver
//! emits, interpreting action trees instead of compiling them. Host text
//! is recorded in [`Machine::trace`] rather than executed. Registers are
//! public and persist across [`Machine::exec`] calls, the way the
//! caller-owned registers of the emitted routine do.

use fsmc_ir::{ActionId, ActionNode, ActionTree, Key, LmBranch, ReducedFsm, StateId};
use fsmc_tables::{ArrayTable, EncodedTables};

use crate::action::{ActionCtx, node_name};
use crate::error::{EmitError, Result};
use crate::level::Level;
use crate::options::GenOptions;

/// Default call-stack depth limit.
pub const DEFAULT_STACK_LIMIT: usize = 64;

/// Guard evaluator: `(guard action, raw key) -> holds`.
pub type GuardFn<'a> = Box<dyn FnMut(ActionId, i64) -> bool + 'a>;

pub struct Machine<'a> {
    fsm: &'a ReducedFsm,
    tables: &'a EncodedTables,
    pre_push: Option<&'a ActionTree>,
    post_pop: Option<&'a ActionTree>,
    no_end: bool,
    data: Vec<i64>,
    guard: GuardFn<'a>,
    stack_limit: usize,
    ps: i64,

    pub p: i64,
    pub pe: i64,
    pub eof: Option<i64>,
    pub cs: i64,
    pub top: usize,
    pub stack: Vec<i64>,
    pub act: i64,
    pub ts: Option<i64>,
    pub te: i64,

    /// Host text and values reached in statement position, in order.
    pub trace: Vec<String>,
    /// Level each loop iteration started at.
    pub levels: Vec<Level>,
    /// `cs` after every taken transition.
    pub cs_trace: Vec<i64>,
}

impl<'a> Machine<'a> {
    #[must_use]
    pub fn new(fsm: &'a ReducedFsm, tables: &'a EncodedTables, opts: &'a GenOptions) -> Self {
        let mut machine = Self {
            fsm,
            tables,
            pre_push: opts.host.pre_push.as_ref(),
            post_pop: opts.host.post_pop.as_ref(),
            no_end: opts.no_end,
            data: Vec::new(),
            guard: Box::new(|_, _| false),
            stack_limit: DEFAULT_STACK_LIMIT,
            ps: 0,
            p: 0,
            pe: 0,
            eof: None,
            cs: 0,
            top: 0,
            stack: Vec::new(),
            act: 0,
            ts: None,
            te: 0,
            trace: Vec::new(),
            levels: Vec::new(),
            cs_trace: Vec::new(),
        };
        machine.init();
        machine
    }

    #[must_use]
    pub fn with_guard(mut self, guard: impl FnMut(ActionId, i64) -> bool + 'a) -> Self {
        self.guard = Box::new(guard);
        self
    }

    #[must_use]
    pub const fn with_stack_limit(mut self, limit: usize) -> Self {
        self.stack_limit = limit;
        self
    }

    /// Reset the persisted registers, as the emitted init block does.
    pub fn init(&mut self) {
        self.p = 0;
        self.cs = self.tables.start_state;
        self.top = 0;
        self.stack.clear();
        self.ts = None;
        self.te = 0;
        self.act = 0;
    }

    /// The machine is in a final state.
    #[must_use]
    pub const fn accepted(&self) -> bool {
        self.cs >= self.tables.first_final
    }

    #[must_use]
    pub fn in_error(&self) -> bool {
        self.fsm.error_state.is_some_and(|e| i64::from(e.0) == self.cs)
    }

    /// Scan one buffer. `at_eof` marks it as the last one.
    pub fn exec(&mut self, data: &[i64], at_eof: bool) -> Result<()> {
        self.data = data.to_vec();
        self.p = 0;
        self.pe = i64::try_from(data.len()).unwrap_or(i64::MAX);
        self.eof = at_eof.then_some(self.pe);

        let err = self.fsm.error_state.map(|e| i64::from(e.0));
        let mut level = Level::Entry;
        let mut trans = 0i64;
        loop {
            self.levels.push(level);

            if level <= Level::Entry {
                if !self.no_end && self.p == self.pe {
                    level = Level::TestEof;
                    continue;
                }
                if err == Some(self.cs) {
                    level = Level::Out;
                    continue;
                }
            }

            if level <= Level::Resume {
                let loc = self.state_loc(self.tables.from_state_actions.as_ref());
                if let Some(next) = self.run_table(loc, ActionCtx::default())? {
                    level = next;
                    continue;
                }
                let wide = self.wide_key()?;
                trans = self.tables.locate(self.state_index()?, wide);
            }

            if level <= Level::EofTrans {
                self.ps = self.cs;
                self.cs = self.tables.target(trans);
                self.cs_trace.push(self.cs);
                let loc = self.tables.trans_action(trans);
                if let Some(next) = self.run_table(loc, ActionCtx::default())? {
                    level = next;
                    continue;
                }
            }

            if level <= Level::Again {
                let loc = self.state_loc(self.tables.to_state_actions.as_ref());
                if let Some(next) = self.run_table(loc, ActionCtx::default())? {
                    level = next;
                    continue;
                }
                if err == Some(self.cs) {
                    level = Level::Out;
                    continue;
                }
                self.p += 1;
                if self.no_end || self.p != self.pe {
                    level = Level::Resume;
                    continue;
                }
            }

            if level <= Level::TestEof && self.eof == Some(self.p) {
                let et = self.state_loc(self.tables.eof_trans.as_ref());
                if et > 0 {
                    trans = et - 1;
                    level = Level::EofTrans;
                    continue;
                }
                let loc = self.state_loc(self.tables.eof_actions.as_ref());
                if let Some(next) = self.run_table(loc, ActionCtx::finish())? {
                    level = next;
                    continue;
                }
            }

            break;
        }
        Ok(())
    }

    fn state_index(&self) -> Result<usize> {
        usize::try_from(self.cs)
            .ok()
            .filter(|&i| i < self.tables.state_count())
            .ok_or(EmitError::UnknownState {
                state: StateId(u32::try_from(self.cs).unwrap_or(u32::MAX)),
                loc: None,
            })
    }

    /// Per-state entry of an optional array, 0 when absent.
    fn state_loc(&self, array: Option<&ArrayTable>) -> i64 {
        match (array, usize::try_from(self.cs)) {
            (Some(array), Ok(cs)) => array.get(cs),
            _ => 0,
        }
    }

    fn key_at(&self, p: i64) -> Result<i64> {
        usize::try_from(p)
            .ok()
            .and_then(|i| self.data.get(i).copied())
            .ok_or(EmitError::InputOverrun(p))
    }

    fn wide_key(&mut self) -> Result<i64> {
        let raw = self.key_at(self.p)?;
        let state = self.state_index()?;
        let (tables, fsm) = (self.tables, self.fsm);
        let guard = &mut self.guard;
        let wide = tables.widen(fsm, state, Key(raw), |space, pos| {
            space.guards.get(pos).is_some_and(|&g| guard(g, raw))
        });
        Ok(wide.0)
    }

    /// Run the action table at `loc`. Returns the level to restart at when
    /// an action jumps.
    fn run_table(&mut self, loc: i64, ctx: ActionCtx) -> Result<Option<Level>> {
        if loc == 0 {
            return Ok(None);
        }
        let ids = self.tables.action_ids(loc).to_vec();
        for id in ids {
            let id = ActionId(u32::try_from(id).unwrap_or(u32::MAX));
            let action = self.fsm.action(id).ok_or(EmitError::UnknownAction(id))?;
            if let Some(level) = self.run(&action.tree, ctx)? {
                return Ok(Some(level));
            }
        }
        Ok(None)
    }

    const fn jump(ctx: ActionCtx) -> Level {
        Level::jump_target(ctx.in_finish)
    }

    fn push(&mut self) -> Result<()> {
        if self.top >= self.stack_limit {
            return Err(EmitError::CallStackOverflow(self.top));
        }
        if self.stack.len() <= self.top {
            self.stack.resize(self.top + 1, 0);
        }
        self.stack[self.top] = self.cs;
        self.top += 1;
        Ok(())
    }

    fn call(&mut self, target: i64, ctx: ActionCtx) -> Result<Option<Level>> {
        if let Some(hook) = self.pre_push {
            let jumped = self.run(hook, ActionCtx::default())?;
            if jumped.is_some() {
                return Ok(jumped);
            }
        }
        self.push()?;
        self.cs = target;
        Ok(Some(Self::jump(ctx)))
    }

    fn ret(&mut self, ctx: ActionCtx) -> Result<Option<Level>> {
        if self.top == 0 {
            return Err(EmitError::CallStackUnderflow);
        }
        self.top -= 1;
        self.cs = self.stack[self.top];
        if let Some(hook) = self.post_pop {
            let jumped = self.run(hook, ActionCtx::default())?;
            if jumped.is_some() {
                return Ok(jumped);
            }
        }
        Ok(Some(Self::jump(ctx)))
    }

    fn state_value(&self, state: StateId) -> Result<i64> {
        self.fsm
            .state(state)
            .map(|s| i64::from(s.id.0))
            .ok_or(EmitError::UnknownState { state, loc: None })
    }

    fn value(&self, node: &ActionNode, ctx: ActionCtx) -> Result<Option<i64>> {
        Ok(Some(match node {
            ActionNode::PChar => self.p,
            ActionNode::Char => self.key_at(self.p)?,
            ActionNode::Curs => self.ps,
            ActionNode::Targs => match ctx.targ_state {
                Some(state) => i64::from(state.0),
                None => self.cs,
            },
            ActionNode::Entry(state) => self.state_value(*state)?,
            ActionNode::LmGetTokEnd => self.te,
            _ => return Ok(None),
        }))
    }

    /// Evaluate an expression tree: a signed sum of integer literals and
    /// value primitives.
    fn eval(&self, tree: &ActionTree, ctx: ActionCtx) -> Result<i64> {
        let mut total = 0i64;
        let mut sign = 1i64;
        for node in tree.nodes() {
            if let ActionNode::Text(text) = node {
                let mut chars = text.chars().peekable();
                while let Some(c) = chars.next() {
                    match c {
                        '+' => sign = 1,
                        '-' => sign = -sign,
                        '(' | ')' => {}
                        c if c.is_whitespace() => {}
                        c if c.is_ascii_digit() => {
                            let mut lit = i64::from(c.to_digit(10).unwrap_or(0));
                            while let Some(d) = chars.peek().and_then(|d| d.to_digit(10)) {
                                lit = lit.saturating_mul(10).saturating_add(i64::from(d));
                                chars.next();
                            }
                            total += sign * lit;
                            sign = 1;
                        }
                        _ => {
                            return Err(EmitError::malformed(
                                format!("cannot evaluate `{text}`"),
                                None,
                            ));
                        }
                    }
                }
            } else if let Some(v) = self.value(node, ctx)? {
                total += sign * v;
                sign = 1;
            } else {
                return Err(EmitError::malformed(
                    format!("{} cannot appear in an expression", node_name(node)),
                    None,
                ));
            }
        }
        Ok(total)
    }

    fn lm_switch(&mut self, branches: &[LmBranch], ctx: ActionCtx) -> Result<Option<Level>> {
        if branches.is_empty() {
            return Err(EmitError::malformed("longest-match switch has no branches", None));
        }
        let mut default = None;
        let mut chosen = None;
        for (i, branch) in branches.iter().enumerate() {
            match branch.id {
                None if default.is_some() => {
                    return Err(EmitError::malformed(
                        "longest-match switch has two default branches",
                        None,
                    ));
                }
                None => default = Some(branch),
                Some(id) => {
                    if branches[..i].iter().any(|b| b.id == Some(id)) {
                        return Err(EmitError::malformed(
                            format!("longest-match switch repeats id {id}"),
                            None,
                        ));
                    }
                    if i64::from(id) == self.act {
                        chosen = Some(branch);
                    }
                }
            }
        }
        match chosen.or(default) {
            Some(branch) => self.run(&branch.body, ctx),
            None => Ok(None),
        }
    }

    fn run(&mut self, tree: &ActionTree, ctx: ActionCtx) -> Result<Option<Level>> {
        for node in tree.nodes() {
            let jumped = match node {
                ActionNode::Text(s) => {
                    self.trace.push(s.clone());
                    None
                }
                ActionNode::Goto(state) => {
                    self.cs = self.state_value(*state)?;
                    Some(Self::jump(ctx))
                }
                ActionNode::Call(state) => {
                    let target = self.state_value(*state)?;
                    self.call(target, ctx)?
                }
                ActionNode::Ret => self.ret(ctx)?,
                ActionNode::Next(state) => {
                    self.cs = self.state_value(*state)?;
                    None
                }
                ActionNode::PChar
                | ActionNode::Char
                | ActionNode::Curs
                | ActionNode::Targs
                | ActionNode::Entry(_)
                | ActionNode::LmGetTokEnd => {
                    let v = self.value(node, ctx)?.unwrap_or_default();
                    self.trace.push(v.to_string());
                    None
                }
                ActionNode::Hold => {
                    self.p -= 1;
                    None
                }
                ActionNode::Exec(sub) => {
                    let target = self.eval(sub, ctx)?;
                    self.p = if ctx.in_finish { target } else { target - 1 };
                    None
                }
                ActionNode::GotoExpr(sub) => {
                    self.cs = self.eval(sub, ctx)?;
                    Some(Self::jump(ctx))
                }
                ActionNode::CallExpr(sub) => {
                    let target = self.eval(sub, ctx)?;
                    self.call(target, ctx)?
                }
                ActionNode::NextExpr(sub) => {
                    self.cs = self.eval(sub, ctx)?;
                    None
                }
                ActionNode::LmSwitch(branches) => self.lm_switch(branches, ctx)?,
                ActionNode::LmSetActId(id) => {
                    self.act = i64::from(*id);
                    None
                }
                ActionNode::LmSetTokEnd(offset) => {
                    self.te = self.p + offset;
                    None
                }
                ActionNode::LmInitTokStart => {
                    self.ts = None;
                    None
                }
                ActionNode::LmInitAct => {
                    self.act = 0;
                    None
                }
                ActionNode::LmSetTokStart => {
                    self.ts = Some(self.p);
                    None
                }
                ActionNode::SubAction(sub) => self.run(sub, ctx)?,
                ActionNode::Break => {
                    if !ctx.in_finish {
                        self.p += 1;
                    }
                    Some(Level::Out)
                }
            };
            if jumped.is_some() {
                return Ok(jumped);
            }
        }
        Ok(None)
    }
}
