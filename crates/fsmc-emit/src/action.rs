//! Action-tree compiler.
//!
//! Renders action trees into statements for the goto-free scan loop. Every
//! control transfer becomes "store the target state, store the level to
//! resume at, raise `_trigger_goto`, and `break` out of the action
//! dispatch loop"; the driver then restarts the outer loop.

use std::fmt::Write;

use fsmc_ir::{Action, ActionNode, ActionTree, LmBranch, Loc, ReducedFsm, StateId};

use crate::error::{EmitError, Result};
use crate::host::{HostNames, line_directive};
use crate::level::Level;
use crate::options::GenOptions;
use crate::writer::INDENT;

/// Context threaded through a rendering pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionCtx {
    /// State the current transition is known to target, if any.
    pub targ_state: Option<StateId>,
    /// Rendering an end-of-input action: jumps leave the loop and
    /// position updates skip the trailing advance.
    pub in_finish: bool,
}

impl ActionCtx {
    #[must_use]
    pub const fn finish() -> Self {
        Self {
            targ_state: None,
            in_finish: true,
        }
    }
}

/// Output of one rendering pass: raw text plus statement lines at a
/// relative depth.
#[derive(Default)]
struct Frag {
    out: String,
    depth: usize,
}

impl Frag {
    fn text(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn stmt(&mut self, s: &str) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    fn open(&mut self, s: &str) {
        self.stmt(s);
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.stmt("end");
    }
}

/// Renders action trees against resolved host names.
pub struct ActionCompiler<'a> {
    fsm: &'a ReducedFsm,
    names: &'a HostNames,
    opts: &'a GenOptions,
}

impl<'a> ActionCompiler<'a> {
    #[must_use]
    pub const fn new(fsm: &'a ReducedFsm, names: &'a HostNames, opts: &'a GenOptions) -> Self {
        Self { fsm, names, opts }
    }

    /// Body of one action as a dispatch case: an optional line directive
    /// followed by a `begin ... end` block. Empty actions render as nothing.
    pub fn action_body(&self, action: &Action, ctx: ActionCtx) -> Result<String> {
        if action.tree.is_empty() {
            return Ok(String::new());
        }
        let mut frag = Frag::default();
        if let Some(loc) = action.loc.as_ref().filter(|_| self.opts.line_directives) {
            frag.stmt(&line_directive(loc));
        }
        frag.open("begin");
        self.tree(&mut frag, &action.tree, ctx, action.loc.as_ref())?;
        frag.close();
        Ok(frag.out)
    }

    /// Render a tree in statement position.
    pub fn statements(&self, tree: &ActionTree, ctx: ActionCtx, loc: Option<&Loc>) -> Result<String> {
        let mut frag = Frag::default();
        self.tree(&mut frag, tree, ctx, loc)?;
        Ok(frag.out)
    }

    /// Render a tree in expression position. Only text and value-producing
    /// nodes are allowed.
    pub fn expr(&self, tree: &ActionTree, ctx: ActionCtx, loc: Option<&Loc>) -> Result<String> {
        let mut out = String::new();
        for node in tree.nodes() {
            match node {
                ActionNode::Text(s) => out.push_str(s),
                ActionNode::PChar
                | ActionNode::Char
                | ActionNode::Curs
                | ActionNode::Targs
                | ActionNode::Entry(_)
                | ActionNode::LmGetTokEnd => out.push_str(&self.value(node, ctx, loc)?),
                other => {
                    return Err(EmitError::malformed(
                        format!("{} cannot appear in an expression", node_name(other)),
                        loc,
                    ));
                }
            }
        }
        Ok(out)
    }

    /// Host expression of a condition guard.
    pub fn condition(&self, guard: &Action) -> Result<String> {
        if guard.tree.is_empty() {
            return Err(EmitError::malformed("empty condition", guard.loc.as_ref()));
        }
        self.expr(&guard.tree, ActionCtx::default(), guard.loc.as_ref())
    }

    fn value(&self, node: &ActionNode, ctx: ActionCtx, loc: Option<&Loc>) -> Result<String> {
        let n = self.names;
        Ok(match node {
            ActionNode::PChar => n.p.clone(),
            ActionNode::Char => n.get_key.clone(),
            ActionNode::Curs => "(_ps)".to_string(),
            ActionNode::Targs => match ctx.targ_state {
                Some(state) => format!("({state})"),
                None => format!("({})", n.cs),
            },
            ActionNode::Entry(state) => self.state_id(*state, loc)?.to_string(),
            ActionNode::LmGetTokEnd => n.te.clone(),
            other => {
                return Err(EmitError::malformed(
                    format!("{} is not a value", node_name(other)),
                    loc,
                ));
            }
        })
    }

    fn state_id(&self, state: StateId, loc: Option<&Loc>) -> Result<u32> {
        match self.fsm.state(state) {
            Some(s) => Ok(s.id.0),
            None => Err(EmitError::UnknownState {
                state,
                loc: loc.cloned(),
            }),
        }
    }

    /// The statements that transfer control to `level`.
    fn jump_tail(frag: &mut Frag, level: Level) {
        frag.stmt("_trigger_goto = true");
        frag.stmt(&format!("_goto_level = {}", level.operand()));
        frag.stmt("break");
    }

    fn hook(&self, frag: &mut Frag, hook: Option<&ActionTree>, loc: Option<&Loc>) -> Result<()> {
        if let Some(tree) = hook.filter(|t| !t.is_empty()) {
            self.tree(frag, tree, ActionCtx::default(), loc)?;
        }
        Ok(())
    }

    fn goto(&self, frag: &mut Frag, dest: &str, ctx: ActionCtx) {
        frag.open("begin");
        frag.stmt(&format!("{} = {dest}", self.names.cs));
        Self::jump_tail(frag, Level::jump_target(ctx.in_finish));
        frag.close();
    }

    fn call(&self, frag: &mut Frag, dest: &str, ctx: ActionCtx, loc: Option<&Loc>) -> Result<()> {
        let n = self.names;
        frag.open("begin");
        self.hook(frag, self.opts.host.pre_push.as_ref(), loc)?;
        frag.stmt(&format!("{}[{}] = {}", n.stack, n.top, n.cs));
        frag.stmt(&format!("{} += 1", n.top));
        frag.stmt(&format!("{} = {dest}", n.cs));
        Self::jump_tail(frag, Level::jump_target(ctx.in_finish));
        frag.close();
        Ok(())
    }

    fn ret(&self, frag: &mut Frag, ctx: ActionCtx, loc: Option<&Loc>) -> Result<()> {
        let n = self.names;
        frag.open("begin");
        frag.stmt(&format!("{} -= 1", n.top));
        frag.stmt(&format!("{} = {}[{}]", n.cs, n.stack, n.top));
        self.hook(frag, self.opts.host.post_pop.as_ref(), loc)?;
        Self::jump_tail(frag, Level::jump_target(ctx.in_finish));
        frag.close();
        Ok(())
    }

    fn lm_switch(
        &self,
        frag: &mut Frag,
        branches: &[LmBranch],
        ctx: ActionCtx,
        loc: Option<&Loc>,
    ) -> Result<()> {
        if branches.is_empty() {
            return Err(EmitError::malformed("longest-match switch has no branches", loc));
        }
        let mut seen = Vec::with_capacity(branches.len());
        let mut default = None;
        for branch in branches {
            match branch.id {
                None if default.is_some() => {
                    return Err(EmitError::malformed(
                        "longest-match switch has two default branches",
                        loc,
                    ));
                }
                None => default = Some(branch),
                Some(id) if seen.contains(&id) => {
                    return Err(EmitError::malformed(
                        format!("longest-match switch repeats id {id}"),
                        loc,
                    ));
                }
                Some(id) => seen.push(id),
            }
        }

        frag.stmt(&format!("case {}", self.names.act));
        for branch in branches {
            let Some(id) = branch.id else { continue };
            frag.open(&format!("when {id} then"));
            self.branch_body(frag, &branch.body, ctx, loc)?;
            frag.depth -= 1;
        }
        if let Some(branch) = default {
            frag.open("else");
            self.branch_body(frag, &branch.body, ctx, loc)?;
            frag.depth -= 1;
        }
        frag.stmt("end");
        Ok(())
    }

    fn branch_body(&self, frag: &mut Frag, body: &ActionTree, ctx: ActionCtx, loc: Option<&Loc>) -> Result<()> {
        if body.is_empty() {
            return Ok(());
        }
        frag.open("begin");
        self.tree(frag, body, ctx, loc)?;
        frag.close();
        Ok(())
    }

    fn tree(&self, frag: &mut Frag, tree: &ActionTree, ctx: ActionCtx, loc: Option<&Loc>) -> Result<()> {
        let n = self.names;
        for node in tree.nodes() {
            match node {
                ActionNode::Text(s) => frag.text(s),
                ActionNode::Goto(state) => {
                    let id = self.state_id(*state, loc)?;
                    self.goto(frag, &id.to_string(), ctx);
                }
                ActionNode::Call(state) => {
                    let id = self.state_id(*state, loc)?;
                    self.call(frag, &id.to_string(), ctx, loc)?;
                }
                ActionNode::Ret => self.ret(frag, ctx, loc)?,
                ActionNode::Next(state) => {
                    let id = self.state_id(*state, loc)?;
                    frag.stmt(&format!("{} = {id}", n.cs));
                }
                ActionNode::PChar
                | ActionNode::Char
                | ActionNode::Curs
                | ActionNode::Targs
                | ActionNode::Entry(_)
                | ActionNode::LmGetTokEnd => frag.text(&self.value(node, ctx, loc)?),
                ActionNode::Hold => frag.stmt(&format!("{0} = {0} - 1", n.p)),
                ActionNode::Exec(sub) => {
                    let target = self.expr(sub, ctx, loc)?;
                    // No advance follows an EOF action, so the target is
                    // stored without the usual `- 1`.
                    if ctx.in_finish {
                        frag.stmt(&format!("{} = (({target}))", n.p));
                    } else {
                        frag.stmt(&format!("{} = (({target})) - 1", n.p));
                    }
                }
                ActionNode::GotoExpr(sub) => {
                    let dest = format!("({})", self.expr(sub, ctx, loc)?);
                    self.goto(frag, &dest, ctx);
                }
                ActionNode::CallExpr(sub) => {
                    let dest = format!("({})", self.expr(sub, ctx, loc)?);
                    self.call(frag, &dest, ctx, loc)?;
                }
                ActionNode::NextExpr(sub) => {
                    let dest = self.expr(sub, ctx, loc)?;
                    frag.stmt(&format!("{} = ({dest})", n.cs));
                }
                ActionNode::LmSwitch(branches) => self.lm_switch(frag, branches, ctx, loc)?,
                ActionNode::LmSetActId(id) => frag.stmt(&format!("{} = {id}", n.act)),
                ActionNode::LmSetTokEnd(offset) => {
                    let mut line = format!("{} = {}", n.te, n.p);
                    match offset.signum() {
                        1 => {
                            let _ = write!(line, " + {offset}");
                        }
                        -1 => {
                            let _ = write!(line, " - {}", offset.unsigned_abs());
                        }
                        _ => {}
                    }
                    frag.stmt(&line);
                }
                ActionNode::LmInitTokStart => frag.stmt(&format!("{} = nil", n.ts)),
                ActionNode::LmInitAct => frag.stmt(&format!("{} = 0", n.act)),
                ActionNode::LmSetTokStart => frag.stmt(&format!("{} = {}", n.ts, n.p)),
                ActionNode::SubAction(sub) => {
                    if !sub.is_empty() {
                        frag.open("begin");
                        self.tree(frag, sub, ctx, loc)?;
                        frag.close();
                    }
                }
                ActionNode::Break => {
                    frag.open("begin");
                    // At EOF `p` already equals `eof`; stepping past it
                    // would leave the buffer.
                    if !ctx.in_finish {
                        frag.stmt(&format!("{} += 1", n.p));
                    }
                    Self::jump_tail(frag, Level::Out);
                    frag.close();
                }
            }
        }
        Ok(())
    }
}

/// Human-readable primitive name for diagnostics.
#[must_use]
pub const fn node_name(node: &ActionNode) -> &'static str {
    match node {
        ActionNode::Text(_) => "text",
        ActionNode::Goto(_) => "goto",
        ActionNode::Call(_) => "call",
        ActionNode::Ret => "ret",
        ActionNode::Next(_) => "next",
        ActionNode::PChar => "p",
        ActionNode::Char => "char",
        ActionNode::Hold => "hold",
        ActionNode::Exec(_) => "exec",
        ActionNode::Curs => "curs",
        ActionNode::Targs => "targs",
        ActionNode::Entry(_) => "entry",
        ActionNode::GotoExpr(_) => "goto expression",
        ActionNode::CallExpr(_) => "call expression",
        ActionNode::NextExpr(_) => "next expression",
        ActionNode::LmSwitch(_) => "longest-match switch",
        ActionNode::LmSetActId(_) => "set act",
        ActionNode::LmSetTokEnd(_) => "set token end",
        ActionNode::LmGetTokEnd => "token end",
        ActionNode::LmInitTokStart => "init token start",
        ActionNode::LmInitAct => "init act",
        ActionNode::LmSetTokStart => "set token start",
        ActionNode::SubAction(_) => "sub-action",
        ActionNode::Break => "break",
    }
}
