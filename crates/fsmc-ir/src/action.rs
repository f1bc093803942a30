//! Embedded action language.
//!
//! An action body is an [`ActionTree`]: an ordered list of [`ActionNode`]s
//! mixing host-language text with control primitives. The code generator
//! matches on [`ActionNode`] exhaustively, so a new primitive has to be
//! handled everywhere before the workspace compiles again.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::loc::Loc;
use crate::state::StateId;

/// Dense action identifier (index into [`crate::ReducedFsm::actions`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub u32);

impl ActionId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dense action-table identifier (index into [`crate::ReducedFsm::action_tables`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionTableId(pub u32);

impl ActionTableId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ActionTableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named action (or condition guard) and its body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub loc: Option<Loc>,
    pub tree: ActionTree,
}

impl Action {
    pub fn new(id: ActionId, tree: ActionTree) -> Self {
        Self {
            id,
            name: None,
            loc: None,
            tree,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_loc(mut self, loc: Loc) -> Self {
        self.loc = Some(loc);
        self
    }
}

/// Ordered list of actions executed together on one transition, state
/// entry/exit, or end of input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTable {
    pub id: ActionTableId,
    pub actions: Vec<ActionId>,
}

/// One branch of a longest-match switch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LmBranch {
    /// Match id this branch handles; `None` is the default branch.
    pub id: Option<u32>,
    pub body: ActionTree,
}

/// A node of the embedded action language.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionNode {
    /// Host-language text copied verbatim.
    Text(String),
    /// Jump to a state.
    Goto(StateId),
    /// Push the current state and jump.
    Call(StateId),
    /// Pop the call stack and jump back.
    Ret,
    /// Set the next state without jumping.
    Next(StateId),
    /// Current scan position.
    PChar,
    /// Current input symbol.
    Char,
    /// Re-examine the current symbol on the next iteration.
    Hold,
    /// Continue scanning at the position the subtree evaluates to.
    Exec(ActionTree),
    /// State the machine was in before the current transition.
    Curs,
    /// Target state of the current transition.
    Targs,
    /// Numeric id of a state.
    Entry(StateId),
    GotoExpr(ActionTree),
    CallExpr(ActionTree),
    NextExpr(ActionTree),
    /// Dispatch on the current longest-match id.
    LmSwitch(Vec<LmBranch>),
    /// Record the id of the longest match seen so far.
    LmSetActId(u32),
    /// Record the token end at the current position plus an offset.
    LmSetTokEnd(i64),
    /// Value of the token end register.
    LmGetTokEnd,
    LmInitTokStart,
    LmInitAct,
    LmSetTokStart,
    /// Nested statement block.
    SubAction(ActionTree),
    /// Advance once more and leave the scan loop.
    Break,
}

impl ActionNode {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Whether this node ends the enclosing action block by transferring
    /// control.
    #[must_use]
    pub const fn is_jump(&self) -> bool {
        matches!(
            self,
            Self::Goto(_)
                | Self::Call(_)
                | Self::Ret
                | Self::GotoExpr(_)
                | Self::CallExpr(_)
                | Self::Break
        )
    }

    /// Child trees of this node, in source order.
    pub fn children(&self) -> Vec<&ActionTree> {
        match self {
            Self::Exec(t)
            | Self::GotoExpr(t)
            | Self::CallExpr(t)
            | Self::NextExpr(t)
            | Self::SubAction(t) => vec![t],
            Self::LmSwitch(branches) => branches.iter().map(|b| &b.body).collect(),
            _ => Vec::new(),
        }
    }
}

/// An ordered sequence of action nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionTree(pub Vec<ActionNode>);

impl ActionTree {
    #[must_use]
    pub const fn new(nodes: Vec<ActionNode>) -> Self {
        Self(nodes)
    }

    /// Tree holding a single text fragment.
    pub fn text(s: impl Into<String>) -> Self {
        Self(vec![ActionNode::text(s)])
    }

    #[must_use]
    pub fn nodes(&self) -> &[ActionNode] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Visit every node, depth first, in source order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a ActionNode)) {
        for node in &self.0 {
            f(node);
            for child in node.children() {
                child.walk(f);
            }
        }
    }

    /// Whether any node (at any depth) satisfies `pred`.
    pub fn any(&self, pred: impl Fn(&ActionNode) -> bool) -> bool {
        let mut found = false;
        self.walk(&mut |n| found |= pred(n));
        found
    }

    /// Every state referenced by a node of the tree.
    #[must_use]
    pub fn state_refs(&self) -> Vec<StateId> {
        let mut refs = Vec::new();
        self.walk(&mut |n| match n {
            ActionNode::Goto(s) | ActionNode::Call(s) | ActionNode::Next(s) | ActionNode::Entry(s) => {
                refs.push(*s);
            }
            _ => {}
        });
        refs
    }
}

impl From<Vec<ActionNode>> for ActionTree {
    fn from(nodes: Vec<ActionNode>) -> Self {
        Self(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_reaches_nested_nodes() {
        let tree = ActionTree::new(vec![
            ActionNode::text("a"),
            ActionNode::SubAction(ActionTree::new(vec![ActionNode::Goto(StateId(3))])),
            ActionNode::LmSwitch(vec![LmBranch {
                id: None,
                body: ActionTree::new(vec![ActionNode::Call(StateId(4))]),
            }]),
        ]);
        assert_eq!(tree.state_refs(), vec![StateId(3), StateId(4)]);
        assert!(tree.any(|n| matches!(n, ActionNode::Call(_))));
        assert!(!tree.any(|n| matches!(n, ActionNode::Ret)));
    }

    #[test]
    fn test_jump_classification() {
        assert!(ActionNode::Goto(StateId(0)).is_jump());
        assert!(ActionNode::Break.is_jump());
        assert!(!ActionNode::Next(StateId(0)).is_jump());
        assert!(!ActionNode::Hold.is_jump());
    }

    #[test]
    fn test_tree_json_shape() {
        let tree = ActionTree::new(vec![ActionNode::text("x"), ActionNode::Ret]);
        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(json, r#"[{"Text":"x"},"Ret"]"#);
        let back: ActionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
