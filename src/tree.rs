//! Parse-tree nodes the interpreter loop builds while walking the ATN
//! (SPEC_FULL.md sec 3 "Parse tree nodes", sec 4.5). `ParserRuleContext` is
//! the one concrete rule-context shape this crate needs: since generating
//! typed per-rule context subclasses from a grammar is explicitly out of
//! scope (sec 1 Non-goals), every rule invocation the interpreter performs
//! builds the same shape, which is exactly what the source calls
//! `InterpreterRuleContext`.
//!
//! Grounded on the teacher's `tree.rs` (`NodeType`/`NodeImpl`/`Node` trait),
//! generalized and fixed: the teacher's draft stored `Option<dyn Token>` and
//! `Option<dyn RuleContext>` as sized struct fields (does not compile) and
//! built child iterators that re-returned the same index forever; this
//! version uses owned/`Rc` fields and a real `Vec`-backed child list.

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::ANTLRError;
use crate::interval_set::Interval;
use crate::rule_context::{RuleContext, NO_INVOKING_STATE};
use crate::token::{CommonToken, Token};

/// A handle to a rule invocation's context, shared between the context
/// itself (as a forward edge from its parent's `children`) and its own
/// `parent` back-edge. `RefCell` because the interpreter keeps mutating a
/// rule's context (consuming tokens, invoking nested rules) after a child
/// rule has already captured an `Rc` to it as its parent -- an immutable
/// `Rc<ParserRuleContext>` can't support that, since the parent is still
/// very much "under construction" when the child's back-edge is created.
pub type RuleNode = Rc<RefCell<ParserRuleContext>>;

/// A child of a `ParserRuleContext`: either a token consumed directly by
/// that rule, an error-recovery placeholder, or a nested rule invocation.
#[derive(Debug, Clone)]
pub enum ParseTreeNode {
    Terminal(CommonToken),
    Error(CommonToken),
    Rule(RuleNode),
}

impl ParseTreeNode {
    pub fn get_text(&self) -> String {
        match self {
            ParseTreeNode::Terminal(t) | ParseTreeNode::Error(t) => t.get_text().to_owned(),
            ParseTreeNode::Rule(ctx) => ctx.borrow().get_text(),
        }
    }
}

/// One rule invocation's worth of parse-tree state: the interpreter pushes
/// one of these on `enter_rule` and finalizes it (`stop`, any caught
/// exception) on `exit_rule`.
#[derive(Debug)]
pub struct ParserRuleContext {
    pub parent: Option<RuleNode>,
    pub invoking_state: isize,
    pub rule_index: usize,
    pub start: Option<CommonToken>,
    pub stop: Option<CommonToken>,
    pub children: Vec<ParseTreeNode>,
    pub exception: Option<ANTLRError>,
}

impl ParserRuleContext {
    pub fn new(parent: Option<RuleNode>, invoking_state: isize, rule_index: usize) -> Self {
        ParserRuleContext {
            parent,
            invoking_state,
            rule_index,
            start: None,
            stop: None,
            children: Vec::new(),
            exception: None,
        }
    }

    pub fn root(rule_index: usize) -> Self {
        ParserRuleContext::new(None, NO_INVOKING_STATE, rule_index)
    }

    pub fn into_node(self) -> RuleNode {
        Rc::new(RefCell::new(self))
    }

    pub fn add_child(&mut self, node: ParseTreeNode) {
        self.children.push(node);
    }

    pub fn add_token_node(&mut self, token: CommonToken) {
        self.children.push(ParseTreeNode::Terminal(token));
    }

    pub fn add_error_node(&mut self, token: CommonToken) {
        self.children.push(ParseTreeNode::Error(token));
    }

    pub fn get_child_count(&self) -> usize {
        self.children.len()
    }

    pub fn get_child(&self, i: usize) -> Option<&ParseTreeNode> {
        self.children.get(i)
    }

    /// Combined text of this subtree, traversing every child in order.
    /// Tokens on a hidden channel are never added as children in the first
    /// place (the interpreter only calls `add_token_node` for matched,
    /// default-channel tokens), so this naturally excludes them -- see the
    /// teacher's own doc comment on the same method.
    pub fn get_text(&self) -> String {
        self.children.iter().map(ParseTreeNode::get_text).collect()
    }

    pub fn get_source_interval(&self) -> Interval {
        match (&self.start, &self.stop) {
            (Some(s), Some(e)) => Interval::new(s.get_token_index(), e.get_token_index()),
            (Some(s), None) => Interval::new(s.get_token_index(), s.get_token_index() - 1),
            _ => crate::interval_set::INVALID,
        }
    }
}

impl RuleContext for ParserRuleContext {
    fn get_invoking_state(&self) -> isize {
        self.invoking_state
    }
    fn set_invoking_state(&mut self, state: isize) {
        self.invoking_state = state;
    }
    fn get_rule_index(&self) -> usize {
        self.rule_index
    }
}

/// Named distinctly per SPEC_FULL.md sec 3, but structurally identical to
/// `ParserRuleContext`: this crate has no generated-parser subclass to fall
/// back from.
pub type InterpreterRuleContext = ParserRuleContext;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_text_concatenates_children_in_order() {
        let mut ctx = ParserRuleContext::root(0);
        ctx.add_token_node(CommonToken::new(1, "x"));
        let mut inner = ParserRuleContext::new(None, 3, 1);
        inner.add_token_node(CommonToken::new(2, "="));
        ctx.add_child(ParseTreeNode::Rule(inner.into_node()));
        ctx.add_token_node(CommonToken::new(3, "3"));
        assert_eq!(ctx.get_text(), "x=3");
    }

    #[test]
    fn root_context_has_no_invoking_state() {
        let ctx = ParserRuleContext::root(0);
        assert!(ctx.is_empty());
    }
}
