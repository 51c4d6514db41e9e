//! Narrow, shape-erased surface over a parse-tree rule-context node
//! (SPEC_FULL.md sec 3). This is what the interpreter's left-recursion
//! unrolling (`_parentContextStack`, sec 4.5/9) walks without needing to
//! know the concrete context type, and what a generated parser's
//! rule-specific context ultimately implements.
//!
//! The teacher's draft threaded an `'input` lifetime through this trait to
//! mirror `Recognizer<'input>`, but every concrete `RuleContext` this crate
//! builds (`ParserRuleContext`) owns its tokens (`CommonToken`, not a
//! borrowed slice of the input), so there is nothing for that lifetime to
//! bind to here; dropped, see DESIGN.md.

/// Invoking state recorded on a context that has not yet been pushed by a
/// rule call (the outermost context of a parse).
pub const NO_INVOKING_STATE: isize = -1;

pub trait RuleContext: std::fmt::Debug {
    fn get_invoking_state(&self) -> isize;
    fn set_invoking_state(&mut self, state: isize);
    fn get_rule_index(&self) -> usize;

    /// True for the root context created before any rule has been entered.
    fn is_empty(&self) -> bool {
        self.get_invoking_state() == NO_INVOKING_STATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Dummy(isize, usize);
    impl RuleContext for Dummy {
        fn get_invoking_state(&self) -> isize {
            self.0
        }
        fn set_invoking_state(&mut self, state: isize) {
            self.0 = state;
        }
        fn get_rule_index(&self) -> usize {
            self.1
        }
    }

    #[test]
    fn root_context_is_empty() {
        assert!(Dummy(NO_INVOKING_STATE, 0).is_empty());
        assert!(!Dummy(4, 0).is_empty());
    }
}
