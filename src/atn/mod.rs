//! The immutable, read-only-after-construction automaton a `Recognizer`
//! walks. See SPEC_FULL.md sec 3 for the data model this mirrors.

pub mod state;
pub mod transition;

pub use state::{ATNState, ATNStateType, INVALID_STATE_NUMBER};
pub use transition::{Transition, TransitionKind};

use crate::interval_set::IntervalSet;

pub const INVALID_ALT: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ATNKind {
    Lexer,
    Parser,
}

/// An immutable directed graph of `ATNState`s. Shared read-only (behind an
/// `Arc`) by every parser/simulator instance constructed from the same
/// generated grammar -- see SPEC_FULL.md sec 5.
#[derive(Debug, Clone)]
pub struct ATN {
    pub grammar_type: ATNKind,
    pub max_token_type: isize,
    pub states: Vec<ATNState>,
    pub decision_to_state: Vec<usize>,
    pub rule_to_start_state: Vec<usize>,
    pub rule_to_stop_state: Vec<usize>,
    /// Lexer-only: the token type a rule produces. Empty for parser ATNs.
    pub rule_to_token_type: Vec<isize>,
}

impl ATN {
    pub fn new(grammar_type: ATNKind, max_token_type: isize) -> Self {
        ATN {
            grammar_type,
            max_token_type,
            states: Vec::new(),
            decision_to_state: Vec::new(),
            rule_to_start_state: Vec::new(),
            rule_to_stop_state: Vec::new(),
            rule_to_token_type: Vec::new(),
        }
    }

    pub fn add_state(&mut self, state: ATNState) -> usize {
        let number = self.states.len();
        debug_assert_eq!(state.state_number, number, "state numbers must be assigned densely, in order");
        if state.is_decision() {
            self.decision_to_state.push(number);
        }
        self.states.push(state);
        number
    }

    pub fn state(&self, number: usize) -> &ATNState {
        &self.states[number]
    }

    pub fn num_decisions(&self) -> usize {
        self.decision_to_state.len()
    }

    pub fn is_precedence_rule(&self, rule_index: usize) -> bool {
        let start = self.rule_to_start_state[rule_index];
        matches!(
            self.states[start].state_type,
            ATNStateType::RuleStart { is_precedence_rule: true }
        )
    }

    /// The single outgoing `Rule` transition's `follow_state` for a rule
    /// invocation resumed at `invoking_state`; panics (a fatal, not
    /// recoverable condition) if the invoking state does not in fact own a
    /// `Rule` transition -- callers only ever call this with states known
    /// to be rule-invocation sites.
    pub fn rule_follow_state(&self, invoking_state: usize) -> usize {
        for t in &self.states[invoking_state].transitions {
            if let TransitionKind::Rule { follow_state, .. } = t.kind {
                return follow_state;
            }
        }
        panic!("state {invoking_state} has no Rule transition; ATN is inconsistent");
    }

    /// The minimal-lookahead "what tokens can follow here" set used by
    /// `removeAllConfigsNotInRuleStopState`'s epsilon-closure extension
    /// (sec 4.2). Computed (and memoized on the state itself) by walking
    /// epsilon transitions up to the first non-epsilon match set or rule
    /// stop.
    pub fn next_tokens(&self, state_number: usize) -> IntervalSet {
        if let Some(cached) = self.states[state_number].next_token_within_rule.borrow().clone() {
            return cached;
        }
        let mut visited = vec![false; self.states.len()];
        let result = self.next_tokens_uncached(state_number, &mut visited);
        *self.states[state_number].next_token_within_rule.borrow_mut() = Some(result.clone());
        result
    }

    fn next_tokens_uncached(&self, state_number: usize, visited: &mut [bool]) -> IntervalSet {
        if visited[state_number] {
            return IntervalSet::new();
        }
        visited[state_number] = true;
        let state = &self.states[state_number];
        let mut out = IntervalSet::new();
        if state.is_rule_stop() {
            // The rule can end here with no further input consumed;
            // `removeAllConfigsNotInRuleStopState`'s epsilon-extension reads
            // this back as "reaches end of rule" (sec 4.2).
            out.add_single(crate::int_stream::EPSILON);
        }
        for t in &state.transitions {
            match &t.kind {
                TransitionKind::Epsilon | TransitionKind::Predicate { .. } | TransitionKind::PrecedencePredicate { .. } | TransitionKind::Action { .. } => {
                    out.add_set(&self.next_tokens_uncached(t.target, visited));
                }
                TransitionKind::Rule { .. } => {
                    out.add_set(&self.next_tokens_uncached(t.target, visited));
                }
                TransitionKind::Atom(tt) => out.add_single(*tt),
                TransitionKind::Range(lo, hi) => out.add_range(*lo, *hi),
                TransitionKind::Set(set) => out.add_set(set),
                TransitionKind::Wildcard => {
                    out.add_range(crate::token::TOKEN_MIN_USER_TOKEN_TYPE, self.max_token_type)
                }
                TransitionKind::NotSet(_) => {
                    out.add_range(crate::token::TOKEN_MIN_USER_TOKEN_TYPE, self.max_token_type)
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(n: usize, rule: usize) -> ATNState {
        ATNState::new(n, rule, ATNStateType::Basic)
    }

    #[test]
    fn next_tokens_follows_epsilon_to_first_match_set() {
        let mut atn = ATN::new(ATNKind::Parser, 3);
        let mut s0 = basic(0, 0);
        s0.add_transition(Transition::new(1, TransitionKind::Epsilon));
        atn.add_state(s0);
        let mut s1 = basic(1, 0);
        s1.add_transition(Transition::new(2, TransitionKind::Atom(1)));
        atn.add_state(s1);
        atn.add_state(basic(2, 0));

        let nt = atn.next_tokens(0);
        assert!(nt.contains(1));
        assert!(!nt.contains(2));
    }
}
