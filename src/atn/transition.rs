//! Transition labels. An epsilon transition carries no match set; the rest
//! either match a set of input symbols or represent a non-consuming control
//! transfer (rule call/return, predicate, action).

use crate::interval_set::IntervalSet;

#[derive(Debug, Clone)]
pub enum TransitionKind {
    Epsilon,
    Atom(isize),
    Range(isize, isize),
    Set(IntervalSet),
    NotSet(IntervalSet),
    Wildcard,
    Rule { rule_index: usize, precedence: isize, follow_state: usize },
    Predicate { rule_index: usize, pred_index: usize, is_ctx_dependent: bool },
    PrecedencePredicate { precedence: isize },
    Action { rule_index: usize, action_index: isize, is_ctx_dependent: bool },
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub target: usize,
    pub kind: TransitionKind,
}

impl Transition {
    pub fn new(target: usize, kind: TransitionKind) -> Self {
        Transition { target, kind }
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(
            self.kind,
            TransitionKind::Epsilon
                | TransitionKind::Rule { .. }
                | TransitionKind::Predicate { .. }
                | TransitionKind::PrecedencePredicate { .. }
                | TransitionKind::Action { .. }
        )
    }

    /// Whether this transition kind is part of the serialized wire format
    /// (actions are generated-code side effects and are not, themselves,
    /// part of the matchable grammar surface, but they are still emitted by
    /// the ATN serializer so a deserializer must round-trip them).
    pub fn is_serializable(&self) -> bool {
        true
    }

    /// The set of input symbols this transition matches; `None` for
    /// control-transfer (epsilon-like) transitions.
    pub fn label(&self) -> Option<IntervalSet> {
        match &self.kind {
            TransitionKind::Atom(t) => Some(IntervalSet::of_single(*t)),
            TransitionKind::Range(lo, hi) => Some(IntervalSet::of(*lo, *hi)),
            TransitionKind::Set(set) => Some(set.clone()),
            TransitionKind::NotSet(_) => None,
            TransitionKind::Wildcard => None,
            _ => None,
        }
    }

    pub fn matches(&self, symbol: isize, min_vocab_symbol: isize, max_vocab_symbol: isize) -> bool {
        match &self.kind {
            TransitionKind::Atom(t) => *t == symbol,
            TransitionKind::Range(lo, hi) => symbol >= *lo && symbol <= *hi,
            TransitionKind::Set(set) => set.contains(symbol),
            TransitionKind::NotSet(set) => {
                symbol >= min_vocab_symbol && symbol <= max_vocab_symbol && !set.contains(symbol)
            }
            TransitionKind::Wildcard => symbol >= min_vocab_symbol && symbol <= max_vocab_symbol,
            _ => false,
        }
    }
}
