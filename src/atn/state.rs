//! ATN states, tagged-enum style (SPEC_FULL.md sec 3.1: dispatch by tag
//! rather than by virtual call, which also keeps the type serialization
//! friendly -- see DESIGN NOTES sec 9 on the deep-inheritance hierarchy the
//! original runtimes use here).

use super::transition::Transition;

pub const INVALID_STATE_NUMBER: usize = usize::MAX;

/// Distinguishes what kind of ATN state a given `ATNState` is. `Decision`
/// carries its decision number; precedence/loop flags live on the variant
/// they apply to rather than as loose booleans on every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ATNStateType {
    Basic,
    RuleStart { is_precedence_rule: bool },
    RuleStop,
    BlockStart { end_state: usize },
    BlockEnd { start_state: usize },
    Decision { decision: usize },
    StarLoopEntry { decision: usize, precedence_rule_decision: bool },
    PlusLoopback { decision: usize },
    StarLoopback,
    PlusBlockStart { decision: usize, loopback_state: usize },
    TokensStart,
    LoopEnd { loopback_state: usize },
}

impl ATNStateType {
    /// A `DecisionState` is any variant that owns an ordered list of
    /// alternative entry states and a decision number.
    pub fn decision_number(&self) -> Option<usize> {
        match *self {
            ATNStateType::Decision { decision }
            | ATNStateType::StarLoopEntry { decision, .. }
            | ATNStateType::PlusLoopback { decision }
            | ATNStateType::PlusBlockStart { decision, .. } => Some(decision),
            _ => None,
        }
    }

    pub fn is_decision(&self) -> bool {
        self.decision_number().is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ATNState {
    /// Index into `ATN.states`; states are compared by this number, not by
    /// identity, so equality survives a serialize/deserialize round trip
    /// (DESIGN NOTES sec 9).
    pub state_number: usize,
    pub rule_index: usize,
    pub state_type: ATNStateType,
    pub transitions: Vec<Transition>,
    /// Non-epsilon-only decision states compute and cache their `FOLLOW`
    /// (next-token) set the first time it's asked for; populated lazily by
    /// the simulator, not at construction.
    pub next_token_within_rule: std::cell::RefCell<Option<crate::interval_set::IntervalSet>>,
}

impl ATNState {
    pub fn new(state_number: usize, rule_index: usize, state_type: ATNStateType) -> Self {
        ATNState {
            state_number,
            rule_index,
            state_type,
            transitions: Vec::new(),
            next_token_within_rule: std::cell::RefCell::new(None),
        }
    }

    pub fn add_transition(&mut self, t: Transition) {
        self.transitions.push(t);
    }

    pub fn is_decision(&self) -> bool {
        self.state_type.is_decision()
    }

    pub fn decision_number(&self) -> Option<usize> {
        self.state_type.decision_number()
    }

    pub fn is_rule_stop(&self) -> bool {
        matches!(self.state_type, ATNStateType::RuleStop)
    }

    /// A state with at most one, epsilon, outgoing transition -- the
    /// closure-expansion loop treats these as pass-through.
    pub fn is_epsilon_only_state(&self) -> bool {
        !matches!(self.state_type, ATNStateType::RuleStop)
            && self.transitions.len() <= 1
            && self.transitions.iter().all(Transition::is_epsilon)
    }
}

impl PartialEq for ATNState {
    fn eq(&self, other: &Self) -> bool {
        self.state_number == other.state_number
    }
}
impl Eq for ATNState {}

impl std::hash::Hash for ATNState {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.state_number.hash(state);
    }
}
