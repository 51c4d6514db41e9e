//! Memoized prediction outcomes, one `DFA` per decision (SPEC_FULL.md sec
//! 3 / 5). `DFAState`s are exactly the frozen `ATNConfigSet`s the simulator
//! built, plus the edges it has since discovered from them.

use crate::atn::INVALID_ALT;
use crate::atn_config_set::ATNConfigSet;
use crate::semantic_context::SemanticContext;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::rc::Rc;
use std::sync::Arc;

pub type DfaStateId = usize;

/// A DFA state's config set, frozen at the moment it was published to the
/// DFA. `ATNConfigSet`/`ATNConfig` are built on `Rc<PredictionContext>`
/// (sec 4.1), so `DFAState`, and every `DFA`/`DFACache` built out of it, is
/// `!Send`/`!Sync`: a `DFACache` is confined to the thread (or single-owner
/// task) that drives the `ParserATNSimulator` it belongs to. Sharing one
/// decision's cache across threads needs a simulator per thread, each with
/// its own `DFACache`, not one `DFACache` handed to several.
#[derive(Debug)]
pub struct DFAState {
    pub state_number: DfaStateId,
    pub configs: ATNConfigSet,
    pub edges: FxHashMap<isize, DfaStateId>,
    pub is_accept_state: bool,
    pub prediction: usize,
    pub requires_full_context: bool,
    /// For predicated accept states: `(semantic_context, alt)` pairs tried
    /// in order until one evaluates true.
    pub predicates: Vec<(Rc<SemanticContext>, usize)>,
}

impl DFAState {
    fn new(state_number: DfaStateId, configs: ATNConfigSet) -> Self {
        DFAState {
            state_number,
            configs,
            edges: FxHashMap::default(),
            is_accept_state: false,
            prediction: INVALID_ALT,
            requires_full_context: false,
            predicates: Vec::new(),
        }
    }
}

/// One DFA per decision number. `s0`/`s0_full` are the SLL/full-context
/// entry points; states are append-only and edges are added monotonically,
/// so a decision's cache only ever grows across the lifetime of the
/// `ParserATNSimulator` it belongs to.
#[derive(Debug, Default)]
pub struct DFA {
    pub decision: usize,
    states: Vec<DFAState>,
    pub s0: Option<DfaStateId>,
    pub s0_full: Option<DfaStateId>,
    pub is_precedence_dfa: bool,
    /// One SLL start state per precedence level, for decisions where
    /// `is_precedence_dfa` is set. A left-recursive rule's loop-continuation
    /// decision is reached at every precedence its rule ever recurses at,
    /// and the edges/accept states reachable from it differ by precedence
    /// (`{N >= _p}?` gates that continuation) even though it's one decision
    /// number and one `DFA` -- so `s0` alone can't serve every caller the
    /// way it does for an ordinary decision.
    precedence_states: FxHashMap<isize, DfaStateId>,
}

impl DFA {
    pub fn new(decision: usize) -> Self {
        DFA {
            decision,
            states: Vec::new(),
            s0: None,
            s0_full: None,
            is_precedence_dfa: false,
            precedence_states: FxHashMap::default(),
        }
    }

    pub fn precedence_start_state(&self, precedence: isize) -> Option<DfaStateId> {
        self.precedence_states.get(&precedence).copied()
    }

    pub fn set_precedence_start_state(&mut self, precedence: isize, id: DfaStateId) {
        self.precedence_states.insert(precedence, id);
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, id: DfaStateId) -> &DFAState {
        &self.states[id]
    }

    pub fn state_mut(&mut self, id: DfaStateId) -> &mut DFAState {
        &mut self.states[id]
    }

    /// Adds a new, frozen config set as a DFA state and returns its id.
    /// Does not check for an existing structurally-equal state; callers
    /// that want canonicalization use [`DFA::add_state_canonical`].
    pub fn add_state(&mut self, mut configs: ATNConfigSet) -> DfaStateId {
        configs.freeze();
        let id = self.states.len();
        self.states.push(DFAState::new(id, configs));
        id
    }

    /// Canonicalizes on the config set's configuration contents (state +
    /// alt + semantic-context keys, in insertion order) so two predictions
    /// landing on an equal set share one `DFAState`, matching the
    /// "config sets of stored DFA states are frozen and canonicalized"
    /// invariant of SPEC_FULL.md sec 3.
    pub fn add_state_canonical(&mut self, configs: ATNConfigSet) -> DfaStateId {
        let fp = fingerprint(&configs);
        for s in &self.states {
            if fingerprint(&s.configs) == fp {
                return s.state_number;
            }
        }
        self.add_state(configs)
    }

    pub fn add_edge(&mut self, from: DfaStateId, symbol: isize, to: DfaStateId) {
        self.states[from].edges.insert(symbol, to);
    }
}

fn fingerprint(set: &ATNConfigSet) -> Vec<(usize, usize)> {
    set.configs().iter().map(|c| (c.state, c.alt)).collect()
}

/// Per-`ParserATNSimulator` handle to every decision's `DFA`, reached
/// through an `Arc` so a simulator can clone and pass it around freely
/// within its own thread. `RwLock` (rather than the teacher's plain
/// `std::sync::RwLock`, which this swaps for `parking_lot`'s non-poisoning
/// variant) guards the append-only `Vec<DFA>`; within one `DFA`, writers
/// only ever append states/edges, never remove, so repeated borrows across
/// one thread's own prediction calls never observe a torn state. The `Rc`
/// inside every stored `ATNConfigSet` (see `DFAState`) keeps this type
/// itself `!Send`/`!Sync`, so the lock is about reentrancy within a thread,
/// not about handing the cache to another one.
pub struct DFACache {
    decisions: RwLock<Vec<DFA>>,
}

impl DFACache {
    pub fn new(num_decisions: usize) -> Arc<DFACache> {
        Arc::new(DFACache {
            decisions: RwLock::new((0..num_decisions).map(DFA::new).collect()),
        })
    }

    pub fn with_decision<T>(&self, decision: usize, f: impl FnOnce(&DFA) -> T) -> T {
        let guard = self.decisions.read();
        f(&guard[decision])
    }

    pub fn with_decision_mut<T>(&self, decision: usize, f: impl FnOnce(&mut DFA) -> T) -> T {
        let mut guard = self.decisions.write();
        f(&mut guard[decision])
    }

    pub fn clear(&self) {
        let mut guard = self.decisions.write();
        for dfa in guard.iter_mut() {
            *dfa = DFA::new(dfa.decision);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn_config::ATNConfig;
    use crate::prediction_context::{MergeCache, PredictionContext};

    #[test]
    fn add_state_canonical_shares_equal_config_sets() {
        let mut dfa = DFA::new(0);
        let mut cache = MergeCache::new();
        let mut a = ATNConfigSet::new(false);
        a.add(ATNConfig::new(1, 1, PredictionContext::empty()), &mut cache).unwrap();
        let mut b = ATNConfigSet::new(false);
        b.add(ATNConfig::new(1, 1, PredictionContext::empty()), &mut cache).unwrap();

        let id1 = dfa.add_state_canonical(a);
        let id2 = dfa.add_state_canonical(b);
        assert_eq!(id1, id2);
        assert_eq!(dfa.num_states(), 1);
    }

    #[test]
    fn edges_accumulate_monotonically_across_predictions() {
        // Simulates repeated `adaptive_predict` calls against the same
        // decision, each discovering one more edge from the same state --
        // the access pattern `with_decision_mut` actually serves, all from
        // the one thread a `DFACache` is confined to.
        let cache = DFACache::new(1);
        let configs = ATNConfigSet::new(false);
        let id = cache.with_decision_mut(0, |d| d.add_state(configs));
        for sym in 0..8 {
            cache.with_decision_mut(0, |d| {
                let target = d.add_state(ATNConfigSet::new(false));
                d.add_edge(id, sym, target);
            });
        }
        cache.with_decision(0, |d| {
            assert_eq!(d.state(id).edges.len(), 8);
        });
    }
}
