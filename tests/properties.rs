//! Property-based encodings of the invariants this runtime is supposed to
//! hold regardless of which grammar it's driving: context-merge algebra,
//! config-set dedup, and the promise that `adaptive_predict` always leaves
//! the token stream exactly where it found it.

use std::rc::Rc;
use std::sync::Arc;

use antlr_rust::{
    ATNKind, ATNState, ATNStateType, ANTLRError, CommonToken, ErrorListener, IntStream, MergeCache, PredicateEvaluator,
    PredictionContext, PredictionMode, Transition, TransitionKind, VecTokenStream, ATN,
};
use antlr_rust::dfa::DFACache;
use antlr_rust::parser_atn_simulator::ParserATNSimulator;

use proptest::prelude::*;

struct AcceptAll;
impl PredicateEvaluator for AcceptAll {
    fn sempred(&mut self, _rule_index: isize, _pred_index: isize) -> bool {
        true
    }
    fn precpred(&mut self, _precedence: isize) -> bool {
        true
    }
}

struct SilentListener;
impl<'input> ErrorListener<'input> for SilentListener {
    fn syntax_error(&self, _offending_token_index: isize, _line: isize, _column: isize, _msg: &str, _error: Option<&ANTLRError>) {}
}

/// `s : 'a' | 'b' ;` -- same shape as the simulator's own unit-test fixture,
/// duplicated here since that one is private to its module.
fn two_alt_atn() -> ATN {
    let mut atn = ATN::new(ATNKind::Parser, 2);
    let mut decision = ATNState::new(0, 0, ATNStateType::Decision { decision: 0 });
    decision.add_transition(Transition::new(1, TransitionKind::Epsilon));
    decision.add_transition(Transition::new(2, TransitionKind::Epsilon));
    atn.add_state(decision);
    let mut alt1 = ATNState::new(1, 0, ATNStateType::Basic);
    alt1.add_transition(Transition::new(3, TransitionKind::Atom(1)));
    atn.add_state(alt1);
    let mut alt2 = ATNState::new(2, 0, ATNStateType::Basic);
    alt2.add_transition(Transition::new(3, TransitionKind::Atom(2)));
    atn.add_state(alt2);
    atn.add_state(ATNState::new(3, 0, ATNStateType::RuleStop));
    atn
}

fn small_context(seed: u8) -> Rc<PredictionContext> {
    // Bounded-depth context generator: each bit of `seed` either stacks one
    // more singleton frame (return state derived from the remaining bits)
    // or stops, so depth stays within a handful of frames.
    let mut ctx = PredictionContext::empty();
    for i in 0..4 {
        if seed & (1 << i) == 0 {
            break;
        }
        ctx = PredictionContext::singleton(ctx, (seed as usize >> i) + 1);
    }
    ctx
}

proptest! {
    #[test]
    fn merge_is_idempotent_over_generated_contexts(seed in any::<u8>()) {
        let ctx = small_context(seed);
        let mut cache = MergeCache::new();
        let merged = antlr_rust::prediction_context::merge(&ctx, &ctx, true, &mut cache);
        prop_assert_eq!(merged, ctx);
    }

    #[test]
    fn merge_is_commutative_over_generated_contexts(seed_a in any::<u8>(), seed_b in any::<u8>(), root_is_wildcard in any::<bool>()) {
        let a = small_context(seed_a);
        let b = small_context(seed_b);
        let mut cache_ab = MergeCache::new();
        let ab = antlr_rust::prediction_context::merge(&a, &b, root_is_wildcard, &mut cache_ab);
        let mut cache_ba = MergeCache::new();
        let ba = antlr_rust::prediction_context::merge(&b, &a, root_is_wildcard, &mut cache_ba);
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn adaptive_predict_restores_stream_position(pick_second in any::<bool>()) {
        let atn = Arc::new(two_alt_atn());
        let dfa_cache = DFACache::new(atn.num_decisions());
        let sim = ParserATNSimulator::new(Arc::clone(&atn), dfa_cache);
        let token_type = if pick_second { 2 } else { 1 };
        let mut stream = VecTokenStream::new(vec![CommonToken::new(token_type, "x")], "<test>");
        let mut eval = AcceptAll;
        let listener = SilentListener;
        let entry_index = stream.index();
        let alt = sim
            .adaptive_predict(&mut stream, 0, PredictionContext::empty(), PredictionMode::Ll, &mut eval, &listener)
            .unwrap();
        prop_assert_eq!(alt, if pick_second { 2 } else { 1 });
        prop_assert_eq!(stream.index(), entry_index);
    }
}

#[test]
fn config_set_add_keeps_one_entry_per_equality_key() {
    use antlr_rust::atn_config::ATNConfig;
    use antlr_rust::ATNConfigSet;

    let mut set = ATNConfigSet::new(false);
    let mut cache = MergeCache::new();
    for return_state in [1usize, 2, 3] {
        let ctx = PredictionContext::singleton(PredictionContext::empty(), return_state);
        set.add(ATNConfig::new(10, 1, ctx), &mut cache).unwrap();
    }
    // Same (state, alt, semantic-context) key every time: one stored config,
    // its context widened to the merge of all three return states.
    assert_eq!(set.len(), 1);
    assert_eq!(set.configs()[0].context.size(), 3);
}

#[test]
fn frozen_config_set_rejects_further_adds() {
    use antlr_rust::atn_config::ATNConfig;
    use antlr_rust::ATNConfigSet;

    let mut set = ATNConfigSet::new(false);
    let mut cache = MergeCache::new();
    set.add(ATNConfig::new(1, 1, PredictionContext::empty()), &mut cache).unwrap();
    set.freeze();
    let err = set.add(ATNConfig::new(2, 1, PredictionContext::empty()), &mut cache);
    assert!(err.is_err());
}
