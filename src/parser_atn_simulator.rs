//! Adaptive prediction: the SLL-then-full-LL core described in
//! SPEC_FULL.md sec 4.4. This is the heart of the runtime; everything else
//! in the crate exists to support this one entry point,
//! [`ParserATNSimulator::adaptive_predict`].

use crate::atn::{TransitionKind, INVALID_ALT};
use crate::atn_config::ATNConfig;
use crate::atn_config_set::ATNConfigSet;
use crate::atn_simulator::IATNSimulator;
use crate::dfa::{DfaStateId, DFA};
use crate::errors::{ANTLRError, ATNError, NoViableAltDetail};
use crate::error_listener::ErrorListener;
use crate::int_stream::{InputMark, IntStream, EOF};
use crate::prediction_context::{MergeCache, PredictionContext};
use crate::prediction_mode::{self, PredictionMode};
use crate::semantic_context::PredicateEvaluator;
use crate::token::{CommonToken, Token};
use crate::token_stream::TokenStream;
use rustc_hash::FxHashSet;
use std::rc::Rc;
use std::sync::Arc;

pub struct ParserATNSimulator {
    atn: Arc<crate::atn::ATN>,
    dfa_cache: Arc<crate::dfa::DFACache>,
}

impl IATNSimulator for ParserATNSimulator {
    fn atn(&self) -> &Arc<crate::atn::ATN> {
        &self.atn
    }
    fn dfa_cache(&self) -> &Arc<crate::dfa::DFACache> {
        &self.dfa_cache
    }
}

/// Visited-set key for the closure cycle guard in sec 4.4: "never re-enter
/// the same (state, alt, context, semanticContext) in one closure call".
type ClosureKey = (usize, usize, usize, u64);

fn closure_key(c: &ATNConfig) -> ClosureKey {
    use std::hash::{Hash, Hasher};
    let mut h = rustc_hash::FxHasher::default();
    c.semantic_context.hash(&mut h);
    (c.state, c.alt, Rc::as_ptr(&c.context) as usize, h.finish())
}

enum WalkOutcome {
    Accepted(usize),
    NeedsAtn { from: DfaStateId, full_context: bool },
}

impl ParserATNSimulator {
    pub fn new(atn: Arc<crate::atn::ATN>, dfa_cache: Arc<crate::dfa::DFACache>) -> Self {
        ParserATNSimulator { atn, dfa_cache }
    }

    /// Entry point. `outer_context` is the caller's prediction-context
    /// stack at the point this decision is reached -- `PredictionContext::empty()`
    /// when predicting from the outermost rule.
    #[tracing::instrument(skip(self, input, evaluator, listener), fields(decision))]
    pub fn adaptive_predict<'input, S>(
        &self,
        input: &mut S,
        decision: usize,
        outer_context: Rc<PredictionContext>,
        mode: PredictionMode,
        evaluator: &mut dyn PredicateEvaluator,
        listener: &dyn ErrorListener<'input>,
    ) -> Result<usize, ANTLRError>
    where
        S: TokenStream<'input, Tok = CommonToken>,
    {
        let mut mark = InputMark::new(input);
        let start_index = mark.stream().index();
        tracing::trace!(decision, start_index, "adaptivePredict entry");

        let decision_state = self.atn.decision_to_state[decision];
        let mut merge_cache = MergeCache::new();
        let is_precedence_decision = matches!(
            self.atn.state(decision_state).state_type,
            crate::atn::ATNStateType::StarLoopEntry { precedence_rule_decision: true, .. }
        );

        let result = self.dfa_cache.with_decision_mut(decision, |dfa| {
            let start = if is_precedence_decision {
                dfa.is_precedence_dfa = true;
                let precedence = evaluator.current_precedence();
                match dfa.precedence_start_state(precedence) {
                    Some(id) => id,
                    None => {
                        let initial = self.compute_start_configs(
                            decision_state,
                            Rc::clone(&outer_context),
                            false,
                            &mut *evaluator,
                            &mut merge_cache,
                        );
                        let filtered = initial
                            .apply_precedence_filter(&mut *evaluator, &mut merge_cache)
                            .expect("initial closure cannot observe a frozen set");
                        let id = dfa.add_state_canonical(filtered);
                        dfa.set_precedence_start_state(precedence, id);
                        id
                    }
                }
            } else {
                if dfa.s0.is_none() {
                    let initial = self.compute_start_configs(
                        decision_state,
                        Rc::clone(&outer_context),
                        false,
                        &mut *evaluator,
                        &mut merge_cache,
                    );
                    let id = dfa.add_state_canonical(initial);
                    dfa.s0 = Some(id);
                }
                dfa.s0.unwrap()
            };
            self.walk_dfa(dfa, mark.stream(), start, &mut *evaluator)
        });

        let alt = match result {
            WalkOutcome::Accepted(alt) => alt,
            WalkOutcome::NeedsAtn { from, full_context } => self.run_simulation(
                &mut mark,
                decision,
                decision_state,
                from,
                full_context,
                outer_context,
                mode,
                evaluator,
                listener,
                start_index,
                &mut merge_cache,
            )?,
        };

        mark.restore();
        tracing::trace!(decision, alt, "adaptivePredict exit");
        Ok(alt)
    }

    /// Builds the decision's initial (pre-reach) closure: one config per
    /// alternative, at each alt's entry state, under the given context.
    fn compute_start_configs(
        &self,
        decision_state: usize,
        outer_context: Rc<PredictionContext>,
        full_ctx: bool,
        evaluator: &mut dyn PredicateEvaluator,
        merge_cache: &mut MergeCache,
    ) -> ATNConfigSet {
        let state = self.atn.state(decision_state);
        let mut configs = ATNConfigSet::new(full_ctx);
        for (i, t) in state.transitions.iter().enumerate() {
            let alt = i + 1;
            let start = ATNConfig::new(t.target, alt, Rc::clone(&outer_context));
            let mut visited = FxHashSet::default();
            self.closure(start, &mut configs, &mut visited, true, full_ctx, evaluator, merge_cache)
                .expect("initial closure cannot observe a frozen set");
        }
        configs
    }

    /// Establishes a fresh full-context entry point for `decision`, sharing
    /// `s0_full` across predictions the way `s0` is shared for SLL.
    fn enter_full_context(
        &self,
        decision: usize,
        decision_state: usize,
        outer_context: Rc<PredictionContext>,
        evaluator: &mut dyn PredicateEvaluator,
        merge_cache: &mut MergeCache,
    ) -> (DfaStateId, ATNConfigSet) {
        let configs = self.compute_start_configs(decision_state, outer_context, true, evaluator, merge_cache);
        let id = self.dfa_cache.with_decision_mut(decision, |dfa| {
            if dfa.s0_full.is_none() {
                let id = dfa.add_state_canonical(configs.clone());
                dfa.s0_full = Some(id);
            }
            dfa.s0_full.unwrap()
        });
        (id, configs)
    }

    fn walk_dfa<'input, S: TokenStream<'input, Tok = CommonToken>>(
        &self,
        dfa: &mut DFA,
        input: &mut S,
        mut current: DfaStateId,
        evaluator: &mut dyn PredicateEvaluator,
    ) -> WalkOutcome {
        loop {
            if dfa.state(current).requires_full_context {
                return WalkOutcome::NeedsAtn { from: current, full_context: true };
            }
            if dfa.state(current).is_accept_state {
                if let Some(alt) = self.resolve_accept_predicates(dfa.state(current), evaluator) {
                    return WalkOutcome::Accepted(alt);
                }
            }
            let sym = input.la(1);
            match dfa.state(current).edges.get(&sym).copied() {
                Some(target) => {
                    input.consume();
                    current = target;
                }
                None => return WalkOutcome::NeedsAtn { from: current, full_context: false },
            }
        }
    }

    fn resolve_accept_predicates(
        &self,
        state: &crate::dfa::DFAState,
        evaluator: &mut dyn PredicateEvaluator,
    ) -> Option<usize> {
        if state.predicates.is_empty() {
            return Some(state.prediction);
        }
        for (sem, alt) in &state.predicates {
            if sem.eval(evaluator) {
                return Some(*alt);
            }
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn run_simulation<'input, S: TokenStream<'input, Tok = CommonToken>>(
        &self,
        mark: &mut InputMark<'_, S>,
        decision: usize,
        decision_state: usize,
        resume_from: DfaStateId,
        mut full_context: bool,
        outer_context: Rc<PredictionContext>,
        mode: PredictionMode,
        evaluator: &mut dyn PredicateEvaluator,
        listener: &dyn ErrorListener<'input>,
        start_index: isize,
        merge_cache: &mut MergeCache,
    ) -> Result<usize, ANTLRError> {
        let (mut predecessor, mut configs) = if full_context {
            self.enter_full_context(decision, decision_state, Rc::clone(&outer_context), evaluator, merge_cache)
        } else {
            let c = self.dfa_cache.with_decision(decision, |dfa| dfa.state(resume_from).configs.clone());
            (resume_from, c)
        };

        loop {
            if configs.is_empty() {
                return Err(self.no_viable_alt(mark, configs, start_index));
            }

            let unique = configs.get_unique_alt();
            if unique != INVALID_ALT {
                // `configs` may still carry a deferred precedence/semantic
                // predicate (SLL defers rather than evaluating eagerly, see
                // `closure`) even though every surviving config already
                // agrees on one alt. This same DFA accept state is reused by
                // every future call to this decision regardless of the
                // precedence level or outer context it's called at next, so
                // the predicate has to travel with it and be re-checked on
                // each reuse -- not just on this first resolution.
                self.publish_accept(decision, predecessor, unique, Some(&configs));
                return Ok(unique);
            }

            if full_context {
                let subsets = configs.get_conflicting_alt_subsets();
                if prediction_mode::all_subsets_equal(&subsets) || mode != PredictionMode::LlExactAmbigDetection {
                    let alt = prediction_mode::resolves_to_just_one_viable_alt(&subsets);
                    if alt != INVALID_ALT {
                        let ambig_alts = prediction_mode::get_alts(&subsets);
                        if ambig_alts.count_ones(..) > 1 {
                            listener.report_ambiguity(
                                decision,
                                start_index,
                                mark.stream().index(),
                                mode == PredictionMode::LlExactAmbigDetection,
                                &ambig_alts.ones().collect::<Vec<_>>(),
                                &configs,
                            );
                        }
                        self.publish_accept(decision, predecessor, alt, None);
                        return Ok(alt);
                    }
                }
            } else if prediction_mode::has_sll_conflict_terminating_prediction(mode, &configs, &self.atn) {
                if configs.has_semantic_context {
                    let (succeeded, _failed) = configs
                        .split_according_to_semantic_validity(evaluator, merge_cache)
                        .expect("split over a non-frozen set cannot fail");
                    if let Some(alt) = succeeded.iter().map(|c| c.alt).min() {
                        self.publish_accept(decision, predecessor, alt, Some(&configs));
                        return Ok(alt);
                    }
                    return Err(self.no_viable_alt(mark, configs, start_index));
                }
                listener.report_attempting_full_context(decision, start_index, mark.stream().index(), &configs);
                self.dfa_cache.with_decision_mut(decision, |dfa| {
                    dfa.state_mut(predecessor).requires_full_context = true;
                });
                mark.stream().seek(start_index);
                let (id, new_configs) =
                    self.enter_full_context(decision, decision_state, Rc::clone(&outer_context), evaluator, merge_cache);
                listener.report_context_sensitivity(decision, start_index, mark.stream().index(), 0, &new_configs);
                full_context = true;
                predecessor = id;
                configs = new_configs;
                continue;
            }

            let t = mark.stream().la(1);
            if t == EOF {
                // Nothing left to consume; an alt that already reached (or
                // dipped into an outer) rule exit can still be accepted even
                // though other, still-mid-match alts cannot. If none has,
                // fall through to the ordinary reach() below, which will
                // correctly report no viable alternative.
                let alt = configs
                    .get_alt_that_finished_decision_entry_rule(&self.atn, merge_cache)
                    .expect("filtering a non-frozen set cannot fail");
                if alt != INVALID_ALT {
                    // This resolution only holds because input happens to be
                    // exhausted right here; `predecessor` is the shared
                    // decision-entry DFA state and a later call can reach it
                    // with real lookahead still to come, so it must not be
                    // latched as an accept state for every future visit.
                    return Ok(alt);
                }
            }

            let reached = self.reach(&configs, t, full_context, merge_cache);
            mark.stream().consume();

            let mut next = ATNConfigSet::new(full_context);
            let mut visited = FxHashSet::default();
            for c in reached.configs() {
                self.closure(c.clone(), &mut next, &mut visited, !full_context, full_context, evaluator, merge_cache)
                    .expect("closure over a fresh set cannot be frozen");
            }

            let next_id = self.dfa_cache.with_decision_mut(decision, |dfa| {
                let id = dfa.add_state_canonical(next.clone());
                dfa.add_edge(predecessor, t, id);
                id
            });
            predecessor = next_id;
            configs = next;
        }
    }

    fn publish_accept(&self, decision: usize, dfa_state: DfaStateId, alt: usize, predicated: Option<&ATNConfigSet>) {
        self.dfa_cache.with_decision_mut(decision, |dfa| {
            let s = dfa.state_mut(dfa_state);
            s.is_accept_state = true;
            s.prediction = alt;
            if let Some(preds) = predicated {
                for c in preds.iter() {
                    if !c.semantic_context.is_none() {
                        s.predicates.push((Rc::clone(&c.semantic_context), c.alt));
                    }
                }
            }
        });
    }

    fn no_viable_alt<'input, S: TokenStream<'input, Tok = CommonToken>>(
        &self,
        mark: &mut InputMark<'_, S>,
        configs: ATNConfigSet,
        start_index: isize,
    ) -> ANTLRError {
        let offending = mark.stream().lt(1).map(|t| t.get_token_index()).unwrap_or(-1);
        tracing::debug!(start_index, offending, "no viable alternative");
        ANTLRError::NoViableAlt {
            offending_token_index: offending,
            rule_index: -1,
            num_configs: configs.len(),
            configs: Box::new(NoViableAltDetail(configs)),
        }
    }

    /// Consumes one symbol from every config in `set` along its non-epsilon
    /// transitions; the result still needs [`ParserATNSimulator::closure`]
    /// applied before it is a valid decision-state config set again.
    fn reach(&self, set: &ATNConfigSet, symbol: isize, full_ctx: bool, merge_cache: &mut MergeCache) -> ATNConfigSet {
        let mut out = ATNConfigSet::new(full_ctx);
        for c in set.iter() {
            let state = self.atn.state(c.state);
            for t in &state.transitions {
                if t.is_epsilon() {
                    continue;
                }
                if t.matches(symbol, crate::token::TOKEN_MIN_USER_TOKEN_TYPE, self.atn.max_token_type) {
                    let moved = c.transition_to(t.target, Rc::clone(&c.context));
                    out.add(moved, merge_cache).expect("reach over a fresh set cannot be frozen");
                }
            }
        }
        out
    }

    /// Epsilon-transitive closure (sec 4.1/4.4). `collect_predicates`
    /// controls whether predicates are attached to the semantic context
    /// (SLL: keep, to support predicated DFA accept states) or evaluated
    /// immediately and dropped on failure (full-LL).
    #[allow(clippy::too_many_arguments)]
    fn closure(
        &self,
        config: ATNConfig,
        configs: &mut ATNConfigSet,
        visited: &mut FxHashSet<ClosureKey>,
        collect_predicates: bool,
        full_ctx: bool,
        evaluator: &mut dyn PredicateEvaluator,
        merge_cache: &mut MergeCache,
    ) -> Result<(), ATNError> {
        let key = closure_key(&config);
        if !visited.insert(key) {
            return Ok(());
        }

        let state = self.atn.state(config.state);

        if state.is_rule_stop() {
            return self.closure_rule_stop(config, configs, visited, collect_predicates, full_ctx, evaluator, merge_cache);
        }

        let has_match_transition = state.transitions.iter().any(|t| !t.is_epsilon());
        if has_match_transition {
            configs.add(config.clone(), merge_cache)?;
        }

        for t in &state.transitions {
            if !t.is_epsilon() {
                continue;
            }
            match &t.kind {
                TransitionKind::Rule { follow_state, .. } => {
                    let new_context = PredictionContext::singleton(Rc::clone(&config.context), *follow_state);
                    let next = config.transition_to(t.target, new_context);
                    self.closure(next, configs, visited, collect_predicates, full_ctx, evaluator, merge_cache)?;
                }
                TransitionKind::Predicate { rule_index, pred_index, .. } => {
                    if collect_predicates {
                        let pred = Rc::new(crate::semantic_context::SemanticContext::Predicate {
                            rule_index: *rule_index as isize,
                            pred_index: *pred_index as isize,
                            is_ctx_dependent: false,
                        });
                        let mut next = config.transition_to(t.target, Rc::clone(&config.context));
                        next.semantic_context = crate::semantic_context::and(&config.semantic_context, &pred);
                        self.closure(next, configs, visited, collect_predicates, full_ctx, evaluator, merge_cache)?;
                    } else if evaluator.sempred(*rule_index as isize, *pred_index as isize) {
                        let next = config.transition_to(t.target, Rc::clone(&config.context));
                        self.closure(next, configs, visited, collect_predicates, full_ctx, evaluator, merge_cache)?;
                    }
                    // predicate failed under eager evaluation: this branch of
                    // the closure is abandoned.
                }
                TransitionKind::PrecedencePredicate { precedence } => {
                    if collect_predicates {
                        let pred = Rc::new(crate::semantic_context::SemanticContext::PrecedencePredicate { precedence: *precedence });
                        let mut next = config.transition_to(t.target, Rc::clone(&config.context));
                        next.semantic_context = crate::semantic_context::and(&config.semantic_context, &pred);
                        self.closure(next, configs, visited, collect_predicates, full_ctx, evaluator, merge_cache)?;
                    } else if evaluator.precpred(*precedence) {
                        let next = config.transition_to(t.target, Rc::clone(&config.context));
                        self.closure(next, configs, visited, collect_predicates, full_ctx, evaluator, merge_cache)?;
                    }
                    // predicate failed under eager evaluation: this branch of
                    // the closure is abandoned.
                }
                _ => {
                    // Plain epsilon or a generated-code action: pass through.
                    let next = config.transition_to(t.target, Rc::clone(&config.context));
                    self.closure(next, configs, visited, collect_predicates, full_ctx, evaluator, merge_cache)?;
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn closure_rule_stop(
        &self,
        config: ATNConfig,
        configs: &mut ATNConfigSet,
        visited: &mut FxHashSet<ClosureKey>,
        collect_predicates: bool,
        full_ctx: bool,
        evaluator: &mut dyn PredicateEvaluator,
        merge_cache: &mut MergeCache,
    ) -> Result<(), ATNError> {
        if config.context.is_empty() {
            if full_ctx {
                configs.add(config, merge_cache)?;
            } else {
                let mut dipped = config;
                dipped.reaches_into_outer_context += 1;
                configs.add(dipped, merge_cache)?;
            }
            return Ok(());
        }
        for i in 0..config.context.size() {
            let return_state = config.context.get_return_state(i);
            if return_state == crate::prediction_context::EMPTY_RETURN_STATE {
                if full_ctx {
                    configs.add(config.clone(), merge_cache)?;
                } else {
                    let mut dipped = config.clone();
                    dipped.reaches_into_outer_context += 1;
                    configs.add(dipped, merge_cache)?;
                }
                continue;
            }
            let parent = config.context.get_parent(i).unwrap_or_else(PredictionContext::empty);
            let next = ATNConfig::with_context(return_state, config.alt, parent, Rc::clone(&config.semantic_context));
            self.closure(next, configs, visited, collect_predicates, full_ctx, evaluator, merge_cache)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::{ATNKind, ATNState, ATNStateType as ST, Transition};
    use crate::dfa::DFACache;

    struct NoPredicates;
    impl PredicateEvaluator for NoPredicates {
        fn sempred(&mut self, _rule_index: isize, _pred_index: isize) -> bool {
            true
        }
        fn precpred(&mut self, _precedence: isize) -> bool {
            true
        }
    }

    struct RecordingListener;
    impl<'input> ErrorListener<'input> for RecordingListener {
        fn syntax_error(&self, _offending_token_index: isize, _line: isize, _column: isize, _msg: &str, _error: Option<&ANTLRError>) {}
    }

    /// `s : 'a' | 'b' ;` as a hand-built two-alternative decision: state 0
    /// is the decision, alts 1 and 2 match tokens 1 and 2 respectively and
    /// both land on the rule stop state 3.
    fn two_alt_atn() -> crate::atn::ATN {
        let mut atn = crate::atn::ATN::new(ATNKind::Parser, 2);
        let mut decision = ATNState::new(0, 0, ST::Decision { decision: 0 });
        decision.add_transition(Transition::new(1, TransitionKind::Epsilon));
        decision.add_transition(Transition::new(2, TransitionKind::Epsilon));
        atn.add_state(decision);
        let mut alt1 = ATNState::new(1, 0, ST::Basic);
        alt1.add_transition(Transition::new(3, TransitionKind::Atom(1)));
        atn.add_state(alt1);
        let mut alt2 = ATNState::new(2, 0, ST::Basic);
        alt2.add_transition(Transition::new(3, TransitionKind::Atom(2)));
        atn.add_state(alt2);
        atn.add_state(ATNState::new(3, 0, ST::RuleStop));
        atn
    }

    #[test]
    fn picks_the_alt_whose_token_matches() {
        let atn = Arc::new(two_alt_atn());
        let dfa_cache = DFACache::new(atn.num_decisions());
        let sim = ParserATNSimulator::new(Arc::clone(&atn), dfa_cache);
        let mut stream = crate::token_stream::VecTokenStream::new(vec![CommonToken::new(2, "b")], "<test>");
        let mut eval = NoPredicates;
        let listener = RecordingListener;
        let alt = sim
            .adaptive_predict(&mut stream, 0, PredictionContext::empty(), PredictionMode::Ll, &mut eval, &listener)
            .unwrap();
        assert_eq!(alt, 2);
        assert_eq!(stream.index(), 0, "adaptivePredict must restore stream position");
    }

    #[test]
    fn dfa_is_reused_on_second_prediction() {
        let atn = Arc::new(two_alt_atn());
        let dfa_cache = DFACache::new(atn.num_decisions());
        let sim = ParserATNSimulator::new(Arc::clone(&atn), Arc::clone(&dfa_cache));
        let mut eval = NoPredicates;
        let listener = RecordingListener;
        for _ in 0..2 {
            let mut stream = crate::token_stream::VecTokenStream::new(vec![CommonToken::new(1, "a")], "<test>");
            let alt = sim
                .adaptive_predict(&mut stream, 0, PredictionContext::empty(), PredictionMode::Ll, &mut eval, &listener)
                .unwrap();
            assert_eq!(alt, 1);
        }
        dfa_cache.with_decision(0, |d| assert!(d.num_states() >= 1));
    }
}
