//! The ATN-walking loop: drives `adaptive_predict` to choose alternatives,
//! builds the parse tree, and implements left-recursion via the
//! enter-recursion/unroll dance (SPEC_FULL.md sec 4.5). Grounded on the
//! teacher's `recognizer.rs`, which names this collaborator
//! (`parser_interpreter()`) but never implements the loop itself.
//!
//! This crate has no grammar-compilation toolchain (sec 1 Non-goals), so
//! there is exactly one way through the ATN: this generic, grammar-free
//! walker. A generated parser elsewhere would inline most of this as
//! per-rule Rust methods; here it stays a single interpreter over any ATN.

use std::rc::Rc;
use std::sync::Arc;

use crate::atn::{ATNState, ATNStateType, TransitionKind, ATN};
use crate::atn_simulator::IATNSimulator;
use crate::config::PredictionConfig;
use crate::error_listener::ErrorListener;
use crate::error_strategy::ErrorStrategy;
use crate::errors::ANTLRError;
use crate::int_stream::IntStream;
use crate::interval_set::IntervalSet;
use crate::prediction_context::PredictionContext;
use crate::recognizer::{ProfilingData, Recognizer, RecognizerImpl};
use crate::rule_context::NO_INVOKING_STATE;
use crate::semantic_context::PredicateEvaluator;
use crate::token::{CommonToken, Token};
use crate::token_stream::TokenStream;
use crate::tree::{ParseTreeNode, ParserRuleContext, RuleNode};

/// Evaluates only `precpred`, against the interpreter's own precedence
/// stack; user `sempred`s always hold, matching [`RecognizerImpl`]'s own
/// default (sec 1 Non-goals: no grammar-generated predicate bodies exist to
/// call here). Borrows nothing from the interpreter beyond a copied `isize`
/// so it can be constructed without holding `self` borrowed while
/// `adaptive_predict` also needs `&mut self.input`.
struct PrecedenceEvaluator {
    current_precedence: Option<isize>,
}

impl PredicateEvaluator for PrecedenceEvaluator {
    fn sempred(&mut self, _rule_index: isize, _pred_index: isize) -> bool {
        true
    }

    fn precpred(&mut self, precedence: isize) -> bool {
        self.current_precedence.map_or(true, |p| precedence >= p)
    }

    fn current_precedence(&self) -> isize {
        self.current_precedence.unwrap_or(0)
    }
}

/// Walks an [`ATN`] to parse one rule's worth of input into a
/// [`ParserRuleContext`] tree. `_parentContextStack` in SPEC_FULL.md sec
/// 4.5 is `parent_context_stack` below: the only two operations allowed to
/// mutate it are pushing on entry to a left-recursive rule and popping on
/// its rule-stop, per the same section's REDESIGN note against encoding it
/// with nested Rust calls.
pub struct ParserInterpreter<'input, S: TokenStream<'input, Tok = CommonToken>> {
    recognizer: RecognizerImpl<'input>,
    input: S,
    error_strategy: Box<dyn ErrorStrategy<'input, S>>,
    listener: Arc<dyn ErrorListener<'input>>,
    config: PredictionConfig,
    ctx: Option<RuleNode>,
    precedence_stack: Vec<isize>,
    parent_context_stack: Vec<(Option<RuleNode>, isize)>,
    last_token: Option<CommonToken>,
    profiling: Option<ProfilingData>,
}

impl<'input, S: TokenStream<'input, Tok = CommonToken>> ParserInterpreter<'input, S> {
    pub fn new(recognizer: RecognizerImpl<'input>, input: S, config: PredictionConfig) -> Self {
        let profiling = config.profile().then(|| ProfilingData::for_num_decisions(recognizer.get_atn().num_decisions()));
        ParserInterpreter {
            recognizer,
            input,
            error_strategy: Box::new(crate::error_strategy::DefaultErrorStrategy::new()),
            listener: Arc::new(crate::error_listener::TracingErrorListener),
            config,
            ctx: None,
            precedence_stack: Vec::new(),
            parent_context_stack: Vec::new(),
            last_token: None,
            profiling,
        }
    }

    pub fn recognizer(&self) -> &RecognizerImpl<'input> {
        &self.recognizer
    }

    /// Per-decision invocation counts and time spent in `adaptive_predict`,
    /// populated only when constructed with
    /// [`PredictionConfig::with_profiling`].
    pub fn profiling_data(&self) -> Option<&ProfilingData> {
        self.profiling.as_ref()
    }

    /// Parses `start_rule_index` to completion, returning the root rule
    /// context. The ATN-walking loop itself (sec 4.5): dispatch on state
    /// type until the outermost rule's `RuleStopState` is reached with an
    /// empty invoking-state (the one invariant that holds whether or not
    /// `start_rule_index` is left-recursive, since every recursion-context
    /// push carries the *caller's* invoking state forward).
    #[tracing::instrument(skip(self), fields(start_rule_index))]
    pub fn parse(&mut self, start_rule_index: usize) -> Result<RuleNode, ANTLRError> {
        let atn = Arc::clone(self.recognizer.get_atn());
        let start_state = atn.rule_to_start_state[start_rule_index];

        if atn.is_precedence_rule(start_rule_index) {
            self.parent_context_stack.push((None, NO_INVOKING_STATE as isize));
            self.enter_recursion_rule(&atn, start_rule_index, start_state, 0);
        } else {
            self.enter_rule(start_rule_index, start_state);
        }

        loop {
            let state_number = self.recognizer.get_state();
            let state = atn.state(state_number as usize);

            if state.is_rule_stop() {
                if self.ctx.as_ref().expect("a context is always open while parsing").borrow().invoking_state
                    == NO_INVOKING_STATE
                {
                    if !self.parent_context_stack.is_empty() {
                        self.parent_context_stack.pop();
                        self.precedence_stack.pop();
                    }
                    let root = self.ctx.take().expect("root context must still be open");
                    root.borrow_mut().stop = self.last_token.clone();
                    return Ok(root);
                }
                self.visit_rule_stop_state(&atn)?;
                continue;
            }

            if let Err(e) = self.visit_state(&atn, state) {
                self.error_strategy.report_error(&mut self.input, &e);
                let expected = atn.next_tokens(state.state_number);
                self.error_strategy.recover(&mut self.input, &e, &expected);
            }
        }
    }

    fn visit_state(&mut self, atn: &ATN, state: &ATNState) -> Result<(), ANTLRError> {
        let edge = if state.is_decision() { self.predict(atn, state)? } else { 1 };
        let transition = state.transitions[edge - 1].clone();
        self.apply_transition(atn, state, &transition)
    }

    fn predict(&mut self, atn: &ATN, state: &ATNState) -> Result<usize, ANTLRError> {
        let decision = state.decision_number().expect("decision state must carry a decision number");
        let expected = atn.next_tokens(state.state_number);
        self.error_strategy.sync(&mut self.input, &expected)?;

        let token_index = self.input.index();
        if let Some(forced) = self.config.take_override(decision, token_index) {
            return Ok(forced);
        }

        if !self.config.use_dfa_cache() {
            self.recognizer.parser_interpreter().dfa_cache().clear();
        }

        let outer_context = self.current_prediction_context(atn);
        let mut evaluator = PrecedenceEvaluator { current_precedence: self.precedence_stack.last().copied() };
        let start = self.profiling.is_some().then(std::time::Instant::now);
        let result = self.recognizer.parser_interpreter().adaptive_predict(
            &mut self.input,
            decision,
            outer_context,
            self.config.mode(),
            &mut evaluator,
            self.listener.as_ref(),
        );
        if let (Some(profiling), Some(start)) = (self.profiling.as_mut(), start) {
            profiling.record(decision, start.elapsed().as_nanos() as u64);
        }
        result
    }

    /// The prediction-context stack `adaptivePredict` needs is built fresh
    /// from the currently open rule contexts' `invoking_state` chain (sec
    /// 4.1) -- a separate notion from the parse tree's own parent pointers,
    /// even though both walk the same chain of open rule invocations. Each
    /// frame's `invoking_state` names the call site itself; the context the
    /// simulator's own closure traversal expects to pop back to is that
    /// site's `Rule` transition's `follow_state`, the same conversion real
    /// prediction-context construction from a rule-context chain performs.
    fn current_prediction_context(&self, atn: &ATN) -> Rc<PredictionContext> {
        fn build(ctx: &Option<RuleNode>, atn: &ATN) -> Rc<PredictionContext> {
            match ctx {
                None => PredictionContext::empty(),
                Some(node) => {
                    let b = node.borrow();
                    if b.invoking_state == NO_INVOKING_STATE {
                        PredictionContext::empty()
                    } else {
                        let parent = build(&b.parent, atn);
                        let return_state = atn.rule_follow_state(b.invoking_state as usize);
                        PredictionContext::singleton(parent, return_state)
                    }
                }
            }
        }
        build(&self.ctx, atn)
    }

    fn apply_transition(&mut self, atn: &ATN, state: &ATNState, transition: &crate::atn::Transition) -> Result<(), ANTLRError> {
        match &transition.kind {
            TransitionKind::Epsilon => {
                if let ATNStateType::StarLoopEntry { precedence_rule_decision: true, .. } = state.state_type {
                    let target_is_loop_end = matches!(atn.state(transition.target).state_type, ATNStateType::LoopEnd { .. });
                    if !target_is_loop_end {
                        self.push_new_recursion_context(state.rule_index);
                    }
                }
                self.recognizer.set_state(transition.target as isize);
            }
            TransitionKind::Atom(_) | TransitionKind::Range(_, _) | TransitionKind::Set(_) | TransitionKind::NotSet(_) | TransitionKind::Wildcard => {
                self.match_transition(atn, transition)?;
                self.recognizer.set_state(transition.target as isize);
            }
            TransitionKind::Rule { rule_index, precedence, .. } => {
                let start_state = atn.rule_to_start_state[*rule_index];
                if atn.is_precedence_rule(*rule_index) {
                    let invoking_state = state.state_number as isize;
                    self.parent_context_stack.push((self.ctx.clone(), invoking_state));
                    self.enter_recursion_rule(atn, *rule_index, start_state, *precedence);
                } else {
                    self.enter_rule(*rule_index, start_state);
                }
            }
            TransitionKind::Predicate { rule_index, pred_index, .. } => {
                if !self.recognizer.sempred(*rule_index as isize, *pred_index as isize) {
                    return Err(ANTLRError::FailedPredicate {
                        rule_index: *rule_index as isize,
                        predicate_index: *pred_index as isize,
                        message: None,
                    });
                }
                self.recognizer.set_state(transition.target as isize);
            }
            TransitionKind::PrecedencePredicate { precedence } => {
                let top = self.precedence_stack.last().copied().unwrap_or(0);
                if *precedence < top {
                    return Err(ANTLRError::FailedPredicate {
                        rule_index: state.rule_index as isize,
                        predicate_index: -1,
                        message: Some(format!("precedence {precedence} < required {top}")),
                    });
                }
                self.recognizer.set_state(transition.target as isize);
            }
            TransitionKind::Action { rule_index, action_index, .. } => {
                self.recognizer.action(*rule_index, *action_index);
                self.recognizer.set_state(transition.target as isize);
            }
        }
        Ok(())
    }

    fn match_transition(&mut self, atn: &ATN, transition: &crate::atn::Transition) -> Result<(), ANTLRError> {
        let current = self.input.lt(1).cloned();
        let la = self.input.la(1);
        let matched = transition.matches(la, crate::token::TOKEN_MIN_USER_TOKEN_TYPE, atn.max_token_type);

        if matched {
            self.input.consume();
            self.error_strategy.report_match();
            if let Some(t) = current {
                self.last_token = Some(t.clone());
                if let Some(ctx) = &self.ctx {
                    ctx.borrow_mut().add_token_node(t);
                }
            }
            Ok(())
        } else {
            let expected = transition.label().unwrap_or_else(IntervalSet::new);
            let recovered = self.error_strategy.recover_inline(&mut self.input, &expected)?;
            self.last_token = Some(recovered.clone());
            if let Some(ctx) = &self.ctx {
                ctx.borrow_mut().add_error_node(recovered);
            }
            Ok(())
        }
    }

    fn enter_rule(&mut self, rule_index: usize, start_state: usize) {
        let invoking_state = self.recognizer.get_state();
        let parent = self.ctx.clone();
        let new_ctx = ParserRuleContext::new(parent, invoking_state, rule_index).into_node();
        new_ctx.borrow_mut().start = self.input.lt(1).cloned();
        self.ctx = Some(new_ctx);
        self.recognizer.set_state(start_state as isize);
    }

    /// `exitRule`: closes the current context, attaches it to its parent's
    /// children, restores `ctx` to that parent, and returns the state the
    /// finished rule was invoked from (so the caller can resume at its
    /// `Rule` transition's follow state).
    fn exit_rule(&mut self) -> isize {
        let finished = self.ctx.take().expect("exit_rule with no open context");
        let invoking_state = finished.borrow().invoking_state;
        finished.borrow_mut().stop = self.last_token.clone();
        let parent = finished.borrow().parent.clone();
        if let Some(p) = &parent {
            p.borrow_mut().children.push(ParseTreeNode::Rule(Rc::clone(&finished)));
        }
        self.ctx = parent;
        invoking_state
    }

    /// `enterRecursionRule`: pushes the precedence threshold and opens a
    /// fresh context at the rule's start state, at precedence 0 for the
    /// outermost call or the invoking `Rule` transition's own precedence
    /// argument otherwise.
    fn enter_recursion_rule(&mut self, _atn: &ATN, rule_index: usize, start_state: usize, precedence: isize) {
        let invoking_state = self.recognizer.get_state();
        let parent = self.ctx.clone();
        let new_ctx = ParserRuleContext::new(parent, invoking_state, rule_index).into_node();
        new_ctx.borrow_mut().start = self.input.lt(1).cloned();
        self.ctx = Some(new_ctx);
        self.precedence_stack.push(precedence);
        self.recognizer.set_state(start_state as isize);
    }

    /// `pushNewRecursionContext`: at the top of another pass through the
    /// precedence-climbing loop, wraps the context built so far (the
    /// lower-precedence parse) as the first child of a new context whose
    /// parent/invoking-state come from the call that originally entered
    /// this left-recursive rule -- not from whatever the loop's last
    /// iteration happened to set, which is exactly why that pair lives on
    /// `parent_context_stack` instead of being re-derived from `ctx`. The
    /// just-finished `previous` context is re-tagged with that same
    /// original invoking state too: every wrapper level this loop produces
    /// is, for any later context-walking (prediction, error reporting),
    /// indistinguishable from the single outer call that started the whole
    /// recursive chain.
    fn push_new_recursion_context(&mut self, rule_index: usize) {
        let (parent, invoking_state) = self
            .parent_context_stack
            .last()
            .cloned()
            .expect("a precedence loop can only continue inside a left-recursive rule");

        let previous = self.ctx.take().expect("a context is always open while looping");
        previous.borrow_mut().invoking_state = invoking_state;
        previous.borrow_mut().stop = self.last_token.clone();

        let new_ctx = ParserRuleContext::new(parent, invoking_state, rule_index).into_node();
        new_ctx.borrow_mut().start = previous.borrow().start.clone();
        new_ctx.borrow_mut().children.push(ParseTreeNode::Rule(Rc::clone(&previous)));
        previous.borrow_mut().parent = Some(Rc::clone(&new_ctx));

        self.ctx = Some(new_ctx);
    }

    /// `visitRuleStopState` for the non-outermost case: either an ordinary
    /// `exitRule`, or (for a left-recursive rule) one level of
    /// `unrollRecursionContexts`, before resuming at the invoking state's
    /// `Rule` transition follow state.
    fn visit_rule_stop_state(&mut self, atn: &ATN) -> Result<(), ANTLRError> {
        let rule_index = self.ctx.as_ref().unwrap().borrow().rule_index;
        let resume_at = if atn.is_precedence_rule(rule_index) {
            let (parent, invoking_state) =
                self.parent_context_stack.pop().expect("rule-stop of a left-recursive rule needs a matching push");
            self.unroll_recursion_contexts(parent);
            invoking_state
        } else {
            self.exit_rule()
        };
        let follow = atn.rule_follow_state(resume_at as usize);
        self.recognizer.set_state(follow as isize);
        Ok(())
    }

    fn unroll_recursion_contexts(&mut self, parent: Option<RuleNode>) {
        self.precedence_stack.pop();
        let finished = self.ctx.take().expect("unroll with no open context");
        finished.borrow_mut().stop = self.last_token.clone();
        finished.borrow_mut().parent = parent.clone();
        if let Some(p) = &parent {
            p.borrow_mut().children.push(ParseTreeNode::Rule(Rc::clone(&finished)));
        }
        self.ctx = parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::{ATNKind, Transition};
    use crate::token_stream::VecTokenStream;
    use crate::vocabulary::VocabularyImpl;

    fn recognizer(atn: ATN) -> RecognizerImpl<'static> {
        RecognizerImpl::new("t.g4", &[], VocabularyImpl::empty_vocabulary(), Arc::new(atn))
    }

    /// `s : INT ;` -- a single rule, no decisions at all.
    fn single_token_atn() -> ATN {
        let mut atn = ATN::new(ATNKind::Parser, 1);
        let mut start = ATNState::new(0, 0, ATNStateType::RuleStart { is_precedence_rule: false });
        start.add_transition(Transition::new(1, TransitionKind::Atom(1)));
        atn.add_state(start);
        atn.add_state(ATNState::new(1, 0, ATNStateType::RuleStop));
        atn.rule_to_start_state.push(0);
        atn.rule_to_stop_state.push(1);
        atn
    }

    #[test]
    fn parses_a_single_matched_token_into_a_terminal_child() {
        let atn = single_token_atn();
        let rec = recognizer(atn);
        let input = VecTokenStream::new(vec![CommonToken::new(1, "x")], "<test>");
        let mut interp = ParserInterpreter::new(rec, input, PredictionConfig::new());
        let root = interp.parse(0).unwrap();
        let root = root.borrow();
        assert_eq!(root.get_child_count(), 1);
        assert_eq!(root.get_text(), "x");
    }

    /// Left-recursive `e : e '+' e | INT ;`, precedence-eliminated by hand
    /// into a primary match followed by a `({3 >= _p}? '+' e[4])*` loop,
    /// rule index 0. Token types: `INT = 1`, `'+' = 2`.
    fn left_recursive_sum_atn() -> ATN {
        let mut atn = ATN::new(ATNKind::Parser, 2);

        let mut s0 = ATNState::new(0, 0, ATNStateType::RuleStart { is_precedence_rule: true });
        s0.add_transition(Transition::new(1, TransitionKind::Epsilon));
        atn.add_state(s0);

        let mut s1 = ATNState::new(1, 0, ATNStateType::Basic); // primary: match INT
        s1.add_transition(Transition::new(2, TransitionKind::Atom(1)));
        atn.add_state(s1);

        let mut s2 = ATNState::new(2, 0, ATNStateType::Basic);
        s2.add_transition(Transition::new(3, TransitionKind::Epsilon));
        atn.add_state(s2);

        let mut s3 = ATNState::new(3, 0, ATNStateType::StarLoopEntry { decision: 0, precedence_rule_decision: true });
        s3.add_transition(Transition::new(4, TransitionKind::Epsilon)); // alt 1: continue looping
        s3.add_transition(Transition::new(8, TransitionKind::Epsilon)); // alt 2: exit
        atn.add_state(s3);

        let mut s4 = ATNState::new(4, 0, ATNStateType::Basic);
        s4.add_transition(Transition::new(5, TransitionKind::PrecedencePredicate { precedence: 3 }));
        atn.add_state(s4);

        let mut s5 = ATNState::new(5, 0, ATNStateType::Basic); // match '+'
        s5.add_transition(Transition::new(6, TransitionKind::Atom(2)));
        atn.add_state(s5);

        let mut s6 = ATNState::new(6, 0, ATNStateType::Basic); // recurse at precedence 4
        s6.add_transition(Transition::new(0, TransitionKind::Rule { rule_index: 0, precedence: 4, follow_state: 7 }));
        atn.add_state(s6);

        let mut s7 = ATNState::new(7, 0, ATNStateType::Basic);
        s7.add_transition(Transition::new(3, TransitionKind::Epsilon)); // loop back
        atn.add_state(s7);

        let mut s8 = ATNState::new(8, 0, ATNStateType::LoopEnd { loopback_state: 3 });
        s8.add_transition(Transition::new(9, TransitionKind::Epsilon));
        atn.add_state(s8);

        atn.add_state(ATNState::new(9, 0, ATNStateType::RuleStop));

        atn.rule_to_start_state.push(0);
        atn.rule_to_stop_state.push(9);
        atn
    }

    fn depth(node: &RuleNode) -> usize {
        let n = node.borrow();
        n.children
            .iter()
            .map(|c| match c {
                ParseTreeNode::Rule(r) => 1 + depth(r),
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn left_recursive_rule_builds_a_left_associative_tree() {
        let atn = left_recursive_sum_atn();
        let rec = recognizer(atn);
        let tokens = vec![CommonToken::new(1, "1"), CommonToken::new(2, "+"), CommonToken::new(1, "2"), CommonToken::new(2, "+"), CommonToken::new(1, "3")];
        let input = VecTokenStream::new(tokens, "<test>");
        let mut interp = ParserInterpreter::new(rec, input, PredictionConfig::new());
        let root = interp.parse(0).unwrap();
        assert_eq!(root.borrow().get_text(), "1+2+3");
        // Two rounds of the precedence-climbing loop wrap the context
        // twice, giving a left spine of depth 2 -- `((1+2)+3)`.
        assert_eq!(depth(&root), 2);
    }

    #[test]
    fn decision_override_forces_the_configured_alt() {
        let mut atn = ATN::new(ATNKind::Parser, 2);
        let mut decision = ATNState::new(0, 0, ATNStateType::RuleStart { is_precedence_rule: false });
        decision.add_transition(Transition::new(1, TransitionKind::Epsilon));
        atn.add_state(decision);
        let mut dec = ATNState::new(1, 0, ATNStateType::Decision { decision: 0 });
        dec.add_transition(Transition::new(2, TransitionKind::Atom(1)));
        dec.add_transition(Transition::new(2, TransitionKind::Atom(2)));
        atn.add_state(dec);
        atn.add_state(ATNState::new(2, 0, ATNStateType::RuleStop));
        atn.rule_to_start_state.push(0);
        atn.rule_to_stop_state.push(2);

        // The override pins alt 1 (Atom(1)), which is also what this input
        // would pick under ordinary prediction; the point of this test is
        // that `take_override` short-circuits `predict` before it ever
        // calls into `adaptive_predict`.
        let rec = recognizer(atn);
        let input = VecTokenStream::new(vec![CommonToken::new(1, "a")], "<test>");
        let config = PredictionConfig::new().with_decision_override(0, 0, 1);
        let mut interp = ParserInterpreter::new(rec, input, config);
        let root = interp.parse(0).unwrap();
        assert_eq!(root.borrow().get_text(), "a");
    }
}
