//! Boolean algebra of user and precedence predicates attached to a
//! configuration (SPEC_FULL.md sec 3 / 4.3).

use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticContext {
    /// Always-true sentinel; the vast majority of configs carry this.
    None,
    Predicate { rule_index: isize, pred_index: isize, is_ctx_dependent: bool },
    PrecedencePredicate { precedence: isize },
    And(Vec<Rc<SemanticContext>>),
    Or(Vec<Rc<SemanticContext>>),
}

/// What a `Recognizer` implements to evaluate the two predicate kinds this
/// module folds over. Kept minimal and generic rather than trait-object
/// erased so a generated parser's `sempred`/`precpred` can close over its
/// own rule-context type.
pub trait PredicateEvaluator {
    fn sempred(&mut self, rule_index: isize, pred_index: isize) -> bool;
    fn precpred(&mut self, precedence: isize) -> bool;

    /// The threshold `precpred` currently checks against. Used only to key
    /// the per-precedence DFA start states a precedence decision needs
    /// (sec 4.4/4.2's `applyPrecedenceFilter`); evaluators with no notion of
    /// precedence (ordinary rule predicates) never have it consulted.
    fn current_precedence(&self) -> isize {
        0
    }
}

impl SemanticContext {
    pub fn none() -> Rc<SemanticContext> {
        thread_local! {
            static NONE: Rc<SemanticContext> = Rc::new(SemanticContext::None);
        }
        NONE.with(Rc::clone)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SemanticContext::None)
    }

    pub fn eval(&self, evaluator: &mut dyn PredicateEvaluator) -> bool {
        match self {
            SemanticContext::None => true,
            SemanticContext::Predicate { rule_index, pred_index, .. } => evaluator.sempred(*rule_index, *pred_index),
            SemanticContext::PrecedencePredicate { precedence } => evaluator.precpred(*precedence),
            SemanticContext::And(ops) => ops.iter().all(|o| o.eval(evaluator)),
            SemanticContext::Or(ops) => ops.iter().any(|o| o.eval(evaluator)),
        }
    }

    /// Folds precedence predicates against the parser's current
    /// precedence, per sec 4.3: `Some(NONE)` if everything holds and no
    /// user predicates remain, `None` if something's definitely falsified,
    /// otherwise `Some(simplified)` with the precedence predicates dropped.
    pub fn eval_precedence(&self, evaluator: &mut dyn PredicateEvaluator) -> Option<Rc<SemanticContext>> {
        match self {
            SemanticContext::None => Some(SemanticContext::none()),
            SemanticContext::PrecedencePredicate { precedence } => {
                if evaluator.precpred(*precedence) {
                    Some(SemanticContext::none())
                } else {
                    None
                }
            }
            SemanticContext::Predicate { .. } => Some(Rc::new(self.clone())),
            SemanticContext::And(ops) => {
                let mut changed = false;
                let mut kept = Vec::with_capacity(ops.len());
                for op in ops {
                    match op.eval_precedence(evaluator) {
                        None => return None,
                        Some(simplified) => {
                            if !Rc::ptr_eq(&simplified, op) {
                                changed = true;
                            }
                            if !simplified.is_none() {
                                kept.push(simplified);
                            } else {
                                changed = true;
                            }
                        }
                    }
                }
                if !changed {
                    return Some(Rc::new(self.clone()));
                }
                if kept.is_empty() {
                    return Some(SemanticContext::none());
                }
                if kept.len() == 1 {
                    return Some(kept.remove(0));
                }
                Some(and_all(kept))
            }
            SemanticContext::Or(ops) => {
                let mut changed = false;
                let mut kept = Vec::with_capacity(ops.len());
                for op in ops {
                    match op.eval_precedence(evaluator) {
                        None => changed = true,
                        Some(simplified) => {
                            if !Rc::ptr_eq(&simplified, op) {
                                changed = true;
                            }
                            if simplified.is_none() {
                                return Some(SemanticContext::none());
                            }
                            kept.push(simplified);
                        }
                    }
                }
                if !changed {
                    return Some(Rc::new(self.clone()));
                }
                if kept.is_empty() {
                    return None;
                }
                if kept.len() == 1 {
                    return Some(kept.remove(0));
                }
                Some(or_all(kept))
            }
        }
    }
}

fn dedup_sorted(mut ops: Vec<Rc<SemanticContext>>) -> Vec<Rc<SemanticContext>> {
    ops.sort_by(|a, b| format!("{a:?}").cmp(&format!("{b:?}")));
    ops.dedup();
    ops
}

/// `and(a, b)`: short-circuits against `NONE`, flattens nested `And`s,
/// dedups and sorts operands for structural-equality-friendly comparison.
pub fn and(a: &Rc<SemanticContext>, b: &Rc<SemanticContext>) -> Rc<SemanticContext> {
    if a.is_none() {
        return Rc::clone(b);
    }
    if b.is_none() {
        return Rc::clone(a);
    }
    let mut ops = Vec::new();
    flatten_and(a, &mut ops);
    flatten_and(b, &mut ops);
    and_all(dedup_sorted(ops))
}

pub fn or(a: &Rc<SemanticContext>, b: &Rc<SemanticContext>) -> Rc<SemanticContext> {
    if a.is_none() || b.is_none() {
        return SemanticContext::none();
    }
    let mut ops = Vec::new();
    flatten_or(a, &mut ops);
    flatten_or(b, &mut ops);
    or_all(dedup_sorted(ops))
}

fn flatten_and(ctx: &Rc<SemanticContext>, out: &mut Vec<Rc<SemanticContext>>) {
    match &**ctx {
        SemanticContext::And(ops) => out.extend(ops.iter().cloned()),
        _ => out.push(Rc::clone(ctx)),
    }
}

fn flatten_or(ctx: &Rc<SemanticContext>, out: &mut Vec<Rc<SemanticContext>>) {
    match &**ctx {
        SemanticContext::Or(ops) => out.extend(ops.iter().cloned()),
        _ => out.push(Rc::clone(ctx)),
    }
}

fn and_all(ops: Vec<Rc<SemanticContext>>) -> Rc<SemanticContext> {
    if ops.len() == 1 {
        return ops.into_iter().next().unwrap();
    }
    Rc::new(SemanticContext::And(ops))
}

fn or_all(ops: Vec<Rc<SemanticContext>>) -> Rc<SemanticContext> {
    if ops.len() == 1 {
        return ops.into_iter().next().unwrap();
    }
    Rc::new(SemanticContext::Or(ops))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysTrue;
    impl PredicateEvaluator for AlwaysTrue {
        fn sempred(&mut self, _rule_index: isize, _pred_index: isize) -> bool {
            true
        }
        fn precpred(&mut self, _precedence: isize) -> bool {
            true
        }
    }

    struct AlwaysFalse;
    impl PredicateEvaluator for AlwaysFalse {
        fn sempred(&mut self, _rule_index: isize, _pred_index: isize) -> bool {
            false
        }
        fn precpred(&mut self, _precedence: isize) -> bool {
            false
        }
    }

    #[test]
    fn and_short_circuits_on_none() {
        let p = Rc::new(SemanticContext::Predicate { rule_index: 0, pred_index: 0, is_ctx_dependent: false });
        let n = SemanticContext::none();
        assert_eq!(and(&p, &n), p);
    }

    #[test]
    fn eval_precedence_drops_satisfied_precedence_predicates() {
        let pp = Rc::new(SemanticContext::PrecedencePredicate { precedence: 2 });
        let simplified = pp.eval_precedence(&mut AlwaysTrue).unwrap();
        assert!(simplified.is_none());
        assert!(pp.eval_precedence(&mut AlwaysFalse).is_none());
    }
}
