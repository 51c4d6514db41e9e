//! `(state, alt, context, semanticContext)` tuples, per SPEC_FULL.md sec 3.

use crate::prediction_context::PredictionContext;
use crate::semantic_context::SemanticContext;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct ATNConfig {
    pub state: usize,
    pub alt: usize,
    pub context: Rc<PredictionContext>,
    pub semantic_context: Rc<SemanticContext>,
    /// Set when this configuration's call stack was unwound past the rule
    /// the decision started in -- i.e. it "dips into" the caller's context.
    pub reaches_into_outer_context: usize,
    /// Precedence-filter suppression flag; see sec 4.2's
    /// `applyPrecedenceFilter`. ORed together whenever two configs with the
    /// same equality key are merged.
    pub precedence_filter_suppressed: bool,
}

impl ATNConfig {
    pub fn new(state: usize, alt: usize, context: Rc<PredictionContext>) -> Self {
        ATNConfig {
            state,
            alt,
            context,
            semantic_context: SemanticContext::none(),
            reaches_into_outer_context: 0,
            precedence_filter_suppressed: false,
        }
    }

    pub fn with_semantic_context(mut self, sem: Rc<SemanticContext>) -> Self {
        self.semantic_context = sem;
        self
    }

    pub fn with_context(state: usize, alt: usize, context: Rc<PredictionContext>, semantic_context: Rc<SemanticContext>) -> Self {
        ATNConfig {
            state,
            alt,
            context,
            semantic_context,
            reaches_into_outer_context: 0,
            precedence_filter_suppressed: false,
        }
    }

    pub fn transition_to(&self, state: usize, context: Rc<PredictionContext>) -> Self {
        ATNConfig {
            state,
            alt: self.alt,
            context,
            semantic_context: Rc::clone(&self.semantic_context),
            reaches_into_outer_context: self.reaches_into_outer_context,
            precedence_filter_suppressed: self.precedence_filter_suppressed,
        }
    }

    /// Membership/lookup key for `ATNConfigSet`: context is deliberately
    /// excluded (it gets merged, not compared) per sec 3's invariant.
    pub fn equality_key(&self) -> ConfigKey {
        ConfigKey { state: self.state, alt: self.alt, semantic_context: Rc::clone(&self.semantic_context) }
    }
}

#[derive(Clone)]
pub struct ConfigKey {
    pub state: usize,
    pub alt: usize,
    pub semantic_context: Rc<SemanticContext>,
}

impl PartialEq for ConfigKey {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state && self.alt == other.alt && self.semantic_context == other.semantic_context
    }
}
impl Eq for ConfigKey {}

impl std::hash::Hash for ConfigKey {
    fn hash<H: std::hash::Hasher>(&self, h: &mut H) {
        self.state.hash(h);
        self.alt.hash(h);
        self.semantic_context.hash(h);
    }
}
