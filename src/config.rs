//! The interpreter's small, builder-style configuration surface
//! (SPEC_FULL.md sec 1.1 "Configuration" / sec 6 "Decision override API"),
//! analogous to the generated-parser constructor parameters the teacher's
//! `RecognizerImpl` takes plus the builder pattern seen elsewhere in the
//! retrieved corpus (e.g. apollo-parser's `Parser::recursion_limit`).

use crate::prediction_mode::PredictionMode;

/// One `(decision, tokenIndex, forcedAlt)` triple, applied exactly once
/// when both keys match (sec 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionOverride {
    pub decision: usize,
    pub token_index: isize,
    pub forced_alt: usize,
}

#[derive(Debug, Clone)]
pub struct PredictionConfig {
    mode: PredictionMode,
    use_dfa_cache: bool,
    profile: bool,
    decision_override: Option<DecisionOverride>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig::new()
    }
}

impl PredictionConfig {
    pub fn new() -> Self {
        PredictionConfig { mode: PredictionMode::Ll, use_dfa_cache: true, profile: false, decision_override: None }
    }

    pub fn with_mode(mut self, mode: PredictionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Disables the DFA cache entirely: every decision is recomputed from
    /// the ATN on every prediction. A debug-only mode for isolating DFA
    /// memoization bugs from the underlying simulation; the interpreter
    /// honors this by clearing the cache before each `adaptive_predict`
    /// call rather than threading a flag through the simulator itself.
    pub fn without_dfa_cache(mut self) -> Self {
        self.use_dfa_cache = false;
        self
    }

    pub fn with_profiling(mut self) -> Self {
        self.profile = true;
        self
    }

    pub fn with_decision_override(mut self, decision: usize, token_index: isize, forced_alt: usize) -> Self {
        self.decision_override = Some(DecisionOverride { decision, token_index, forced_alt });
        self
    }

    pub fn mode(&self) -> PredictionMode {
        self.mode
    }

    pub fn use_dfa_cache(&self) -> bool {
        self.use_dfa_cache
    }

    pub fn profile(&self) -> bool {
        self.profile
    }

    /// Consumes the override if `(decision, token_index)` match; the
    /// interpreter calls this once per decision state instead of
    /// `adaptive_predict` when it hits.
    pub fn take_override(&mut self, decision: usize, token_index: isize) -> Option<usize> {
        match self.decision_override {
            Some(o) if o.decision == decision && o.token_index == token_index => {
                self.decision_override = None;
                Some(o.forced_alt)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_applies_exactly_once() {
        let mut cfg = PredictionConfig::new().with_decision_override(2, 0, 1);
        assert_eq!(cfg.take_override(2, 0), Some(1));
        assert_eq!(cfg.take_override(2, 0), None);
    }

    #[test]
    fn override_ignores_non_matching_token_index() {
        let mut cfg = PredictionConfig::new().with_decision_override(2, 5, 1);
        assert_eq!(cfg.take_override(2, 0), None);
        assert_eq!(cfg.take_override(2, 5), Some(1));
    }
}
