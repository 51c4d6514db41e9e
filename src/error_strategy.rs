//! The error-recovery policy is, per SPEC_FULL.md sec 6, an external
//! collaborator: the interpreter drives it through this trait but does not
//! mandate a particular recovery algorithm. `DefaultErrorStrategy`
//! implements the minimal single-token-deletion/insertion policy needed to
//! make scenario 5 of sec 8 concrete.

use crate::errors::ANTLRError;
use crate::int_stream::IntStream;
use crate::interval_set::IntervalSet;
use crate::token::{CommonToken, Token, TOKEN_EOF};
use crate::token_stream::TokenStream;

/// Operations the interpreter calls into while walking the ATN. `P` is the
/// parsing context this strategy is attached to; kept generic rather than
/// trait-object-erased so a recovery strategy can read parser-specific
/// state if it needs to (the teacher's own `Recognizer` trait is generic
/// over the recognizer for the same reason).
pub trait ErrorStrategy<'input, S: TokenStream<'input>> {
    /// Called before reading lookahead at a decision point, to give the
    /// strategy a chance to pre-emptively resynchronize.
    fn sync(&mut self, input: &mut S, expected: &IntervalSet) -> Result<(), ANTLRError>;

    fn report_error(&mut self, input: &mut S, error: &ANTLRError);

    /// Recovers from an error raised mid-rule; resumes at the rule's follow
    /// set by consuming tokens until one is found in `expected`.
    fn recover(&mut self, input: &mut S, error: &ANTLRError, expected: &IntervalSet);

    /// Recovers from a single mismatched token inline (without unwinding
    /// the rule stack): deletes the offending token if doing so makes the
    /// next token match, otherwise reports a mismatch and returns the
    /// current token unconsumed so the caller can substitute it.
    fn recover_inline(&mut self, input: &mut S, expected: &IntervalSet) -> Result<CommonToken, ANTLRError>;

    fn in_error_recovery_mode(&self) -> bool;
    fn report_match(&mut self);
}

#[derive(Debug, Default)]
pub struct DefaultErrorStrategy {
    error_recovery_mode: bool,
    last_error_index: isize,
}

impl<'input, S: TokenStream<'input, Tok = CommonToken>> ErrorStrategy<'input, S> for DefaultErrorStrategy {
    fn sync(&mut self, _input: &mut S, _expected: &IntervalSet) -> Result<(), ANTLRError> {
        Ok(())
    }

    fn report_error(&mut self, _input: &mut S, error: &ANTLRError) {
        tracing::warn!(offending_token_index = ?error.offending_token_index(), ?error, "syntax error reported");
    }

    fn recover(&mut self, input: &mut S, error: &ANTLRError, expected: &IntervalSet) {
        self.report_error(input, error);
        self.error_recovery_mode = true;
        // Single-token-deletion style recovery: consume tokens until one is
        // in the rule's follow set (or EOF), so the interpreter can resume
        // the walk from the rule stop state.
        loop {
            let la = input.la(1);
            if la == TOKEN_EOF || expected.contains(la) {
                break;
            }
            input.consume();
        }
    }

    fn recover_inline(&mut self, input: &mut S, expected: &IntervalSet) -> Result<CommonToken, ANTLRError> {
        let current = input.lt(1).cloned();
        let next_matches = expected.contains(input.la(2));
        if next_matches {
            // Single-token deletion: drop the offending token, re-sync on
            // the one that follows it.
            let deleted = current.clone();
            input.consume();
            self.error_recovery_mode = true;
            if let Some(t) = deleted {
                tracing::debug!(text = %t.get_text(), "deleted offending token during recovery");
            }
            if let Some(t) = input.lt(1).cloned() {
                return Ok(t);
            }
        }
        let rule_index = -1;
        Err(ANTLRError::InputMismatch {
            offending_token_index: current.map(|t| t.get_token_index()).unwrap_or(-1),
            rule_index,
            expected: format!("{expected}"),
        })
    }

    fn in_error_recovery_mode(&self) -> bool {
        self.error_recovery_mode
    }

    fn report_match(&mut self) {
        self.error_recovery_mode = false;
    }
}

impl DefaultErrorStrategy {
    pub fn new() -> Self {
        DefaultErrorStrategy { error_recovery_mode: false, last_error_index: -1 }
    }
}
