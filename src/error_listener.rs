//! Observer hook for recognition errors and (informational) ambiguity /
//! context-sensitivity reports raised during prediction.

use crate::atn_config_set::ATNConfigSet;
use crate::errors::ANTLRError;

pub trait ErrorListener<'input>: Send + Sync {
    fn syntax_error(
        &self,
        offending_token_index: isize,
        line: isize,
        column: isize,
        msg: &str,
        error: Option<&ANTLRError>,
    );

    /// Raised when SLL prediction conflicted and full-LL confirmed more
    /// than one viable alternative (a genuine grammar ambiguity).
    fn report_ambiguity(
        &self,
        decision: usize,
        start_index: isize,
        stop_index: isize,
        exact: bool,
        ambig_alts: &[usize],
        configs: &ATNConfigSet,
    ) {
        let _ = (decision, start_index, stop_index, exact, ambig_alts, configs);
    }

    /// Raised whenever SLL fell back to full-LL, whether or not the
    /// fallback ultimately surfaced an ambiguity.
    fn report_context_sensitivity(
        &self,
        decision: usize,
        start_index: isize,
        stop_index: isize,
        prediction: usize,
        configs: &ATNConfigSet,
    ) {
        let _ = (decision, start_index, stop_index, prediction, configs);
    }

    fn report_attempting_full_context(
        &self,
        decision: usize,
        start_index: isize,
        stop_index: isize,
        configs: &ATNConfigSet,
    ) {
        let _ = (decision, start_index, stop_index, configs);
    }
}

/// Forwards every syntax error and conflict report to `tracing`, matching
/// the ambient logging story described in SPEC_FULL.md sec 1.1. This is the
/// listener a `Recognizer` is constructed with unless the caller installs
/// their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorListener;

impl<'input> ErrorListener<'input> for TracingErrorListener {
    fn syntax_error(
        &self,
        offending_token_index: isize,
        line: isize,
        column: isize,
        msg: &str,
        error: Option<&ANTLRError>,
    ) {
        tracing::warn!(
            offending_token_index,
            line,
            column,
            error = ?error,
            "{msg}"
        );
    }

    fn report_ambiguity(
        &self,
        decision: usize,
        start_index: isize,
        stop_index: isize,
        exact: bool,
        ambig_alts: &[usize],
        _configs: &ATNConfigSet,
    ) {
        tracing::warn!(decision, start_index, stop_index, exact, ?ambig_alts, "ambiguity detected");
    }

    fn report_context_sensitivity(
        &self,
        decision: usize,
        start_index: isize,
        stop_index: isize,
        prediction: usize,
        _configs: &ATNConfigSet,
    ) {
        tracing::debug!(decision, start_index, stop_index, prediction, "context sensitivity (SLL->LL fallback)");
    }
}
