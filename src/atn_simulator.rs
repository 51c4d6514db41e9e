//! Shared plumbing between ATN simulators (the parser-side one is the only
//! one this crate implements in full; a lexer-side simulator would share
//! this trait but lexing is out of scope per SPEC_FULL.md sec 1).

use crate::atn::ATN;
use crate::dfa::DFACache;
use std::sync::Arc;

/// Named by the teacher's `recognizer.rs` as `ATNInterpreter = dyn
/// IATNSimulator`. Both a parser and a lexer simulator share an ATN and a
/// DFA cache and must be resettable between parses.
pub trait IATNSimulator {
    fn atn(&self) -> &Arc<ATN>;
    fn dfa_cache(&self) -> &Arc<DFACache>;

    /// Drops all cached DFA states, forcing every decision to be
    /// recomputed from the ATN on the next prediction. Used by profiling
    /// harnesses that want a cold cache for each measurement pass.
    fn reset(&self) {
        self.dfa_cache().clear();
    }
}
