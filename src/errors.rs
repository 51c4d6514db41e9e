//! Recognition errors (recoverable) and ATN errors (fatal/programmer
//! error), per SPEC_FULL.md sec 7.

use crate::atn_config_set::ATNConfigSet;
use thiserror::Error;

/// Recoverable recognition errors. These always carry enough to build a
/// diagnostic: offending token, rule index, and (where meaningful) the
/// configuration set prediction failed over.
#[derive(Debug, Error, Clone)]
pub enum ANTLRError {
    #[error("mismatched input at token {offending_token_index}: expected one of {expected}")]
    InputMismatch {
        offending_token_index: isize,
        rule_index: isize,
        expected: String,
    },

    #[error("no viable alternative at input (rule {rule_index}, decision over {num_configs} configs)")]
    NoViableAlt {
        offending_token_index: isize,
        rule_index: isize,
        num_configs: usize,
        #[source]
        configs: Box<NoViableAltDetail>,
    },

    #[error("rule {rule_index} predicate {predicate_index} failed: {}", message.as_deref().unwrap_or("<no message>"))]
    FailedPredicate {
        rule_index: isize,
        predicate_index: isize,
        message: Option<String>,
    },

    #[error("lexer: no viable alternative at character position {char_position_in_line}")]
    LexerNoViableAlt { char_position_in_line: isize, line: isize },
}

/// Carries the configuration set a failed `NoViableAlt` prediction ended on,
/// kept out of the main enum so `ANTLRError` stays cheap to clone/pass
/// around in the common (no-error) path.
#[derive(Debug, Clone, Error)]
#[error("none of the configurations in the set were viable")]
pub struct NoViableAltDetail(pub ATNConfigSet);

impl ANTLRError {
    pub fn rule_index(&self) -> isize {
        match self {
            ANTLRError::InputMismatch { rule_index, .. } => *rule_index,
            ANTLRError::NoViableAlt { rule_index, .. } => *rule_index,
            ANTLRError::FailedPredicate { rule_index, .. } => *rule_index,
            ANTLRError::LexerNoViableAlt { .. } => -1,
        }
    }

    /// The token index recovery should resynchronize from, where the
    /// variant carries one; `None` for errors that aren't anchored to a
    /// single input position (`FailedPredicate`, lexer errors).
    pub fn offending_token_index(&self) -> Option<isize> {
        match self {
            ANTLRError::InputMismatch { offending_token_index, .. } => Some(*offending_token_index),
            ANTLRError::NoViableAlt { offending_token_index, .. } => Some(*offending_token_index),
            ANTLRError::FailedPredicate { .. } => None,
            ANTLRError::LexerNoViableAlt { .. } => None,
        }
    }
}

/// Fatal conditions: the ATN itself is inconsistent, a state type was used
/// where it cannot occur, or the DFA cache was observed in a state its own
/// invariants forbid. Never meant to be caught and recovered from by a
/// generated parser -- these indicate a bug upstream of this crate (a
/// corrupt serialized ATN, or a caller bypassing the simulator's own
/// bookkeeping).
#[derive(Debug, Error)]
pub enum ATNError {
    #[error("unrecognized serialized ATN version {0}")]
    UnsupportedSerializedVersion(i32),

    #[error("serialized ATN UUID {0} is not a supported version")]
    UnsupportedUuid(String),

    #[error("invalid state type {0} at state {1}")]
    InvalidStateType(u8, usize),

    #[error("decision state {0} has no alternatives")]
    DecisionWithNoAlts(usize),

    #[error("attempted to mutate a readonly ATNConfigSet")]
    ConfigSetFrozen,

    #[error("inconsistent ATN: {0}")]
    Inconsistent(String),
}
