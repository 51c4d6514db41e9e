//! An ANTLR-style ATN simulator, prediction-context/config-set algebra, and
//! interpreter runtime (SPEC_FULL.md sec 2). Grounded on the teacher's own
//! `lib.rs`: a flat module tree with a single re-export surface, so
//! generated-parser code (and this crate's own tests) reach everything as
//! `antlr_rust::Thing` rather than reaching into submodules directly.

pub mod atn;
pub mod atn_config;
pub mod atn_config_set;
pub mod atn_deserializer;
pub mod atn_simulator;
pub mod config;
pub mod dfa;
pub mod error_listener;
pub mod error_strategy;
pub mod errors;
pub mod int_stream;
pub mod interval_set;
pub mod parser_atn_simulator;
pub mod parser_interpreter;
pub mod prediction_context;
pub mod prediction_mode;
pub mod recognizer;
pub mod rule_context;
pub mod semantic_context;
pub mod token;
pub mod token_factory;
pub mod token_stream;
pub mod tree;
pub mod vocabulary;

pub use atn::{ATN, ATNKind, ATNState, ATNStateType, Transition, TransitionKind, INVALID_ALT, INVALID_STATE_NUMBER};
pub use atn_config::{ATNConfig, ConfigKey};
pub use atn_config_set::ATNConfigSet;
pub use atn_deserializer::ATNDeserializer;
pub use atn_simulator::IATNSimulator;
pub use config::{DecisionOverride, PredictionConfig};
pub use dfa::{DFACache, DFAState, DfaStateId, DFA};
pub use error_listener::{ErrorListener, TracingErrorListener};
pub use error_strategy::{DefaultErrorStrategy, ErrorStrategy};
pub use errors::{ANTLRError, ATNError, NoViableAltDetail};
pub use int_stream::{InputMark, IntStream, EOF, EPSILON, INVALID_TYPE, MIN_USER_TOKEN_TYPE};
pub use interval_set::{Interval, IntervalSet};
pub use parser_atn_simulator::ParserATNSimulator;
pub use parser_interpreter::ParserInterpreter;
pub use prediction_context::{MergeCache, PredictionContext, EMPTY_RETURN_STATE};
pub use prediction_mode::PredictionMode;
pub use recognizer::{check_version, DecisionInfo, ParseInfo, ProfilingData, Recognizer, RecognizerImpl, ATNInterpreter, VERSION_MAJOR, VERSION_MINOR};
pub use rule_context::{RuleContext, NO_INVOKING_STATE};
pub use semantic_context::{PredicateEvaluator, SemanticContext};
pub use token::{CommonToken, Token, TOKEN_DEFAULT_CHANNEL, TOKEN_EOF, TOKEN_EPSILON, TOKEN_HIDDEN_CHANNEL, TOKEN_INVALID_TYPE, TOKEN_MIN_USER_TOKEN_TYPE};
pub use token_factory::{CommonTokenFactory, TokenAware, TokenFactory};
pub use token_stream::{TokenStream, VecTokenStream};
pub use tree::{InterpreterRuleContext, ParseTreeNode, ParserRuleContext, RuleNode};
pub use vocabulary::{Vocabulary, VocabularyImpl};
