//! Phrase finder searches text files with boolean formulas over up to six phrases.
//!
//! This crate provides the library interface behind the `finder` binary: the
//! formula engine (normalization, validation, evaluation) and the cancellable
//! search run, enabling integration with other tools and testing.

pub mod config;
pub mod formula;
pub mod models;
pub mod search;

// Re-export commonly used types for convenience
pub use formula::{CompiledFormula, EvaluationError, ValidationResult};
pub use models::{MatchResult, Phrase, PhraseId, PhraseSet, SearchMode};
pub use search::{run_search, spawn_search, CancellationToken, SearchOptions};
