//! Boolean phrase formulas.
//!
//! A formula combines the phrase slots `A`..`F` with `NOT`, `AND`, `OR`,
//! `NOR`, `XOR` and `XNOR` (case-insensitive), grouped by `()`, `[]` or `{}`.
//! Symbolic aliases `&`/`&&`, `|`/`||`, `!`/`~` and `^` are rewritten by
//! [`normalize`] before anything else looks at the text.
//!
//! Precedence, tightest first: `NOT`, then `AND`, then `OR`/`NOR`/`XOR`/`XNOR`
//! which share a level and associate left. So `A OR B AND C` reads as
//! `A OR (B AND C)` and `A XOR B OR C` as `(A XOR B) OR C`.

pub mod errors;
pub mod expr;
pub mod lexer;
mod normalize;
pub mod parser;
pub mod validate;

pub use errors::EvaluationError;
pub use expr::Expr;
pub use normalize::normalize;
pub use parser::CompiledFormula;
pub use validate::{validate, Diagnostic, DiagnosticKind, ValidationResult};

use crate::models::PhraseSet;

/// Evaluates `formula` against one content unit.
///
/// An empty or whitespace-only formula is `Ok(false)`. A formula that cannot
/// be parsed is an [`EvaluationError`], never a silent `false`.
pub fn evaluate(
    formula: &str,
    phrases: &PhraseSet,
    content: &str,
) -> Result<bool, EvaluationError> {
    Ok(CompiledFormula::compile(formula)?.evaluate(phrases, content))
}

/// Formula used when the user supplies none: every set phrase joined by `AND`.
pub fn auto_formula(phrases: &PhraseSet) -> String {
    phrases
        .active_ids()
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" AND ")
}
