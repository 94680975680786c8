// Error type for formula evaluation

/// A formula that could not be turned into an expression tree.
///
/// Returned by [`crate::formula::evaluate`] and
/// [`crate::formula::CompiledFormula::compile`]. Kept distinct from a
/// legitimate `false` result so callers can surface it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("Unrecognized input '{fragment}' at position {position}")]
    UnrecognizedInput { fragment: String, position: usize },

    #[error("Unexpected '{token}' at token {index}")]
    UnexpectedToken { token: String, index: usize },

    #[error("Unexpected end of formula")]
    UnexpectedEnd,

    #[error("'{open}' closed by '{close}' at token {index}")]
    MismatchedBracket { open: char, close: char, index: usize },

    #[error("Formula nests deeper than {limit} levels")]
    TooDeep { limit: usize },
}
