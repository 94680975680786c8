use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::formula::errors::EvaluationError;
use crate::formula::lexer::{self, Bracket, Token};
use crate::formula::normalize::{canonical_text, normalize};
use crate::formula::parser::parse_tokens;
use crate::models::{PhraseId, PhraseSet};

/// Characters allowed once a formula is normalized, uppercased and stripped
/// of whitespace: the phrase letters, the letters that spell the operator
/// keywords, and the three bracket kinds.
const VALID_CHARS: &str = "ABCDEF()[]{}NORTX";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// Bracket mismatch, invalid character, empty grouping.
    Syntax,
    /// Missing operand or consecutive operators.
    Structural,
    /// Tautology, contradiction or a reference to an unset phrase.
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    fn syntax(message: impl Into<String>) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Syntax,
            message: message.into(),
        }
    }

    fn structural(message: impl Into<String>) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Structural,
            message: message.into(),
        }
    }

    fn semantic(message: impl Into<String>) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Semantic,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of [`validate`]. `is_valid` is true iff `errors` is empty;
/// warnings never affect validity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationResult {
    fn from_findings(errors: Vec<Diagnostic>, warnings: Vec<Diagnostic>) -> Self {
        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|d| d.message.clone()).collect()
    }
}

/// Checks a formula against the current phrase definitions.
///
/// Never fails: every problem is returned as data. Bracket balance, token
/// validity, structure and empty groupings produce errors; contradictions,
/// tautologies and references to unset phrases produce warnings.
pub fn validate(formula: &str, phrases: &PhraseSet) -> ValidationResult {
    if formula.trim().is_empty() {
        return ValidationResult::from_findings(vec![], vec![]);
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    errors.extend(check_brackets(formula));

    let (tokens, token_errors) = check_tokens(formula);
    errors.extend(token_errors);

    errors.extend(check_structure(&tokens));
    errors.extend(check_nesting(&tokens));
    errors.extend(check_empty_groups(formula));

    warnings.extend(check_paradoxes(formula));
    warnings.extend(check_unset_phrases(&tokens, phrases));

    ValidationResult::from_findings(errors, warnings)
}

/// Stack-based bracket balance with 1-based character positions.
fn check_brackets(formula: &str) -> Vec<Diagnostic> {
    let mut errors = Vec::new();
    let mut stack: Vec<(Bracket, usize)> = Vec::new();

    for (i, ch) in formula.chars().enumerate() {
        let position = i + 1;
        if let Some(open) = Bracket::from_open(ch) {
            stack.push((open, position));
        } else if let Some(close) = Bracket::from_close(ch) {
            match stack.pop() {
                None => errors.push(Diagnostic::syntax(format!(
                    "Unmatched closing '{ch}' at position {position}"
                ))),
                Some((open, open_pos)) if open != close => {
                    errors.push(Diagnostic::syntax(format!(
                        "Mismatched brackets: '{}' at position {} closed by '{}' at position {}",
                        open.open_char(),
                        open_pos,
                        ch,
                        position
                    )))
                }
                Some(_) => {}
            }
        }
    }

    for (open, position) in stack {
        errors.push(Diagnostic::syntax(format!(
            "Unclosed '{}' at position {position}",
            open.open_char()
        )));
    }

    errors
}

/// Character-set check, then token extraction. Tokens that could be read
/// are returned alongside any errors so the structure is still checked.
fn check_tokens(formula: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let upper = normalize(formula).to_uppercase();

    let invalid: BTreeSet<char> = upper
        .chars()
        .filter(|c| !c.is_whitespace() && !VALID_CHARS.contains(*c))
        .collect();

    let mut errors = Vec::new();
    if !invalid.is_empty() {
        let listed: Vec<String> = invalid.iter().map(|c| c.to_string()).collect();
        errors.push(Diagnostic::syntax(format!(
            "Invalid characters found: {}",
            listed.join(", ")
        )));
    }

    let scanned = lexer::scan_formula(formula);
    if scanned.tokens.is_empty() {
        errors.push(Diagnostic::syntax("No valid tokens found in formula"));
        return (Vec::new(), errors);
    }

    // Valid letters that do not spell a keyword, e.g. the `N` in `A N B`.
    // Positions are in the formula as typed.
    if invalid.is_empty() {
        for gap in &scanned.unrecognized {
            errors.push(Diagnostic::syntax(format!(
                "Unrecognized text '{}' at position {}",
                gap.fragment, gap.position
            )));
        }
    }

    (scanned.tokens, errors)
}

/// Operand checks over the token sequence; positions are 1-based token indices.
fn check_structure(tokens: &[Token]) -> Vec<Diagnostic> {
    let mut errors = Vec::new();
    let last = tokens.len().saturating_sub(1);

    for (i, token) in tokens.iter().enumerate() {
        let index = i + 1;
        let prev = i.checked_sub(1).map(|p| tokens[p]);
        let next = tokens.get(i + 1).copied();

        if token.is_binary() {
            if i == 0 {
                errors.push(Diagnostic::structural(format!(
                    "'{token}' at token {index} needs a left operand"
                )));
            } else if i == last {
                errors.push(Diagnostic::structural(format!(
                    "'{token}' at token {index} needs a right operand"
                )));
            } else {
                if matches!(prev, Some(p) if p.is_binary() || matches!(p, Token::Not | Token::Open(_)))
                {
                    errors.push(Diagnostic::structural(format!(
                        "'{token}' at token {index} is missing a valid left operand"
                    )));
                }
                if matches!(next, Some(n) if n.is_binary() || matches!(n, Token::Close(_))) {
                    errors.push(Diagnostic::structural(format!(
                        "'{token}' at token {index} is missing a valid right operand"
                    )));
                }
            }
        } else if *token == Token::Not {
            match next {
                None => errors.push(Diagnostic::structural(format!(
                    "'NOT' at token {index} needs an operand"
                ))),
                Some(n) if n.is_binary() || matches!(n, Token::Close(_)) => {
                    errors.push(Diagnostic::structural(format!(
                        "'NOT' at token {index} is missing a valid operand"
                    )))
                }
                Some(_) => {}
            }
        } else if matches!(token, Token::Var(_) | Token::Close(_)) {
            if let Some(n @ (Token::Var(_) | Token::Open(_) | Token::Not)) = next {
                errors.push(Diagnostic::structural(format!(
                    "Missing operator between '{token}' and '{n}' at token {}",
                    index + 1
                )));
            }
        }
    }

    errors
}

/// Nesting beyond what the parser accepts. Other parse failures are already
/// covered by the token and structure checks.
fn check_nesting(tokens: &[Token]) -> Option<Diagnostic> {
    match parse_tokens(tokens) {
        Err(err @ EvaluationError::TooDeep { .. }) => {
            Some(Diagnostic::structural(err.to_string()))
        }
        _ => None,
    }
}

/// `()`, `[]` and `{}` with nothing but whitespace inside.
fn check_empty_groups(formula: &str) -> Vec<Diagnostic> {
    let chars: Vec<char> = formula.chars().collect();
    let mut errors = Vec::new();

    for (i, ch) in chars.iter().enumerate() {
        let Some(open) = Bracket::from_open(*ch) else {
            continue;
        };
        let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
        if next == Some(&open.close_char()) {
            errors.push(Diagnostic::syntax(format!(
                "Empty grouping '{}{}' at position {} must contain an expression",
                open.open_char(),
                open.close_char(),
                i + 1
            )));
        }
    }

    errors
}

/// Literal scans for `X AND NOT X` and `X OR NOT X` shapes.
fn check_paradoxes(formula: &str) -> Vec<Diagnostic> {
    let text = canonical_text(formula);
    let mut warnings = Vec::new();

    for id in PhraseId::ALL {
        let contradiction = [format!("{id} AND NOT {id}"), format!("NOT {id} AND {id}")];
        if contradiction.iter().any(|p| text.contains(p.as_str())) {
            warnings.push(Diagnostic::semantic(format!(
                "Logical contradiction: '{id} AND NOT {id}' is always false"
            )));
        }
    }

    for id in PhraseId::ALL {
        let tautology = [format!("{id} OR NOT {id}"), format!("NOT {id} OR {id}")];
        if tautology.iter().any(|p| text.contains(p.as_str())) {
            warnings.push(Diagnostic::semantic(format!(
                "Tautology: '{id} OR NOT {id}' is always true"
            )));
        }
    }

    warnings
}

fn check_unset_phrases(tokens: &[Token], phrases: &PhraseSet) -> Vec<Diagnostic> {
    let unset: BTreeSet<PhraseId> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Var(id) if !phrases.get(*id).is_set() => Some(*id),
            _ => None,
        })
        .collect();

    if unset.is_empty() {
        return Vec::new();
    }

    let listed: Vec<String> = unset.iter().map(|id| id.to_string()).collect();
    let noun = if unset.len() == 1 { "Phrase" } else { "Phrases" };
    let (verb, has) = if unset.len() == 1 {
        ("is", "has")
    } else {
        ("are", "have")
    };
    vec![Diagnostic::semantic(format!(
        "{noun} {} {verb} used in the formula but {has} no search text",
        listed.join(", ")
    ))]
}
