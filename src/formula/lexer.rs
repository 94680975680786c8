use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::formula::errors::EvaluationError;
use crate::formula::normalize::normalize_upper_with_positions;
use crate::models::PhraseId;

// Keywords are listed longest-first so `XNOR` wins over `NOR`/`OR`.
// Keywords also come before single letters so `AND` is not read as `A`.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"XNOR|NOR|XOR|AND|OR|NOT|[A-F]|[()\[\]{}]").expect("static token pattern")
});

/// Grouping bracket kinds. All three group the same way but must close with
/// their own kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    Round,
    Square,
    Curly,
}

impl Bracket {
    pub fn from_open(c: char) -> Option<Self> {
        match c {
            '(' => Some(Bracket::Round),
            '[' => Some(Bracket::Square),
            '{' => Some(Bracket::Curly),
            _ => None,
        }
    }

    pub fn from_close(c: char) -> Option<Self> {
        match c {
            ')' => Some(Bracket::Round),
            ']' => Some(Bracket::Square),
            '}' => Some(Bracket::Curly),
            _ => None,
        }
    }

    pub fn open_char(self) -> char {
        match self {
            Bracket::Round => '(',
            Bracket::Square => '[',
            Bracket::Curly => '{',
        }
    }

    pub fn close_char(self) -> char {
        match self {
            Bracket::Round => ')',
            Bracket::Square => ']',
            Bracket::Curly => '}',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Var(PhraseId),
    Not,
    And,
    Or,
    Nor,
    Xor,
    Xnor,
    Open(Bracket),
    Close(Bracket),
}

impl Token {
    fn from_match(text: &str) -> Option<Self> {
        let token = match text {
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            "NOR" => Token::Nor,
            "XOR" => Token::Xor,
            "XNOR" => Token::Xnor,
            _ => {
                let c = text.chars().next()?;
                if let Some(id) = PhraseId::from_char(c) {
                    Token::Var(id)
                } else if let Some(b) = Bracket::from_open(c) {
                    Token::Open(b)
                } else {
                    Token::Close(Bracket::from_close(c)?)
                }
            }
        };
        Some(token)
    }

    /// AND, OR, NOR, XOR and XNOR.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            Token::And | Token::Or | Token::Nor | Token::Xor | Token::Xnor
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Var(id) => write!(f, "{id}"),
            Token::Not => write!(f, "NOT"),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Nor => write!(f, "NOR"),
            Token::Xor => write!(f, "XOR"),
            Token::Xnor => write!(f, "XNOR"),
            Token::Open(b) => write!(f, "{}", b.open_char()),
            Token::Close(b) => write!(f, "{}", b.close_char()),
        }
    }
}

/// A run of non-whitespace text the token pattern could not consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unrecognized {
    pub fragment: String,
    // 1-based character position in the scanned text
    pub position: usize,
}

/// Result of a lenient scan: every token the pattern found plus the gaps it
/// had to skip.
#[derive(Debug, Default)]
pub struct Scan {
    pub tokens: Vec<Token>,
    pub unrecognized: Vec<Unrecognized>,
}

/// Lenient token extraction over already-normalized, uppercased text.
pub fn scan(upper: &str) -> Scan {
    let mut out = Scan::default();
    let mut last_end = 0;

    for m in TOKEN_RE.find_iter(upper) {
        record_gap(upper, last_end, m.start(), &mut out.unrecognized);
        if let Some(token) = Token::from_match(m.as_str()) {
            out.tokens.push(token);
        }
        last_end = m.end();
    }
    record_gap(upper, last_end, upper.len(), &mut out.unrecognized);

    out
}

fn record_gap(text: &str, start: usize, end: usize, gaps: &mut Vec<Unrecognized>) {
    let gap = &text[start..end];
    let trimmed = gap.trim_start();
    if trimmed.trim_end().is_empty() {
        return;
    }
    let offset = start + (gap.len() - trimmed.len());
    gaps.push(Unrecognized {
        fragment: trimmed.trim_end().to_string(),
        position: text[..offset].chars().count() + 1,
    });
}

/// Lenient scan of a raw formula. Gap positions refer to the formula as
/// written, not to its normalized form.
pub fn scan_formula(formula: &str) -> Scan {
    let (upper, positions) = normalize_upper_with_positions(formula);
    let mut scanned = scan(&upper);
    for gap in &mut scanned.unrecognized {
        if let Some(&raw) = positions.get(gap.position - 1) {
            gap.position = raw;
        }
    }
    scanned
}

/// Strict tokenization used by the parser: any unrecognized text is an error.
pub fn tokenize(formula: &str) -> Result<Vec<Token>, EvaluationError> {
    let scanned = scan_formula(formula);

    if let Some(first) = scanned.unrecognized.into_iter().next() {
        return Err(EvaluationError::UnrecognizedInput {
            fragment: first.fragment,
            position: first.position,
        });
    }
    Ok(scanned.tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_and_letters() {
        let tokens = tokenize("A and not B xnor c").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Var(PhraseId::A),
                Token::And,
                Token::Not,
                Token::Var(PhraseId::B),
                Token::Xnor,
                Token::Var(PhraseId::C),
            ]
        );
    }

    #[test]
    fn test_unspaced_keywords() {
        // `AANDB` is A, AND, B rather than A, A, N, D, B
        let tokens = tokenize("AANDB").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Var(PhraseId::A), Token::And, Token::Var(PhraseId::B)]
        );
    }

    #[test]
    fn test_nor_versus_not() {
        assert_eq!(tokenize("A NOR B").unwrap()[1], Token::Nor);
        assert_eq!(tokenize("NOT B").unwrap()[0], Token::Not);
    }

    #[test]
    fn test_brackets() {
        let tokens = tokenize("[{(A)}]").unwrap();
        assert_eq!(tokens.len(), 7);
        assert_eq!(tokens[0], Token::Open(Bracket::Square));
        assert_eq!(tokens[6], Token::Close(Bracket::Square));
    }

    #[test]
    fn test_symbols_are_normalized() {
        let tokens = tokenize("A&!B").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Var(PhraseId::A),
                Token::And,
                Token::Not,
                Token::Var(PhraseId::B)
            ]
        );
    }

    #[test]
    fn test_unrecognized_input_is_error() {
        let err = tokenize("A AND G").unwrap_err();
        assert_eq!(
            err,
            EvaluationError::UnrecognizedInput {
                fragment: "G".to_string(),
                position: 7
            }
        );
    }

    #[test]
    fn test_gap_positions_follow_raw_formula() {
        let scanned = scan_formula("A&N B");
        assert_eq!(scanned.unrecognized[0].fragment, "N");
        assert_eq!(scanned.unrecognized[0].position, 3);

        let err = tokenize("~A || g").unwrap_err();
        assert_eq!(
            err,
            EvaluationError::UnrecognizedInput {
                fragment: "G".to_string(),
                position: 7
            }
        );
    }

    #[test]
    fn test_scan_reports_gaps() {
        let scanned = scan("A N B");
        assert_eq!(scanned.tokens.len(), 2);
        assert_eq!(scanned.unrecognized.len(), 1);
        assert_eq!(scanned.unrecognized[0].fragment, "N");
        assert_eq!(scanned.unrecognized[0].position, 3);
    }
}
