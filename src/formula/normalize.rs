/// Symbolic operators and their word forms, longest symbol first so `&&`
/// is never split into two `&` replacements.
const SYMBOL_OPERATORS: [(&str, &str); 7] = [
    ("&&", "AND"),
    ("||", "OR"),
    ("&", "AND"),
    ("|", "OR"),
    ("!", "NOT"),
    ("~", "NOT"),
    ("^", "XOR"),
];

/// Rewrites symbolic operators into their word equivalents.
///
/// Each replacement is padded with single spaces so `A&B` becomes
/// `A AND B`. The output never contains a symbolic operator, which makes the
/// function idempotent. Case and all other characters are left untouched.
pub fn normalize(formula: &str) -> String {
    let mut out = String::with_capacity(formula.len() + 8);
    rewrite(formula, |ch, _| out.push(ch));
    out
}

/// Uppercased [`normalize`] output paired with, for every output character,
/// the 1-based position in `formula` it came from. Padding and keyword
/// letters map to the position of the symbol they replaced.
pub(crate) fn normalize_upper_with_positions(formula: &str) -> (String, Vec<usize>) {
    let mut text = String::with_capacity(formula.len() + 8);
    let mut positions = Vec::with_capacity(formula.len() + 8);
    rewrite(formula, |ch, position| {
        for upper in ch.to_uppercase() {
            text.push(upper);
            positions.push(position);
        }
    });
    (text, positions)
}

fn rewrite(formula: &str, mut emit: impl FnMut(char, usize)) {
    let mut rest = formula;
    let mut position = 1;

    'outer: while let Some(ch) = rest.chars().next() {
        for (symbol, word) in SYMBOL_OPERATORS {
            if let Some(tail) = rest.strip_prefix(symbol) {
                emit(' ', position);
                word.chars().for_each(|c| emit(c, position));
                emit(' ', position);
                position += symbol.chars().count();
                rest = tail;
                continue 'outer;
            }
        }
        emit(ch, position);
        position += 1;
        rest = &rest[ch.len_utf8()..];
    }
}

/// Normalized, uppercased form with whitespace runs collapsed to one space.
/// Used by the literal contradiction/tautology scans.
pub(crate) fn canonical_text(formula: &str) -> String {
    normalize(formula)
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
