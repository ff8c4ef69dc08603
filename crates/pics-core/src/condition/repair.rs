//! Structural repair of hand-authored condition text.
//!
//! The catalogs drop closing parentheses before `THEN`, glue operators to the next
//! parenthesis (`AND(`) and carry stray line breaks. Repair is heuristic: it only
//! ever adds `)` to the antecedent, never removes characters that carry meaning.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref GLUED_OPERATOR: Regex = Regex::new(r"(?i)\b(AND|OR|NOT)\(").unwrap();
    static ref THEN_KEYWORD: Regex = Regex::new(r"(?i)\bTHEN\b").unwrap();
}

/// Count `(` that are never closed, scanning left to right.
pub(crate) fn unmatched_open_parens(text: &str) -> usize {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

/// Repair `text` into the shape the IF/THEN/ELSE grammar expects.
///
/// The result is also the fallback cache key, so repair must be deterministic.
pub fn repair(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_end_matches(['.', ';']).trim_end();
    let spaced = GLUED_OPERATOR.replace_all(trimmed, "$1 (");

    let Some(then_at) = THEN_KEYWORD.find(&spaced).map(|m| m.start()) else {
        return spaced.into_owned();
    };

    let antecedent = spaced[..then_at].trim_end();
    let missing = unmatched_open_parens(antecedent);
    if missing == 0 {
        return spaced.into_owned();
    }

    let mut out = String::with_capacity(spaced.len() + missing + 1);
    out.push_str(antecedent);
    out.extend(std::iter::repeat(')').take(missing));
    out.push(' ');
    out.push_str(&spaced[then_at..]);
    out
}
