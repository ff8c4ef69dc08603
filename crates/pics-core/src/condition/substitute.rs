//! Capability-id extraction and whole-token substitution.

use crate::pics::{is_capability_id, CAPABILITY_ID};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref AND_KEYWORD: Regex = Regex::new(r"(?i)\bAND\b").unwrap();
    static ref OR_KEYWORD: Regex = Regex::new(r"(?i)\bOR\b").unwrap();
    static ref NOT_KEYWORD: Regex = Regex::new(r"(?i)\bNOT\b").unwrap();
}

/// All capability ids referenced in `text` plus any `extra` ids, de-duplicated and
/// ordered longest first so a shorter id is never substituted inside a longer one.
pub fn extract_references(text: &str, extra: &[String]) -> Vec<String> {
    let mut refs: BTreeSet<String> = CAPABILITY_ID
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    refs.extend(
        extra
            .iter()
            .map(|r| r.trim())
            .filter(|r| is_capability_id(r))
            .map(str::to_string),
    );

    let mut refs: Vec<String> = refs.into_iter().collect();
    refs.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    refs
}

fn extends_id_before(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn extends_id_after(c: char, following: Option<char>) -> bool {
    if c.is_ascii_alphanumeric() || c == '_' {
        return true;
    }
    matches!(c, '.' | '-' | '/') && following.is_some_and(|f| f.is_ascii_digit())
}

/// Replace every whole-token occurrence of `token` in `haystack`.
///
/// An occurrence is skipped when a neighbouring character would make it part of a
/// longer identifier (`A.1` inside `A.1.2`, `A.4` inside `A.4/1`).
pub fn replace_whole_token(haystack: &str, token: &str, replacement: &str) -> String {
    if token.is_empty() {
        return haystack.to_string();
    }

    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for (start, _) in haystack.match_indices(token) {
        if start < last {
            continue;
        }
        let end = start + token.len();
        let before = haystack[..start].chars().next_back();
        let mut after_iter = haystack[end..].chars();
        let after = after_iter.next();
        let following = after_iter.next();

        let bounded_before = before.map_or(true, |c| !extends_id_before(c));
        let bounded_after = after.map_or(true, |c| !extends_id_after(c, following));
        if bounded_before && bounded_after {
            out.push_str(&haystack[last..start]);
            out.push_str(replacement);
            last = end;
        }
    }
    out.push_str(&haystack[last..]);
    out
}

/// Rewrite AND/OR/NOT keywords into the sandbox operators.
pub fn translate_operators(text: &str) -> String {
    let text = AND_KEYWORD.replace_all(text, "&&");
    let text = OR_KEYWORD.replace_all(&text, "||");
    let text = NOT_KEYWORD.replace_all(&text, "!");
    text.into_owned()
}

/// Pad parentheses on whichever side is short. Returns the text and whether it changed.
pub fn balance_parentheses(text: &str) -> (String, bool) {
    let opens = text.matches('(').count();
    let closes = text.matches(')').count();
    if opens > closes {
        let mut out = text.to_string();
        out.extend(std::iter::repeat(')').take(opens - closes));
        (out, true)
    } else if closes > opens {
        let mut out = "(".repeat(closes - opens);
        out.push_str(text);
        (out, true)
    } else {
        (text.to_string(), false)
    }
}
