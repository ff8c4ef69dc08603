//! D-/E-selection codes carried in test case comments.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref D_SELECTION: Regex = Regex::new(r"\bD\d+\b").unwrap();
    static ref E_SELECTION: Regex = Regex::new(r"\bE\d+\b").unwrap();
}

fn collect(re: &Regex, comment: &str) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for m in re.find_iter(comment) {
        if !codes.iter().any(|c| c == m.as_str()) {
            codes.push(m.as_str().to_string());
        }
    }
    codes
}

/// `D<n>` codes in order of first appearance.
pub fn d_selections(comment: &str) -> Vec<String> {
    collect(&D_SELECTION, comment)
}

/// `E<n>` codes in order of first appearance.
pub fn e_selections(comment: &str) -> Vec<String> {
    collect(&E_SELECTION, comment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ordered_unique_codes() {
        let comment = "Run with D3, D1 and D3 again; E12/E2. Not DX1 or AD5 or D4a.";
        assert_eq!(d_selections(comment), vec!["D3", "D1"]);
        assert_eq!(e_selections(comment), vec!["E12", "E2"]);
    }

    #[test]
    fn empty_comment_has_no_codes() {
        assert!(d_selections("").is_empty());
        assert!(e_selections("no codes here").is_empty());
    }
}
