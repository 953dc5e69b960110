//! Numeric-token comparison.
//!
//! Numbers are extracted from both sides with the same pattern and compared
//! as an ordered list of strings: `"5.0"` and `"5"` are different tokens.
//! Expected output without any number gives this comparator nothing to check.

use crate::traits::comparator::{OutputComparator, normalize};
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").unwrap());

pub fn numeric_tokens(text: &str) -> Vec<String> {
    NUMBER
        .find_iter(&normalize(text))
        .map(|m| m.as_str().to_string())
        .collect()
}

pub struct NumericComparator;

impl OutputComparator for NumericComparator {
    fn equivalent(&self, actual: &str, expected: &str) -> bool {
        let want = numeric_tokens(expected);
        !want.is_empty() && numeric_tokens(actual) == want
    }
}
