//! Normalized equality: both sides trimmed and lower-cased.

use crate::traits::comparator::{OutputComparator, normalize};

pub struct ExactComparator;

impl OutputComparator for ExactComparator {
    fn equivalent(&self, actual: &str, expected: &str) -> bool {
        normalize(actual) == normalize(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_case_and_surrounding_whitespace() {
        assert!(ExactComparator.equivalent("  YES\n", "yes"));
        assert!(!ExactComparator.equivalent("yes please", "yes"));
    }
}
