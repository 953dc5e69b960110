//! Lenient containment: accepts when the normalized expected text occurs
//! inside the normalized actual output. Blank expected output is always
//! accepted since there is nothing to check against.

use crate::traits::comparator::{OutputComparator, normalize};

pub struct ContainmentComparator;

impl OutputComparator for ContainmentComparator {
    fn equivalent(&self, actual: &str, expected: &str) -> bool {
        let expected = normalize(expected);
        expected.is_empty() || normalize(actual).contains(&expected)
    }
}
