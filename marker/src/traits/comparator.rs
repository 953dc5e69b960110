/// OutputComparator is a strategy trait for deciding whether a program's
/// output answers a test case.
///
/// Implementations only ever *accept*; a `false` means "this strategy has no
/// evidence of a match", which lets strategies be chained.
pub trait OutputComparator: Send + Sync {
    fn equivalent(&self, actual: &str, expected: &str) -> bool;
}

/// Trimmed and lower-cased.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
