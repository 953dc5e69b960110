use crate::comparators::{ContainmentComparator, ExactComparator, NumericComparator};
use crate::traits::comparator::OutputComparator;

/// Runs its stages in order and accepts on the first one that does.
///
/// The default chain is exact, then numeric, then containment.
pub struct StagedComparator {
    stages: Vec<Box<dyn OutputComparator>>,
}

impl Default for StagedComparator {
    fn default() -> Self {
        Self {
            stages: vec![
                Box::new(ExactComparator),
                Box::new(NumericComparator),
                Box::new(ContainmentComparator),
            ],
        }
    }
}

impl StagedComparator {
    pub fn new(stages: Vec<Box<dyn OutputComparator>>) -> Self {
        Self { stages }
    }
}

impl OutputComparator for StagedComparator {
    fn equivalent(&self, actual: &str, expected: &str) -> bool {
        self.stages.iter().any(|s| s.equivalent(actual, expected))
    }
}
