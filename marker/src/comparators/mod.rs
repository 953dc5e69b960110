//! # Comparators
//!
//! Output comparison strategies implementing [`OutputComparator`](crate::traits::comparator::OutputComparator).
//!
//! - [`exact_comparator`]: normalized string equality.
//! - [`numeric_comparator`]: ordered numeric tokens must match.
//! - [`containment_comparator`]: expected text appears inside the actual output.
//! - [`staged_comparator`]: runs the above in order, most precise first.

pub mod containment_comparator;
pub mod exact_comparator;
pub mod numeric_comparator;
pub mod staged_comparator;

pub use containment_comparator::ContainmentComparator;
pub use exact_comparator::ExactComparator;
pub use numeric_comparator::NumericComparator;
pub use staged_comparator::StagedComparator;
