//!
//! Traits Module
//!
//! Extension points of the grading pipeline.
//!
//! - [`comparator`]: strategies for comparing program output with expected output.

pub mod comparator;
