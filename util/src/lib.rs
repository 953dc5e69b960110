//! Shared building blocks for the grading workspace: the grading data model,
//! language conventions, configuration and storage paths.

pub mod config;
pub mod execution_config;
pub mod grading;
pub mod languages;
pub mod paths;
pub mod test_helpers;
