//! Persistence-facing services of the grader: content fingerprints,
//! the result store and cross-student duplicate detection.

pub mod duplicate_detector;
pub mod error;
pub mod fingerprint;
pub mod result_store;

pub use duplicate_detector::DuplicateDetector;
pub use error::ServiceError;
pub use result_store::{InMemoryResultStore, JsonFileResultStore, ResultKey, ResultRecord, ResultStore};
