//! Marker Error Types
//!
//! Errors that escape [`GradingJob::grade`](crate::GradingJob::grade). Everything
//! else that can go wrong while grading (oracle failures, sandbox outages,
//! panics inside one part) is absorbed into a zero-scored part instead.

use services::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    /// The aggregator was handed no part results.
    #[error("no part results to aggregate")]
    EmptyParts,

    /// The question produced no parts to grade against.
    #[error("question has no gradable parts")]
    EmptyQuestion,

    /// A computed result could not be saved.
    #[error("failed to persist grading result: {0}")]
    Persistence(#[source] ServiceError),
}
