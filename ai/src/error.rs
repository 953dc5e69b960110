use std::time::Duration;

/// Failure of a single oracle call. Callers degrade on any variant; none of
/// them aborts a grading request.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("oracle request failed: {0}")]
    Request(String),

    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("oracle does not support {0}")]
    Unsupported(&'static str),
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        OracleError::Request(e.to_string())
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(e: serde_json::Error) -> Self {
        OracleError::Malformed(e.to_string())
    }
}
