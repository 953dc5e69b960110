#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Result store unavailable: {0}")]
    Unavailable(String),
}
