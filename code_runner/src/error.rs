/// Failures of the container backend itself. None of these describe the
/// submitted program; program failures are reported through `RunStatus`.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("container backend failed: {0}")]
    Backend(String),
}
