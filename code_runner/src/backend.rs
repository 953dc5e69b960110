use crate::error::RunnerError;
use async_trait::async_trait;
use std::path::PathBuf;
use util::execution_config::ExecutionLimits;

/// Everything needed to create one single-use container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Host directory mounted read-only at `/code`.
    pub code_dir: PathBuf,
    /// Shell script run with `sh -c` inside the container.
    pub script: String,
    pub limits: ExecutionLimits,
}

#[derive(Debug, Clone, Default)]
pub struct ContainerOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

/// Container lifecycle as seen by [`crate::ContainerSandbox`].
///
/// `start` creates the container without running it, `attach` runs it to
/// completion with `stdin` fed in, and `remove` destroys it whether or not it
/// is still running. Callers pair every successful `start` with one `remove`.
#[async_trait]
pub trait ContainerBackend: Send + Sync {
    async fn start(&self, spec: &ContainerSpec) -> Result<String, RunnerError>;

    async fn attach(&self, id: &str, stdin: &[u8]) -> Result<ContainerOutput, RunnerError>;

    async fn remove(&self, id: &str) -> Result<(), RunnerError>;
}
