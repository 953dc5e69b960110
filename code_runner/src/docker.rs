use crate::backend::{ContainerBackend, ContainerOutput, ContainerSpec};
use crate::error::RunnerError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Per-stream cap on captured program output.
const MAX_OUTPUT_BYTES: u64 = 1 << 20;

/// [`ContainerBackend`] driving the `docker` CLI.
#[derive(Debug, Clone)]
pub struct DockerBackend {
    binary: String,
}

impl Default for DockerBackend {
    fn default() -> Self {
        Self {
            binary: "docker".into(),
        }
    }
}

impl DockerBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another docker-compatible CLI (e.g. `podman`).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Arguments for `docker create`.
    pub fn create_args(spec: &ContainerSpec) -> Vec<String> {
        vec![
            "create".into(),
            "-i".into(),
            "--name".into(),
            spec.name.clone(),
            "--network=none".into(),
            format!("--memory={}", spec.limits.max_memory),
            format!("--memory-swap={}", spec.limits.max_memory),
            format!("--cpus={}", spec.limits.max_cpus),
            format!("--pids-limit={}", spec.limits.max_processes),
            "--security-opt=no-new-privileges".into(),
            "-v".into(),
            format!("{}:/code:ro", spec.code_dir.display()),
            "-w".into(),
            "/tmp".into(),
            spec.image.clone(),
            "sh".into(),
            "-c".into(),
            spec.script.clone(),
        ]
    }
}

#[async_trait]
impl ContainerBackend for DockerBackend {
    async fn start(&self, spec: &ContainerSpec) -> Result<String, RunnerError> {
        let output = Command::new(&self.binary)
            .args(Self::create_args(spec))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(RunnerError::Backend(format!(
                "docker create exited with {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(RunnerError::Backend("docker create returned no id".into()));
        }
        Ok(id)
    }

    async fn attach(&self, id: &str, stdin: &[u8]) -> Result<ContainerOutput, RunnerError> {
        let mut child = Command::new(&self.binary)
            .args(["start", "-a", "-i", id])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut pipe) = child.stdin.take() {
            // A program that never reads stdin closes the pipe early.
            if let Err(e) = pipe.write_all(stdin).await {
                tracing::debug!(container = id, error = %e, "stdin not fully consumed");
            }
            drop(pipe);
        }

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let (stdout, stderr) = tokio::join!(
            async {
                let read = read_capped(stdout_pipe).await;
                if matches!(read, Ok((_, true))) {
                    tracing::debug!(container = id, "output limit reached; stopping run");
                    if let Err(e) = child.start_kill() {
                        tracing::debug!(container = id, error = %e, "could not stop docker client");
                    }
                }
                read
            },
            read_capped(stderr_pipe),
        );
        let (stdout, _) = stdout?;
        let (stderr, _) = stderr?;
        let status = child.wait().await?;

        Ok(ContainerOutput {
            stdout,
            stderr,
            exit_code: status.code(),
        })
    }

    async fn remove(&self, id: &str) -> Result<(), RunnerError> {
        let output = Command::new(&self.binary)
            .args(["rm", "-f", id])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(RunnerError::Backend(format!(
                "docker rm failed for {id}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// Reads at most [`MAX_OUTPUT_BYTES`]; the flag is set when more was available.
async fn read_capped<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<(Vec<u8>, bool)> {
    let mut buf = Vec::new();
    if let Some(pipe) = pipe {
        pipe.take(MAX_OUTPUT_BYTES + 1).read_to_end(&mut buf).await?;
    }
    let truncated = buf.len() as u64 > MAX_OUTPUT_BYTES;
    buf.truncate(MAX_OUTPUT_BYTES as usize);
    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use util::execution_config::ExecutionLimits;

    #[test]
    fn create_args_lock_down_the_container() {
        let spec = ContainerSpec {
            name: "grader-1".into(),
            image: "python:3.9-slim".into(),
            code_dir: PathBuf::from("/tmp/src"),
            script: "python3 /code/main.py 2>&1".into(),
            limits: ExecutionLimits::default(),
        };
        let args = DockerBackend::create_args(&spec);
        for expected in [
            "--network=none",
            "--memory=512m",
            "--pids-limit=64",
            "--security-opt=no-new-privileges",
            "/tmp/src:/code:ro",
        ] {
            assert!(args.iter().any(|a| a == expected), "missing {expected}");
        }
        assert_eq!(args.last().map(String::as_str), Some("python3 /code/main.py 2>&1"));
    }

    #[tokio::test]
    async fn output_is_capped() {
        let flood = vec![b'y'; MAX_OUTPUT_BYTES as usize + 10];
        let (buf, truncated) = read_capped(Some(&flood[..])).await.unwrap();
        assert_eq!(buf.len() as u64, MAX_OUTPUT_BYTES);
        assert!(truncated);

        let (buf, truncated) = read_capped(Some(&b"5\n"[..])).await.unwrap();
        assert_eq!(buf, b"5\n");
        assert!(!truncated);

        let (buf, truncated) = read_capped::<&[u8]>(None).await.unwrap();
        assert!(buf.is_empty() && !truncated);
    }

    #[tokio::test]
    async fn missing_binary_is_an_io_error() {
        let backend = DockerBackend::with_binary("definitely-not-a-container-cli");
        let spec = ContainerSpec {
            name: "x".into(),
            image: "busybox".into(),
            code_dir: PathBuf::from("/tmp"),
            script: "true".into(),
            limits: ExecutionLimits::default(),
        };
        assert!(matches!(backend.start(&spec).await, Err(RunnerError::Io(_))));
    }
}
