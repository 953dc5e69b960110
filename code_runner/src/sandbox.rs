use crate::backend::{ContainerBackend, ContainerOutput, ContainerSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use util::execution_config::{ExecutionLimits, RunnerImages};
use util::grading::RunStatus;
use util::languages::{Language, LanguageExt};

/// Exit status the build step uses to report a failed compile.
const BUILD_FAILED: i32 = 101;

/// Result of one program run against one stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Combined stdout/stderr. `None` when there is nothing meaningful to compare.
    pub output: Option<String>,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn new(output: Option<String>, status: RunStatus) -> Self {
        Self { output, status }
    }

    fn without_output(status: RunStatus) -> Self {
        Self::new(None, status)
    }
}

/// Runs untrusted code in isolation. Never fails: every problem is folded
/// into the returned [`RunStatus`].
#[async_trait]
pub trait SandboxRunner: Send + Sync {
    async fn run(&self, code: &str, language: Language, input: &str) -> RunOutcome;
}

/// Shell script executed inside the container: optional build, then run.
pub fn container_script(language: Language) -> Option<String> {
    let run = language.run_command()?;
    Some(match language.build_command() {
        Some(build) => format!("{build} >/dev/null 2>&1 || exit {BUILD_FAILED}; {run} 2>&1"),
        None => format!("{run} 2>&1"),
    })
}

/// [`SandboxRunner`] that creates one container per run through a
/// [`ContainerBackend`], with at most `max_concurrent` containers alive.
pub struct ContainerSandbox<B: ContainerBackend + 'static> {
    backend: Arc<B>,
    limits: ExecutionLimits,
    images: RunnerImages,
    slots: Arc<Semaphore>,
}

impl<B: ContainerBackend + 'static> ContainerSandbox<B> {
    pub fn new(backend: B, limits: ExecutionLimits, images: RunnerImages, max_concurrent: usize) -> Self {
        Self {
            backend: Arc::new(backend),
            limits,
            images,
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn wall_clock(&self) -> Duration {
        Duration::from_secs(self.limits.timeout_secs.max(1))
    }

    async fn run_in_container(&self, code: &str, language: Language, input: &str) -> RunOutcome {
        let (Some(image), Some(script)) = (self.images.image_for(language), container_script(language))
        else {
            return RunOutcome::without_output(RunStatus::UnsupportedLanguage);
        };

        let _permit = match self.slots.acquire().await {
            Ok(p) => p,
            Err(_) => return RunOutcome::without_output(RunStatus::SetupError),
        };

        // Dropped at the end of this function, after the container is gone.
        let workdir = match tempfile::Builder::new().prefix("grader-src-").tempdir() {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "could not create sandbox workdir");
                return RunOutcome::without_output(RunStatus::SetupError);
            }
        };
        let source = workdir.path().join(language.main_filename());
        if let Err(e) = tokio::fs::write(&source, code).await {
            tracing::warn!(error = %e, "could not write sandbox source");
            return RunOutcome::without_output(RunStatus::SetupError);
        }

        let spec = ContainerSpec {
            name: format!("grader-{}", uuid::Uuid::new_v4()),
            image: image.to_string(),
            code_dir: workdir.path().to_path_buf(),
            script,
            limits: self.limits.clone(),
        };

        let id = match self.backend.start(&spec).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, image = %spec.image, "sandbox unavailable");
                return RunOutcome::without_output(RunStatus::SetupError);
            }
        };
        let container = ContainerGuard {
            backend: self.backend.clone(),
            id: Some(id.clone()),
        };

        let mut stdin = input.as_bytes().to_vec();
        if !stdin.ends_with(b"\n") {
            stdin.push(b'\n');
        }

        let limit = self.wall_clock();
        let attached = timeout(limit, self.backend.attach(&id, &stdin)).await;
        container.remove().await;

        match attached {
            Err(_) => {
                tracing::debug!(container = %id, ?limit, "sandbox run timed out");
                RunOutcome::without_output(RunStatus::RuntimeError)
            }
            Ok(Err(e)) => {
                tracing::warn!(container = %id, error = %e, "sandbox attach failed");
                RunOutcome::without_output(RunStatus::SetupError)
            }
            Ok(Ok(out)) => classify(language, out),
        }
    }
}

/// Removes the container when the run finishes, or from a spawned task when
/// the run future is dropped before it gets there.
struct ContainerGuard<B: ContainerBackend + 'static> {
    backend: Arc<B>,
    id: Option<String>,
}

impl<B: ContainerBackend + 'static> ContainerGuard<B> {
    async fn remove(mut self) {
        if let Some(id) = self.id.take() {
            remove_container(self.backend.as_ref(), &id).await;
        }
    }
}

impl<B: ContainerBackend + 'static> Drop for ContainerGuard<B> {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        let backend = self.backend.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(container = %id, "run cancelled; removing container in background");
                handle.spawn(async move { remove_container(backend.as_ref(), &id).await });
            }
            Err(_) => tracing::warn!(container = %id, "no runtime left to remove sandbox container"),
        }
    }
}

async fn remove_container<B: ContainerBackend>(backend: &B, id: &str) {
    if let Err(e) = backend.remove(id).await {
        tracing::warn!(container = %id, error = %e, "failed to remove sandbox container");
    }
}

/// Nonzero exits are the program's own; host-side failures only arrive as
/// backend errors.
fn classify(language: Language, out: ContainerOutput) -> RunOutcome {
    let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&out.stderr));

    match out.exit_code {
        Some(0) => RunOutcome::new(Some(text), RunStatus::Ok),
        Some(BUILD_FAILED) if language.build_command().is_some() => {
            RunOutcome::without_output(RunStatus::RuntimeError)
        }
        _ => RunOutcome::new(Some(text), RunStatus::RuntimeError),
    }
}

#[async_trait]
impl<B: ContainerBackend + 'static> SandboxRunner for ContainerSandbox<B> {
    async fn run(&self, code: &str, language: Language, input: &str) -> RunOutcome {
        self.run_in_container(code, language, input).await
    }
}
