use async_trait::async_trait;
use code_runner::{
    ContainerBackend, ContainerOutput, ContainerSandbox, ContainerSpec, RunnerError, SandboxRunner,
};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use util::execution_config::{ExecutionLimits, RunnerImages};
use util::grading::RunStatus;
use util::languages::Language;

#[derive(Clone, Copy)]
enum Behaviour {
    Echo,
    Hang,
    StartFails,
    AttachFails,
    Slow,
}

/// Records every lifecycle call and the specs it was given.
struct CountingBackend {
    behaviour: Behaviour,
    started: AtomicUsize,
    attached: AtomicUsize,
    removed: AtomicUsize,
    running: AtomicUsize,
    max_running: AtomicUsize,
    specs: Mutex<Vec<ContainerSpec>>,
}

impl CountingBackend {
    fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            started: AtomicUsize::new(0),
            attached: AtomicUsize::new(0),
            removed: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            specs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ContainerBackend for CountingBackend {
    async fn start(&self, spec: &ContainerSpec) -> Result<String, RunnerError> {
        if let Behaviour::StartFails = self.behaviour {
            return Err(RunnerError::Backend("daemon not reachable".into()));
        }
        assert!(spec.code_dir.is_dir(), "source dir must exist while the container lives");
        self.specs.lock().unwrap().push(spec.clone());
        let n = self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        Ok(format!("c{n}"))
    }

    async fn attach(&self, _id: &str, stdin: &[u8]) -> Result<ContainerOutput, RunnerError> {
        self.attached.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("the sandbox timeout cancels this future")
            }
            Behaviour::AttachFails => Err(RunnerError::Backend("attach refused".into())),
            Behaviour::Slow => {
                tokio::time::sleep(Duration::from_millis(150)).await;
                Ok(ContainerOutput {
                    stdout: stdin.to_vec(),
                    stderr: vec![],
                    exit_code: Some(0),
                })
            }
            _ => Ok(ContainerOutput {
                stdout: stdin.to_vec(),
                stderr: vec![],
                exit_code: Some(0),
            }),
        }
    }

    async fn remove(&self, _id: &str) -> Result<(), RunnerError> {
        self.removed.fetch_add(1, Ordering::SeqCst);
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

fn sandbox(behaviour: Behaviour, max_concurrent: usize) -> ContainerSandbox<CountingBackend> {
    let limits = ExecutionLimits {
        timeout_secs: 1,
        ..ExecutionLimits::default()
    };
    ContainerSandbox::new(
        CountingBackend::new(behaviour),
        limits,
        RunnerImages::default(),
        max_concurrent,
    )
}

#[tokio::test]
async fn successful_run_starts_and_removes_once() {
    let sb = sandbox(Behaviour::Echo, 2);
    let out = sb.run("print(input())", Language::Python, "2 3").await;

    assert_eq!(out.status, RunStatus::Ok);
    assert_eq!(out.output.as_deref(), Some("2 3\n"));

    let b = sb.backend();
    assert_eq!(b.started.load(Ordering::SeqCst), 1);
    assert_eq!(b.removed.load(Ordering::SeqCst), 1);

    let specs = b.specs.lock().unwrap();
    assert_eq!(specs[0].image, "python:3.9-slim");
    assert_eq!(specs[0].script, "python3 /code/main.py 2>&1");
    assert!(!specs[0].code_dir.exists(), "workdir is cleaned up after the run");
}

#[tokio::test]
async fn timeout_still_removes_container() {
    let sb = sandbox(Behaviour::Hang, 2);
    let out = sb.run("while True: pass", Language::Python, "").await;

    assert_eq!(out.status, RunStatus::RuntimeError);
    assert!(out.output.is_none());
    let b = sb.backend();
    assert_eq!(b.started.load(Ordering::SeqCst), 1);
    assert_eq!(b.removed.load(Ordering::SeqCst), 1);
    assert_eq!(b.running.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dropped_run_still_removes_container() {
    let sb = sandbox(Behaviour::Hang, 2);
    let cut_short = tokio::time::timeout(
        Duration::from_millis(300),
        sb.run("while True: pass", Language::Python, ""),
    )
    .await;
    assert!(cut_short.is_err());

    let b = sb.backend();
    for _ in 0..100 {
        if b.removed.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(b.started.load(Ordering::SeqCst), 1);
    assert_eq!(b.removed.load(Ordering::SeqCst), 1);
    assert_eq!(b.running.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn attach_failure_is_setup_error_and_removes() {
    let sb = sandbox(Behaviour::AttachFails, 2);
    let out = sb.run("int main(){}", Language::C, "").await;

    assert_eq!(out.status, RunStatus::SetupError);
    assert_eq!(sb.backend().removed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn start_failure_is_setup_error_without_remove() {
    let sb = sandbox(Behaviour::StartFails, 2);
    let out = sb.run("print(1)", Language::Python, "").await;

    assert_eq!(out.status, RunStatus::SetupError);
    let b = sb.backend();
    assert_eq!(b.started.load(Ordering::SeqCst), 0);
    assert_eq!(b.removed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_language_never_touches_backend() {
    let sb = sandbox(Behaviour::Echo, 2);
    let out = sb.run("10 PRINT HELLO", Language::Unknown, "").await;

    assert_eq!(out.status, RunStatus::UnsupportedLanguage);
    assert_eq!(sb.backend().started.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_runs_respect_slot_limit() {
    let max_concurrent = 2;
    let sb = Arc::new(sandbox(Behaviour::Slow, max_concurrent));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let sb = Arc::clone(&sb);
            tokio::spawn(async move { sb.run("print(input())", Language::Python, &i.to_string()).await })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    for (i, res) in results.into_iter().enumerate() {
        let out = res.expect("run should not panic");
        assert_eq!(out.output, Some(format!("{i}\n")));
    }

    let b = sb.backend();
    assert_eq!(b.started.load(Ordering::SeqCst), 6);
    assert_eq!(b.removed.load(Ordering::SeqCst), 6);
    assert!(
        b.max_running.load(Ordering::SeqCst) <= max_concurrent,
        "observed {} live containers",
        b.max_running.load(Ordering::SeqCst)
    );
}
