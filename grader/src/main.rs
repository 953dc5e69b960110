use ai::{GeminiOracle, HeuristicOracle, Oracle};
use anyhow::Context;
use clap::Parser;
use code_runner::{ContainerSandbox, DockerBackend};
use common::logger::init_logging;
use marker::GradingJob;
use services::JsonFileResultStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use util::config::AppConfig;
use util::execution_config::ExecutionConfig;
use util::grading::GradingRequest;
use util::paths::{logs_dir, storage_root};

#[derive(Parser)]
#[command(name = "grader", version, about = "Grade one multi-part submission")]
struct Cli {
    /// Grading request JSON (question, artifacts, identifiers)
    request: PathBuf,

    /// Sandbox limits and grading options; built-in defaults when omitted
    #[arg(long, env = "GRADER_CONFIG")]
    config: Option<PathBuf>,

    /// Store the result under a per-file key
    #[arg(long)]
    file_id: Option<String>,

    /// Use the offline heuristic oracle even when a model key is configured
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration and initialize logging
    let app = AppConfig::from_env();
    let root = storage_root(&app.storage_root);
    let _log_guard = init_logging(
        &logs_dir(&root),
        &app.log_file,
        &app.log_level,
        app.log_to_stdout,
    );

    let execution = match &cli.config {
        Some(path) => ExecutionConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("loading {}: {e}", path.display()))?,
        None => ExecutionConfig::default_config(),
    };

    let raw = tokio::fs::read_to_string(&cli.request)
        .await
        .with_context(|| format!("reading {}", cli.request.display()))?;
    let request: GradingRequest = serde_json::from_str(&raw).context("parsing grading request")?;

    let oracle_timeout = Duration::from_secs(app.oracle_timeout_secs);
    let oracle: Arc<dyn Oracle> = if app.has_gemini_key() && !cli.offline {
        Arc::new(GeminiOracle::new(
            &app.gemini_api_key,
            &app.gemini_model,
            oracle_timeout,
        )?)
    } else {
        tracing::info!("no model key configured; using heuristic oracle");
        Arc::new(HeuristicOracle::new())
    };

    let sandbox = Arc::new(ContainerSandbox::new(
        DockerBackend::new(),
        execution.execution.clone(),
        execution.images.clone(),
        app.max_concurrent_runs,
    ));
    let store = Arc::new(JsonFileResultStore::new(root.clone()));

    tracing::info!(
        project = %app.project_name,
        env = %app.env,
        root = %root.display(),
        "grader starting"
    );

    let mut job = GradingJob::new(request, oracle, sandbox, store)
        .with_config(execution)
        .with_oracle_timeout(oracle_timeout)
        .with_max_parallel_parts(app.max_parallel_parts);
    if let Some(file_id) = cli.file_id {
        job = job.with_file_id(file_id);
    }

    let result = job.grade().await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
