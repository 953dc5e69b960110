//! # Marker Library
//!
//! Grades a multi-part question against a handwritten or OCR'd submission.
//!
//! ## Key Concepts
//! - **GradingJob**: one grading request run end to end: duplicate check,
//!   splitting, matching, per-part evaluation, aggregation and persistence.
//! - **PartSplitter / PartMatcher**: cut the question and the submission into
//!   parts and pair them up.
//! - **PartEvaluator**: scores one part, by running generated test cases in
//!   the sandbox or by asking the oracle for a conceptual verdict.
//! - **Comparators**: pluggable strategies deciding whether program output
//!   answers a test case.
//! - **Scorer**: folds part results into the final [`GradingResult`].

pub mod comparators;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod scorer;
pub mod splitter;
pub mod traits;

use crate::comparators::StagedComparator;
use crate::error::MarkerError;
use crate::evaluator::PartEvaluator;
use crate::matcher::PartMatcher;
use crate::splitter::PartSplitter;
use crate::traits::comparator::OutputComparator;

use ai::{Oracle, with_deadline};
use code_runner::SandboxRunner;
use services::fingerprint::fingerprint_artifacts;
use services::{DuplicateDetector, ResultKey, ResultRecord, ResultStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use util::execution_config::ExecutionConfig;
use util::grading::{
    GradingRequest, GradingResult, PartOutcome, PartResult, SubmissionFingerprint,
    SubmissionFragment,
};

pub const EVALUATION_PANICKED: &str = "Evaluation failed unexpectedly; no score awarded.";

/// A grading job for a single student submission.
///
/// # Fields
/// - `request`: question text, artifacts and identity of the submission.
/// - `oracle`: language detection, repair, test generation and conceptual grading.
/// - `sandbox`: isolated execution of candidate programs.
/// - `store`: where results are persisted and earlier submissions are looked up.
/// - `comparator`: strategy for comparing program output with expected output.
pub struct GradingJob {
    request: GradingRequest,
    oracle: Arc<dyn Oracle>,
    sandbox: Arc<dyn SandboxRunner>,
    store: Arc<dyn ResultStore>,
    comparator: Arc<dyn OutputComparator>,
    config: ExecutionConfig,
    oracle_timeout: Duration,
    max_parallel_parts: usize,
    file_id: Option<String>,
}

impl GradingJob {
    pub fn new(
        request: GradingRequest,
        oracle: Arc<dyn Oracle>,
        sandbox: Arc<dyn SandboxRunner>,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            request,
            oracle,
            sandbox,
            store,
            comparator: Arc::new(StagedComparator::default()),
            config: ExecutionConfig::default_config(),
            oracle_timeout: Duration::from_secs(30),
            max_parallel_parts: 4,
            file_id: None,
        }
    }

    /// Set a custom output comparator strategy for this job.
    pub fn with_comparator<C: OutputComparator + 'static>(mut self, comparator: C) -> Self {
        self.comparator = Arc::new(comparator);
        self
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    /// Upper bound on parts evaluated at the same time. Clamped to at least one.
    pub fn with_max_parallel_parts(mut self, n: usize) -> Self {
        self.max_parallel_parts = n.max(1);
        self
    }

    /// Store the result under a per-file key instead of the per-student one.
    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    fn result_key(&self) -> ResultKey {
        ResultKey::new(&self.request.assignment_id, &self.request.student_id)
            .with_course(self.request.course_id.clone())
            .with_file(self.file_id.clone())
    }

    /// Run the grading process.
    ///
    /// # Steps
    /// 1. Fingerprints every artifact and checks for an exact copy of another
    ///    student's work. A hit short-circuits to a flagged zero result.
    /// 2. Splits the question into parts and the artifacts into fragments.
    /// 3. Matches fragments to parts.
    /// 4. Evaluates every part concurrently; a panicking part scores zero.
    /// 5. Aggregates and persists the result.
    ///
    /// # Errors
    /// [`MarkerError::EmptyQuestion`] when the question has no text, and
    /// [`MarkerError::Persistence`] when the result cannot be saved.
    pub async fn grade(self) -> Result<GradingResult, MarkerError> {
        let req = &self.request;
        tracing::info!(
            assignment_id = %req.assignment_id,
            student_id = %req.student_id,
            artifacts = req.artifacts.len(),
            "grading started"
        );

        let fingerprints = fingerprint_artifacts(&req.artifacts, &req.student_id, &req.assignment_id);

        let detector = DuplicateDetector::new(self.store.clone());
        let hashes = fingerprints.iter().map(|f| f.content_hash.as_str());
        let duplicate = detector
            .check_all(hashes, &req.assignment_id, &req.student_id)
            .await;
        match duplicate {
            Ok(Some(found)) => {
                let result = scorer::plagiarism_result(found);
                self.persist(&result, fingerprints).await?;
                return Ok(result);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "duplicate check failed; grading anyway"),
        }

        let splitter = PartSplitter::new();
        let parts = splitter.split_question(&req.question);
        if parts.is_empty() {
            return Err(MarkerError::EmptyQuestion);
        }

        let fragments = self.fragments(&splitter).await;
        let assignment = PartMatcher::new(self.config.grading.match_threshold).assign(&parts, &fragments);
        tracing::info!(
            parts = parts.len(),
            fragments = fragments.len(),
            orphans = assignment.orphans.len(),
            "fragments matched"
        );

        let evaluator = PartEvaluator::new(
            self.oracle.clone(),
            self.sandbox.clone(),
            self.comparator.clone(),
            self.config.grading.clone(),
            self.oracle_timeout,
        );
        let slots = Arc::new(Semaphore::new(self.max_parallel_parts));
        let domain = req.domain;

        let handles: Vec<_> = parts
            .iter()
            .map(|part| {
                let index = part.index;
                let matched = assignment.fragment_for(index);
                let fragment = matched.map(|f| fragments[f].clone());
                let part = part.clone();
                let evaluator = evaluator.clone();
                let slots = slots.clone();
                let handle = tokio::spawn(async move {
                    let _permit = slots.acquire_owned().await.ok();
                    evaluator.evaluate(&part, fragment.as_ref(), domain).await
                });
                (index, matched, handle)
            })
            .collect();

        let mut results: Vec<PartResult> = Vec::with_capacity(handles.len());
        for (index, fragment, handle) in handles {
            match handle.await {
                Ok(r) => results.push(r),
                Err(e) => {
                    tracing::error!(part = index + 1, error = %e, "part evaluation panicked");
                    let mut r = PartResult::zero(index, EVALUATION_PANICKED, PartOutcome::EvaluatorPanic);
                    if let Some(f) = fragment {
                        r = r.from_fragment(&fragments[f]);
                    }
                    results.push(r);
                }
            }
        }

        let mut result = scorer::aggregate(results)?;
        let empty = scorer::nothing_submitted(&result.part_results);
        if empty {
            tracing::warn!(
                assignment_id = %req.assignment_id,
                student_id = %req.student_id,
                "no submission text in any artifact"
            );
        }
        result.debug_info = debug_trail(parts.len(), &fragments, &assignment.orphans, empty);

        self.persist(&result, fingerprints).await?;
        tracing::info!(
            assignment_id = %req.assignment_id,
            student_id = %req.student_id,
            score = result.score,
            "grading finished"
        );
        Ok(result)
    }

    /// Every artifact's text cut into fragments, numbered across the whole
    /// submission. Provenance is the artifact name, with an ordinal when one
    /// artifact yields several fragments.
    async fn fragments(&self, splitter: &PartSplitter) -> Vec<SubmissionFragment> {
        let mut out = Vec::new();
        for artifact in &self.request.artifacts {
            if artifact.text.trim().is_empty() {
                continue;
            }
            let pieces = self.split_artifact(splitter, &artifact.text).await;
            let name = artifact.display_name();
            let several = pieces.len() > 1;
            for (ordinal, text) in pieces.into_iter().enumerate() {
                let source = if several {
                    format!("{name} #{}", ordinal + 1)
                } else {
                    name.clone()
                };
                out.push(SubmissionFragment::new(out.len(), text).with_source(source));
            }
        }
        out
    }

    async fn split_artifact(&self, splitter: &PartSplitter, text: &str) -> Vec<String> {
        if self.config.grading.oracle_split {
            match with_deadline(self.oracle_timeout, self.oracle.split_into_programs(text)).await {
                Ok(programs) => {
                    let programs: Vec<String> = programs
                        .into_iter()
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect();
                    if !programs.is_empty() {
                        return programs;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "oracle split unavailable; using heuristic split"),
            }
        }
        splitter.split_submission(text)
    }

    async fn persist(
        &self,
        result: &GradingResult,
        fingerprints: Vec<SubmissionFingerprint>,
    ) -> Result<(), MarkerError> {
        let record = ResultRecord::from_result(self.result_key(), result, fingerprints);
        self.store
            .upsert(&record)
            .await
            .map_err(MarkerError::Persistence)
    }
}

fn debug_trail(
    parts: usize,
    fragments: &[SubmissionFragment],
    orphans: &[usize],
    nothing_submitted: bool,
) -> Option<String> {
    let mut trail = format!("parts={parts} fragments={}", fragments.len());
    if nothing_submitted {
        trail.push_str("; nothing submitted");
    }
    if !orphans.is_empty() {
        let names = orphans
            .iter()
            .map(|&f| fragments[f].label())
            .collect::<Vec<_>>()
            .join(", ");
        trail.push_str(&format!("; unmatched fragments: {names}"));
    }
    Some(trail)
}
