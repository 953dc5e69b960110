//! # Grading data model
//!
//! Types shared by every stage of the grading pipeline: the split question
//! parts and submission fragments, generated test cases and their execution
//! results, per-part results and the final aggregated result.
//!
//! All types are serializable so they can be persisted by the result store
//! and echoed back to callers unchanged.

use crate::languages::Language;
use serde::{Deserialize, Serialize};

/// Clamp a score into `[0, 1]`. Non-finite values collapse to `0`.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// One required sub-question of a multi-part assignment prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPart {
    pub index: usize,
    pub text: String,
}

/// One candidate program or answer extracted from a raw submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFragment {
    pub index: usize,
    pub text: String,
    /// Name of the artifact the fragment was cut from, when known.
    #[serde(default)]
    pub source: Option<String>,
    /// Unset until the fragment's language has been resolved.
    #[serde(default)]
    pub language: Option<Language>,
}

impl SubmissionFragment {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            source: None,
            language: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Label used in justifications: the artifact name, or `fragment N`.
    pub fn label(&self) -> String {
        match &self.source {
            Some(name) => name.clone(),
            None => format!("fragment {}", self.index + 1),
        }
    }
}

/// A single stdin/expected-stdout pair. An empty `expected_output` means
/// the expected output is unknown and any output is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    #[serde(default, alias = "expected")]
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// How a single sandbox invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    RuntimeError,
    SetupError,
    UnsupportedLanguage,
}

/// Verdict for one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub test_case: TestCase,
    /// `None` when the sandbox produced no usable output.
    pub actual_output: Option<String>,
    pub status: TestStatus,
    pub run_status: RunStatus,
}

/// Why a part ended up with the score it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartOutcome {
    Scored,
    NoSubmission,
    NoTestCases,
    SandboxUnavailable,
    OracleFailure,
    EvaluatorPanic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartResult {
    pub part_index: usize,
    pub score: f64,
    pub justification: String,
    pub outcome: PartOutcome,
    /// Index of the fragment that produced this result.
    #[serde(default)]
    pub fragment_index: Option<usize>,
    /// Human label of the originating fragment (artifact name).
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executions: Vec<ExecutionResult>,
}

impl PartResult {
    /// Build a result with a clamped score and no provenance.
    pub fn new(
        part_index: usize,
        score: f64,
        justification: impl Into<String>,
        outcome: PartOutcome,
    ) -> Self {
        Self {
            part_index,
            score: clamp_score(score),
            justification: justification.into(),
            outcome,
            fragment_index: None,
            source: None,
            language: None,
            executions: Vec::new(),
        }
    }

    pub fn zero(part_index: usize, justification: impl Into<String>, outcome: PartOutcome) -> Self {
        Self::new(part_index, 0.0, justification, outcome)
    }

    pub fn from_fragment(mut self, fragment: &SubmissionFragment) -> Self {
        self.fragment_index = Some(fragment.index);
        self.source = Some(fragment.label());
        self
    }
}

/// Details of a cross-student exact-content match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlagiarismMatch {
    pub matched_student: String,
    pub matched_record: String,
    pub matched_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub score: f64,
    pub justification: String,
    pub part_results: Vec<PartResult>,
    #[serde(default)]
    pub is_plagiarized: bool,
    #[serde(default)]
    pub plagiarism: Option<PlagiarismMatch>,
    #[serde(default)]
    pub debug_info: Option<String>,
}

/// Content hash of one submitted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionFingerprint {
    pub content_hash: String,
    pub student_id: String,
    pub assignment_id: String,
}

/// What kind of answers the assignment expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    #[default]
    Programming,
    Theory,
}

/// One uploaded file, with the text already extracted upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionArtifact {
    pub file_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub bytes: Vec<u8>,
    #[serde(default)]
    pub text: String,
}

impl SubmissionArtifact {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("file_{}", self.file_id))
    }
}

/// A fully-formed grading request as handed over by the upstream caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingRequest {
    #[serde(default)]
    pub course_id: Option<String>,
    pub assignment_id: String,
    pub student_id: String,
    #[serde(default)]
    pub domain: Domain,
    pub question: String,
    #[serde(default)]
    pub artifacts: Vec<SubmissionArtifact>,
}
