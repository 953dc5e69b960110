//! # Part evaluator
//!
//! Grades one question part against the fragment matched to it.
//!
//! ```text
//! Start ─▶ LanguageResolved ─▶ InputDecision ─┬▶ Dynamic ────┬▶ Scored
//!                                             └▶ Conceptual ─┘
//! ```
//!
//! Every oracle call runs under a deadline and every failure degrades
//! locally: a failed language lookup falls back to keyword sniffing, a failed
//! repair keeps the text as extracted, and failed test generation or
//! conceptual grading yields a zero score with an explanation. The evaluator
//! never returns an error.

use crate::traits::comparator::OutputComparator;
use ai::{ConceptualRequest, Oracle, OracleError, with_deadline};
use code_runner::SandboxRunner;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use util::execution_config::GradingOptions;
use util::grading::{
    Domain, ExecutionResult, PartOutcome, PartResult, QuestionPart, RunStatus, SubmissionFragment,
    TestCase, TestStatus,
};
use util::languages::{Language, LanguageExt};

pub const NO_SUBMISSION: &str = "No submission found.";
pub const NO_TEST_CASES: &str = "No test cases generated.";
pub const SANDBOX_UNAVAILABLE: &str = "Sandbox unavailable; test cases could not be executed.";
pub const CONCEPTUAL_FAILED: &str = "Conceptual grading failed; no score awarded.";

/// Shared, cheaply clonable evaluator. One instance serves every part of a request.
#[derive(Clone)]
pub struct PartEvaluator {
    oracle: Arc<dyn Oracle>,
    sandbox: Arc<dyn SandboxRunner>,
    comparator: Arc<dyn OutputComparator>,
    options: GradingOptions,
    oracle_timeout: Duration,
}

/// Program text after language resolution and repair.
#[derive(Debug, Clone)]
struct Candidate {
    code: String,
    language: Language,
}

impl PartEvaluator {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        sandbox: Arc<dyn SandboxRunner>,
        comparator: Arc<dyn OutputComparator>,
        options: GradingOptions,
        oracle_timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            sandbox,
            comparator,
            options,
            oracle_timeout,
        }
    }

    pub async fn evaluate(
        &self,
        part: &QuestionPart,
        fragment: Option<&SubmissionFragment>,
        domain: Domain,
    ) -> PartResult {
        let Some(fragment) = fragment else {
            return PartResult::zero(part.index, NO_SUBMISSION, PartOutcome::NoSubmission);
        };

        let mut result = match domain {
            Domain::Theory => {
                self.conceptual(part, &fragment.text, Language::Unknown, Domain::Theory)
                    .await
            }
            Domain::Programming => {
                let candidate = self.resolve(fragment).await;
                let mut r = if self.reads_input(&candidate).await {
                    self.dynamic(part, &candidate).await
                } else {
                    self.conceptual(part, &candidate.code, candidate.language, Domain::Programming)
                        .await
                };
                r.language = Some(candidate.language);
                r
            }
        };
        result = result.from_fragment(fragment);
        tracing::debug!(
            part = part.index + 1,
            score = result.score,
            outcome = ?result.outcome,
            "part scored"
        );
        result
    }

    async fn ask<T, F>(&self, what: &str, part: Option<usize>, call: F) -> Result<T, OracleError>
    where
        F: std::future::Future<Output = Result<T, OracleError>>,
    {
        let res = with_deadline(self.oracle_timeout, call).await;
        if let Err(e) = &res {
            tracing::warn!(call = what, part = ?part.map(|p| p + 1), error = %e, "oracle call degraded");
        }
        res
    }

    /// `Start -> LanguageResolved`
    async fn resolve(&self, fragment: &SubmissionFragment) -> Candidate {
        let detected = match fragment.language {
            Some(lang) if lang.is_supported() => Ok(lang),
            _ => {
                self.ask("detect_language", None, self.oracle.detect_language(&fragment.text))
                    .await
            }
        };
        let language = match detected {
            Ok(lang) if lang.is_supported() => lang,
            _ => Language::sniff(&fragment.text),
        };

        let code = match self
            .ask("repair", None, self.oracle.repair(&fragment.text, language))
            .await
        {
            Ok(fixed) if !fixed.trim().is_empty() => fixed,
            _ => fragment.text.clone(),
        };

        Candidate { code, language }
    }

    /// `LanguageResolved -> InputDecision`. Static inspection decides unless
    /// the oracle override is enabled and answers in time.
    async fn reads_input(&self, candidate: &Candidate) -> bool {
        let static_answer = candidate.language.reads_input(&candidate.code);
        if !self.options.oracle_input_check {
            return static_answer;
        }
        self.ask(
            "reads_input",
            None,
            self.oracle.reads_input(&candidate.code, candidate.language),
        )
        .await
        .unwrap_or(static_answer)
    }

    /// `Dynamic -> Scored`
    async fn dynamic(&self, part: &QuestionPart, candidate: &Candidate) -> PartResult {
        let limit = self.options.max_test_cases;
        let cases = self
            .ask(
                "generate_test_cases",
                Some(part.index),
                self.oracle.generate_test_cases(&part.text, candidate.language, limit),
            )
            .await
            .unwrap_or_default();
        let cases: Vec<TestCase> = cases.into_iter().take(limit).collect();

        if cases.is_empty() {
            return PartResult::zero(part.index, NO_TEST_CASES, PartOutcome::NoTestCases);
        }

        let executions = join_all(cases.into_iter().map(|tc| self.execute(candidate, tc))).await;

        if executions.iter().any(|e| e.run_status == RunStatus::SetupError) {
            let mut r = PartResult::zero(part.index, SANDBOX_UNAVAILABLE, PartOutcome::SandboxUnavailable);
            r.executions = executions;
            return r;
        }

        let total = executions.len();
        let passed = executions.iter().filter(|e| e.status == TestStatus::Pass).count();
        let mut r = PartResult::new(
            part.index,
            passed as f64 / total as f64,
            format!("Passed {passed}/{total} test cases."),
            PartOutcome::Scored,
        );
        r.executions = executions;
        r
    }

    async fn execute(&self, candidate: &Candidate, test_case: TestCase) -> ExecutionResult {
        let outcome = self
            .sandbox
            .run(&candidate.code, candidate.language, &test_case.input)
            .await;

        let status = match (outcome.status, &outcome.output) {
            (RunStatus::Ok, Some(out)) if self.comparator.equivalent(out, &test_case.expected_output) => {
                TestStatus::Pass
            }
            (RunStatus::SetupError, _) => TestStatus::Error,
            _ => TestStatus::Fail,
        };

        ExecutionResult {
            test_case,
            actual_output: outcome.output,
            status,
            run_status: outcome.status,
        }
    }

    /// `Conceptual -> Scored`
    async fn conceptual(
        &self,
        part: &QuestionPart,
        answer: &str,
        language: Language,
        domain: Domain,
    ) -> PartResult {
        let request = ConceptualRequest {
            part: &part.text,
            answer,
            language,
            domain,
        };
        match self
            .ask(
                "grade_conceptually",
                Some(part.index),
                self.oracle.grade_conceptually(request),
            )
            .await
        {
            Ok(verdict) => PartResult::new(part.index, verdict.score, verdict.justification, PartOutcome::Scored),
            Err(_) => PartResult::zero(part.index, CONCEPTUAL_FAILED, PartOutcome::OracleFailure),
        }
    }
}
