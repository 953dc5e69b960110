use crate::error::OracleError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use util::grading::{Domain, TestCase};
use util::languages::Language;

/// Input for a holistic judgement of one answer against one question part.
#[derive(Debug, Clone, Copy)]
pub struct ConceptualRequest<'a> {
    pub part: &'a str,
    pub answer: &'a str,
    pub language: Language,
    pub domain: Domain,
}

/// Holistic score in `[0, 1]` plus a one-sentence reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptualVerdict {
    pub score: f64,
    pub justification: String,
}

/// External intelligence consulted by the grading pipeline.
///
/// Any method may fail; the pipeline treats every error as a local
/// degradation of the part being graded.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn detect_language(&self, code: &str) -> Result<Language, OracleError>;

    /// Undo OCR damage. Returning the input unchanged is a valid answer.
    async fn repair(&self, code: &str, language: Language) -> Result<String, OracleError>;

    async fn reads_input(&self, code: &str, language: Language) -> Result<bool, OracleError>;

    /// At most `limit` stdin/stdout pairs for `part`. May be empty.
    async fn generate_test_cases(
        &self,
        part: &str,
        language: Language,
        limit: usize,
    ) -> Result<Vec<TestCase>, OracleError>;

    async fn grade_conceptually(
        &self,
        request: ConceptualRequest<'_>,
    ) -> Result<ConceptualVerdict, OracleError>;

    async fn split_into_programs(&self, text: &str) -> Result<Vec<String>, OracleError>;
}

/// Bound an oracle call by `limit`; expiry becomes [`OracleError::Timeout`].
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, OracleError>
where
    F: Future<Output = Result<T, OracleError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(res) => res,
        Err(_) => Err(OracleError::Timeout(limit)),
    }
}
