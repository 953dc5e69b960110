use crate::error::ServiceError;
use crate::result_store::ResultStore;
use std::sync::Arc;
use util::grading::PlagiarismMatch;

/// Exact-content duplicate detection across students of one assignment.
///
/// Only clean (non-plagiarised) records count as originals, so a copied
/// submission never becomes the source of later matches. Two identical
/// submissions arriving at the same time may both pass the check; there is
/// no cross-request lock.
#[derive(Clone)]
pub struct DuplicateDetector {
    store: Arc<dyn ResultStore>,
}

impl DuplicateDetector {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    /// The earliest clean record from another student carrying `content_hash`.
    /// Resubmissions by the same student are never reported.
    pub async fn check(
        &self,
        content_hash: &str,
        assignment_id: &str,
        student_id: &str,
    ) -> Result<Option<PlagiarismMatch>, ServiceError> {
        let candidates = self
            .store
            .find_by_fingerprint(assignment_id, content_hash)
            .await?;

        let original = candidates
            .into_iter()
            .filter(|r| r.key.student_id != student_id && !r.is_plagiarized)
            .min_by_key(|r| r.graded_at);

        Ok(original.map(|r| {
            tracing::info!(
                assignment_id,
                student_id,
                matched_student = %r.key.student_id,
                "exact duplicate found"
            );
            PlagiarismMatch {
                matched_student: r.key.student_id.clone(),
                matched_record: r.key.to_string(),
                matched_hash: content_hash.to_string(),
            }
        }))
    }

    /// Check several hashes, returning the first match.
    pub async fn check_all(
        &self,
        hashes: impl IntoIterator<Item = &str>,
        assignment_id: &str,
        student_id: &str,
    ) -> Result<Option<PlagiarismMatch>, ServiceError> {
        for hash in hashes {
            if let Some(m) = self.check(hash, assignment_id, student_id).await? {
                return Ok(Some(m));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result_store::{InMemoryResultStore, ResultKey, ResultRecord};
    use chrono::{Duration, Utc};
    use util::grading::SubmissionFingerprint;

    fn record(student: &str, hash: &str, plagiarized: bool, age_secs: i64) -> ResultRecord {
        ResultRecord {
            key: ResultKey::new("a1", student),
            score: 0.0,
            justification: String::new(),
            part_results: vec![],
            fingerprints: vec![SubmissionFingerprint {
                content_hash: hash.into(),
                student_id: student.into(),
                assignment_id: "a1".into(),
            }],
            is_plagiarized: plagiarized,
            plagiarism: None,
            debug_info: None,
            graded_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[tokio::test]
    async fn reports_other_student_only() {
        let store = Arc::new(InMemoryResultStore::new());
        store.upsert(&record("alice", "h1", false, 10)).await.unwrap();
        let detector = DuplicateDetector::new(store.clone());

        assert!(detector.check("h1", "a1", "alice").await.unwrap().is_none());
        assert!(detector.check("h2", "a1", "bob").await.unwrap().is_none());
        assert!(detector.check("h1", "a2", "bob").await.unwrap().is_none());

        let m = detector.check("h1", "a1", "bob").await.unwrap().unwrap();
        assert_eq!(m.matched_student, "alice");
        assert_eq!(m.matched_record, "a1-alice");
        assert_eq!(m.matched_hash, "h1");
    }

    #[tokio::test]
    async fn prefers_earliest_clean_original() {
        let store = Arc::new(InMemoryResultStore::new());
        store.upsert(&record("carol", "h", false, 5)).await.unwrap();
        store.upsert(&record("alice", "h", false, 50)).await.unwrap();
        store.upsert(&record("bob", "h", true, 100)).await.unwrap();
        let detector = DuplicateDetector::new(store);

        let m = detector
            .check_all(["x", "h"], "a1", "dave")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(m.matched_student, "alice");
    }
}
