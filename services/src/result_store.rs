//! # Result store
//!
//! Graded results are upserted under a composite key built from the course,
//! assignment, student and (for per-attachment grading) file identifiers.
//! The store doubles as the fingerprint index used by
//! [`crate::DuplicateDetector`].
//!
//! Two implementations are provided: [`InMemoryResultStore`] for tests and
//! embedding, and [`JsonFileResultStore`] which keeps one pretty-printed JSON
//! document per key under `{root}/results/`.

use crate::error::ServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use util::grading::{GradingResult, PartResult, PlagiarismMatch, SubmissionFingerprint};
use util::paths::{ensure_dir, result_path, results_dir};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultKey {
    #[serde(default)]
    pub course_id: Option<String>,
    pub assignment_id: String,
    pub student_id: String,
    #[serde(default)]
    pub file_id: Option<String>,
}

impl ResultKey {
    pub fn new(assignment_id: impl Into<String>, student_id: impl Into<String>) -> Self {
        Self {
            course_id: None,
            assignment_id: assignment_id.into(),
            student_id: student_id.into(),
            file_id: None,
        }
    }

    pub fn with_course(mut self, course_id: Option<String>) -> Self {
        self.course_id = course_id;
        self
    }

    pub fn with_file(mut self, file_id: Option<String>) -> Self {
        self.file_id = file_id;
        self
    }
}

/// `[{course}-]{assignment}-{student}[-{file}]`
impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(course) = &self.course_id {
            write!(f, "{course}-")?;
        }
        write!(f, "{}-{}", self.assignment_id, self.student_id)?;
        if let Some(file) = &self.file_id {
            write!(f, "-{file}")?;
        }
        Ok(())
    }
}

/// The persisted form of one graded submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub key: ResultKey,
    pub score: f64,
    pub justification: String,
    #[serde(default)]
    pub part_results: Vec<PartResult>,
    #[serde(default)]
    pub fingerprints: Vec<SubmissionFingerprint>,
    #[serde(default)]
    pub is_plagiarized: bool,
    #[serde(default)]
    pub plagiarism: Option<PlagiarismMatch>,
    #[serde(default)]
    pub debug_info: Option<String>,
    pub graded_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn from_result(
        key: ResultKey,
        result: &GradingResult,
        fingerprints: Vec<SubmissionFingerprint>,
    ) -> Self {
        Self {
            key,
            score: result.score,
            justification: result.justification.clone(),
            part_results: result.part_results.clone(),
            fingerprints,
            is_plagiarized: result.is_plagiarized,
            plagiarism: result.plagiarism.clone(),
            debug_info: result.debug_info.clone(),
            graded_at: Utc::now(),
        }
    }

    pub fn has_fingerprint(&self, assignment_id: &str, content_hash: &str) -> bool {
        self.key.assignment_id == assignment_id
            && self.fingerprints.iter().any(|f| f.content_hash == content_hash)
    }
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert or replace the record stored under `record.key`.
    async fn upsert(&self, record: &ResultRecord) -> Result<(), ServiceError>;

    async fn get(&self, key: &ResultKey) -> Result<Option<ResultRecord>, ServiceError>;

    /// Every record for `assignment_id` carrying a fingerprint with `content_hash`.
    async fn find_by_fingerprint(
        &self,
        assignment_id: &str,
        content_hash: &str,
    ) -> Result<Vec<ResultRecord>, ServiceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    records: RwLock<HashMap<String, ResultRecord>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn upsert(&self, record: &ResultRecord) -> Result<(), ServiceError> {
        self.records
            .write()
            .await
            .insert(record.key.to_string(), record.clone());
        Ok(())
    }

    async fn get(&self, key: &ResultKey) -> Result<Option<ResultRecord>, ServiceError> {
        Ok(self.records.read().await.get(&key.to_string()).cloned())
    }

    async fn find_by_fingerprint(
        &self,
        assignment_id: &str,
        content_hash: &str,
    ) -> Result<Vec<ResultRecord>, ServiceError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.has_fingerprint(assignment_id, content_hash))
            .cloned()
            .collect())
    }
}

/// One JSON document per key under `{root}/results/`.
#[derive(Debug, Clone)]
pub struct JsonFileResultStore {
    root: PathBuf,
}

impl JsonFileResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &ResultKey) -> PathBuf {
        result_path(&self.root, &key.to_string())
    }
}

/// Write to `{path}.tmp` then rename into place.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ServiceError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl ResultStore for JsonFileResultStore {
    async fn upsert(&self, record: &ResultRecord) -> Result<(), ServiceError> {
        ensure_dir(results_dir(&self.root))?;
        let pretty = serde_json::to_string_pretty(record)?;
        write_atomic(&self.path_for(&record.key), pretty.as_bytes()).await
    }

    async fn get(&self, key: &ResultKey) -> Result<Option<ResultRecord>, ServiceError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_fingerprint(
        &self,
        assignment_id: &str,
        content_hash: &str,
    ) -> Result<Vec<ResultRecord>, ServiceError> {
        let dir = results_dir(&self.root);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let raw = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<ResultRecord>(&raw) {
                Ok(record) if record.has_fingerprint(assignment_id, content_hash) => found.push(record),
                Ok(_) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable result"),
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(assignment: &str, student: &str, hash: &str) -> ResultRecord {
        ResultRecord {
            key: ResultKey::new(assignment, student),
            score: 0.5,
            justification: "P1 (from main.py): ok".into(),
            part_results: vec![],
            fingerprints: vec![SubmissionFingerprint {
                content_hash: hash.into(),
                student_id: student.into(),
                assignment_id: assignment.into(),
            }],
            is_plagiarized: false,
            plagiarism: None,
            debug_info: None,
            graded_at: Utc::now(),
        }
    }

    #[test]
    fn key_formats() {
        assert_eq!(ResultKey::new("a1", "s1").to_string(), "a1-s1");
        assert_eq!(
            ResultKey::new("a1", "s1")
                .with_course(Some("c9".into()))
                .with_file(Some("f3".into()))
                .to_string(),
            "c9-a1-s1-f3"
        );
    }

    #[tokio::test]
    async fn in_memory_upsert_replaces() {
        let store = InMemoryResultStore::new();
        let mut r = record("a1", "s1", "h");
        store.upsert(&r).await.unwrap();
        r.score = 1.0;
        store.upsert(&r).await.unwrap();

        assert_eq!(store.len().await, 1);
        let got = store.get(&r.key).await.unwrap().unwrap();
        assert_eq!(got.score, 1.0);
    }

    #[tokio::test]
    async fn json_store_round_trips_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileResultStore::new(dir.path());

        assert!(store.get(&ResultKey::new("a1", "s1")).await.unwrap().is_none());
        assert!(store.find_by_fingerprint("a1", "h").await.unwrap().is_empty());

        store.upsert(&record("a1", "s1", "h")).await.unwrap();
        store.upsert(&record("a2", "s2", "h")).await.unwrap();
        tokio::fs::write(dir.path().join("results").join("junk.json"), "{not json")
            .await
            .unwrap();

        let path = store.path_for(&ResultKey::new("a1", "s1"));
        assert!(path.ends_with("results/a1-s1.json"));
        assert!(!path.with_extension("json.tmp").exists());

        let hits = store.find_by_fingerprint("a1", "h").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key.student_id, "s1");
    }
}
