//! # Scorer Module
//!
//! Combines per-part results into the final [`GradingResult`].

use crate::error::MarkerError;
use util::grading::{GradingResult, PartOutcome, PartResult, clamp_score};

pub const PLAGIARISM_JUSTIFICATION: &str = "Plagiarism detected (exact file match).";

/// `P{n} (from {source}): {justification}`, with the provenance dropped when unknown.
pub fn part_label(result: &PartResult) -> String {
    match &result.source {
        Some(source) => format!("P{} (from {}): {}", result.part_index + 1, source, result.justification),
        None => format!("P{}: {}", result.part_index + 1, result.justification),
    }
}

/// Mean of the clamped part scores, with part justifications joined by `" | "`.
///
/// # Errors
///
/// [`MarkerError::EmptyParts`] when `results` is empty; every question part
/// must have produced a result before aggregation.
///
/// # Example
///
/// ```
/// use marker::scorer::aggregate;
/// use util::grading::{PartOutcome, PartResult};
///
/// let results = vec![
///     PartResult::new(0, 1.0, "Passed 3/3 test cases.", PartOutcome::Scored),
///     PartResult::zero(1, "No submission found.", PartOutcome::NoSubmission),
/// ];
/// let graded = aggregate(results).unwrap();
/// assert_eq!(graded.score, 0.5);
/// assert_eq!(graded.justification, "P1: Passed 3/3 test cases. | P2: No submission found.");
/// ```
pub fn aggregate(mut results: Vec<PartResult>) -> Result<GradingResult, MarkerError> {
    if results.is_empty() {
        return Err(MarkerError::EmptyParts);
    }
    results.sort_by_key(|r| r.part_index);

    let total: f64 = results.iter().map(|r| clamp_score(r.score)).sum();
    let score = clamp_score(total / results.len() as f64);

    let justification = results.iter().map(part_label).collect::<Vec<_>>().join(" | ");

    Ok(GradingResult {
        score,
        justification,
        part_results: results,
        is_plagiarized: false,
        plagiarism: None,
        debug_info: None,
    })
}

/// Fixed zero-score result for a submission that duplicates another student's.
pub fn plagiarism_result(match_info: util::grading::PlagiarismMatch) -> GradingResult {
    let debug = format!(
        "Matched student {} (record {}) on hash {}",
        match_info.matched_student, match_info.matched_record, match_info.matched_hash
    );
    GradingResult {
        score: 0.0,
        justification: PLAGIARISM_JUSTIFICATION.to_string(),
        part_results: Vec::new(),
        is_plagiarized: true,
        plagiarism: Some(match_info),
        debug_info: Some(debug),
    }
}

/// `true` when every part ended without a submission.
pub fn nothing_submitted(results: &[PartResult]) -> bool {
    results.iter().all(|r| r.outcome == PartOutcome::NoSubmission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use util::grading::{PlagiarismMatch, SubmissionFragment};

    #[test]
    fn empty_is_an_error() {
        assert!(matches!(aggregate(vec![]), Err(MarkerError::EmptyParts)));
    }

    #[test]
    fn all_missing_is_exactly_zero() {
        let results = (0..3)
            .map(|i| PartResult::zero(i, "No submission found.", PartOutcome::NoSubmission))
            .collect::<Vec<_>>();
        assert!(nothing_submitted(&results));
        let r = aggregate(results).unwrap();
        assert_eq!(r.score, 0.0);
        assert_eq!(r.part_results.len(), 3);
    }

    #[test]
    fn labels_include_provenance_and_order_by_part() {
        let frag = SubmissionFragment::new(0, "code").with_source("q2.py");
        let results = vec![
            PartResult::new(1, 0.5, "Passed 1/2 test cases.", PartOutcome::Scored).from_fragment(&frag),
            PartResult::new(0, 1.0, "Conceptual check: uses return.", PartOutcome::Scored),
        ];
        let r = aggregate(results).unwrap();
        assert_eq!(
            r.justification,
            "P1: Conceptual check: uses return. | P2 (from q2.py): Passed 1/2 test cases."
        );
        assert!((r.score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let mut a = PartResult::new(0, 1.0, "x", PartOutcome::Scored);
        a.score = 7.0;
        let mut b = PartResult::new(1, 0.0, "y", PartOutcome::Scored);
        b.score = f64::NAN;
        let r = aggregate(vec![a, b]).unwrap();
        assert_eq!(r.score, 0.5);
    }

    #[test]
    fn plagiarism_result_is_flagged_zero() {
        let r = plagiarism_result(PlagiarismMatch {
            matched_student: "alice".into(),
            matched_record: "a1-alice".into(),
            matched_hash: "abc".into(),
        });
        assert_eq!(r.score, 0.0);
        assert!(r.is_plagiarized);
        assert_eq!(r.justification, PLAGIARISM_JUSTIFICATION);
        assert!(r.debug_info.unwrap().contains("alice"));
    }
}
