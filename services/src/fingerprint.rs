use sha2::{Digest, Sha256};
use util::grading::{SubmissionArtifact, SubmissionFingerprint};

/// Lower-case hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// One fingerprint per artifact that carries raw bytes, in artifact order.
/// Identical artifacts within one submission collapse to a single entry.
pub fn fingerprint_artifacts(
    artifacts: &[SubmissionArtifact],
    student_id: &str,
    assignment_id: &str,
) -> Vec<SubmissionFingerprint> {
    let mut out: Vec<SubmissionFingerprint> = Vec::new();
    for artifact in artifacts.iter().filter(|a| !a.bytes.is_empty()) {
        let content_hash = content_hash(&artifact.bytes);
        if out.iter().any(|f| f.content_hash == content_hash) {
            continue;
        }
        out.push(SubmissionFingerprint {
            content_hash,
            student_id: student_id.to_string(),
            assignment_id: assignment_id.to_string(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(id: &str, bytes: &[u8]) -> SubmissionArtifact {
        SubmissionArtifact {
            file_id: id.into(),
            name: None,
            mime_type: None,
            bytes: bytes.to_vec(),
            text: String::new(),
        }
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn skips_empty_and_repeated_artifacts() {
        let fps = fingerprint_artifacts(
            &[artifact("1", b"x"), artifact("2", b""), artifact("3", b"x"), artifact("4", b"y")],
            "s1",
            "a1",
        );
        assert_eq!(fps.len(), 2);
        assert_eq!(fps[0].content_hash, content_hash(b"x"));
        assert_eq!(fps[1].student_id, "s1");
        assert_eq!(fps[1].assignment_id, "a1");
    }
}
