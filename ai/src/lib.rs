//! The grading oracle: language detection, OCR repair, stdin detection,
//! test-case generation, conceptual grading and program splitting.
//!
//! Every capability sits behind the [`Oracle`] trait so the pipeline can run
//! against the hosted model ([`GeminiOracle`]), the deterministic offline
//! rules ([`HeuristicOracle`]), or a test double.

pub mod error;
pub mod gemini;
pub mod heuristic;
pub mod oracle;

pub use error::OracleError;
pub use gemini::GeminiOracle;
pub use heuristic::HeuristicOracle;
pub use oracle::{ConceptualRequest, ConceptualVerdict, Oracle, with_deadline};
