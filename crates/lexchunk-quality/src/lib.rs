//! lexchunk-quality
//!
//! Content gates applied to raw documents and to produced chunks:
//! [`DocumentValidator`] (length, meaningful-character ratio, forbidden
//! patterns, degenerate content) and [`Deduplicator`] (exact and windowed
//! fuzzy signatures).

pub mod dedup;
pub mod validator;

pub use dedup::{content_hash, fuzzy_signature, normalize_text, Dedupable, DedupOutcome, Deduplicator, DuplicateIndex, DuplicateKind, DuplicateMatch};
pub use validator::{BatchValidation, DocumentValidator, ValidationIssue, ValidationResult};
