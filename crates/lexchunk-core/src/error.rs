use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Tree-level problems found after parsing. Reported, never fatal: the
/// document still goes through chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("document is empty or whitespace-only")]
    EmptyDocument,

    #[error("no article-level node found")]
    NoArticles,
}

/// Data-quality findings accumulated while a document moves through the
/// pipeline. None of these abort processing; the orchestrator decides what
/// to escalate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Issue {
    #[error("structure: {0}")]
    Structure(StructureError),

    #[error("size constraint violated by {chunk_id}: {detail}")]
    SizeConstraintViolation { chunk_id: String, detail: String },

    #[error("{target} failed validation: {}", .issues.join("; "))]
    ValidationFailure { target: String, issues: Vec<String> },

    #[error("{item} duplicates {of} (similarity {similarity:.2})")]
    DuplicateDetected { item: String, of: String, similarity: f64 },
}

impl Issue {
    /// Short stable name used for histograms and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Issue::Structure(_) => "structure_error",
            Issue::SizeConstraintViolation { .. } => "size_constraint_violation",
            Issue::ValidationFailure { .. } => "validation_failure",
            Issue::DuplicateDetected { .. } => "duplicate_detected",
        }
    }
}

impl From<StructureError> for Issue {
    fn from(err: StructureError) -> Self {
        Issue::Structure(err)
    }
}
