use thiserror::Error;

/// Failures that abort answering a question.
///
/// Store failures never appear here; they stay with the entity that hit them
/// and are reported inside the retrieval output.
#[derive(Error, Debug)]
pub enum QaError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error("entity extraction failed: {0:#}")]
    Extraction(#[source] anyhow::Error),

    #[error("answer synthesis failed: {0:#}")]
    Synthesis(#[source] anyhow::Error),
}

impl QaError {
    /// Pipeline stage that failed, for logs and API responses.
    pub fn stage(&self) -> &'static str {
        match self {
            QaError::EmptyQuestion => "input",
            QaError::Extraction(_) => "extraction",
            QaError::Synthesis(_) => "synthesis",
        }
    }
}
