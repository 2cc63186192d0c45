use std::time::Duration;
use thiserror::Error;

/// Errors raised by a graph store binding.
///
/// A store that simply has no matching node does not produce an error; the
/// retriever reports that case separately.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("graph store connection failed: {0}")]
    Connection(String),

    #[error("graph query failed: {0}")]
    Query(String),

    #[error("unexpected graph query result: {0}")]
    Decode(String),

    #[error("graph query timed out after {0:?}")]
    Timeout(Duration),

    #[error("graph document error: {0}")]
    Document(String),
}

impl From<neo4rs::Error> for StoreError {
    fn from(e: neo4rs::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}
