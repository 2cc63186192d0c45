//! Structured retrieval over the knowledge graph and answer generation.
//!
//! [`StructuredRetriever`] turns entity names into the relationship subgraph
//! around them, as prompt text or as a node/edge index. [`GraphQa`] wires
//! entity extraction, retrieval and answer synthesis into one call.

pub mod error;
pub mod pipeline;
pub mod result;
pub mod retriever;
pub mod synthesizer;
pub mod traversal;

pub use error::QaError;
pub use pipeline::{build_context, GraphQa, GraphScope, GraphView, QaAnswer, QaTrace};
pub use result::{EntityFailure, IndexedRelationship, RetrievalResult};
pub use retriever::{EntityOutcome, EntityRetrieval, StructuredRetriever};
pub use synthesizer::{AnswerSynthesizer, LlmSynthesizer};
