use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::QaError;
use crate::result::RetrievalResult;
use crate::retriever::{build_result, render_text, EntityRetrieval, StructuredRetriever};
use crate::synthesizer::AnswerSynthesizer;
use extract::EntityExtractor;

/// Which extracted entities feed the visualization graph.
///
/// The text context always uses every entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphScope {
    /// Only the first extracted entity.
    #[default]
    Primary,
    All,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaTrace {
    pub entities_found: usize,
    pub entities_unmatched: usize,
    pub entities_failed: usize,
    pub relationships: usize,
    pub context_size: usize,
    pub extraction_ms: u64,
    pub retrieval_ms: u64,
    pub synthesis_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QaAnswer {
    pub answer: String,
    pub entities: Vec<String>,
    pub context: String,
    pub graph: RetrievalResult,
    pub trace: QaTrace,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub entities: Vec<String>,
    pub graph: RetrievalResult,
}

/// Wrap retrieved text the way the answer prompt expects it.
pub fn build_context(structured: &str) -> String {
    format!("Structured data:\n{}", structured)
}

/// Question in, answer and subgraph out.
pub struct GraphQa {
    extractor: Arc<dyn EntityExtractor>,
    retriever: StructuredRetriever,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    default_entity: Option<String>,
    graph_scope: GraphScope,
}

impl GraphQa {
    pub fn new(
        extractor: Arc<dyn EntityExtractor>,
        retriever: StructuredRetriever,
        synthesizer: Arc<dyn AnswerSynthesizer>,
    ) -> Self {
        Self {
            extractor,
            retriever,
            synthesizer,
            default_entity: None,
            graph_scope: GraphScope::default(),
        }
    }

    /// Entity to fall back on when extraction finds nothing.
    pub fn with_default_entity(mut self, default_entity: Option<String>) -> Self {
        self.default_entity = default_entity.filter(|e| !e.trim().is_empty());
        self
    }

    pub fn with_graph_scope(mut self, graph_scope: GraphScope) -> Self {
        self.graph_scope = graph_scope;
        self
    }

    pub fn retriever(&self) -> &StructuredRetriever {
        &self.retriever
    }

    pub async fn extract_entities(&self, question: &str) -> Result<Vec<String>, QaError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QaError::EmptyQuestion);
        }

        let mut entities = self
            .extractor
            .extract(question)
            .await
            .map_err(QaError::Extraction)?;

        if entities.is_empty() {
            if let Some(default) = &self.default_entity {
                debug!(default = %default, "no entities found, using default");
                entities.push(default.clone());
            }
        }

        info!(?entities, "entities extracted");
        Ok(entities)
    }

    fn scoped<'a>(&self, retrievals: &'a [EntityRetrieval]) -> &'a [EntityRetrieval] {
        match self.graph_scope {
            GraphScope::Primary => &retrievals[..retrievals.len().min(1)],
            GraphScope::All => retrievals,
        }
    }

    pub async fn ask(&self, question: &str) -> Result<QaAnswer, QaError> {
        let started = Instant::now();
        let entities = self.extract_entities(question).await?;
        let extraction_ms = started.elapsed().as_millis() as u64;

        let started = Instant::now();
        let retrievals = self.retriever.retrieve_all(&entities).await;
        let context = build_context(&render_text(&retrievals));
        let graph = build_result(self.scoped(&retrievals));
        let retrieval_ms = started.elapsed().as_millis() as u64;
        debug!(context = %context, "structured context built");

        let started = Instant::now();
        let answer = self
            .synthesizer
            .synthesize(&context, question.trim())
            .await
            .map_err(QaError::Synthesis)?;
        let synthesis_ms = started.elapsed().as_millis() as u64;

        let all = build_result(&retrievals);
        let trace = QaTrace {
            entities_found: entities.len(),
            entities_unmatched: all.unmatched.len(),
            entities_failed: all.failed.len(),
            relationships: all.relationships.len(),
            context_size: context.len(),
            extraction_ms,
            retrieval_ms,
            synthesis_ms,
        };
        info!(
            entities = trace.entities_found,
            relationships = trace.relationships,
            nodes = graph.nodes.len(),
            "answer generated"
        );

        Ok(QaAnswer {
            answer,
            entities,
            context,
            graph,
            trace,
        })
    }

    /// Subgraph for the visualization consumer, honoring the graph scope.
    pub async fn graph(&self, question: &str) -> Result<GraphView, QaError> {
        let entities = self.extract_entities(question).await?;
        let retrievals = match self.graph_scope {
            GraphScope::Primary => self.retriever.retrieve_all(&entities[..entities.len().min(1)]).await,
            GraphScope::All => self.retriever.retrieve_all(&entities).await,
        };
        let graph = build_result(&retrievals);

        info!(
            nodes = graph.nodes.len(),
            relationships = graph.relationships.len(),
            "graph generated"
        );
        Ok(GraphView { entities, graph })
    }
}
