pub mod schema;
pub mod normalizer;
pub mod llm;
pub mod prompt;

pub use schema::Entities;
pub use normalizer::EntityNormalizer;
pub use llm::{OllamaClient, TextGenerator};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

/// Turns a question into the entity names it mentions.
///
/// An empty list is a valid answer. Errors are reserved for the call itself
/// failing, so callers can tell "nothing mentioned" from "could not ask".
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, question: &str) -> Result<Vec<String>>;
}

/// Entity extraction through a JSON-mode completion model.
pub struct Extractor<G = OllamaClient> {
    llm_client: G,
    max_retries: usize,
}

impl<G: TextGenerator> Extractor<G> {
    pub fn new(llm_client: G) -> Self {
        Self {
            llm_client,
            max_retries: 3,
        }
    }
}

/// Parse the model's JSON reply and tidy the names.
pub fn parse_entities(json_str: &str) -> Result<Vec<String>> {
    let entities: Entities = serde_json::from_str(json_str)
        .context("Failed to parse entity extraction result")?;

    Ok(EntityNormalizer::normalize_all(entities.names))
}

#[async_trait]
impl<G: TextGenerator> EntityExtractor for Extractor<G> {
    async fn extract(&self, question: &str) -> Result<Vec<String>> {
        let prompt = prompt::build_entity_prompt(question);

        let json_str = llm::generate_json_with_retry(&self.llm_client, &prompt, self.max_retries)
            .await
            .context("Failed to extract entities after retries")?;

        let names = parse_entities(&json_str)?;
        debug!(?names, "entities extracted");

        Ok(names)
    }
}
