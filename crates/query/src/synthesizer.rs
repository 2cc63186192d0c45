use anyhow::Result;
use async_trait::async_trait;

use extract::{OllamaClient, TextGenerator};

/// Produces the final answer from retrieved context.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(&self, context: &str, question: &str) -> Result<String>;
}

pub fn build_answer_prompt(context: &str, question: &str) -> String {
    format!(
        r#"Answer the question based only on the following context:
{}

Question: {}
Use natural language and be concise.
Answer:"#,
        context, question
    )
}

/// Answers with a plain-text completion model.
pub struct LlmSynthesizer<G = OllamaClient> {
    llm: G,
}

impl<G: TextGenerator> LlmSynthesizer<G> {
    pub fn new(llm: G) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl<G: TextGenerator> AnswerSynthesizer for LlmSynthesizer<G> {
    async fn synthesize(&self, context: &str, question: &str) -> Result<String> {
        let prompt = build_answer_prompt(context, question);
        let answer = self.llm.generate(&prompt).await?;
        Ok(answer.trim().to_string())
    }
}
