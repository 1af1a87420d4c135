//! LLM capability abstraction.
//!
//! The executor and indexer depend only on this contract, never on a
//! specific provider, so tests can substitute fakes.

mod openai;

pub use openai::OpenAiLlm;

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// A lazy, in-order, non-restartable sequence of generated text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for LLM inference providers.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate free text for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate output constrained to the given JSON schema.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema_name: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value>;

    /// Generate text as a stream of fragments for incremental delivery.
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
