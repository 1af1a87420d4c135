//! OpenAI-backed LLM client.

use super::{LlmClient, TextStream};
use crate::config::LlmSettings;
use crate::error::{MaestroError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs, EmbeddingInput, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// OpenAI-based LLM client for generation, structured output, streaming,
/// and embeddings.
pub struct OpenAiLlm {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    embedding_model: String,
    dimensions: usize,
}

impl OpenAiLlm {
    /// Create a client from settings, with a timeout to prevent hung calls.
    pub fn new(settings: &LlmSettings) -> Self {
        Self::with_timeout(settings, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(settings: &LlmSettings, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client: async_openai::Client::with_config(OpenAIConfig::default())
                .with_http_client(http_client),
            model: settings.model.clone(),
            embedding_model: settings.embedding_model.clone(),
            dimensions: settings.embedding_dimensions as usize,
        }
    }

    fn user_message(prompt: &str) -> Result<Vec<ChatCompletionRequestMessage>> {
        Ok(vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(|e| MaestroError::Llm(e.to_string()))?
            .into()])
    }
}

#[async_trait]
impl LlmClient for OpenAiLlm {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MaestroError::Llm("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // OpenAI has a limit on batch size, process in chunks
        const BATCH_SIZE: usize = 100;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.embedding_model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| MaestroError::Llm(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| MaestroError::Llm(format!("Embedding API error: {}", e)))?;

            // Sort by index to ensure correct order
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            for embedding_data in embeddings {
                all_embeddings.push(embedding_data.embedding);
            }
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    #[instrument(skip(self, prompt))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::user_message(prompt)?)
            .build()
            .map_err(|e| MaestroError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| MaestroError::Llm(format!("Chat API error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| MaestroError::Llm("Empty response from LLM".to_string()))
    }

    #[instrument(skip(self, prompt, schema))]
    async fn generate_structured(
        &self,
        prompt: &str,
        schema_name: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::user_message(prompt)?)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: schema_name.to_string(),
                    description: None,
                    schema: Some(schema.clone()),
                    strict: Some(true),
                },
            })
            .build()
            .map_err(|e| MaestroError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| MaestroError::Llm(format!("Chat API error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| MaestroError::Llm("Empty structured response from LLM".to_string()))?;

        serde_json::from_str(&content)
            .map_err(|e| MaestroError::Llm(format!("Structured response is not JSON: {}", e)))
    }

    #[instrument(skip(self, prompt))]
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::user_message(prompt)?)
            .stream(true)
            .build()
            .map_err(|e| MaestroError::Llm(e.to_string()))?;

        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| MaestroError::Llm(format!("Chat API error: {}", e)))?;

        let fragments = stream.filter_map(|item| async move {
            match item {
                Ok(response) => response
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.clone())
                    .map(Ok),
                Err(e) => Some(Err(MaestroError::Llm(format!("Streaming error: {}", e)))),
            }
        });

        Ok(Box::pin(fragments))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
