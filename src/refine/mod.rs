//! LLM refinement of caption transcripts.
//!
//! Raw captions are split into fixed-size batches and sent to a chat model,
//! which reconstructs full sentences and attributes speakers. A batch that
//! cannot be refined falls back to its raw text, so refinement never fails
//! as a whole.

mod chunked;

pub use chunked::{parse_refinement_response, BatchOutcome, ChunkedRefiner, RefinedLine};

use crate::config::RefinementSettings;
use crate::error::{Result, TekstError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;

/// A chat completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a system and user prompt, returning the assistant's text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Chat completions through the OpenAI API.
pub struct OpenAiCompletionClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiCompletionClient {
    pub fn new(settings: &RefinementSettings) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| TekstError::OpenAI(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| TekstError::OpenAI(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| TekstError::OpenAI(e.to_string()))?;

        debug!("Sending refinement request to {}", self.model);

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| TekstError::OpenAI(format!("Refinement error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| TekstError::RefinementParseFailure("Empty response".to_string()))
    }
}
