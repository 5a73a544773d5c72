//! OpenAI-style chat-completions client behind the generation trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragkit_core::config::GenerationSettings;
use ragkit_core::error::{Error, Result};
use ragkit_core::traits::GenerationBackend;

pub struct OpenAiGeneration {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OpenAiGeneration {
    /// Missing credentials fail fast here, before any request is issued.
    pub fn new(settings: &GenerationSettings) -> Result<Self> {
        if settings.api_key.is_empty() {
            return Err(Error::InvalidConfig("generation.api_key is required".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenAiGeneration {
    fn model(&self) -> &str {
        &self.model
    }

    /// One completion call. Failures are not retried here; they propagate
    /// to the answering pipeline's caller.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature,
            max_tokens,
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("generation request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Backend(format!("generation request rejected: {e}")))?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Backend(format!("invalid generation response: {e}")))?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Backend("generation response had no choices".into()))?;
        debug!(model = %self.model, chars = answer.len(), "generation response");
        Ok(answer)
    }
}
