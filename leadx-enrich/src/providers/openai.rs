//! OpenAI Chat Completion Client (cloud language-model tier)
//!
//! Sends a single user prompt framed by a short system instruction and
//! returns the trimmed text of the first choice. Parsing the reply is the
//! caller's job.
//!
//! Transport and authentication failures are returned as errors rather than
//! swallowed; the resolver decides whether they are fatal.

use crate::prompt::ENRICHMENT_SYSTEM_PROMPT;
use crate::types::{CompletionProvider, ProviderError, ResolutionSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Production API base URL
const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Chat completion endpoint path
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Default hosted model
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Reply budget; a `ZIP, City, State` answer fits comfortably
const DEFAULT_MAX_TOKENS: u32 = 50;

/// Default timeout for completion requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenAI chat completion client
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    system_prompt: String,
    max_tokens: u32,
}

impl OpenAIClient {
    /// Create new client with default model and enrichment system prompt
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            system_prompt: ENRICHMENT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Point the client at a different host (mock servers, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionProvider for OpenAIClient {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn source(&self) -> ResolutionSource {
        ResolutionSource::OpenAI
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        debug!(model = %self.model, prompt_length = prompt.len(), "Requesting chat completion");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
        };

        let url = format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Chat completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::Api(format!(
                "Chat completion returned error {}: {}",
                status, message
            )));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse chat completion: {}", e)))?;

        let Some(choice) = completion.choices.into_iter().next() else {
            return Err(ProviderError::NotAvailable(
                "Chat completion has no choices".to_string(),
            ));
        };

        let text = choice.message.content.unwrap_or_default().trim().to_string();
        debug!(reply = %text, "Chat completion received");
        Ok(text)
    }
}

// ============================================================================
// Chat Completion API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
