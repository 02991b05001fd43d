use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::models::{ChatMessage, CompletionRequest, CompletionResponse};

const COMPLETIONS_PATH: &str = "v1/chat/completions";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1000;

pub const NO_RESPONSE: &str = "No response generated";

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, base_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            http,
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model,
        }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Runs one chat completion and returns the first choice's text.
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, UpstreamError> {
        let api_key = self.api_key.as_deref().ok_or(UpstreamError::MissingKey("OpenAI"))?;
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), COMPLETIONS_PATH);
        let request = CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        debug!(model = %self.model, messages = request.messages.len(), "requesting completion");
        let res = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            warn!(%status, "openai rejected completion");
            return Err(UpstreamError::Status(status));
        }

        let body: CompletionResponse = res.json().await?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }
}
