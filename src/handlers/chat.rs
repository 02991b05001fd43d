use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::context::{prepare_context, system_prompt};
use crate::error::ApiError;
use crate::models::ChatMessage;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub context_type: Option<String>,
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    if !state.openai.has_key() {
        return Err(ApiError::NotConfigured("OpenAI API key not configured".to_string()));
    }
    if payload.messages.is_empty() {
        return Err(ApiError::BadRequest("Messages are required".to_string()));
    }

    let context_type = payload.context_type.as_deref();
    let context = payload
        .context
        .as_ref()
        .map(|context| prepare_context(context_type, context));

    let mut messages = Vec::with_capacity(payload.messages.len() + 1);
    messages.push(ChatMessage {
        role: "system".to_string(),
        content: system_prompt(context_type, context.as_ref()),
    });
    messages.extend(payload.messages);

    let message = state.openai.complete(messages).await.map_err(|err| {
        error!(error = %err, "chat completion failed");
        ApiError::from(err)
    })?;

    Ok(Json(json!({ "success": true, "message": message })))
}
