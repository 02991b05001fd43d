use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::error::ApiError;
use crate::state::AppState;
use crate::subscan::is_supported_chain;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequest {
    #[serde(default)]
    pub chain_key: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

// Full account snapshot for the analytics view
pub async fn snapshot_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SnapshotRequest>,
) -> Result<Json<Value>, ApiError> {
    if !state.subscan.has_key() {
        return Err(ApiError::NotConfigured("Subscan API key not configured".to_string()));
    }

    let present = |field: Option<String>| field.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
    let (Some(chain), Some(address)) = (present(payload.chain_key), present(payload.address)) else {
        return Err(ApiError::BadRequest("Missing chainKey or address".to_string()));
    };
    if !is_supported_chain(&chain) {
        return Err(ApiError::BadRequest(format!("Unsupported chain: {chain}")));
    }

    info!(chain = %chain, address = %address, "fetching account snapshot");
    let snapshot = state
        .subscan
        .account_snapshot(&chain, &address)
        .await
        .map_err(|err| {
            error!(chain = %chain, error = %err, "account snapshot failed");
            ApiError::from(err)
        })?;

    Ok(Json(json!({ "success": true, "data": snapshot })))
}
