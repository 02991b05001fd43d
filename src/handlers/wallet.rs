use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State};
use serde::Deserialize;

use crate::cache::RefreshOptions;
use crate::dashboard::{DashboardRefresh, DashboardView};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    #[serde(default)]
    pub address: Option<String>,
}

pub async fn wallet_view_handler(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.dashboard.view())
}

// Switches the wallet and returns what the panels show right away
pub async fn wallet_select_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SelectRequest>,
) -> Json<DashboardView> {
    state.dashboard.select(payload.address);
    Json(state.dashboard.view())
}

// An empty body means a plain refresh
pub async fn wallet_refresh_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<DashboardRefresh>, ApiError> {
    let options = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshOptions::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid refresh options: {e}")))?
    };

    Ok(Json(state.dashboard.refresh(options).await))
}
