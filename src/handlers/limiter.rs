use std::sync::Arc;

use axum::{Json, extract::State};

use crate::rate_limit::LimiterStatus;
use crate::state::AppState;

pub async fn limiter_handler(State(state): State<Arc<AppState>>) -> Json<LimiterStatus> {
    Json(state.limiter.status())
}
