use std::sync::Arc;

use axum::{Json, extract::State};

use crate::price::PriceQuote;
use crate::state::AppState;

pub async fn price_handler(State(state): State<Arc<AppState>>) -> Json<PriceQuote> {
    Json(state.price.dot_price().await)
}
