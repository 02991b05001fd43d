mod chat;
mod health;
mod limiter;
mod metrics;
mod price;
mod snapshot;
mod wallet;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::state::AppState;

pub use chat::chat_handler;
pub use health::health_handler;
pub use limiter::limiter_handler;
pub use metrics::metrics_handler;
pub use price::price_handler;
pub use snapshot::snapshot_handler;
pub use wallet::{wallet_refresh_handler, wallet_select_handler, wallet_view_handler};

// creating the router with routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/subscan", post(snapshot_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/price", get(price_handler))
        .route("/api/limiter", get(limiter_handler))
        .route("/api/wallet", get(wallet_view_handler))
        .route("/api/wallet/select", post(wallet_select_handler))
        .route("/api/wallet/refresh", post(wallet_refresh_handler))
        .layer(middleware::from_fn(crate::metrics::track_requests))
        .with_state(state)
}
