mod cache;
mod config;
mod context;
mod dashboard;
mod error;
mod handlers;
mod metrics;
mod models;
mod openai;
mod polkassembly;
mod price;
mod rate_limit;
mod state;
mod subscan;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Args;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        error!(%err, "gateway exited with error");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_args(&args)?);
    if !state.subscan.has_key() {
        warn!("no Subscan API key configured, account snapshots are disabled");
    }
    if !state.openai.has_key() {
        warn!("no OpenAI API key configured, chat is disabled");
    }

    let app = handlers::router(state);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, network = %args.network, "gateway listening");
    info!(
        max_calls = args.rate_limit,
        window_ms = args.rate_window_ms,
        backoff_ms = args.rate_backoff_ms,
        "subscan rate limit"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
