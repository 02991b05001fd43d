//! In-process stand-ins for Subscan, Polkassembly, CoinGecko and OpenAI.
//!
//! Addresses pick the scenario: `alice` has a little of everything, `empty`
//! has nothing, `missing` makes every upstream fail, `whale` has 203
//! transfers and `bottomless` never runs out of transfer pages.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::dashboard::WalletDashboard;
use crate::openai::OpenAiClient;
use crate::polkassembly::PolkassemblyClient;
use crate::price::PriceService;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::AppState;
use crate::subscan::SubscanClient;

pub const TEST_API_KEY: &str = "test-subscan-key";

pub struct FakeUpstream {
    pub url: String,
}

pub async fn fake_upstream() -> FakeUpstream {
    let app = Router::new()
        .route("/api/v2/scan/search", post(search))
        .route("/api/scan/token", get(token))
        .route("/api/v2/scan/transfers", post(transfers))
        .route("/api/v2/scan/extrinsics", post(extrinsics))
        .route("/api/scan/staking_history", post(staking_history))
        .route("/api/scan/referenda/votes", post(referenda_votes))
        .route("/api/v2/scan/account/tokens", post(account_tokens))
        .route("/api/v2/scan/account/transfer", post(account_transfer))
        .route("/api/v1/users/user-activities", post(user_activities))
        .route("/api/v3/simple/price", get(simple_price))
        .route("/v1/chat/completions", post(completions));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    FakeUpstream {
        url: format!("http://{addr}"),
    }
}

/// Limiter loose enough that tests never wait on it.
pub fn test_limiter() -> RateLimiter {
    RateLimiter::new(RateLimitConfig {
        max_calls: 10_000,
        window: Duration::from_secs(1),
        backoff: Duration::from_millis(1),
    })
}

pub async fn test_state(subscan_key: Option<&str>, openai_key: Option<&str>) -> Arc<AppState> {
    let upstream = fake_upstream().await;
    let http = reqwest::Client::new();
    let limiter = test_limiter();

    let subscan = SubscanClient::new(
        http.clone(),
        upstream.url.clone(),
        subscan_key.map(str::to_string),
        limiter.clone(),
    );
    let polkassembly = PolkassemblyClient::new(http.clone(), upstream.url.clone(), "polkadot".into());

    Arc::new(AppState {
        dashboard: WalletDashboard::new(subscan.clone(), polkassembly, "polkadot".into(), 16),
        openai: OpenAiClient::new(
            http.clone(),
            upstream.url.clone(),
            openai_key.map(str::to_string),
            "gpt-4o-mini".into(),
        ),
        price: PriceService::new(http, upstream.url),
        limiter,
        subscan,
    })
}

fn subscan_reply(headers: &HeaderMap, data: Option<Value>) -> Response {
    let key = headers.get("X-API-Key").and_then(|v| v.to_str().ok());
    if key != Some(TEST_API_KEY) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }

    let body = match data {
        Some(data) => json!({
            "code": 0,
            "message": "Success",
            "generated_at": 1_700_000_000,
            "data": data,
        }),
        None => json!({
            "code": 10004,
            "message": "Record Not Found",
            "generated_at": 1_700_000_000,
            "data": null,
        }),
    };
    Json(body).into_response()
}

fn field<'a>(body: &'a Value, name: &str) -> &'a str {
    body.get(name).and_then(Value::as_str).unwrap_or_default()
}

fn list(items: Vec<Value>) -> Option<Value> {
    Some(json!({ "count": items.len(), "list": items }))
}

async fn search(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let data = match field(&body, "key") {
        "missing" => None,
        address => Some(json!({
            "account": { "address": address, "balance": "12.5", "nonce": 3 }
        })),
    };
    subscan_reply(&headers, data)
}

async fn token(headers: HeaderMap) -> Response {
    let detail = json!({
        "detail": {
            "USDT": { "symbol": "USDT", "token_decimals": 6, "price": "1", "is_native": false },
            "DOT": { "symbol": "DOT", "token_decimals": 10, "price": "6.5", "is_native": true },
        }
    });
    subscan_reply(&headers, Some(detail))
}

async fn transfers(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let page = body.get("page").and_then(Value::as_u64).unwrap_or(0);
    let count = match field(&body, "address") {
        "missing" => return subscan_reply(&headers, None),
        "empty" => 0,
        "whale" => match page {
            0 | 1 => 100,
            2 => 3,
            _ => 0,
        },
        "bottomless" => 100,
        _ => 2,
    };

    let transfers: Vec<Value> = (0..count)
        .map(|i| json!({ "hash": format!("0x{page:02}{i:03}"), "amount": "1.5", "success": true }))
        .collect();
    subscan_reply(&headers, Some(json!({ "count": count, "transfers": transfers })))
}

async fn extrinsics(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let data = match field(&body, "address") {
        "missing" => None,
        "empty" => Some(json!({ "count": 0, "extrinsics": null })),
        _ => Some(json!({
            "count": 1,
            "extrinsics": [{ "extrinsic_hash": "0xdef", "call_module": "balances", "success": true }]
        })),
    };
    subscan_reply(&headers, data)
}

async fn staking_history(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let data = match field(&body, "address") {
        "missing" => None,
        "alice" => list(vec![json!({ "era": 1200, "amount": "5000000000", "event_id": "Reward" })]),
        _ => list(vec![]),
    };
    subscan_reply(&headers, data)
}

async fn referenda_votes(headers: HeaderMap) -> Response {
    subscan_reply(&headers, list(vec![]))
}

async fn account_tokens(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let data = match field(&body, "address") {
        "missing" => None,
        "alice" => list(vec![json!({
            "asset_id": "native",
            "symbol": "DOT",
            "balance": "10000000000",
            "decimals": 10,
            "price_usd": "6.5",
        })]),
        _ => list(vec![]),
    };
    subscan_reply(&headers, data)
}

async fn account_transfer(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let data = match field(&body, "address") {
        "missing" => None,
        "alice" => list(vec![json!({
            "hash": "0xabc",
            "block_num": 100,
            "block_timestamp": 1_700_000_000,
            "module": "balances",
            "call_module_function": "transfer",
            "fee": "0.01",
            "from_account_id": "alice",
            "to_account_id": "bob",
            "amount": "2",
            "success": true,
        })]),
        _ => list(vec![]),
    };
    subscan_reply(&headers, data)
}

async fn user_activities(Json(body): Json<Value>) -> Json<Value> {
    Json(match field(&body, "address") {
        "missing" => json!({ "data": null, "status": 404, "error": "User not found" }),
        "alice" => json!({
            "data": {
                "activities": [{
                    "id": 7,
                    "type": "vote",
                    "created_at": "2024-03-01T10:00:00Z",
                    "details": { "referendum_index": 42, "title": "Treasury proposal" }
                }],
                "totalCount": 1
            }
        }),
        _ => json!({ "data": { "activities": [], "totalCount": 0 } }),
    })
}

async fn simple_price() -> Json<Value> {
    Json(json!({ "polkadot": { "usd": 7.25 } }))
}

async fn completions(Json(body): Json<Value>) -> Json<Value> {
    let last = body
        .get("messages")
        .and_then(Value::as_array)
        .and_then(|messages| messages.last())
        .map(|message| field(message, "content"))
        .unwrap_or_default();

    Json(match last {
        "silence" => json!({ "choices": [] }),
        text => json!({
            "choices": [{ "message": { "role": "assistant", "content": format!("echo: {text}") } }]
        }),
    })
}
