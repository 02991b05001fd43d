use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::metrics::UPSTREAM_CALLS;
use crate::models::{
    AccountSnapshot, ExtrinsicsData, ListData, SubscanResponse, Token, TokenMetadata, Transaction,
    TransfersData,
};
use crate::rate_limit::RateLimiter;

pub const SEARCH_PATH: &str = "api/v2/scan/search";
pub const TOKEN_PATH: &str = "api/scan/token";
pub const TRANSFERS_PATH: &str = "api/v2/scan/transfers";
pub const EXTRINSICS_PATH: &str = "api/v2/scan/extrinsics";
pub const STAKING_HISTORY_PATH: &str = "api/scan/staking_history";
pub const REFERENDA_VOTES_PATH: &str = "api/scan/referenda/votes";
pub const ACCOUNT_TOKENS_PATH: &str = "api/v2/scan/account/tokens";
pub const ACCOUNT_TRANSFER_PATH: &str = "api/v2/scan/account/transfer";

const TRANSFER_PAGE_SIZE: usize = 100;
const MAX_TRANSFER_PAGES: usize = 5;

// Display name -> chain key
pub const SUPPORTED_CHAINS: &[(&str, &str)] = &[
    ("Polkadot", "polkadot"),
    ("Kusama", "kusama"),
    ("Acala", "acala"),
    ("Astar", "astar"),
    ("Moonbeam", "moonbeam"),
    ("Phala", "phala"),
    ("Bifrost", "bifrost"),
    ("Centrifuge", "centrifuge"),
    ("Parallel", "parallel"),
    ("HydraDX", "hydradx"),
    ("Litentry", "litentry"),
    ("Crust", "crust"),
    ("Darwinia", "darwinia"),
    ("Edgeware", "edgeware"),
    ("Karura", "karura"),
    ("Statemine", "statemine"),
    ("Statemint", "statemint"),
    ("Ternoa", "ternoa"),
    ("Unique", "unique"),
    ("Zeitgeist", "zeitgeist"),
];

pub fn is_supported_chain(chain: &str) -> bool {
    SUPPORTED_CHAINS.iter().any(|(_, key)| *key == chain)
}

/// Subscan client. Every request goes through the shared [`RateLimiter`].
#[derive(Clone)]
pub struct SubscanClient {
    http: reqwest::Client,
    url_template: String,
    api_key: Option<String>,
    limiter: RateLimiter,
}

impl SubscanClient {
    pub fn new(
        http: reqwest::Client,
        url_template: String,
        api_key: Option<String>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            http,
            url_template,
            api_key,
            limiter,
        }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self, chain: &str, path: &str) -> String {
        let base = self.url_template.replace("{chain}", chain);
        format!("{}/{}", base.trim_end_matches('/'), path)
    }

    // Sends one queued request and checks the envelope code
    async fn request(
        &self,
        method: Method,
        chain: &str,
        path: &str,
        body: Option<Value>,
    ) -> Result<SubscanResponse<Value>, UpstreamError> {
        let api_key = self.api_key.clone().ok_or(UpstreamError::MissingKey("Subscan"))?;
        let http = self.http.clone();
        let url = self.url(chain, path);

        let response = self
            .limiter
            .enqueue(move || async move {
                UPSTREAM_CALLS.inc();
                let mut request = http.request(method, &url).header("X-API-Key", api_key);
                if let Some(body) = body {
                    request = request.json(&body);
                }
                let res = request.send().await?;
                if !res.status().is_success() {
                    return Err(UpstreamError::Status(res.status()));
                }
                Ok::<_, UpstreamError>(res.json::<SubscanResponse<Value>>().await?)
            })
            .await??;

        if response.code != 0 {
            return Err(UpstreamError::Api(format!(
                "Subscan API Error: {}",
                response.message
            )));
        }
        Ok(response)
    }

    /// POSTs `params` to `path`. Any failure is logged and reported as `None`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        chain: &str,
        path: &str,
        params: Value,
    ) -> Option<SubscanResponse<T>> {
        let result = match self.request(Method::POST, chain, path, Some(params)).await {
            Ok(response) => response.decode().map_err(UpstreamError::from),
            Err(err) => Err(err),
        };

        match result {
            Ok(response) => Some(response),
            Err(err) => {
                warn!(chain, endpoint = path, error = %err, "subscan request failed");
                None
            }
        }
    }

    /// Account record from the search endpoint. Unlike the list helpers this
    /// one fails loudly, a snapshot without an account is useless.
    pub async fn search_account(&self, chain: &str, address: &str) -> Result<Value, UpstreamError> {
        let response = self
            .request(Method::POST, chain, SEARCH_PATH, Some(json!({ "key": address })))
            .await?;
        Ok(response
            .data
            .and_then(|data| data.get("account").cloned())
            .unwrap_or_else(|| json!({})))
    }

    pub async fn token_metadata(&self, chain: &str) -> TokenMetadata {
        let response = match self.request(Method::GET, chain, TOKEN_PATH, None).await {
            Ok(response) => response,
            Err(err) => {
                warn!(chain, error = %err, "token metadata unavailable");
                return TokenMetadata::default();
            }
        };

        let tokens: Vec<&Value> = match response.data.as_ref().and_then(|d| d.get("detail")) {
            Some(Value::Object(detail)) => detail.values().collect(),
            _ => Vec::new(),
        };
        let token = tokens
            .iter()
            .find(|t| t.get("is_native").and_then(Value::as_bool).unwrap_or(false))
            .or_else(|| tokens.first());

        match token {
            Some(token) => TokenMetadata {
                symbol: token
                    .get("symbol")
                    .and_then(Value::as_str)
                    .unwrap_or("N/A")
                    .to_string(),
                decimals: token
                    .get("token_decimals")
                    .and_then(as_u32)
                    .unwrap_or(10),
                price: token.get("price").and_then(as_f64).unwrap_or(0.0),
            },
            None => TokenMetadata::default(),
        }
    }

    /// Walks the transfer pages until one comes back short, empty or failed.
    pub async fn transfers(&self, chain: &str, address: &str) -> Vec<Value> {
        let mut all = Vec::new();

        for page in 0..MAX_TRANSFER_PAGES {
            let params = json!({
                "address": address,
                "direction": "all",
                "row": TRANSFER_PAGE_SIZE,
                "page": page,
            });
            let Some(response) = self
                .fetch_json::<TransfersData>(chain, TRANSFERS_PATH, params)
                .await
            else {
                break;
            };

            let transfers = response.data.and_then(|d| d.transfers).unwrap_or_default();
            let fetched = transfers.len();
            all.extend(transfers);
            if fetched < TRANSFER_PAGE_SIZE {
                break;
            }
        }

        debug!(chain, count = all.len(), "transfers fetched");
        all
    }

    pub async fn extrinsics(&self, chain: &str, address: &str) -> Vec<Value> {
        let params = json!({
            "address": address,
            "order": "desc",
            "page": 0,
            "row": 100,
            "success": true,
        });
        self.fetch_json::<ExtrinsicsData>(chain, EXTRINSICS_PATH, params)
            .await
            .and_then(|r| r.data)
            .and_then(|d| d.extrinsics)
            .unwrap_or_default()
    }

    pub async fn staking_history(&self, chain: &str, address: &str) -> Option<Vec<Value>> {
        self.list(chain, STAKING_HISTORY_PATH, json!({ "address": address, "page": 0, "row": 100 }))
            .await
    }

    pub async fn referenda_votes(&self, chain: &str, address: &str) -> Option<Vec<Value>> {
        self.list(chain, REFERENDA_VOTES_PATH, json!({ "address": address, "page": 0, "row": 100 }))
            .await
    }

    pub async fn account_tokens(&self, chain: &str, address: &str) -> Option<Vec<Token>> {
        self.list(chain, ACCOUNT_TOKENS_PATH, json!({ "address": address }))
            .await
    }

    pub async fn account_transfers(&self, chain: &str, address: &str) -> Option<Vec<Transaction>> {
        self.list(
            chain,
            ACCOUNT_TRANSFER_PATH,
            json!({ "address": address, "row": 25, "page": 0 }),
        )
        .await
    }

    async fn list<T: DeserializeOwned>(&self, chain: &str, path: &str, params: Value) -> Option<Vec<T>> {
        self.fetch_json::<ListData<T>>(chain, path, params)
            .await
            .map(|r| r.data.map(|d| d.list).unwrap_or_default())
    }

    /// Everything the analytics view shows for one account, fetched concurrently.
    pub async fn account_snapshot(
        &self,
        chain: &str,
        address: &str,
    ) -> Result<AccountSnapshot, UpstreamError> {
        let (account, token_metadata, transfers, extrinsics, staking, votes) = tokio::join!(
            self.search_account(chain, address),
            self.token_metadata(chain),
            self.transfers(chain, address),
            self.extrinsics(chain, address),
            self.staking_history(chain, address),
            self.referenda_votes(chain, address),
        );

        Ok(AccountSnapshot {
            account_data: account?,
            token_metadata,
            transfers,
            extrinsics,
            staking: staking.unwrap_or_default(),
            votes: votes.unwrap_or_default(),
            last_updated: chrono::Utc::now().to_rfc3339(),
        })
    }
}

// Subscan mixes numeric strings and numbers
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
