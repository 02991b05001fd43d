use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::UpstreamError;

const SIMPLE_PRICE_PATH: &str = "api/v3/simple/price?ids=polkadot&vs_currencies=usd";
const PRICE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub usd: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// DOT/USD spot price from CoinGecko, remembering the last good quote.
pub struct PriceService {
    http: reqwest::Client,
    base_url: String,
    last: RwLock<Option<(f64, DateTime<Utc>)>>,
}

impl PriceService {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self {
            http,
            base_url,
            last: RwLock::new(None),
        }
    }

    /// Fresh price when CoinGecko answers, otherwise the last good one (or 0).
    pub async fn dot_price(&self) -> PriceQuote {
        match self.fetch().await {
            Ok(usd) => {
                let now = Utc::now();
                *self.last.write().await = Some((usd, now));
                PriceQuote {
                    usd,
                    last_updated: Some(now),
                }
            }
            Err(err) => {
                warn!(error = %err, "price lookup failed, serving cached price");
                self.cached().await
            }
        }
    }

    pub async fn cached(&self) -> PriceQuote {
        match *self.last.read().await {
            Some((usd, at)) => PriceQuote {
                usd,
                last_updated: Some(at),
            },
            None => PriceQuote {
                usd: 0.0,
                last_updated: None,
            },
        }
    }

    async fn fetch(&self) -> Result<f64, UpstreamError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), SIMPLE_PRICE_PATH);
        let res = self.http.get(url).timeout(PRICE_TIMEOUT).send().await?;
        if !res.status().is_success() {
            return Err(UpstreamError::Status(res.status()));
        }

        let body: Value = res.json().await?;
        body.pointer("/polkadot/usd")
            .and_then(Value::as_f64)
            .filter(|price| price.is_finite())
            .ok_or_else(|| UpstreamError::Api("price missing from response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fake_upstream;

    #[tokio::test]
    async fn test_fresh_price() {
        let upstream = fake_upstream().await;
        let service = PriceService::new(reqwest::Client::new(), upstream.url.clone());

        let quote = service.dot_price().await;
        assert_eq!(quote.usd, 7.25);
        assert!(quote.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_failure_without_history_is_zero() {
        let service = PriceService::new(reqwest::Client::new(), "http://127.0.0.1:9".into());
        let quote = service.dot_price().await;
        assert_eq!(quote.usd, 0.0);
        assert!(quote.last_updated.is_none());
    }

    #[tokio::test]
    async fn test_failure_serves_last_good_price() {
        let upstream = fake_upstream().await;
        let service = PriceService::new(reqwest::Client::new(), upstream.url.clone());
        let first = service.dot_price().await;

        let service = PriceService {
            base_url: "http://127.0.0.1:9".into(),
            ..service
        };
        assert_eq!(service.dot_price().await, first);
    }
}
