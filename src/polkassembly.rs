use serde_json::json;
use tracing::warn;

use crate::error::UpstreamError;
use crate::models::{PolkassemblyResponse, UserActivities};

pub const USER_ACTIVITIES_PATH: &str = "api/v1/users/user-activities";

#[derive(Clone)]
pub struct PolkassemblyClient {
    http: reqwest::Client,
    base_url: String,
    network: String,
}

impl PolkassemblyClient {
    pub fn new(http: reqwest::Client, base_url: String, network: String) -> Self {
        Self {
            http,
            base_url,
            network,
        }
    }

    /// Latest governance activity of `address`; `None` when Polkassembly fails.
    pub async fn user_activities(&self, address: &str) -> Option<UserActivities> {
        match self.fetch_activities(address).await {
            Ok(activities) => Some(activities),
            Err(err) => {
                warn!(endpoint = USER_ACTIVITIES_PATH, error = %err, "polkassembly request failed");
                None
            }
        }
    }

    async fn fetch_activities(&self, address: &str) -> Result<UserActivities, UpstreamError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), USER_ACTIVITIES_PATH);
        let res = self
            .http
            .post(url)
            .header("X-Network", &self.network)
            .json(&json!({ "address": address, "limit": 10, "page": 0 }))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(UpstreamError::Status(res.status()));
        }

        let body: PolkassemblyResponse<UserActivities> = res.json().await?;
        if let Some(error) = body.error.filter(|e| !e.is_empty()) {
            return Err(UpstreamError::Api(error));
        }
        Ok(body.data.unwrap_or_default())
    }
}
