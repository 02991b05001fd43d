use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{LoadableResource, LoadableState, RefreshOptions, RefreshResult};
use crate::models::{Token, Transaction, UserActivities};
use crate::polkassembly::PolkassemblyClient;
use crate::subscan::SubscanClient;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub balances: LoadableState<Vec<Token>>,
    pub transactions: LoadableState<Vec<Transaction>>,
    pub governance: LoadableState<UserActivities>,
    pub staking: LoadableState<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardRefresh {
    pub balances: RefreshResult<Vec<Token>>,
    pub transactions: RefreshResult<Vec<Transaction>>,
    pub governance: RefreshResult<UserActivities>,
    pub staking: RefreshResult<Vec<Value>>,
}

/// Single-wallet dashboard: one loadable panel per data source, all keyed by
/// the selected address.
pub struct WalletDashboard {
    balances: LoadableResource<Vec<Token>>,
    transactions: LoadableResource<Vec<Transaction>>,
    governance: LoadableResource<UserActivities>,
    staking: LoadableResource<Vec<Value>>,
}

impl WalletDashboard {
    pub fn new(
        subscan: SubscanClient,
        polkassembly: PolkassemblyClient,
        network: String,
        max_entries: usize,
    ) -> Self {
        let balances = {
            let subscan = subscan.clone();
            let network = network.clone();
            LoadableResource::builder(
                move |address: String| {
                    let subscan = subscan.clone();
                    let network = network.clone();
                    async move {
                        subscan
                            .account_tokens(&network, &address)
                            .await
                            .ok_or("Failed to fetch balances.")
                    }
                },
                Vec::new(),
            )
            .empty_when(|tokens: &Vec<Token>| tokens.is_empty())
            .max_entries(max_entries)
            .build()
        };

        let transactions = {
            let subscan = subscan.clone();
            let network = network.clone();
            LoadableResource::builder(
                move |address: String| {
                    let subscan = subscan.clone();
                    let network = network.clone();
                    async move {
                        subscan
                            .account_transfers(&network, &address)
                            .await
                            .ok_or("Failed to fetch transaction history.")
                    }
                },
                Vec::new(),
            )
            .empty_when(|transactions: &Vec<Transaction>| transactions.is_empty())
            .max_entries(max_entries)
            .build()
        };

        let governance = LoadableResource::builder(
            move |address: String| {
                let polkassembly = polkassembly.clone();
                async move {
                    polkassembly
                        .user_activities(&address)
                        .await
                        .ok_or("Failed to fetch governance data.")
                }
            },
            UserActivities::default(),
        )
        .empty_when(|data: &UserActivities| data.activities.is_empty())
        .max_entries(max_entries)
        .build();

        let staking = LoadableResource::builder(
            move |address: String| {
                let subscan = subscan.clone();
                let network = network.clone();
                async move {
                    subscan
                        .staking_history(&network, &address)
                        .await
                        .ok_or("Failed to fetch staking data.")
                }
            },
            Vec::new(),
        )
        .empty_when(|history: &Vec<Value>| history.is_empty())
        .max_entries(max_entries)
        .build();

        Self {
            balances,
            transactions,
            governance,
            staking,
        }
    }

    /// Points every panel at `address` (or clears them) and lets the panels
    /// load in the background. The returned handle resolves once all four
    /// loads have settled; dropping it leaves them running.
    pub fn select(&self, address: Option<String>) -> Option<JoinHandle<()>> {
        let address = address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        info!(address = address.as_deref().unwrap_or("-"), "wallet selected");

        let loads = (
            self.balances.select(address.clone()),
            self.transactions.select(address.clone()),
            self.governance.select(address.clone()),
            self.staking.select(address),
        );
        match loads {
            (Some(balances), Some(transactions), Some(governance), Some(staking)) => {
                Some(tokio::spawn(async move {
                    let _ = tokio::join!(balances, transactions, governance, staking);
                }))
            }
            _ => None,
        }
    }

    pub async fn refresh(&self, options: RefreshOptions) -> DashboardRefresh {
        let (balances, transactions, governance, staking) = tokio::join!(
            self.balances.refresh(options),
            self.transactions.refresh(options),
            self.governance.refresh(options),
            self.staking.refresh(options),
        );
        DashboardRefresh {
            balances,
            transactions,
            governance,
            staking,
        }
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            balances: self.balances.state(),
            transactions: self.transactions.state(),
            governance: self.governance.state(),
            staking: self.staking.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LoadStatus;
    use crate::test_support::{TEST_API_KEY, fake_upstream, test_limiter};

    async fn dashboard() -> WalletDashboard {
        let upstream = fake_upstream().await;
        let http = reqwest::Client::new();
        let subscan = SubscanClient::new(
            http.clone(),
            upstream.url.clone(),
            Some(TEST_API_KEY.into()),
            test_limiter(),
        );
        let polkassembly = PolkassemblyClient::new(http, upstream.url.clone(), "polkadot".into());
        WalletDashboard::new(subscan, polkassembly, "polkadot".into(), 16)
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let dashboard = dashboard().await;
        let view = dashboard.view();
        assert_eq!(view.balances.status, LoadStatus::Idle);
        assert_eq!(view.staking.status, LoadStatus::Idle);
    }

    #[tokio::test]
    async fn test_select_then_refresh_fills_panels() {
        let dashboard = dashboard().await;
        dashboard.select(Some("alice".into()));
        assert_eq!(dashboard.view().balances.status, LoadStatus::Loading);

        let results = dashboard.refresh(RefreshOptions::default()).await;
        assert_eq!(results.balances.status, LoadStatus::Success);
        assert_eq!(results.transactions.status, LoadStatus::Success);
        assert_eq!(results.governance.status, LoadStatus::Success);
        assert_eq!(results.staking.status, LoadStatus::Success);

        let view = dashboard.view();
        assert_eq!(view.balances.data[0].symbol, "DOT");
        assert_eq!(view.governance.data.total_count, 1);
    }

    #[tokio::test]
    async fn test_quiet_wallet_is_empty_everywhere() {
        let dashboard = dashboard().await;
        dashboard.select(Some("empty".into()));
        let results = dashboard.refresh(RefreshOptions::default()).await;
        assert_eq!(results.balances.status, LoadStatus::Empty);
        assert_eq!(results.transactions.status, LoadStatus::Empty);
        assert_eq!(results.governance.status, LoadStatus::Empty);
        assert_eq!(results.staking.status, LoadStatus::Empty);
    }

    #[tokio::test]
    async fn test_upstream_failure_sets_error_message() {
        let dashboard = dashboard().await;
        dashboard.select(Some("missing".into()));
        let results = dashboard.refresh(RefreshOptions::default()).await;
        assert_eq!(results.balances.status, LoadStatus::Error);

        let view = dashboard.view();
        assert_eq!(view.balances.error.as_deref(), Some("Failed to fetch balances."));
        assert_eq!(view.governance.error.as_deref(), Some("Failed to fetch governance data."));
    }

    #[tokio::test]
    async fn test_switching_wallets_back_to_back() {
        let dashboard = dashboard().await;
        let first = dashboard.select(Some("alice".into())).unwrap();
        let second = dashboard.select(Some("empty".into())).unwrap();
        first.await.unwrap();
        second.await.unwrap();

        let view = dashboard.view();
        assert_eq!(view.balances.key.as_deref(), Some("empty"));
        assert_eq!(view.balances.status, LoadStatus::Empty);
        assert_eq!(view.governance.status, LoadStatus::Empty);
        assert!(view.transactions.data.is_empty());

        let alice = dashboard.balances.cached("alice").unwrap();
        assert_eq!(alice.status, LoadStatus::Success);
        assert_eq!(alice.data[0].symbol, "DOT");
        assert_eq!(dashboard.transactions.cached("alice").unwrap().data[0].hash, "0xabc");
        assert_eq!(dashboard.governance.cached("alice").unwrap().data.total_count, 1);
        assert_eq!(dashboard.staking.cached("alice").unwrap().data.len(), 1);
        assert_eq!(dashboard.balances.cached("empty").unwrap().status, LoadStatus::Empty);
    }

    #[tokio::test]
    async fn test_blank_address_clears_selection() {
        let dashboard = dashboard().await;
        assert!(dashboard.select(Some("   ".into())).is_none());
        assert_eq!(dashboard.view().transactions.status, LoadStatus::Idle);
    }
}
