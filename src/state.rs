use std::time::Duration;

use crate::config::Args;
use crate::dashboard::WalletDashboard;
use crate::openai::OpenAiClient;
use crate::polkassembly::PolkassemblyClient;
use crate::price::PriceService;
use crate::rate_limit::RateLimiter;
use crate::subscan::SubscanClient;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

// app's shared state
pub struct AppState {
    pub limiter: RateLimiter,         // one queue for every Subscan call
    pub subscan: SubscanClient,
    pub openai: OpenAiClient,
    pub price: PriceService,
    pub dashboard: WalletDashboard,
}

impl AppState {
    /// Must run inside the tokio runtime, the limiter spawns its worker.
    pub fn from_args(args: &Args) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(UPSTREAM_TIMEOUT).build()?;
        let limiter = RateLimiter::new(args.rate_limit_config());

        let subscan = SubscanClient::new(
            http.clone(),
            args.subscan_url.clone(),
            args.subscan_key(),
            limiter.clone(),
        );
        let polkassembly = PolkassemblyClient::new(
            http.clone(),
            args.polkassembly_url.clone(),
            args.network.clone(),
        );
        let dashboard = WalletDashboard::new(
            subscan.clone(),
            polkassembly,
            args.network.clone(),
            args.cache_max_entries,
        );

        Ok(Self {
            openai: OpenAiClient::new(
                http.clone(),
                args.openai_url.clone(),
                args.openai_api_key.clone(),
                args.openai_model.clone(),
            ),
            price: PriceService::new(http, args.coingecko_url.clone()),
            limiter,
            subscan,
            dashboard,
        })
    }
}
