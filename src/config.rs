use clap::Parser;
use std::time::Duration;

use crate::rate_limit::RateLimitConfig;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "polka-guardian")]
#[command(about = "Gateway for Polkadot wallet and governance dashboards")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Subscan base url, "{chain}" is replaced by the chain key
    #[arg(long, env = "SUBSCAN_URL", default_value = "https://{chain}.api.subscan.io")]
    pub subscan_url: String,

    #[arg(long, env = "SUBSCAN_API_KEY", hide_env_values = true)]
    pub subscan_api_key: Option<String>,

    // Key the dashboard frontend was built with, used when SUBSCAN_API_KEY is unset
    #[arg(long, env = "VITE_SUBSCAN_API_KEY", hide_env_values = true)]
    pub vite_subscan_api_key: Option<String>,

    #[arg(long, env = "POLKASSEMBLY_URL", default_value = "https://polkadot.polkassembly.io")]
    pub polkassembly_url: String,

    #[arg(long, env = "COINGECKO_URL", default_value = "https://api.coingecko.com")]
    pub coingecko_url: String,

    #[arg(long, env = "OPENAI_URL", default_value = "https://api.openai.com")]
    pub openai_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    // Chain the wallet dashboard reads from
    #[arg(long, env = "NETWORK", default_value = "polkadot")]
    pub network: String,

    // Subscan calls allowed per window
    #[arg(long, default_value_t = 5)]
    pub rate_limit: u32,

    #[arg(long, default_value_t = 1000)]
    pub rate_window_ms: u64,

    // Pause once the limit is hit
    #[arg(long, default_value_t = 2000)]
    pub rate_backoff_ms: u64,

    // Per-panel bound on cached wallet addresses
    #[arg(long, default_value_t = 256)]
    pub cache_max_entries: usize,
}

impl Args {
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_calls: self.rate_limit,
            window: Duration::from_millis(self.rate_window_ms),
            backoff: Duration::from_millis(self.rate_backoff_ms),
        }
    }

    pub fn subscan_key(&self) -> Option<String> {
        let usable = |key: &Option<String>| key.clone().filter(|key| !key.trim().is_empty());
        usable(&self.subscan_api_key).or_else(|| usable(&self.vite_subscan_api_key))
    }
}
