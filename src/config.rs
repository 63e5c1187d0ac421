// src/config.rs

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ethers::types::Address;

/// Where the client is running; controls wallet detection and the
/// contract-deployment check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// A user-facing context with a wallet bridge potentially available.
    Interactive,
    /// A headless context (SSR, jobs). Wallet detection is never attempted
    /// and the deployment check is skipped.
    Server,
}

impl ExecutionMode {
    pub fn is_interactive(&self) -> bool {
        matches!(self, ExecutionMode::Interactive)
    }
}

// A struct to hold all configuration, loaded once at startup from the .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Chain settings
    pub rpc_url: String,
    pub contract_address: Address,
    pub chain_id: u64,
    pub execution_mode: ExecutionMode,

    // Reporting
    pub development: bool,

    // Cache and throttling windows. Independent values; the cache window is
    // not required to exceed the throttle window.
    pub cache_ttl_ms: u64,
    pub throttle_interval_ms: u64,
    pub cache_path: Option<PathBuf>,

    // Read retries and post-write settle delay
    pub retry_max_attempts: u32,
    pub retry_delay_ms: u64,
    pub settle_delay_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();

        let contract_address = env::var("CONTRACT_ADDRESS")
            .context("CONTRACT_ADDRESS must be set to the deployed voting contract address")?
            .parse::<Address>()
            .context("CONTRACT_ADDRESS must be a valid 0x-prefixed address")?;

        let execution_mode = match env::var("EXECUTION_MODE")
            .unwrap_or_else(|_| "interactive".to_string())
            .to_lowercase()
            .as_str()
        {
            "server" => ExecutionMode::Server,
            _ => ExecutionMode::Interactive,
        };

        // Default to a cache file in the user's home directory
        let cache_path = env::var("CACHE_PATH").ok().map(PathBuf::from).or_else(|| {
            dirs::home_dir().map(|mut path| {
                path.push(".dappvote");
                path.push("cache.json");
                path
            })
        });

        Ok(Config {
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string()),
            contract_address,
            // Hardhat's local chain id by default
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "31337".to_string())
                .parse()
                .context("CHAIN_ID must be a valid number")?,
            execution_mode,
            development: env::var("DEVELOPMENT")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            cache_ttl_ms: env::var("CACHE_TTL_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .context("CACHE_TTL_MS must be a valid number")?,
            throttle_interval_ms: env::var("THROTTLE_INTERVAL_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .context("THROTTLE_INTERVAL_MS must be a valid number")?,
            cache_path,
            retry_max_attempts: env::var("RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("RETRY_MAX_ATTEMPTS must be a valid number")?,
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("RETRY_DELAY_MS must be a valid number")?,
            settle_delay_ms: env::var("SETTLE_DELAY_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .context("SETTLE_DELAY_MS must be a valid number")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rpc_url: "http://localhost:8545".to_string(),
            contract_address: Address::zero(),
            chain_id: 31337,
            execution_mode: ExecutionMode::Interactive,
            development: false,
            cache_ttl_ms: 30_000,
            throttle_interval_ms: 2_000,
            cache_path: None,
            retry_max_attempts: 3,
            retry_delay_ms: 1_000,
            settle_delay_ms: 2_000,
        }
    }
}
