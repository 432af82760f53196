//! Bridge client configuration

use eyre::{eyre, Result};
use std::env;
use url::Url;

const DEFAULT_ETH_EXPLORER_URL: &str = "https://etherscan.io";
const DEFAULT_SCRT_EXPLORER_URL: &str = "https://secretnodes.com/secret/chains/secret-4";
const DEFAULT_SCRT_LCD_URL: &str = "http://localhost:1317";
const DEFAULT_ETH_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_TOKEN_CATALOG_PATH: &str = "tokens.json";

/// Gas used for the SNIP20 `send` that starts a SCRT -> ETH transfer
const DEFAULT_EXECUTE_GAS: u64 = 150_000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Bridge client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Secret SCRT (SNIP20) contract address
    pub sscrt_contract: String,

    /// Ethereum block explorer base URL
    pub eth_explorer_url: String,
    /// Secret Network block explorer base URL
    pub scrt_explorer_url: String,

    /// Secret Network LCD URL
    pub scrt_lcd_url: String,
    /// Ethereum JSON-RPC URL
    pub eth_rpc_url: String,

    /// JSON file with the bridged token catalog
    pub token_catalog_path: String,

    /// Gas limit for Secret Network executes
    pub execute_gas: u64,

    /// Timeout for LCD and RPC requests
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment
    pub fn load() -> Result<Self> {
        // Try to load .env file
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }

        let config = Self {
            sscrt_contract: env::var("SSCRT_CONTRACT")
                .map_err(|_| eyre!("SSCRT_CONTRACT required"))?,

            eth_explorer_url: url_var("ETH_EXPLORER_URL", DEFAULT_ETH_EXPLORER_URL),
            scrt_explorer_url: url_var("SCRT_EXPLORER_URL", DEFAULT_SCRT_EXPLORER_URL),
            scrt_lcd_url: url_var("SCRT_LCD_URL", DEFAULT_SCRT_LCD_URL),
            eth_rpc_url: env::var("ETH_RPC_URL").unwrap_or_else(|_| DEFAULT_ETH_RPC_URL.to_string()),

            token_catalog_path: env::var("TOKEN_CATALOG_PATH")
                .unwrap_or_else(|_| DEFAULT_TOKEN_CATALOG_PATH.to_string()),

            execute_gas: env::var("EXECUTE_GAS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EXECUTE_GAS),

            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sscrt_contract.trim().is_empty() {
            return Err(eyre!("SSCRT_CONTRACT cannot be empty"));
        }

        for (name, value) in [
            ("ETH_EXPLORER_URL", &self.eth_explorer_url),
            ("SCRT_EXPLORER_URL", &self.scrt_explorer_url),
            ("SCRT_LCD_URL", &self.scrt_lcd_url),
            ("ETH_RPC_URL", &self.eth_rpc_url),
        ] {
            Url::parse(value).map_err(|e| eyre!("Invalid {}: {} ({})", name, value, e))?;
        }

        if self.execute_gas == 0 {
            return Err(eyre!("EXECUTE_GAS must be greater than 0"));
        }

        Ok(())
    }

    /// Explorer page of an ERC20 contract
    pub fn eth_token_link(&self, token_address: &str) -> String {
        format!("{}/token/{}", self.eth_explorer_url, token_address)
    }

    /// Explorer page of a Secret Network contract
    pub fn scrt_contract_link(&self, contract: &str) -> String {
        format!("{}/contracts/{}", self.scrt_explorer_url, contract)
    }
}

/// Base URLs are joined with paths, so a trailing `/` is dropped
fn url_var(name: &str, default: &str) -> String {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim_end_matches('/')
        .to_string()
}
