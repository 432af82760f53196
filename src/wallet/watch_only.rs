//! Watch-only wallet sessions
//!
//! Sessions for a known address without a signing extension. Native balances
//! are read from public endpoints; SNIP20 balances are private and always
//! report the unlock placeholder.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::queries::{
    query_erc20_balance, query_erc20_decimals, query_eth_balance, query_scrt_balance,
};
use super::{
    Erc20Details, EthBalances, EthWallet, SecretBalances, SecretWallet, WalletError, UNLOCK_TOKEN,
};
use crate::address::{get_scrt_address, is_eth_address};
use crate::amount::{from_base_units, ETH_DECIMALS, SCRT_DECIMALS};
use crate::tokens::TokenEntry;
use crate::types::WalletKind;

#[derive(Debug, Default)]
struct SessionState<B> {
    authorized: bool,
    error: Option<String>,
    balances: B,
}

// ============================================================================
// Secret Network
// ============================================================================

/// Read-only Secret Network session for a fixed address
pub struct WatchOnlySecretWallet {
    lcd_url: String,
    address: String,
    client: Client,
    state: Mutex<SessionState<SecretBalances>>,
    session: watch::Sender<bool>,
}

impl WatchOnlySecretWallet {
    pub fn new(lcd_url: &str, address: &str, client: Client) -> Self {
        let (session, _rx) = watch::channel(false);
        Self {
            lcd_url: lcd_url.trim_end_matches('/').to_string(),
            address: address.to_string(),
            client,
            state: Mutex::new(SessionState::default()),
            session,
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState<SecretBalances>) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    async fn refresh_scrt(&self) -> Result<(), WalletError> {
        let amount = query_scrt_balance(&self.client, &self.lcd_url, &self.address)
            .await
            .map_err(|e| WalletError::Query(e.to_string()))?;
        let balance = from_base_units(amount, SCRT_DECIMALS);
        debug!(address = %self.address, balance = %balance, "SCRT balance updated");
        self.with_state(|s| s.balances.scrt = Some(balance));
        Ok(())
    }
}

#[async_trait]
impl SecretWallet for WatchOnlySecretWallet {
    fn is_extension_present(&self) -> bool {
        true
    }

    fn is_authorized(&self) -> bool {
        self.with_state(|s| s.authorized)
    }

    fn address(&self) -> Option<String> {
        self.with_state(|s| s.authorized.then(|| self.address.clone()))
    }

    fn last_error(&self) -> Option<String> {
        self.with_state(|s| s.error.clone())
    }

    fn balances(&self) -> SecretBalances {
        self.with_state(|s| s.balances.clone())
    }

    fn session_ready(&self) -> watch::Receiver<bool> {
        self.session.subscribe()
    }

    async fn sign_in(&self) -> Result<(), WalletError> {
        if get_scrt_address(&self.address).is_empty() {
            let err = WalletError::SignInFailed {
                wallet: WalletKind::Keplr,
                reason: format!("invalid Secret address '{}'", self.address),
            };
            self.with_state(|s| s.error = Some(err.to_string()));
            return Err(err);
        }

        self.with_state(|s| {
            s.authorized = true;
            s.error = None;
        });
        self.session.send_replace(true);
        info!(address = %self.address, "Watch-only Secret session opened");

        if let Err(e) = self.refresh_scrt().await {
            warn!(error = %e, "Initial SCRT balance query failed");
        }
        Ok(())
    }

    async fn sign_out(&self) {
        self.with_state(|s| *s = SessionState::default());
        self.session.send_replace(false);
        info!(address = %self.address, "Watch-only Secret session closed");
    }

    async fn refresh_token_balance(&self, token: &TokenEntry) -> Result<(), WalletError> {
        if !self.is_authorized() {
            return Err(WalletError::NotAuthorized(WalletKind::Keplr));
        }

        // SNIP20 balances need a viewing key
        self.with_state(|s| {
            s.balances
                .tokens
                .insert(token.src_coin.clone(), UNLOCK_TOKEN.to_string());
            if let Some(min) = token
                .display_props
                .as_ref()
                .and_then(|p| p.min_from_scrt.clone())
            {
                s.balances.tokens_min.insert(token.src_coin.clone(), min);
            }
        });
        Ok(())
    }
}

// ============================================================================
// Ethereum
// ============================================================================

/// Read-only Ethereum session for a fixed address
pub struct WatchOnlyEthWallet {
    rpc_url: String,
    address: String,
    client: Client,
    state: Mutex<SessionState<EthBalances>>,
}

impl WatchOnlyEthWallet {
    pub fn new(rpc_url: &str, address: &str, client: Client) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            address: address.to_string(),
            client,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState<EthBalances>) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Select the ERC20 of the exchange form and load its balance
    pub async fn select_erc20(&self, token: &TokenEntry) -> Result<(), WalletError> {
        if !self.is_authorized() {
            return Err(WalletError::NotAuthorized(WalletKind::Metamask));
        }

        let decimals = query_erc20_decimals(&self.client, &self.rpc_url, &token.src_address)
            .await
            .map_err(|e| WalletError::Query(e.to_string()))?;
        let amount = query_erc20_balance(
            &self.client,
            &self.rpc_url,
            &token.src_address,
            &self.address,
        )
        .await
        .map_err(|e| WalletError::Query(e.to_string()))?;

        let balance = from_base_units(amount, decimals as u32);
        let symbol = token.symbol().unwrap_or(&token.name).to_string();
        debug!(token = %token.src_address, symbol = %symbol, balance = %balance, "ERC20 balance updated");

        let min = token
            .display_props
            .as_ref()
            .and_then(|p| p.min_to_scrt.clone());

        self.with_state(|s| {
            s.balances.erc20_details = Some(Erc20Details {
                address: token.src_address.clone(),
                symbol,
                decimals,
            });
            s.balances.erc20_balance = Some(balance.clone());
            s.balances.erc20_balance_min = min;
            s.balances.tokens.insert(token.src_coin.clone(), balance);
        });
        Ok(())
    }
}

#[async_trait]
impl EthWallet for WatchOnlyEthWallet {
    fn is_authorized(&self) -> bool {
        self.with_state(|s| s.authorized)
    }

    fn address(&self) -> Option<String> {
        self.with_state(|s| s.authorized.then(|| self.address.clone()))
    }

    fn last_error(&self) -> Option<String> {
        self.with_state(|s| s.error.clone())
    }

    fn balances(&self) -> EthBalances {
        self.with_state(|s| s.balances.clone())
    }

    async fn sign_in(&self) -> Result<(), WalletError> {
        if !is_eth_address(&self.address) {
            let err = WalletError::SignInFailed {
                wallet: WalletKind::Metamask,
                reason: format!("invalid Ethereum address '{}'", self.address),
            };
            self.with_state(|s| s.error = Some(err.to_string()));
            return Err(err);
        }

        self.with_state(|s| {
            s.authorized = true;
            s.error = None;
        });
        info!(address = %self.address, "Watch-only Ethereum session opened");

        match query_eth_balance(&self.client, &self.rpc_url, &self.address).await {
            Ok(wei) => {
                let balance = from_base_units(wei, ETH_DECIMALS);
                self.with_state(|s| s.balances.eth = Some(balance));
            }
            Err(e) => warn!(error = %e, "Initial ETH balance query failed"),
        }
        Ok(())
    }

    async fn sign_out(&self) {
        self.with_state(|s| *s = SessionState::default());
        info!(address = %self.address, "Watch-only Ethereum session closed");
    }
}
