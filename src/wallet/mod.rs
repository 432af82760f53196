//! Wallet Sessions
//!
//! The exchange flow only reads wallet state and asks wallets to sign in;
//! the extensions themselves (Keplr, Metamask) live behind these traits.
//!
//! ## Submodules
//!
//! - `queries` - Public LCD / JSON-RPC balance queries
//! - `watch_only` - Read-only sessions backed by those queries

pub mod queries;
pub mod watch_only;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::tokens::TokenEntry;
use crate::types::{ExchangeMode, WalletKind};

pub use watch_only::{WatchOnlyEthWallet, WatchOnlySecretWallet};

/// Balance placeholder reported while a SNIP20 viewing key is missing
pub const UNLOCK_TOKEN: &str = "Unlock";

/// Balance placeholder reported when the stored viewing key is wrong
pub const FIX_UNLOCK_TOKEN: &str = "Fix Unlock";

/// True for either unlock placeholder
pub fn is_locked_balance(value: &str) -> bool {
    value.contains(UNLOCK_TOKEN)
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("{0} extension not found")]
    ExtensionMissing(WalletKind),

    #[error("{wallet} sign-in failed: {reason}")]
    SignInFailed { wallet: WalletKind, reason: String },

    #[error("{0} is not authorized")]
    NotAuthorized(WalletKind),

    #[error("balance query failed: {0}")]
    Query(String),
}

// ============================================================================
// Balance Snapshots
// ============================================================================

/// Balances held by the Keplr session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretBalances {
    /// Native SCRT
    pub scrt: Option<String>,
    /// SNIP20 balances keyed by catalog `src_coin`
    pub tokens: HashMap<String, String>,
    /// Minimum bridgeable amounts keyed by catalog `src_coin`
    pub tokens_min: HashMap<String, String>,
    /// Balance of the SNIP20 selected on the exchange form
    pub snip20_balance: Option<String>,
    pub snip20_balance_min: Option<String>,
}

impl SecretBalances {
    pub fn token(&self, src_coin: &str) -> Option<&str> {
        self.tokens.get(src_coin).map(String::as_str)
    }

    pub fn token_min(&self, src_coin: &str) -> Option<&str> {
        self.tokens_min.get(src_coin).map(String::as_str)
    }
}

/// Details of the ERC20 selected on the exchange form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Erc20Details {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Balances held by the Metamask session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EthBalances {
    pub eth: Option<String>,
    pub eth_min: Option<String>,
    pub erc20_details: Option<Erc20Details>,
    pub erc20_balance: Option<String>,
    pub erc20_balance_min: Option<String>,
    /// ERC20 balances keyed by catalog `src_coin`
    pub tokens: HashMap<String, String>,
}

// ============================================================================
// Session Traits
// ============================================================================

/// Keplr-backed Secret Network session
#[async_trait]
pub trait SecretWallet: Send + Sync {
    /// Whether the browser extension was detected at all
    fn is_extension_present(&self) -> bool;

    fn is_authorized(&self) -> bool;

    fn address(&self) -> Option<String>;

    /// Error of the last failed sign-in, shown next to the connect button
    fn last_error(&self) -> Option<String>;

    fn balances(&self) -> SecretBalances;

    /// Flips to `true` once a signing client is available
    fn session_ready(&self) -> watch::Receiver<bool>;

    async fn sign_in(&self) -> Result<(), WalletError>;

    async fn sign_out(&self);

    /// Re-read the balance of one token into the balance maps
    async fn refresh_token_balance(&self, token: &TokenEntry) -> Result<(), WalletError>;
}

/// Metamask-backed Ethereum session
#[async_trait]
pub trait EthWallet: Send + Sync {
    fn is_authorized(&self) -> bool;

    fn address(&self) -> Option<String>;

    fn last_error(&self) -> Option<String>;

    fn balances(&self) -> EthBalances;

    async fn sign_in(&self) -> Result<(), WalletError>;

    async fn sign_out(&self);
}

/// Both sessions, passed explicitly to the controller and refresh loop
#[derive(Clone)]
pub struct Wallets {
    pub secret: Arc<dyn SecretWallet>,
    pub eth: Arc<dyn EthWallet>,
}

impl Wallets {
    pub fn new(secret: Arc<dyn SecretWallet>, eth: Arc<dyn EthWallet>) -> Self {
        Self { secret, eth }
    }

    /// Whether the wallet that signs in `mode` is authorized
    pub fn is_authorized_for(&self, mode: ExchangeMode) -> bool {
        match mode.acting_wallet() {
            WalletKind::Keplr => self.secret.is_authorized(),
            WalletKind::Metamask => self.eth.is_authorized(),
        }
    }
}
