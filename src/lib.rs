//! Secret Bridge: Exchange Core for the Ethereum <> Secret Network Bridge
//!
//! This crate holds the client-side logic behind a bridge transfer:
//!
//! - **Exchange Controller** - Step machine `Base -> Confirmation -> Sending -> Result`,
//!   wallet authorization gating and form validation
//! - **Token Info Resolver** - Label and min/max amount bounds for the active selection
//! - **Balance Refresh** - Sequential SNIP20 balance refresh published as one snapshot
//! - **Wallet Overview** - Rows of the Metamask and Keplr balance panels
//! - **Wallet Sessions** - Traits for the two extensions plus watch-only implementations
//! - **Utilities** - Bech32 addresses, execute fees, log attribute extraction, amounts
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! secret-bridge = { path = "../secret-bridge" }
//! ```

pub mod address;
pub mod amount;
pub mod balances;
pub mod config;
pub mod events;
pub mod exchange;
pub mod fee;
pub mod refresh;
pub mod resolver;
pub mod tokens;
pub mod types;
pub mod wallet;

// Re-export commonly used items at the crate root
pub use address::{get_scrt_address, is_eth_address, truncate_address_string, validate_bech32_address};
pub use amount::format_with_six_decimals;
pub use balances::{wallet_overview, AssetRow, BalanceDisplay, OverviewSelection, WalletOverview};
pub use config::Config;
pub use events::extract_value_from_logs;
pub use exchange::{
    next_step, validate_form, AdvanceOutcome, Exchange, ExchangeState, FieldErrors, StepAction,
    SubmitError, TransferReceipt, TransferRequest, TransferSubmitter, TransitionError,
};
pub use fee::{fee_for_execute, StdFee};
pub use refresh::{BalanceRefresher, BalanceSelection, BalanceSheet};
pub use resolver::resolve;
pub use tokens::{CatalogSnapshot, TokenCatalog, TokenEntry};
pub use types::{ActionStatus, ExchangeMode, ExchangeStep, TokenInfo, TokenKind, WalletKind};
pub use wallet::{EthWallet, SecretWallet, WalletError, Wallets};
