//! Common types for the exchange flow
//!
//! Direction, asset class, step and status enums shared by the controller,
//! the resolver and the balance refresh loop.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Exchange Direction
// ============================================================================

/// Direction of a bridge transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeMode {
    /// Ethereum -> Secret Network (Metamask signs)
    EthToScrt,
    /// Secret Network -> Ethereum (Keplr signs)
    ScrtToEth,
}

impl ExchangeMode {
    /// Wallet that has to be authorized before the flow can advance
    pub fn acting_wallet(&self) -> WalletKind {
        match self {
            ExchangeMode::EthToScrt => WalletKind::Metamask,
            ExchangeMode::ScrtToEth => WalletKind::Keplr,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeMode::EthToScrt => "eth_to_scrt",
            ExchangeMode::ScrtToEth => "scrt_to_eth",
        }
    }
}

impl fmt::Display for ExchangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Asset class being exchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Eth,
    Erc20,
    S20,
}

impl TokenKind {
    /// Label of the asset tab on the base step
    pub fn tab_label(&self, mode: ExchangeMode) -> &'static str {
        match (self, mode) {
            (TokenKind::Erc20, ExchangeMode::ScrtToEth) => "SNIP20",
            (TokenKind::Erc20, ExchangeMode::EthToScrt) => "ERC20",
            (_, ExchangeMode::ScrtToEth) => "secretETH",
            (_, ExchangeMode::EthToScrt) => "ETH",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Eth => "eth",
            TokenKind::Erc20 => "erc20",
            TokenKind::S20 => "s20",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Browser wallet extension backing a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletKind {
    Metamask,
    Keplr,
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletKind::Metamask => write!(f, "Metamask"),
            WalletKind::Keplr => write!(f, "Keplr"),
        }
    }
}

// ============================================================================
// Step Machine
// ============================================================================

/// Steps of a single transfer attempt, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExchangeStep {
    Base,
    Confirmation,
    Sending,
    Result,
}

impl ExchangeStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeStep::Base => "base",
            ExchangeStep::Confirmation => "confirmation",
            ExchangeStep::Sending => "sending",
            ExchangeStep::Result => "result",
        }
    }
}

impl fmt::Display for ExchangeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of the submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    #[default]
    Idle,
    Fetching,
    Error,
    Success,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Idle => "idle",
            ActionStatus::Fetching => "fetching",
            ActionStatus::Error => "error",
            ActionStatus::Success => "success",
        }
    }

    /// Both outcomes end the attempt; the user restarts from the base step
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Error | ActionStatus::Success)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Token Info
// ============================================================================

/// Label and amount bounds for the active token, as decimal strings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenInfo {
    pub label: String,
    pub min_amount: String,
    pub max_amount: String,
}

impl TokenInfo {
    pub fn new(label: impl Into<String>, min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            min_amount: min.into(),
            max_amount: max.into(),
        }
    }

    /// Placeholder used while ERC20 details are not loaded
    pub fn empty() -> Self {
        Self::new("", "0", "0")
    }
}
