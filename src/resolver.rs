//! Token Info Resolver
//!
//! Computes label and min/max bounds of the amount field from the current
//! selection and the two wallets' balance snapshots. Pure: missing data
//! resolves to `"0"`, locked SNIP20 balances clamp the maximum to `"0"`.

use crate::tokens::ETHEREUM_COIN;
use crate::types::{ExchangeMode, TokenInfo, TokenKind};
use crate::wallet::{is_locked_balance, EthBalances, SecretBalances};

const ZERO: &str = "0";

/// Resolve the [`TokenInfo`] for the active selection
pub fn resolve(
    mode: ExchangeMode,
    kind: TokenKind,
    secret: &SecretBalances,
    eth: &EthBalances,
) -> TokenInfo {
    match kind {
        TokenKind::Erc20 => {
            let Some(details) = &eth.erc20_details else {
                return TokenInfo::empty();
            };

            match mode {
                ExchangeMode::ScrtToEth => TokenInfo::new(
                    details.symbol.clone(),
                    or_zero(secret.snip20_balance_min.as_deref()),
                    spendable(secret.snip20_balance.as_deref()),
                ),
                ExchangeMode::EthToScrt => TokenInfo::new(
                    details.symbol.clone(),
                    or_zero(eth.erc20_balance_min.as_deref()),
                    or_zero(eth.erc20_balance.as_deref()),
                ),
            }
        }
        TokenKind::Eth | TokenKind::S20 => match mode {
            ExchangeMode::ScrtToEth => TokenInfo::new(
                "secretETH",
                or_zero(secret.token_min(ETHEREUM_COIN)),
                spendable(secret.token(ETHEREUM_COIN)),
            ),
            ExchangeMode::EthToScrt => TokenInfo::new(
                "ETH",
                or_zero(eth.eth_min.as_deref()),
                or_zero(eth.eth.as_deref()),
            ),
        },
    }
}

fn or_zero(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => ZERO.to_string(),
    }
}

/// A SNIP20 balance that is absent or still locked cannot be spent
fn spendable(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() && !is_locked_balance(v) => v.to_string(),
        _ => ZERO.to_string(),
    }
}
