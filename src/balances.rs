//! Wallet overview
//!
//! Rows of the Ethereum (Metamask) and Secret Network (Keplr) balance
//! panels next to the exchange form. Each row knows how its raw balance
//! string should be shown and whether it is the asset being exchanged.

use serde::Serialize;

use crate::address::truncate_address_string;
use crate::amount::format_with_six_decimals;
use crate::config::Config;
use crate::refresh::BalanceSheet;
use crate::tokens::{token_display_name, CatalogSnapshot, SSCRT_COIN};
use crate::types::{ExchangeMode, TokenKind, WalletKind};
use crate::wallet::{Wallets, FIX_UNLOCK_TOKEN, UNLOCK_TOKEN};

/// How a raw balance value is displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BalanceDisplay {
    Loading,
    /// No viewing key yet; offer "View Balance"
    Locked,
    /// Stored viewing key does not match; the user has to fix it in Keplr
    ViewingKeyMismatch,
    Amount(String),
    Address(String),
}

impl BalanceDisplay {
    pub fn from_raw(value: Option<&str>) -> Self {
        match value {
            None | Some("") => BalanceDisplay::Loading,
            Some(UNLOCK_TOKEN) => BalanceDisplay::Locked,
            Some(FIX_UNLOCK_TOKEN) => BalanceDisplay::ViewingKeyMismatch,
            Some(v) => BalanceDisplay::Amount(format_with_six_decimals(v)),
        }
    }

    pub fn from_address(value: Option<&str>) -> Self {
        match value {
            None | Some("") => BalanceDisplay::Loading,
            Some(v) => BalanceDisplay::Address(truncate_address_string(v, 10)),
        }
    }

    pub fn text(&self) -> String {
        match self {
            BalanceDisplay::Loading => "...".to_string(),
            BalanceDisplay::Locked => "View Balance".to_string(),
            BalanceDisplay::ViewingKeyMismatch => "Fix Viewing Key".to_string(),
            BalanceDisplay::Amount(v) | BalanceDisplay::Address(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRow {
    pub asset: String,
    pub display: BalanceDisplay,
    /// Full value to copy, for address rows
    pub copy_value: Option<String>,
    pub link: Option<String>,
    pub selected: bool,
}

impl AssetRow {
    fn new(asset: impl Into<String>, display: BalanceDisplay) -> Self {
        Self {
            asset: asset.into(),
            display,
            copy_value: None,
            link: None,
            selected: false,
        }
    }

    fn link(mut self, link: String) -> Self {
        self.link = Some(link);
        self
    }

    fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelState {
    Connected { rows: Vec<AssetRow> },
    Disconnected { connect_label: String, errors: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletPanel {
    pub title: &'static str,
    pub wallet: WalletKind,
    pub state: PanelState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletOverview {
    pub ethereum: WalletPanel,
    pub secret: WalletPanel,
}

/// Current exchange selection seen by the panels
#[derive(Debug, Clone, Copy)]
pub struct OverviewSelection<'a> {
    pub mode: ExchangeMode,
    pub token: TokenKind,
    pub erc20_address: Option<&'a str>,
    pub snip20_address: Option<&'a str>,
}

/// Build both wallet panels
pub fn wallet_overview(
    wallets: &Wallets,
    selection: OverviewSelection<'_>,
    catalog: &CatalogSnapshot,
    sheet: &BalanceSheet,
    config: &Config,
) -> WalletOverview {
    WalletOverview {
        ethereum: ethereum_panel(wallets, selection, catalog, config),
        secret: secret_panel(wallets, selection, sheet, config),
    }
}

fn ethereum_panel(
    wallets: &Wallets,
    selection: OverviewSelection<'_>,
    catalog: &CatalogSnapshot,
    config: &Config,
) -> WalletPanel {
    let eth = &wallets.eth;
    if !eth.is_authorized() {
        return WalletPanel {
            title: "Ethereum",
            wallet: WalletKind::Metamask,
            state: PanelState::Disconnected {
                connect_label: format!("Connect with {}", WalletKind::Metamask),
                errors: eth.last_error().into_iter().collect(),
            },
        };
    }

    let balances = eth.balances();
    let address = eth.address();
    let mut rows = vec![
        AssetRow {
            copy_value: address.clone(),
            ..AssetRow::new("ETH Address", BalanceDisplay::from_address(address.as_deref()))
        },
        AssetRow::new("ETH", BalanceDisplay::from_raw(balances.eth.as_deref())).selected(
            selection.token == TokenKind::Eth && selection.mode == ExchangeMode::EthToScrt,
        ),
    ];

    for token in catalog.eth_side_tokens(selection.token, selection.erc20_address) {
        let raw = balances.tokens.get(&token.src_coin).map(String::as_str);
        rows.push(
            AssetRow::new(token_display_name(TokenKind::Erc20, &token), BalanceDisplay::from_raw(raw))
                .link(config.eth_token_link(&token.src_address))
                .selected(true),
        );
    }

    WalletPanel {
        title: "Ethereum",
        wallet: WalletKind::Metamask,
        state: PanelState::Connected { rows },
    }
}

fn secret_panel(
    wallets: &Wallets,
    selection: OverviewSelection<'_>,
    sheet: &BalanceSheet,
    config: &Config,
) -> WalletPanel {
    let secret = &wallets.secret;
    if !secret.is_authorized() {
        let mut errors = Vec::new();
        if !secret.is_extension_present() {
            errors.push(format!("{} not found", WalletKind::Keplr));
        }
        errors.extend(secret.last_error());
        return WalletPanel {
            title: "Secret Network",
            wallet: WalletKind::Keplr,
            state: PanelState::Disconnected {
                connect_label: format!("Connect with {}", WalletKind::Keplr),
                errors,
            },
        };
    }

    let balances = secret.balances();
    let address = secret.address();
    let mut rows = vec![
        AssetRow {
            copy_value: address.clone(),
            ..AssetRow::new("Secret Address", BalanceDisplay::from_address(address.as_deref()))
        },
        AssetRow::new("SCRT", BalanceDisplay::from_raw(balances.scrt.as_deref())),
        AssetRow::new("secretSCRT", BalanceDisplay::from_raw(balances.token(SSCRT_COIN)))
            .link(config.scrt_contract_link(&config.sscrt_contract))
            .selected(selection.snip20_address == Some(config.sscrt_contract.as_str())),
    ];

    for token in &sheet.tokens {
        rows.push(
            AssetRow::new(
                token_display_name(TokenKind::S20, token),
                BalanceDisplay::from_raw(sheet.balance(&token.src_coin)),
            )
            .link(config.scrt_contract_link(&token.dst_address))
            .selected(
                selection.token == TokenKind::Erc20
                    && selection.mode == ExchangeMode::ScrtToEth
                    && selection.snip20_address == Some(token.dst_address.as_str()),
            ),
        );
    }

    WalletPanel {
        title: "Secret Network",
        wallet: WalletKind::Keplr,
        state: PanelState::Connected { rows },
    }
}
