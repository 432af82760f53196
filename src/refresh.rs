//! Balance Refresh Loop
//!
//! Re-reads the Secret-side token balances shown in the wallet panel. A run
//! waits for the token catalog and the Keplr session, fetches balances one
//! token at a time and publishes the whole [`BalanceSheet`] at once.
//!
//! Runs may overlap when the selection changes quickly. Each run takes a
//! generation number; only the newest run publishes.

use eyre::{eyre, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::tokens::{CatalogSnapshot, TokenEntry};
use crate::types::TokenKind;
use crate::wallet::{SecretBalances, SecretWallet};

/// What the exchange form currently has selected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSelection {
    pub kind: Option<TokenKind>,
    pub snip20_address: Option<String>,
}

impl BalanceSelection {
    pub fn new(kind: TokenKind, snip20_address: Option<String>) -> Self {
        Self {
            kind: Some(kind),
            snip20_address,
        }
    }
}

/// Balance and minimum of the SNIP20 selected on the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedBalance {
    pub src_coin: String,
    pub balance: Option<String>,
    pub min: Option<String>,
}

/// Published result of a refresh run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSheet {
    pub generation: u64,
    /// Tokens listed in the Secret panel
    pub tokens: Vec<TokenEntry>,
    /// Balances keyed by `src_coin`; `None` while not loaded
    pub balances: BTreeMap<String, Option<String>>,
    pub selected: Option<SelectedBalance>,
}

impl BalanceSheet {
    pub fn balance(&self, src_coin: &str) -> Option<&str> {
        self.balances.get(src_coin).and_then(|b| b.as_deref())
    }

    /// Copy the selected SNIP20 balance into the Secret snapshot used by the resolver
    pub fn apply_selected(&self, balances: &mut SecretBalances) {
        match &self.selected {
            Some(selected) => {
                balances.snip20_balance = selected.balance.clone();
                balances.snip20_balance_min = selected.min.clone();
            }
            None => {
                balances.snip20_balance = None;
                balances.snip20_balance_min = None;
            }
        }
    }
}

pub struct BalanceRefresher {
    catalog: watch::Receiver<CatalogSnapshot>,
    sscrt_contract: String,
    sheet: watch::Sender<BalanceSheet>,
    generation: AtomicU64,
}

impl BalanceRefresher {
    pub fn new(catalog: watch::Receiver<CatalogSnapshot>, sscrt_contract: impl Into<String>) -> Self {
        let (sheet, _rx) = watch::channel(BalanceSheet::default());
        Self {
            catalog,
            sscrt_contract: sscrt_contract.into(),
            sheet,
            generation: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BalanceSheet> {
        self.sheet.subscribe()
    }

    pub fn sheet(&self) -> BalanceSheet {
        self.sheet.borrow().clone()
    }

    /// Run one refresh. Returns `None` when a newer run superseded this one.
    pub async fn refresh(
        &self,
        selection: &BalanceSelection,
        wallet: &dyn SecretWallet,
    ) -> Result<Option<BalanceSheet>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, ?selection, "Balance refresh started");

        let catalog = {
            let mut rx = self.catalog.clone();
            let snapshot = rx
                .wait_for(|s| !s.pending)
                .await
                .map_err(|_| eyre!("Token catalog closed"))?;
            (*snapshot).clone()
        };

        let mut session = wallet.session_ready();
        session
            .wait_for(|ready| *ready)
            .await
            .map_err(|_| eyre!("Secret session closed"))?;

        let kind = selection.kind.unwrap_or(TokenKind::Eth);
        let tokens = catalog.secret_side_tokens(kind, selection.snip20_address.as_deref());

        let mut order: Vec<TokenEntry> = Vec::with_capacity(tokens.len() + 1);
        if selection.snip20_address.as_deref() == Some(self.sscrt_contract.as_str()) {
            let sscrt = catalog
                .by_dst_address(&self.sscrt_contract)
                .cloned()
                .unwrap_or_else(|| TokenEntry::sscrt(&self.sscrt_contract));
            order.push(sscrt);
        }
        for token in &tokens {
            if !order.iter().any(|t| t.dst_address == token.dst_address) {
                order.push(token.clone());
            }
        }

        for token in &order {
            if let Err(e) = wallet.refresh_token_balance(token).await {
                warn!(token = %token.name, src_coin = %token.src_coin, error = %e, "Token balance refresh failed");
            }
        }

        let snapshot = wallet.balances();
        let balances = order
            .iter()
            .map(|t| (t.src_coin.clone(), snapshot.token(&t.src_coin).map(str::to_string)))
            .collect();

        let selected = selection.snip20_address.as_deref().and_then(|address| {
            order.iter().find(|t| t.dst_address == address).map(|t| SelectedBalance {
                src_coin: t.src_coin.clone(),
                balance: snapshot.token(&t.src_coin).map(str::to_string),
                min: t
                    .display_props
                    .as_ref()
                    .and_then(|p| p.min_from_scrt.clone())
                    .or_else(|| snapshot.token_min(&t.src_coin).map(str::to_string)),
            })
        });

        let sheet = BalanceSheet {
            generation,
            tokens,
            balances,
            selected,
        };

        let published = self.sheet.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = sheet.clone();
            true
        });

        if published {
            info!(generation, tokens = sheet.tokens.len(), "Balance sheet published");
            Ok(Some(sheet))
        } else {
            debug!(generation, "Balance refresh superseded");
            Ok(None)
        }
    }
}
