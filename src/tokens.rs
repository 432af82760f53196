//! Token Catalog and Display Names
//!
//! The catalog lists every bridged asset pair. It starts out pending and is
//! published in one piece once loaded; consumers wait on the `watch` channel
//! instead of polling a flag.

use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::types::{ExchangeMode, TokenInfo, TokenKind};

/// Catalog name of the wrapped SCRT pair
pub const WSCRT_LABEL: &str = "WSCRT";

/// `src_coin` of the native ETH pair
pub const ETHEREUM_COIN: &str = "Ethereum";

/// Balance key of secret SCRT
pub const SSCRT_COIN: &str = "sSCRT";

// ============================================================================
// Catalog Entries
// ============================================================================

/// Presentation properties of a catalog entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayProps {
    pub symbol: String,
    /// Proxy tokens are shown by their catalog name instead of the symbol
    #[serde(default)]
    pub proxy: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub min_to_scrt: Option<String>,
    #[serde(default)]
    pub min_from_scrt: Option<String>,
}

/// A bridged asset pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub name: String,
    /// Source coin name, also the key of the wallet balance maps
    pub src_coin: String,
    /// ERC20 contract on Ethereum (or "native")
    pub src_address: String,
    /// SNIP20 contract on Secret Network
    pub dst_address: String,
    #[serde(default)]
    pub display_props: Option<DisplayProps>,
}

impl TokenEntry {
    /// Entry for secret SCRT, which is not part of the bridged catalog
    pub fn sscrt(contract: &str) -> Self {
        Self {
            name: "secretSCRT".to_string(),
            src_coin: SSCRT_COIN.to_string(),
            src_address: String::new(),
            dst_address: contract.to_string(),
            display_props: Some(DisplayProps {
                symbol: "SSCRT".to_string(),
                ..Default::default()
            }),
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        self.display_props.as_ref().map(|p| p.symbol.as_str())
    }

    fn is_proxy(&self) -> bool {
        self.display_props.as_ref().is_some_and(|p| p.proxy)
    }
}

// ============================================================================
// Display Names
// ============================================================================

/// Name of a Secret-side asset as shown for the given direction
pub fn secret_token_name(mode: ExchangeMode, kind: TokenKind, label: &str) -> String {
    if label == WSCRT_LABEL {
        return match mode {
            ExchangeMode::ScrtToEth => "SSCRT".to_string(),
            ExchangeMode::EthToScrt => "WSCRT".to_string(),
        };
    }

    if mode == ExchangeMode::ScrtToEth && kind == TokenKind::Erc20 {
        format!("secret{}", label)
    } else {
        label.to_string()
    }
}

/// Label of the amount field
pub fn amount_label(mode: ExchangeMode, kind: TokenKind, info: &TokenInfo) -> String {
    if info.label == WSCRT_LABEL {
        return match mode {
            ExchangeMode::ScrtToEth => "SSCRT Amount".to_string(),
            ExchangeMode::EthToScrt => "WSCRT Amount".to_string(),
        };
    }
    format!("{} Amount", secret_token_name(mode, kind, &info.label))
}

/// Name of a catalog entry in a wallet panel
pub fn token_display_name(kind: TokenKind, token: &TokenEntry) -> String {
    match kind {
        TokenKind::Erc20 => match token.symbol() {
            Some(symbol) if !token.is_proxy() => symbol.to_string(),
            _ => token.name.clone(),
        },
        TokenKind::S20 => match token.symbol() {
            Some(symbol) if !token.is_proxy() => format!("secret{}", symbol),
            _ => token.name.clone(),
        },
        TokenKind::Eth => "ETH".to_string(),
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Catalog contents as seen by subscribers
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub pending: bool,
    pub tokens: Arc<Vec<TokenEntry>>,
}

impl CatalogSnapshot {
    /// Secret-side tokens listed in the Keplr panel
    ///
    /// ERC20 mode shows the selected SNIP20 (never the WSCRT pair),
    /// otherwise every ETH-sourced entry.
    pub fn secret_side_tokens(
        &self,
        kind: TokenKind,
        snip20_address: Option<&str>,
    ) -> Vec<TokenEntry> {
        match kind {
            TokenKind::Erc20 => self
                .tokens
                .iter()
                .filter(|t| {
                    t.display_props.is_some()
                        && snip20_address == Some(t.dst_address.as_str())
                        && t.name != WSCRT_LABEL
                })
                .cloned()
                .collect(),
            _ => self
                .tokens
                .iter()
                .filter(|t| t.src_coin == ETHEREUM_COIN)
                .cloned()
                .collect(),
        }
    }

    /// Ethereum-side tokens listed in the Metamask panel
    pub fn eth_side_tokens(&self, kind: TokenKind, erc20_address: Option<&str>) -> Vec<TokenEntry> {
        if kind != TokenKind::Erc20 {
            return Vec::new();
        }
        self.tokens
            .iter()
            .filter(|t| t.display_props.is_some() && erc20_address == Some(t.src_address.as_str()))
            .cloned()
            .collect()
    }

    /// Look up an entry by its SNIP20 contract
    pub fn by_dst_address(&self, dst_address: &str) -> Option<&TokenEntry> {
        self.tokens.iter().find(|t| t.dst_address == dst_address)
    }
}

/// Shared token catalog with a pending flag
pub struct TokenCatalog {
    tx: watch::Sender<CatalogSnapshot>,
}

impl Default for TokenCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCatalog {
    /// Create an empty catalog in the pending state
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CatalogSnapshot {
            pending: true,
            tokens: Arc::new(Vec::new()),
        });
        Self { tx }
    }

    /// Mark the catalog as reloading; readers keep the previous tokens
    pub fn begin_loading(&self) {
        self.tx.send_modify(|snapshot| snapshot.pending = true);
    }

    /// Replace the catalog contents and clear the pending flag
    pub fn publish(&self, tokens: Vec<TokenEntry>) {
        info!(count = tokens.len(), "Token catalog published");
        self.tx.send_replace(CatalogSnapshot {
            pending: false,
            tokens: Arc::new(tokens),
        });
    }

    /// Load a JSON array of entries from disk and publish it.
    /// On failure the previous contents stay published and pending is cleared.
    pub async fn load_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        self.begin_loading();

        match read_catalog(path).await {
            Ok(tokens) => {
                let count = tokens.len();
                debug!(path = %path.display(), count, "Token catalog loaded from file");
                self.publish(tokens);
                Ok(count)
            }
            Err(e) => {
                self.tx.send_modify(|snapshot| snapshot.pending = false);
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogSnapshot> {
        self.tx.subscribe()
    }

    /// Wait until the catalog is no longer pending
    pub async fn wait_ready(&self) -> Result<CatalogSnapshot> {
        let mut rx = self.subscribe();
        let snapshot = rx
            .wait_for(|s| !s.pending)
            .await
            .map_err(|_| eyre!("Token catalog closed"))?;
        Ok((*snapshot).clone())
    }
}

async fn read_catalog(path: &Path) -> Result<Vec<TokenEntry>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("Failed to read token catalog {}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| eyre!("Invalid token catalog {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, symbol: &str, src_coin: &str, src: &str, dst: &str) -> TokenEntry {
        TokenEntry {
            name: name.to_string(),
            src_coin: src_coin.to_string(),
            src_address: src.to_string(),
            dst_address: dst.to_string(),
            display_props: Some(DisplayProps {
                symbol: symbol.to_string(),
                ..Default::default()
            }),
        }
    }

    fn snapshot(tokens: Vec<TokenEntry>) -> CatalogSnapshot {
        CatalogSnapshot {
            pending: false,
            tokens: Arc::new(tokens),
        }
    }

    #[test]
    fn test_secret_token_name() {
        assert_eq!(
            secret_token_name(ExchangeMode::ScrtToEth, TokenKind::Erc20, "WSCRT"),
            "SSCRT"
        );
        assert_eq!(
            secret_token_name(ExchangeMode::EthToScrt, TokenKind::Erc20, "WSCRT"),
            "WSCRT"
        );
        assert_eq!(
            secret_token_name(ExchangeMode::ScrtToEth, TokenKind::Erc20, "USDT"),
            "secretUSDT"
        );
        assert_eq!(
            secret_token_name(ExchangeMode::EthToScrt, TokenKind::Erc20, "USDT"),
            "USDT"
        );
        assert_eq!(
            secret_token_name(ExchangeMode::ScrtToEth, TokenKind::Eth, "secretETH"),
            "secretETH"
        );
    }

    #[test]
    fn test_amount_label() {
        let info = TokenInfo::new("WSCRT", "0", "0");
        assert_eq!(
            amount_label(ExchangeMode::ScrtToEth, TokenKind::Erc20, &info),
            "SSCRT Amount"
        );
        let info = TokenInfo::new("DAI", "0", "0");
        assert_eq!(
            amount_label(ExchangeMode::ScrtToEth, TokenKind::Erc20, &info),
            "secretDAI Amount"
        );
        assert_eq!(
            amount_label(ExchangeMode::EthToScrt, TokenKind::Erc20, &info),
            "DAI Amount"
        );
    }

    #[test]
    fn test_display_name_s20_non_proxy() {
        let atom = entry("Cosmos", "ATOM", "Cosmos", "0xatom", "secret1atom");
        assert_eq!(token_display_name(TokenKind::S20, &atom), "secretATOM");
        assert_eq!(token_display_name(TokenKind::Erc20, &atom), "ATOM");
        assert_eq!(token_display_name(TokenKind::Eth, &atom), "ETH");
    }

    #[test]
    fn test_display_name_proxy_uses_name() {
        let mut proxy = entry("Wrapped Thing", "WT", "WT", "0xwt", "secret1wt");
        proxy.display_props.as_mut().unwrap().proxy = true;
        assert_eq!(token_display_name(TokenKind::S20, &proxy), "Wrapped Thing");
        assert_eq!(token_display_name(TokenKind::Erc20, &proxy), "Wrapped Thing");
    }

    #[test]
    fn test_secret_side_filter() {
        let catalog = snapshot(vec![
            entry("Ether", "ETH", "Ethereum", "native", "secret1eth"),
            entry("Dai", "DAI", "Dai", "0xdai", "secret1dai"),
            entry("WSCRT", "WSCRT", "WSCRT", "0xwscrt", "secret1dai"),
        ]);

        let erc20 = catalog.secret_side_tokens(TokenKind::Erc20, Some("secret1dai"));
        assert_eq!(erc20.len(), 1);
        assert_eq!(erc20[0].name, "Dai");

        assert!(catalog.secret_side_tokens(TokenKind::Erc20, None).is_empty());

        let eth = catalog.secret_side_tokens(TokenKind::Eth, Some("secret1dai"));
        assert_eq!(eth.len(), 1);
        assert_eq!(eth[0].src_coin, "Ethereum");
    }

    #[test]
    fn test_eth_side_filter() {
        let catalog = snapshot(vec![entry("Dai", "DAI", "Dai", "0xdai", "secret1dai")]);
        assert_eq!(catalog.eth_side_tokens(TokenKind::Erc20, Some("0xdai")).len(), 1);
        assert!(catalog.eth_side_tokens(TokenKind::Eth, Some("0xdai")).is_empty());
    }

    #[tokio::test]
    async fn test_wait_ready_after_publish() {
        let catalog = Arc::new(TokenCatalog::new());
        assert!(catalog.snapshot().pending);

        let publisher = catalog.clone();
        tokio::spawn(async move {
            publisher.publish(vec![entry("Dai", "DAI", "Dai", "0xdai", "secret1dai")]);
        });

        let ready = catalog.wait_ready().await.unwrap();
        assert!(!ready.pending);
        assert_eq!(ready.tokens.len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_file_clears_pending() {
        let catalog = TokenCatalog::new();
        let result = catalog
            .load_from_file("/nonexistent/secret-bridge/tokens.json")
            .await;
        assert!(result.is_err());
        assert!(!catalog.snapshot().pending);
    }

    #[test]
    fn test_catalog_json() {
        let json = r#"[{
            "name": "Dai",
            "src_coin": "Dai",
            "src_address": "0xdai",
            "dst_address": "secret1dai",
            "display_props": {"symbol": "DAI", "proxy": false}
        }]"#;
        let tokens: Vec<TokenEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(tokens[0].symbol(), Some("DAI"));
    }
}
