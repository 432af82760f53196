//! Exchange flow tests against in-memory wallets
//!
//! Drives the step controller, resolver and refresh loop together without
//! any network access.
//!
//! Run with: cargo test --test exchange_flow

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_test::{assert_err, assert_ok};

use secret_bridge::exchange::{FormField, StepAction, MSG_ABOVE_MAX};
use secret_bridge::tokens::{DisplayProps, ETHEREUM_COIN};
use secret_bridge::wallet::{EthBalances, SecretBalances, UNLOCK_TOKEN};
use secret_bridge::{
    resolve, ActionStatus, AdvanceOutcome, BalanceRefresher, BalanceSelection, EthWallet, Exchange,
    ExchangeMode, ExchangeStep, SecretWallet, SubmitError, TokenCatalog, TokenEntry, TokenInfo,
    TokenKind, TransferReceipt, TransferRequest, TransferSubmitter, WalletError, WalletKind,
    Wallets,
};

const SCRT_ADDR: &str = "secret1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5a8chmq";
const ETH_ADDR: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

// ============================================================================
// In-memory wallets
// ============================================================================

struct MemorySecret {
    extension: bool,
    accept_sign_in: bool,
    authorized: Mutex<bool>,
    error: Mutex<Option<String>>,
    balances: Mutex<SecretBalances>,
    session: watch::Sender<bool>,
    sign_ins: Mutex<u32>,
}

impl MemorySecret {
    fn new(extension: bool, accept_sign_in: bool) -> Self {
        let (session, _rx) = watch::channel(false);
        Self {
            extension,
            accept_sign_in,
            authorized: Mutex::new(false),
            error: Mutex::new(None),
            balances: Mutex::new(SecretBalances::default()),
            session,
            sign_ins: Mutex::new(0),
        }
    }

    fn sign_ins(&self) -> u32 {
        *self.sign_ins.lock().unwrap()
    }
}

#[async_trait]
impl SecretWallet for MemorySecret {
    fn is_extension_present(&self) -> bool {
        self.extension
    }

    fn is_authorized(&self) -> bool {
        *self.authorized.lock().unwrap()
    }

    fn address(&self) -> Option<String> {
        self.is_authorized().then(|| SCRT_ADDR.to_string())
    }

    fn last_error(&self) -> Option<String> {
        self.error.lock().unwrap().clone()
    }

    fn balances(&self) -> SecretBalances {
        self.balances.lock().unwrap().clone()
    }

    fn session_ready(&self) -> watch::Receiver<bool> {
        self.session.subscribe()
    }

    async fn sign_in(&self) -> Result<(), WalletError> {
        *self.sign_ins.lock().unwrap() += 1;
        if !self.accept_sign_in {
            *self.error.lock().unwrap() = Some("Request rejected".to_string());
            return Err(WalletError::SignInFailed {
                wallet: WalletKind::Keplr,
                reason: "Request rejected".to_string(),
            });
        }
        *self.authorized.lock().unwrap() = true;
        self.session.send_replace(true);
        Ok(())
    }

    async fn sign_out(&self) {
        *self.authorized.lock().unwrap() = false;
        self.session.send_replace(false);
    }

    async fn refresh_token_balance(&self, token: &TokenEntry) -> Result<(), WalletError> {
        let value = if token.src_coin == ETHEREUM_COIN {
            "0.75"
        } else {
            UNLOCK_TOKEN
        };
        self.balances
            .lock()
            .unwrap()
            .tokens
            .insert(token.src_coin.clone(), value.to_string());
        Ok(())
    }
}

struct MemoryEth {
    authorized: Mutex<bool>,
    balances: EthBalances,
}

impl MemoryEth {
    fn with_eth(eth: &str) -> Self {
        Self {
            authorized: Mutex::new(false),
            balances: EthBalances {
                eth: Some(eth.to_string()),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl EthWallet for MemoryEth {
    fn is_authorized(&self) -> bool {
        *self.authorized.lock().unwrap()
    }

    fn address(&self) -> Option<String> {
        self.is_authorized().then(|| ETH_ADDR.to_string())
    }

    fn last_error(&self) -> Option<String> {
        None
    }

    fn balances(&self) -> EthBalances {
        self.balances.clone()
    }

    async fn sign_in(&self) -> Result<(), WalletError> {
        *self.authorized.lock().unwrap() = true;
        Ok(())
    }

    async fn sign_out(&self) {
        *self.authorized.lock().unwrap() = false;
    }
}

struct RecordingSubmitter {
    outcome: Result<TransferReceipt, SubmitError>,
    requests: Mutex<Vec<TransferRequest>>,
}

impl RecordingSubmitter {
    fn succeeding(tx_hash: &str) -> Self {
        Self {
            outcome: Ok(TransferReceipt {
                tx_hash: tx_hash.to_string(),
                transfer_id: None,
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            outcome: Err(SubmitError::Rejected(message.to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TransferSubmitter for RecordingSubmitter {
    async fn submit(&self, request: &TransferRequest) -> Result<TransferReceipt, SubmitError> {
        self.requests.lock().unwrap().push(request.clone());
        self.outcome.clone()
    }
}

fn wallets(secret: MemorySecret, eth: MemoryEth) -> (Wallets, Arc<MemorySecret>) {
    let secret = Arc::new(secret);
    (Wallets::new(secret.clone(), Arc::new(eth)), secret)
}

// ============================================================================
// Authorization gating
// ============================================================================

mod authorization {
    use super::*;

    #[tokio::test]
    async fn test_missing_keplr_blocks_advance() {
        let (wallets, secret) = wallets(MemorySecret::new(false, true), MemoryEth::with_eth("1"));
        let exchange = Exchange::new(ExchangeMode::ScrtToEth, TokenKind::Eth, 150_000);
        let submitter = RecordingSubmitter::succeeding("0x1");

        let outcome = exchange
            .press(StepAction::Continue, &wallets, &TokenInfo::empty(), &submitter)
            .await
            .unwrap();

        assert_eq!(outcome, AdvanceOutcome::ExtensionMissing(WalletKind::Keplr));
        assert_eq!(secret.sign_ins(), 0);
        assert_eq!(exchange.snapshot().step, ExchangeStep::Base);
    }

    /// A form that passes validation in either direction
    fn filled_exchange(mode: ExchangeMode) -> Exchange {
        let exchange = Exchange::new(mode, TokenKind::Eth, 150_000);
        exchange
            .update_form(|form| {
                form.amount = "0.5".to_string();
                form.eth_address = ETH_ADDR.to_string();
                form.scrt_address = SCRT_ADDR.to_string();
            })
            .unwrap();
        exchange
    }

    fn bounds() -> TokenInfo {
        TokenInfo::new("ETH", "0", "1")
    }

    #[tokio::test]
    async fn test_rejected_sign_in_blocks_advance() {
        let (wallets, secret) = wallets(MemorySecret::new(true, false), MemoryEth::with_eth("1"));
        let exchange = filled_exchange(ExchangeMode::ScrtToEth);
        let submitter = RecordingSubmitter::succeeding("0x1");

        let outcome = exchange
            .press(StepAction::Continue, &wallets, &bounds(), &submitter)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AdvanceOutcome::AuthorizationFailed {
                wallet: WalletKind::Keplr,
                message: "Request rejected".to_string(),
            }
        );
        assert_eq!(secret.sign_ins(), 1);
        assert_eq!(exchange.snapshot().step, ExchangeStep::Base);
    }

    #[tokio::test]
    async fn test_sign_in_then_advance() {
        let (wallets, secret) = wallets(MemorySecret::new(true, true), MemoryEth::with_eth("1"));
        let exchange = filled_exchange(ExchangeMode::ScrtToEth);
        let submitter = RecordingSubmitter::succeeding("0x1");

        let outcome = exchange
            .press(StepAction::Continue, &wallets, &bounds(), &submitter)
            .await
            .unwrap();

        assert_eq!(outcome, AdvanceOutcome::Advanced);
        assert_eq!(secret.sign_ins(), 1);
        assert_eq!(exchange.snapshot().step, ExchangeStep::Confirmation);
    }

    #[tokio::test]
    async fn test_metamask_gates_eth_to_scrt() {
        let (wallets, secret) = wallets(MemorySecret::new(false, false), MemoryEth::with_eth("1"));
        let exchange = filled_exchange(ExchangeMode::EthToScrt);
        let submitter = RecordingSubmitter::succeeding("0x1");

        assert!(!wallets.eth.is_authorized());
        let outcome = exchange
            .press(StepAction::Continue, &wallets, &bounds(), &submitter)
            .await
            .unwrap();

        assert_eq!(outcome, AdvanceOutcome::Advanced);
        assert!(wallets.eth.is_authorized());
        assert_eq!(secret.sign_ins(), 0);
    }

    #[tokio::test]
    async fn test_empty_form_cannot_continue_after_sign_in() {
        let (wallets, secret) = wallets(MemorySecret::new(true, true), MemoryEth::with_eth("1"));
        let exchange = Exchange::new(ExchangeMode::ScrtToEth, TokenKind::Eth, 150_000);
        let submitter = RecordingSubmitter::succeeding("0x1");

        let outcome = exchange
            .press(StepAction::Continue, &wallets, &bounds(), &submitter)
            .await
            .unwrap();

        assert!(matches!(outcome, AdvanceOutcome::Invalid(_)));
        assert_eq!(secret.sign_ins(), 1);
        assert_eq!(exchange.snapshot().step, ExchangeStep::Base);
        assert!(submitter.requests.lock().unwrap().is_empty());
    }

    /// Metamask session whose sign-in prompt is used to flip the direction
    struct SwitchingEth {
        exchange: Arc<Exchange>,
        authorized: Mutex<bool>,
    }

    #[async_trait]
    impl EthWallet for SwitchingEth {
        fn is_authorized(&self) -> bool {
            *self.authorized.lock().unwrap()
        }

        fn address(&self) -> Option<String> {
            None
        }

        fn last_error(&self) -> Option<String> {
            None
        }

        fn balances(&self) -> EthBalances {
            EthBalances::default()
        }

        async fn sign_in(&self) -> Result<(), WalletError> {
            self.exchange.set_mode(ExchangeMode::ScrtToEth).unwrap();
            *self.authorized.lock().unwrap() = true;
            Ok(())
        }

        async fn sign_out(&self) {
            *self.authorized.lock().unwrap() = false;
        }
    }

    #[tokio::test]
    async fn test_mode_change_during_sign_in_blocks_advance() {
        let exchange = Arc::new(filled_exchange(ExchangeMode::EthToScrt));
        let secret = Arc::new(MemorySecret::new(true, true));
        let eth = Arc::new(SwitchingEth {
            exchange: exchange.clone(),
            authorized: Mutex::new(false),
        });
        let wallets = Wallets::new(secret.clone(), eth);
        let submitter = RecordingSubmitter::succeeding("0x1");

        let outcome = exchange
            .press(StepAction::Continue, &wallets, &bounds(), &submitter)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AdvanceOutcome::AuthorizationFailed {
                wallet: WalletKind::Keplr,
                message: "Keplr is not authorized".to_string(),
            }
        );
        let state = exchange.snapshot();
        assert_eq!(state.mode, ExchangeMode::ScrtToEth);
        assert_eq!(state.step, ExchangeStep::Base);
        assert!(!secret.is_authorized());
    }
}

// ============================================================================
// Full transfer
// ============================================================================

mod transfer {
    use super::*;

    #[tokio::test]
    async fn test_validation_blocks_continue() {
        let (wallets, _secret) = wallets(MemorySecret::new(true, true), MemoryEth::with_eth("1"));
        let exchange = Exchange::new(ExchangeMode::EthToScrt, TokenKind::Eth, 150_000);
        exchange
            .update_form(|form| {
                form.amount = "5".to_string();
                form.scrt_address = SCRT_ADDR.to_string();
            })
            .unwrap();

        let info = resolve(
            ExchangeMode::EthToScrt,
            TokenKind::Eth,
            &wallets.secret.balances(),
            &wallets.eth.balances(),
        );
        let submitter = RecordingSubmitter::succeeding("0x1");
        let outcome = exchange
            .press(StepAction::Continue, &wallets, &info, &submitter)
            .await
            .unwrap();

        match outcome {
            AdvanceOutcome::Invalid(errors) => {
                assert_eq!(errors.get(FormField::Amount), [MSG_ABOVE_MAX]);
            }
            other => panic!("expected validation errors, got {:?}", other),
        }
        let state = exchange.snapshot();
        assert_eq!(state.step, ExchangeStep::Base);
        assert!(!state.field_errors.is_empty());
    }

    #[tokio::test]
    async fn test_eth_to_scrt_success() {
        let (wallets, _secret) = wallets(MemorySecret::new(true, true), MemoryEth::with_eth("2.5"));
        let exchange = Exchange::new(ExchangeMode::EthToScrt, TokenKind::Eth, 150_000);
        let mut states = exchange.subscribe();

        wallets.eth.sign_in().await.unwrap();
        wallets.secret.sign_in().await.unwrap();
        assert!(exchange.use_my_address(&wallets).unwrap());
        exchange.update_form(|form| form.amount = "1.5".to_string()).unwrap();

        let info = resolve(
            ExchangeMode::EthToScrt,
            TokenKind::Eth,
            &wallets.secret.balances(),
            &wallets.eth.balances(),
        );
        let submitter = RecordingSubmitter::succeeding("0xfeed");

        let outcome = exchange
            .press(StepAction::Continue, &wallets, &info, &submitter)
            .await
            .unwrap();
        assert_eq!(outcome, AdvanceOutcome::Advanced);
        assert_eq!(exchange.snapshot().step, ExchangeStep::Confirmation);
        assert!(states.has_changed().unwrap());

        // No skipping straight to the result
        assert_err!(exchange.press(StepAction::Restart, &wallets, &info, &submitter).await);

        exchange
            .press(StepAction::Confirm, &wallets, &info, &submitter)
            .await
            .unwrap();

        let state = exchange.snapshot();
        assert_eq!(state.step, ExchangeStep::Result);
        assert_eq!(state.action_status, ActionStatus::Success);
        assert_eq!(state.tx_hash.as_deref(), Some("0xfeed"));

        let requests = submitter.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].recipient, SCRT_ADDR);
        assert_eq!(requests[0].amount, "1.5");

        exchange
            .press(StepAction::Restart, &wallets, &info, &submitter)
            .await
            .unwrap();
        let state = exchange.snapshot();
        assert_eq!(state.step, ExchangeStep::Base);
        assert_eq!(state.action_status, ActionStatus::Idle);
        assert!(state.transaction.amount.is_empty());
    }

    #[tokio::test]
    async fn test_scrt_to_eth_failure_lands_in_result() {
        let (wallets, _secret) = wallets(MemorySecret::new(true, true), MemoryEth::with_eth("0"));
        let exchange = Exchange::new(ExchangeMode::ScrtToEth, TokenKind::Eth, 150_000);
        exchange
            .update_form(|form| {
                form.amount = "0.5".to_string();
                form.eth_address = ETH_ADDR.to_string();
            })
            .unwrap();

        let info = TokenInfo::new("secretETH", "0", "0.75");
        let submitter = RecordingSubmitter::failing("insufficient fees");

        exchange
            .press(StepAction::Continue, &wallets, &info, &submitter)
            .await
            .unwrap();
        exchange
            .press(StepAction::Confirm, &wallets, &info, &submitter)
            .await
            .unwrap();

        let state = exchange.snapshot();
        assert_eq!(state.step, ExchangeStep::Result);
        assert_eq!(state.action_status, ActionStatus::Error);
        assert_eq!(
            state.status_description(),
            "Transaction rejected: insufficient fees"
        );

        let requests = submitter.requests.lock().unwrap().clone();
        assert!(requests[0].fee.is_some());
    }
}

// ============================================================================
// Balance refresh
// ============================================================================

mod refresh {
    use super::*;

    #[tokio::test]
    async fn test_refresh_feeds_resolver() {
        let catalog = TokenCatalog::new();
        let refresher = BalanceRefresher::new(catalog.subscribe(), "secret1sscrt");
        let (wallets, _secret) = wallets(MemorySecret::new(true, true), MemoryEth::with_eth("1"));

        catalog.publish(vec![TokenEntry {
            name: "Ethereum".to_string(),
            src_coin: ETHEREUM_COIN.to_string(),
            src_address: "native".to_string(),
            dst_address: "secret1seth".to_string(),
            display_props: Some(DisplayProps {
                symbol: "ETH".to_string(),
                ..Default::default()
            }),
        }]);

        let mut sheets = refresher.subscribe();
        let selection = BalanceSelection::new(TokenKind::Eth, None);
        let (sheet, signed_in) = tokio::join!(
            refresher.refresh(&selection, wallets.secret.as_ref()),
            wallets.secret.sign_in()
        );
        signed_in.unwrap();
        let sheet = assert_ok!(sheet).expect("refresh superseded");

        assert!(sheets.has_changed().unwrap());
        assert_eq!(sheet.balance(ETHEREUM_COIN), Some("0.75"));

        let info = resolve(
            ExchangeMode::ScrtToEth,
            TokenKind::Eth,
            &wallets.secret.balances(),
            &wallets.eth.balances(),
        );
        assert_eq!(info.max_amount, "0.75");
    }
}

// ============================================================================
// Wallet overview
// ============================================================================

mod overview {
    use super::*;
    use secret_bridge::balances::{BalanceDisplay, PanelState};
    use secret_bridge::tokens::CatalogSnapshot;
    use secret_bridge::{wallet_overview, BalanceSheet, Config, OverviewSelection};

    fn config() -> Config {
        Config {
            sscrt_contract: "secret1sscrt".to_string(),
            eth_explorer_url: "https://etherscan.io".to_string(),
            scrt_explorer_url: "https://explorer.example".to_string(),
            scrt_lcd_url: "http://localhost:1317".to_string(),
            eth_rpc_url: "http://localhost:8545".to_string(),
            token_catalog_path: "tokens.json".to_string(),
            execute_gas: 150_000,
            http_timeout_secs: 30,
        }
    }

    #[tokio::test]
    async fn test_disconnected_panels() {
        let (wallets, _secret) = wallets(MemorySecret::new(false, true), MemoryEth::with_eth("1"));
        let overview = wallet_overview(
            &wallets,
            OverviewSelection {
                mode: ExchangeMode::EthToScrt,
                token: TokenKind::Eth,
                erc20_address: None,
                snip20_address: None,
            },
            &TokenCatalog::new().snapshot(),
            &BalanceSheet::default(),
            &config(),
        );

        match overview.secret.state {
            PanelState::Disconnected { connect_label, errors } => {
                assert_eq!(connect_label, "Connect with Keplr");
                assert_eq!(errors, vec!["Keplr not found".to_string()]);
            }
            other => panic!("expected disconnected panel, got {:?}", other),
        }
        assert!(matches!(overview.ethereum.state, PanelState::Disconnected { .. }));
    }

    #[tokio::test]
    async fn test_connected_rows_and_selection() {
        let (wallets, _secret) = wallets(MemorySecret::new(true, true), MemoryEth::with_eth("1.23456789"));
        wallets.secret.sign_in().await.unwrap();
        wallets.eth.sign_in().await.unwrap();

        let dai = TokenEntry {
            name: "Dai".to_string(),
            src_coin: "DAI".to_string(),
            src_address: "0xdai".to_string(),
            dst_address: "secret1sdai".to_string(),
            display_props: Some(DisplayProps {
                symbol: "DAI".to_string(),
                ..Default::default()
            }),
        };
        wallets.secret.refresh_token_balance(&dai).await.unwrap();

        let mut sheet = BalanceSheet {
            tokens: vec![dai.clone()],
            ..Default::default()
        };
        sheet.balances.insert("DAI".to_string(), Some(UNLOCK_TOKEN.to_string()));

        let catalog = CatalogSnapshot {
            pending: false,
            tokens: Arc::new(vec![dai]),
        };
        let overview = wallet_overview(
            &wallets,
            OverviewSelection {
                mode: ExchangeMode::ScrtToEth,
                token: TokenKind::Erc20,
                erc20_address: Some("0xdai"),
                snip20_address: Some("secret1sdai"),
            },
            &catalog,
            &sheet,
            &config(),
        );

        let PanelState::Connected { rows } = overview.ethereum.state else {
            panic!("ethereum panel not connected");
        };
        assert_eq!(rows[1].asset, "ETH");
        assert_eq!(rows[1].display, BalanceDisplay::Amount("1.234567".to_string()));
        assert!(!rows[1].selected);
        assert_eq!(rows[2].asset, "DAI");
        assert_eq!(rows[2].link.as_deref(), Some("https://etherscan.io/token/0xdai"));
        assert!(rows[2].selected);

        let PanelState::Connected { rows } = overview.secret.state else {
            panic!("secret panel not connected");
        };
        let assets: Vec<&str> = rows.iter().map(|r| r.asset.as_str()).collect();
        assert_eq!(assets, ["Secret Address", "SCRT", "secretSCRT", "secretDAI"]);
        assert_eq!(rows[0].copy_value.as_deref(), Some(SCRT_ADDR));
        assert_eq!(rows[2].display, BalanceDisplay::Loading);
        assert!(!rows[2].selected);
        assert_eq!(rows[3].display, BalanceDisplay::Locked);
        assert_eq!(
            rows[3].link.as_deref(),
            Some("https://explorer.example/contracts/secret1sdai")
        );
        assert!(rows[3].selected);
    }
}
