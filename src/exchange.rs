//! Exchange Step Controller
//!
//! Drives a single transfer attempt through
//! `Base -> Confirmation -> Sending -> Result` and back to `Base`.
//!
//! ## State
//!
//! The controller owns an [`ExchangeState`] snapshot behind a `watch`
//! channel. Every mutation goes through an explicit transition and is
//! published as a whole; views subscribe instead of binding to fields.
//!
//! ## Advancing
//!
//! [`Exchange::press`] is the only way to change steps. Each press:
//! 1. The wallet that signs in the current mode must be authorized. If it is
//!    not, its sign-in is awaited (or the missing-extension notice returned).
//! 2. If the button validates, the form is checked against the resolved
//!    [`TokenInfo`]; field errors block the step.
//! 3. The step transition runs.
//!
//! Transaction outcomes are terminal for the attempt; there is no retry.

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::address::{is_eth_address, validate_bech32_address};
use crate::amount::{parse_bound, parse_input_amount, AmountInputError};
use crate::events::{extract_value_from_logs, ExecuteResult};
use crate::fee::{fee_for_execute, StdFee};
use crate::tokens::TokenEntry;
use crate::types::{ActionStatus, ExchangeMode, ExchangeStep, TokenInfo, TokenKind, WalletKind};
use crate::wallet::Wallets;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {action:?} from the {from} step")]
    InvalidTransition {
        from: ExchangeStep,
        action: StepAction,
    },

    #[error("{0} is only allowed on the base step")]
    NotAtBase(&'static str),
}

/// Failure reported by a [`TransferSubmitter`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("{0}")]
    Failed(String),
}

// ============================================================================
// Step Transitions
// ============================================================================

/// User-triggered step actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepAction {
    Continue,
    Back,
    Confirm,
    Complete,
    Restart,
}

/// Next step for `action`, or an error if the move would skip or rewind
pub fn next_step(step: ExchangeStep, action: StepAction) -> Result<ExchangeStep, TransitionError> {
    match (step, action) {
        (ExchangeStep::Base, StepAction::Continue) => Ok(ExchangeStep::Confirmation),
        (ExchangeStep::Confirmation, StepAction::Back) => Ok(ExchangeStep::Base),
        (ExchangeStep::Confirmation, StepAction::Confirm) => Ok(ExchangeStep::Sending),
        (ExchangeStep::Sending, StepAction::Complete) => Ok(ExchangeStep::Result),
        (ExchangeStep::Result, StepAction::Restart) => Ok(ExchangeStep::Base),
        (from, action) => Err(TransitionError::InvalidTransition { from, action }),
    }
}

/// A button shown under the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepButton {
    pub title: &'static str,
    pub action: StepAction,
    /// Whether the form is validated before the action runs
    pub validate: bool,
    pub transparent: bool,
}

/// Buttons for a step; the result step offers a restart once the attempt ended
pub fn step_buttons(step: ExchangeStep, status: ActionStatus) -> Vec<StepButton> {
    match step {
        ExchangeStep::Base => vec![StepButton {
            title: "Continue",
            action: StepAction::Continue,
            validate: true,
            transparent: false,
        }],
        ExchangeStep::Confirmation => vec![
            StepButton {
                title: "Back",
                action: StepAction::Back,
                validate: false,
                transparent: true,
            },
            StepButton {
                title: "Confirm",
                action: StepAction::Confirm,
                validate: false,
                transparent: false,
            },
        ],
        ExchangeStep::Sending => Vec::new(),
        ExchangeStep::Result if status.is_terminal() => vec![StepButton {
            title: "New transfer",
            action: StepAction::Restart,
            validate: false,
            transparent: false,
        }],
        ExchangeStep::Result => Vec::new(),
    }
}

// ============================================================================
// Form
// ============================================================================

/// Fields edited on the base step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionForm {
    pub amount: String,
    /// Destination for SCRT -> ETH
    pub eth_address: String,
    /// Destination for ETH -> SCRT
    pub scrt_address: String,
    /// Selected ERC20 pair
    pub erc20_address: Option<String>,
    pub snip20_address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormField {
    Amount,
    EthAddress,
    ScrtAddress,
    Token,
}

/// Validation messages keyed by field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<FormField, Vec<String>>);

impl FieldErrors {
    pub fn push(&mut self, field: FormField, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn get(&self, field: FormField) -> &[String] {
        self.0.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.0.keys().copied()
    }
}

pub const MSG_REQUIRED: &str = "This field is required";
pub const MSG_INVALID_AMOUNT: &str = "Invalid amount";
pub const MSG_TOO_PRECISE: &str = "Maximum 6 decimal places";
pub const MSG_MORE_THAN_ZERO: &str = "Value must be more than 0";
pub const MSG_ABOVE_MAX: &str = "Exceeded the maximum amount";
pub const MSG_BELOW_MIN: &str = "Below the minimum amount";
pub const MSG_INVALID_ETH_ADDRESS: &str = "Invalid ETH address";
pub const MSG_INVALID_SCRT_ADDRESS: &str = "Invalid Secret address";
pub const MSG_SELECT_TOKEN: &str = "Select a token";

/// Check the base-step form against the resolved amount bounds
pub fn validate_form(state: &ExchangeState, info: &TokenInfo) -> FieldErrors {
    let mut errors = FieldErrors::default();
    let form = &state.transaction;

    validate_amount(&form.amount, info, &mut errors);

    match state.mode {
        ExchangeMode::ScrtToEth => {
            if form.eth_address.trim().is_empty() {
                errors.push(FormField::EthAddress, MSG_REQUIRED);
            } else if !is_eth_address(form.eth_address.trim()) {
                errors.push(FormField::EthAddress, MSG_INVALID_ETH_ADDRESS);
            }
        }
        ExchangeMode::EthToScrt => {
            if form.scrt_address.trim().is_empty() {
                errors.push(FormField::ScrtAddress, MSG_REQUIRED);
            } else if !validate_bech32_address(form.scrt_address.trim()) {
                errors.push(FormField::ScrtAddress, MSG_INVALID_SCRT_ADDRESS);
            }
        }
    }

    if state.token == TokenKind::Erc20 {
        let selected = match state.mode {
            ExchangeMode::EthToScrt => form.erc20_address.is_some(),
            ExchangeMode::ScrtToEth => form.snip20_address.is_some(),
        };
        if !selected {
            errors.push(FormField::Token, MSG_SELECT_TOKEN);
        }
    }

    errors
}

fn validate_amount(amount: &str, info: &TokenInfo, errors: &mut FieldErrors) {
    if amount.trim().is_empty() {
        errors.push(FormField::Amount, MSG_REQUIRED);
        return;
    }

    let value: BigDecimal = match parse_input_amount(amount) {
        Ok(v) => v,
        Err(AmountInputError::Malformed) => {
            errors.push(FormField::Amount, MSG_INVALID_AMOUNT);
            return;
        }
        Err(AmountInputError::TooPrecise(_)) => {
            errors.push(FormField::Amount, MSG_TOO_PRECISE);
            return;
        }
    };

    if value <= BigDecimal::zero() {
        errors.push(FormField::Amount, MSG_MORE_THAN_ZERO);
    }

    if value > parse_bound(&info.max_amount) {
        errors.push(FormField::Amount, MSG_ABOVE_MAX);
    } else if value < parse_bound(&info.min_amount) {
        errors.push(FormField::Amount, MSG_BELOW_MIN);
    }
}

// ============================================================================
// Submission
// ============================================================================

/// Transfer handed to the wallet SDK once confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub mode: ExchangeMode,
    pub token: TokenKind,
    pub amount: String,
    pub recipient: String,
    pub erc20_address: Option<String>,
    pub snip20_address: Option<String>,
    /// Execute fee, only for transfers signed on Secret Network
    pub fee: Option<StdFee>,
}

/// Receipt of a submitted transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub tx_hash: String,
    pub transfer_id: Option<String>,
}

impl TransferReceipt {
    /// Build from a Secret Network execute result; the bridge reports the
    /// transfer id as the `tx_id` wasm attribute.
    pub fn from_execute_result(result: &ExecuteResult) -> Result<Self, SubmitError> {
        let tx_hash = result
            .transaction_hash
            .clone()
            .ok_or_else(|| SubmitError::Failed("Missing transaction hash".to_string()))?;
        Ok(Self {
            tx_hash,
            transfer_id: extract_value_from_logs(result, "tx_id"),
        })
    }
}

/// Signs and broadcasts a confirmed transfer
#[async_trait]
pub trait TransferSubmitter: Send + Sync {
    async fn submit(&self, request: &TransferRequest) -> Result<TransferReceipt, SubmitError>;
}

// ============================================================================
// Controller
// ============================================================================

/// How many signatures the confirmation step announces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePrompt {
    One,
    /// ERC20 deposits need an allowance first the first time a token is sent
    OneOrTwo,
}

impl SignaturePrompt {
    pub fn message(&self) -> &'static str {
        match self {
            SignaturePrompt::One => "You will be prompted to sign one transaction",
            SignaturePrompt::OneOrTwo => {
                "If this is the first time you're sending this token, you will be prompted to sign two transactions. Otherwise you will be prompted to sign one transaction."
            }
        }
    }
}

/// Published exchange state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeState {
    pub mode: ExchangeMode,
    pub token: TokenKind,
    pub step: ExchangeStep,
    pub action_status: ActionStatus,
    pub error: Option<String>,
    pub transaction: TransactionForm,
    pub field_errors: FieldErrors,
    pub tx_hash: Option<String>,
}

impl ExchangeState {
    fn new(mode: ExchangeMode, token: TokenKind) -> Self {
        Self {
            mode,
            token,
            step: ExchangeStep::Base,
            action_status: ActionStatus::Idle,
            error: None,
            transaction: TransactionForm::default(),
            field_errors: FieldErrors::default(),
            tx_hash: None,
        }
    }

    pub fn signatures_required(&self) -> SignaturePrompt {
        if self.mode == ExchangeMode::EthToScrt && self.token == TokenKind::Erc20 {
            SignaturePrompt::OneOrTwo
        } else {
            SignaturePrompt::One
        }
    }

    /// Text under the status icon on the sending/result steps
    pub fn status_description(&self) -> String {
        match self.action_status {
            ActionStatus::Idle => "Approval".to_string(),
            ActionStatus::Fetching => String::new(),
            ActionStatus::Error => self.error.clone().unwrap_or_default(),
            ActionStatus::Success => "Success".to_string(),
        }
    }

    pub fn buttons(&self) -> Vec<StepButton> {
        step_buttons(self.step, self.action_status)
    }

    fn transfer_request(&self, execute_gas: u64) -> TransferRequest {
        let form = &self.transaction;
        let (recipient, fee) = match self.mode {
            ExchangeMode::ScrtToEth => (form.eth_address.trim().to_string(), Some(fee_for_execute(execute_gas))),
            ExchangeMode::EthToScrt => (form.scrt_address.trim().to_string(), None),
        };
        TransferRequest {
            mode: self.mode,
            token: self.token,
            amount: form.amount.trim().replace(',', ""),
            recipient,
            erc20_address: form.erc20_address.clone(),
            snip20_address: form.snip20_address.clone(),
            fee,
        }
    }
}

/// Result of pressing a step button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Advanced,
    /// No extension detected; show the install notice
    ExtensionMissing(WalletKind),
    /// Sign-in finished without an authorized session
    AuthorizationFailed { wallet: WalletKind, message: String },
    Invalid(FieldErrors),
}

/// Exchange step controller
pub struct Exchange {
    tx: watch::Sender<ExchangeState>,
    execute_gas: u64,
}

impl Exchange {
    pub fn new(mode: ExchangeMode, token: TokenKind, execute_gas: u64) -> Self {
        let (tx, _rx) = watch::channel(ExchangeState::new(mode, token));
        Self { tx, execute_gas }
    }

    pub fn snapshot(&self) -> ExchangeState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ExchangeState> {
        self.tx.subscribe()
    }

    // ------------------------------------------------------------------
    // Base step edits
    // ------------------------------------------------------------------

    fn modify_at_base(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut ExchangeState),
    ) -> Result<(), TransitionError> {
        let mut allowed = false;
        self.tx.send_if_modified(|s| {
            if s.step != ExchangeStep::Base {
                return false;
            }
            allowed = true;
            f(s);
            true
        });
        if allowed {
            Ok(())
        } else {
            Err(TransitionError::NotAtBase(op))
        }
    }

    pub fn set_mode(&self, mode: ExchangeMode) -> Result<(), TransitionError> {
        self.modify_at_base("changing direction", |s| {
            s.mode = mode;
            s.field_errors.clear();
        })?;
        debug!(mode = %mode, "Exchange mode set");
        Ok(())
    }

    pub fn set_token(&self, token: TokenKind) -> Result<(), TransitionError> {
        self.modify_at_base("changing token", |s| {
            s.token = token;
            s.field_errors.clear();
        })?;
        debug!(token = %token, "Exchange token set");
        Ok(())
    }

    pub fn update_form(&self, f: impl FnOnce(&mut TransactionForm)) -> Result<(), TransitionError> {
        self.modify_at_base("editing the form", |s| f(&mut s.transaction))
    }

    /// Select the ERC20/SNIP20 pair of a catalog entry
    pub fn select_token_pair(&self, token: &TokenEntry) -> Result<(), TransitionError> {
        self.update_form(|form| {
            form.erc20_address = Some(token.src_address.clone());
            form.snip20_address = Some(token.dst_address.clone());
        })
    }

    /// Fill the destination with the user's own address on the other chain.
    /// Returns whether a destination was filled.
    pub fn use_my_address(&self, wallets: &Wallets) -> Result<bool, TransitionError> {
        let mode = self.snapshot().mode;
        let own = match mode {
            ExchangeMode::ScrtToEth if wallets.eth.is_authorized() => wallets.eth.address(),
            ExchangeMode::EthToScrt if wallets.secret.is_authorized() => wallets.secret.address(),
            _ => None,
        };
        let Some(address) = own else {
            return Ok(false);
        };
        self.update_form(|form| match mode {
            ExchangeMode::ScrtToEth => form.eth_address = address,
            ExchangeMode::EthToScrt => form.scrt_address = address,
        })?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Advancing
    // ------------------------------------------------------------------

    /// Authorize the acting wallet, optionally validate, then run `on_advance`.
    /// Only reachable through [`Self::press`], which pairs every step action
    /// with its button's validation flag.
    pub(crate) async fn advance<V, A>(
        &self,
        wallets: &Wallets,
        requires_validation: bool,
        validate: V,
        on_advance: A,
    ) -> Result<AdvanceOutcome, TransitionError>
    where
        V: FnOnce(&ExchangeState) -> FieldErrors,
        A: FnOnce(&Self) -> Result<(), TransitionError>,
    {
        let mode = self.snapshot().mode;

        if !wallets.is_authorized_for(mode) {
            if let Some(outcome) = authorize(wallets, mode).await {
                return Ok(outcome);
            }
        }

        // The direction may have changed while the sign-in prompt was open
        let current = self.snapshot().mode;
        if !wallets.is_authorized_for(current) {
            let wallet = current.acting_wallet();
            warn!(from = %mode, to = %current, "Exchange mode changed during sign-in");
            return Ok(AdvanceOutcome::AuthorizationFailed {
                wallet,
                message: format!("{} is not authorized", wallet),
            });
        }

        if requires_validation {
            let errors = validate(&self.snapshot());
            if !errors.is_empty() {
                debug!(fields = ?errors.fields().collect::<Vec<_>>(), "Form validation failed");
                let published = errors.clone();
                self.tx.send_modify(|s| s.field_errors = published);
                return Ok(AdvanceOutcome::Invalid(errors));
            }
            self.tx.send_if_modified(|s| {
                let had_errors = !s.field_errors.is_empty();
                s.field_errors.clear();
                had_errors
            });
        }

        on_advance(self)?;
        Ok(AdvanceOutcome::Advanced)
    }

    /// Apply a step action to the published state
    fn transition(&self, action: StepAction) -> Result<ExchangeStep, TransitionError> {
        let mut result = Err(TransitionError::InvalidTransition {
            from: ExchangeStep::Base,
            action,
        });

        self.tx.send_if_modified(|s| match next_step(s.step, action) {
            Ok(next) => {
                match action {
                    StepAction::Confirm => {
                        s.action_status = ActionStatus::Fetching;
                        s.error = None;
                        s.tx_hash = None;
                    }
                    StepAction::Restart => {
                        s.action_status = ActionStatus::Idle;
                        s.error = None;
                        s.tx_hash = None;
                        s.transaction.amount.clear();
                        s.field_errors.clear();
                    }
                    _ => {}
                }
                s.step = next;
                result = Ok(next);
                true
            }
            Err(e) => {
                result = Err(e);
                false
            }
        });

        if let Ok(step) = &result {
            info!(action = ?action, step = %step, "Exchange step changed");
        }
        result
    }

    /// Press a button of the current step
    pub async fn press(
        &self,
        action: StepAction,
        wallets: &Wallets,
        token_info: &TokenInfo,
        submitter: &dyn TransferSubmitter,
    ) -> Result<AdvanceOutcome, TransitionError> {
        let state = self.snapshot();
        let button = state
            .buttons()
            .into_iter()
            .find(|b| b.action == action)
            .ok_or(TransitionError::InvalidTransition {
                from: state.step,
                action,
            })?;

        let outcome = self
            .advance(
                wallets,
                button.validate,
                |s| validate_form(s, token_info),
                |exchange| exchange.transition(action).map(|_| ()),
            )
            .await?;

        if outcome == AdvanceOutcome::Advanced && action == StepAction::Confirm {
            self.submit(submitter).await?;
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Submit the confirmed transfer and record its outcome
    async fn submit(&self, submitter: &dyn TransferSubmitter) -> Result<ExchangeStep, TransitionError> {
        let state = self.snapshot();
        if state.step != ExchangeStep::Sending {
            return Err(TransitionError::InvalidTransition {
                from: state.step,
                action: StepAction::Complete,
            });
        }

        let request = state.transfer_request(self.execute_gas);
        info!(
            mode = %request.mode,
            token = %request.token,
            amount = %request.amount,
            recipient = %request.recipient,
            "Submitting transfer"
        );

        let outcome = submitter.submit(&request).await;
        match &outcome {
            Ok(receipt) => info!(tx_hash = %receipt.tx_hash, "Transfer submitted"),
            Err(e) => warn!(error = %e, "Transfer failed"),
        }
        self.complete(outcome)
    }

    /// Record the outcome of the in-flight transfer and move to the result step
    fn complete(
        &self,
        outcome: Result<TransferReceipt, SubmitError>,
    ) -> Result<ExchangeStep, TransitionError> {
        let mut result = Err(TransitionError::InvalidTransition {
            from: ExchangeStep::Sending,
            action: StepAction::Complete,
        });

        self.tx.send_if_modified(|s| match next_step(s.step, StepAction::Complete) {
            Ok(next) => {
                match outcome {
                    Ok(receipt) => {
                        s.action_status = ActionStatus::Success;
                        s.tx_hash = Some(receipt.tx_hash);
                        s.error = None;
                    }
                    Err(e) => {
                        s.action_status = ActionStatus::Error;
                        s.error = Some(e.to_string());
                    }
                }
                s.step = next;
                result = Ok(next);
                true
            }
            Err(e) => {
                result = Err(e);
                false
            }
        });

        result
    }
}

/// Sign in the acting wallet. `None` means the session is now authorized.
async fn authorize(wallets: &Wallets, mode: ExchangeMode) -> Option<AdvanceOutcome> {
    let wallet = mode.acting_wallet();

    let (signed_in, last_error) = match wallet {
        WalletKind::Keplr => {
            if !wallets.secret.is_extension_present() {
                info!("Keplr not detected");
                return Some(AdvanceOutcome::ExtensionMissing(WalletKind::Keplr));
            }
            let result = wallets.secret.sign_in().await;
            (
                result.map(|_| wallets.secret.is_authorized()),
                wallets.secret.last_error(),
            )
        }
        WalletKind::Metamask => {
            let result = wallets.eth.sign_in().await;
            (
                result.map(|_| wallets.eth.is_authorized()),
                wallets.eth.last_error(),
            )
        }
    };

    match signed_in {
        Ok(true) => {
            info!(wallet = %wallet, "Wallet authorized");
            None
        }
        Ok(false) => Some(AdvanceOutcome::AuthorizationFailed {
            wallet,
            message: last_error.unwrap_or_else(|| format!("{} is not authorized", wallet)),
        }),
        Err(e) => {
            warn!(wallet = %wallet, error = %e, "Wallet sign-in failed");
            Some(AdvanceOutcome::AuthorizationFailed {
                wallet,
                message: last_error.unwrap_or_else(|| e.to_string()),
            })
        }
    }
}
