//! Secret Bridge client
//!
//! Opens watch-only sessions for `SCRT_ADDRESS` and `ETH_ADDRESS`, loads the
//! token catalog, runs one balance refresh and logs both wallet panels
//! together with the amount bounds of the configured selection.
//!
//! Selection is read from `EXCHANGE_MODE` (`eth_to_scrt` / `scrt_to_eth`),
//! `EXCHANGE_TOKEN` (`eth` / `erc20` / `s20`) and `SNIP20_ADDRESS`.

use std::env;
use std::sync::Arc;

use eyre::{eyre, Result, WrapErr};
use secret_bridge::balances::PanelState;
use secret_bridge::tokens::amount_label;
use secret_bridge::wallet::queries::http_client;
use secret_bridge::wallet::{WatchOnlyEthWallet, WatchOnlySecretWallet};
use secret_bridge::{
    resolve, wallet_overview, BalanceRefresher, BalanceSelection, Config, ExchangeMode,
    OverviewSelection, TokenCatalog, TokenKind, Wallets,
};
use tracing::{info, warn};

fn main() -> Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    init_logging();

    info!("Starting Secret Bridge client");

    let config = Config::load()?;
    info!(
        scrt_lcd = %config.scrt_lcd_url,
        eth_rpc = %config.eth_rpc_url,
        sscrt = %config.sscrt_contract,
        "Configuration loaded"
    );

    let mode = match env::var("EXCHANGE_MODE").as_deref() {
        Ok("scrt_to_eth") => ExchangeMode::ScrtToEth,
        Ok("eth_to_scrt") | Err(_) => ExchangeMode::EthToScrt,
        Ok(other) => return Err(eyre!("Invalid EXCHANGE_MODE: {}", other)),
    };
    let token = match env::var("EXCHANGE_TOKEN").as_deref() {
        Ok("erc20") => TokenKind::Erc20,
        Ok("s20") => TokenKind::S20,
        Ok("eth") | Err(_) => TokenKind::Eth,
        Ok(other) => return Err(eyre!("Invalid EXCHANGE_TOKEN: {}", other)),
    };
    let snip20_address = env::var("SNIP20_ADDRESS").ok();

    let catalog = TokenCatalog::new();
    let count = catalog
        .load_from_file(&config.token_catalog_path)
        .await
        .wrap_err_with(|| format!("Failed to load token catalog {}", config.token_catalog_path))?;
    info!(count, "Token catalog ready");

    let client = http_client(config.http_timeout_secs)?;
    let scrt_address = env::var("SCRT_ADDRESS").map_err(|_| eyre!("SCRT_ADDRESS required"))?;
    let eth_address = env::var("ETH_ADDRESS").map_err(|_| eyre!("ETH_ADDRESS required"))?;

    let secret = Arc::new(WatchOnlySecretWallet::new(
        &config.scrt_lcd_url,
        &scrt_address,
        client.clone(),
    ));
    let eth = Arc::new(WatchOnlyEthWallet::new(&config.eth_rpc_url, &eth_address, client));
    let wallets = Wallets::new(secret.clone(), eth.clone());

    if let Err(e) = wallets.secret.sign_in().await {
        warn!(error = %e, "Secret session unavailable");
    }
    if let Err(e) = wallets.eth.sign_in().await {
        warn!(error = %e, "Ethereum session unavailable");
    }

    let snapshot = catalog.snapshot();
    let selected = snip20_address
        .as_deref()
        .and_then(|address| snapshot.by_dst_address(address))
        .cloned();
    if let Some(entry) = &selected {
        if let Err(e) = eth.select_erc20(entry).await {
            warn!(token = %entry.name, error = %e, "ERC20 balance unavailable");
        }
    }

    let refresher = BalanceRefresher::new(catalog.subscribe(), config.sscrt_contract.clone());
    let sheet = if wallets.secret.is_authorized() {
        let selection = BalanceSelection::new(token, snip20_address.clone());
        refresher
            .refresh(&selection, wallets.secret.as_ref())
            .await?
            .unwrap_or_else(|| refresher.sheet())
    } else {
        refresher.sheet()
    };

    let mut secret_balances = wallets.secret.balances();
    sheet.apply_selected(&mut secret_balances);
    let info = resolve(mode, token, &secret_balances, &wallets.eth.balances());
    info!(
        mode = %mode,
        token = %token,
        label = %amount_label(mode, token, &info),
        min = %info.min_amount,
        max = %info.max_amount,
        "Amount bounds"
    );

    let overview = wallet_overview(
        &wallets,
        OverviewSelection {
            mode,
            token,
            erc20_address: selected.as_ref().map(|t| t.src_address.as_str()),
            snip20_address: snip20_address.as_deref(),
        },
        &snapshot,
        &sheet,
        &config,
    );

    for panel in [&overview.ethereum, &overview.secret] {
        match &panel.state {
            PanelState::Connected { rows } => {
                for row in rows {
                    info!(
                        panel = panel.title,
                        asset = %row.asset,
                        value = %row.display.text(),
                        selected = row.selected,
                        link = row.link.as_deref().unwrap_or(""),
                        "Balance"
                    );
                }
            }
            PanelState::Disconnected { connect_label, errors } => {
                warn!(panel = panel.title, errors = ?errors, "{}", connect_label);
            }
        }
    }

    info!("Secret Bridge client finished");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,secret_bridge=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}
