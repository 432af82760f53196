//! Public Balance Queries
//!
//! Secret Network native balances come from the LCD bank module, Ethereum
//! balances from plain JSON-RPC. None of these need a signer.

use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// `balanceOf(address)` selector
const ERC20_BALANCE_OF: &str = "70a08231";

/// `decimals()` selector
const ERC20_DECIMALS: &str = "313ce567";

/// Native SCRT denomination
pub const SCRT_DENOM: &str = "uscrt";

/// Build the shared HTTP client
pub fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .wrap_err("Failed to create HTTP client")
}

/// Query native balance (uscrt) in base units
pub async fn query_scrt_balance(client: &Client, lcd_url: &str, address: &str) -> Result<u128> {
    let url = format!(
        "{}/cosmos/bank/v1beta1/balances/{}/by_denom?denom={}",
        lcd_url.trim_end_matches('/'),
        address,
        SCRT_DENOM
    );

    let response = client
        .get(&url)
        .send()
        .await
        .wrap_err("Failed to query native balance")?;

    if !response.status().is_success() {
        return Err(eyre!(
            "Balance query failed: {} - {}",
            response.status(),
            response.text().await.unwrap_or_default()
        ));
    }

    let data: serde_json::Value = response.json().await?;
    let amount = data
        .get("balance")
        .and_then(|b| b.get("amount"))
        .and_then(|a| a.as_str())
        .unwrap_or("0");

    amount
        .parse()
        .map_err(|e| eyre!("Failed to parse balance: {}", e))
}

/// Query ETH balance in wei
pub async fn query_eth_balance(client: &Client, rpc_url: &str, address: &str) -> Result<u128> {
    let result = json_rpc(client, rpc_url, "eth_getBalance", json!([address, "latest"])).await?;
    parse_hex_quantity(&result)
}

/// Query an ERC20 balance in base units
pub async fn query_erc20_balance(
    client: &Client,
    rpc_url: &str,
    token: &str,
    owner: &str,
) -> Result<u128> {
    let data = format!("0x{}{}", ERC20_BALANCE_OF, pad_address(owner)?);
    let result = json_rpc(
        client,
        rpc_url,
        "eth_call",
        json!([{"to": token, "data": data}, "latest"]),
    )
    .await?;
    parse_hex_quantity(&result)
}

/// Query ERC20 decimals
pub async fn query_erc20_decimals(client: &Client, rpc_url: &str, token: &str) -> Result<u8> {
    let data = format!("0x{}", ERC20_DECIMALS);
    let result = json_rpc(
        client,
        rpc_url,
        "eth_call",
        json!([{"to": token, "data": data}, "latest"]),
    )
    .await?;
    let decimals = parse_hex_quantity(&result)?;
    u8::try_from(decimals).map_err(|_| eyre!("Decimals out of range: {}", decimals))
}

async fn json_rpc(
    client: &Client,
    rpc_url: &str,
    method: &str,
    params: serde_json::Value,
) -> Result<String> {
    let body = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    });

    let response = client
        .post(rpc_url)
        .json(&body)
        .send()
        .await
        .wrap_err_with(|| format!("Failed to call {}", method))?;

    if !response.status().is_success() {
        return Err(eyre!(
            "{} failed: {} - {}",
            method,
            response.status(),
            response.text().await.unwrap_or_default()
        ));
    }

    let data: serde_json::Value = response.json().await?;
    if let Some(error) = data.get("error") {
        return Err(eyre!("{} returned error: {}", method, error));
    }

    data.get("result")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .ok_or_else(|| eyre!("Missing 'result' field in {} response", method))
}

/// Left-pad a 0x address to a 32-byte ABI word (hex, no prefix)
pub fn pad_address(address: &str) -> Result<String> {
    let hex_str = address.strip_prefix("0x").unwrap_or(address);
    if hex_str.len() != 40 || hex::decode(hex_str).is_err() {
        return Err(eyre!("Invalid EVM address: {}", address));
    }
    Ok(format!("{:0>64}", hex_str.to_lowercase()))
}

/// Parse a JSON-RPC quantity or 32-byte word into u128
pub fn parse_hex_quantity(value: &str) -> Result<u128> {
    let hex_str = value.strip_prefix("0x").unwrap_or(value);
    let trimmed = hex_str.trim_start_matches('0');

    if trimmed.is_empty() {
        return Ok(0);
    }
    if trimmed.len() > 32 {
        return Err(eyre!("Quantity does not fit in u128: {}", value));
    }

    u128::from_str_radix(trimmed, 16).map_err(|e| eyre!("Invalid hex quantity '{}': {}", value, e))
}
