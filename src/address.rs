//! Address Validation and Encoding
//!
//! Secret Network accounts are bech32 strings with the `secret` prefix,
//! Ethereum accounts are `0x`-prefixed 20-byte hex strings.
//!
//! Validation helpers never fail: anything that does not decode is reported
//! as invalid (an empty string or `false`). The encode/decode helpers return
//! errors for callers that need the reason.

use bech32::{self, FromBase32, ToBase32, Variant};
use eyre::{eyre, Result};

/// Human-readable prefix of Secret Network accounts
pub const SCRT_HRP: &str = "secret";

/// Longest accepted bech32 account string (wallet addresses are 45 chars)
pub const MAX_SCRT_ADDRESS_LEN: usize = 46;

// ============================================================================
// Validation
// ============================================================================

/// Return `address` unchanged if it is a well-formed `secret` bech32 account,
/// otherwise an empty string.
pub fn get_scrt_address(address: &str) -> String {
    if address.len() > MAX_SCRT_ADDRESS_LEN {
        return String::new();
    }

    match bech32::decode(address) {
        Ok((hrp, _data, Variant::Bech32)) if hrp == SCRT_HRP => address.to_string(),
        _ => String::new(),
    }
}

/// Check a Secret Network account string
pub fn validate_bech32_address(address: &str) -> bool {
    !get_scrt_address(address).is_empty()
}

/// Check a 0x-prefixed Ethereum account string (checksum casing is not enforced)
pub fn is_eth_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex_str) => hex_str.len() == 40 && hex::decode(hex_str).is_ok(),
        None => false,
    }
}

/// Shorten an address for display: `first n` + `...` + `last n`
pub fn truncate_address_string(address: &str, num: usize) -> String {
    if address.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= num * 2 {
        return address.to_string();
    }

    let head: String = chars[..num].iter().collect();
    let tail: String = chars[chars.len() - num..].iter().collect();
    format!("{}...{}", head, tail)
}

// ============================================================================
// Encoding
// ============================================================================

/// Decode a `secret` bech32 account to its raw bytes
pub fn decode_scrt_address(address: &str) -> Result<Vec<u8>> {
    let (hrp, data, variant) =
        bech32::decode(address).map_err(|e| eyre!("Invalid bech32 address: {}", e))?;

    if hrp != SCRT_HRP {
        return Err(eyre!(
            "Invalid address prefix: expected '{}', got '{}'",
            SCRT_HRP,
            hrp
        ));
    }

    if variant != Variant::Bech32 {
        return Err(eyre!("Invalid bech32 variant: expected bech32, got bech32m"));
    }

    Vec::<u8>::from_base32(&data).map_err(|e| eyre!("Invalid base32 data: {}", e))
}

/// Encode raw bytes as a `secret` bech32 account
pub fn encode_scrt_address(bytes: &[u8]) -> Result<String> {
    bech32::encode(SCRT_HRP, bytes.to_base32(), Variant::Bech32)
        .map_err(|e| eyre!("Failed to encode bech32: {}", e))
}
