//! Fee construction for contract execute messages

use serde::{Deserialize, Serialize};

/// Native fee denomination on Secret Network
pub const FEE_DENOM: &str = "uscrt";

/// Coin amount in a fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCoin {
    pub amount: String,
    pub denom: String,
}

/// Amino `StdFee`: numbers are carried as strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<FeeCoin>,
    pub gas: String,
}

/// Fee for an execute call paying one `uscrt` per unit of gas
pub fn fee_for_execute(gas: u64) -> StdFee {
    StdFee {
        amount: vec![FeeCoin {
            amount: gas.to_string(),
            denom: FEE_DENOM.to_string(),
        }],
        gas: gas.to_string(),
    }
}
