//! Execute Result Log Parsing
//!
//! Contract execution results carry per-message logs; the bridge contracts
//! report values such as the transfer id as `wasm` event attributes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of a contract execute call as returned by the Secret LCD
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteResult {
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub logs: Vec<TxLog>,
}

/// Log entry for a single message of a transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxLog {
    #[serde(default)]
    pub msg_index: u32,
    #[serde(default)]
    pub events: Vec<TxEvent>,
}

/// Raw transaction event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub attributes: Vec<TxEventAttribute>,
}

/// Raw event attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxEventAttribute {
    pub key: String,
    pub value: String,
}

/// Value of the first `key` attribute in the first `wasm` event of the
/// first log. Missing logs, events or attributes yield `None`.
pub fn extract_value_from_logs(result: &ExecuteResult, key: &str) -> Option<String> {
    result
        .logs
        .first()?
        .events
        .iter()
        .find(|e| e.event_type == "wasm")?
        .attributes
        .iter()
        .find(|a| a.key == key)
        .map(|a| a.value.clone())
}

/// Wasm event with attributes grouped by emitting contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasmEvent {
    pub contract_address: String,
    pub attributes: HashMap<String, String>,
}

impl WasmEvent {
    /// Collect wasm events from raw transaction events
    pub fn from_tx_events(events: &[TxEvent]) -> Vec<Self> {
        let mut result = Vec::new();

        for event in events.iter().filter(|e| e.event_type == "wasm") {
            let mut attributes = HashMap::new();
            let mut contract_address = String::new();

            for attr in &event.attributes {
                if attr.key == "contract_address" || attr.key == "_contract_address" {
                    contract_address = attr.value.clone();
                } else {
                    attributes.insert(attr.key.clone(), attr.value.clone());
                }
            }

            if !contract_address.is_empty() {
                result.push(WasmEvent {
                    contract_address,
                    attributes,
                });
            }
        }

        result
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.attributes.get(key)
    }
}
