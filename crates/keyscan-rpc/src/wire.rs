//! rippled JSON-RPC request and response shapes
//!
//! Requests are `{"method": ..., "params": [{...}]}`. Every response wraps its
//! payload in `result`, which carries `status: "error"` plus an error code when
//! the node refuses the request.

use keyscan_core::{TransportError, TxRecord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A JSON-RPC call
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub method: &'static str,
    pub params: [Value; 1],
}

impl RpcRequest {
    pub fn new(method: &'static str, params: Value) -> Self {
        Self {
            method,
            params: [params],
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    result: Value,
}

#[derive(Debug, Deserialize)]
struct NodeError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// rippled's error code for an account missing from the queried ledger
pub const ACCOUNT_NOT_FOUND: &str = "actNotFound";

/// Unwrap `result` from a response body, surfacing node errors
pub fn parse_result<T: DeserializeOwned>(body: Value) -> Result<T, TransportError> {
    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|e| TransportError::Malformed(format!("missing result: {e}")))?;

    if envelope.result.get("status").and_then(Value::as_str) == Some("error") {
        let node: NodeError = serde_json::from_value(envelope.result)
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        let code = node.error.unwrap_or_else(|| "unknown".to_string());
        if code == ACCOUNT_NOT_FOUND {
            return Err(TransportError::AccountNotFound);
        }
        return Err(TransportError::Node(match node.error_message {
            Some(message) => format!("{code}: {message}"),
            None => code,
        }));
    }

    serde_json::from_value(envelope.result).map_err(|e| TransportError::Malformed(e.to_string()))
}

/// A ledger sequence number. API v1 renders some of them as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerIndex(pub u64);

impl<'de> Deserialize<'de> for LedgerIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(index) => Ok(Self(index)),
            Repr::Text(text) => text.parse().map(Self).map_err(serde::de::Error::custom),
        }
    }
}

/// Transaction fields the scanner reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxFields {
    #[serde(rename = "Account")]
    pub account: Option<String>,
    #[serde(rename = "SigningPubKey")]
    pub signing_pub_key: Option<String>,
    pub hash: Option<String>,
    pub ledger_index: Option<LedgerIndex>,
}

/// A transaction as listed by `ledger`, `tx_history` or `account_tx`.
///
/// Depending on the method and API version the fields sit at the top level,
/// under `tx`, or under `tx_json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxEntry {
    #[serde(rename = "Account")]
    pub account: Option<String>,
    #[serde(rename = "SigningPubKey")]
    pub signing_pub_key: Option<String>,
    pub hash: Option<String>,
    pub ledger_index: Option<LedgerIndex>,
    pub tx: Option<TxFields>,
    pub tx_json: Option<TxFields>,
}

impl TxEntry {
    /// Convert to a [`TxRecord`]; entries without an account are dropped.
    ///
    /// A signing key that is not valid hex becomes an empty key, which never
    /// verifies.
    pub fn into_record(self) -> Option<TxRecord> {
        let outer_hash = self.hash;
        let outer_index = self.ledger_index;
        let fields = match (self.tx_json, self.tx) {
            (Some(fields), _) | (None, Some(fields)) => fields,
            (None, None) => TxFields {
                account: self.account,
                signing_pub_key: self.signing_pub_key,
                hash: None,
                ledger_index: None,
            },
        };

        let account = fields.account?;
        let signing_pub_key = fields
            .signing_pub_key
            .and_then(|key| hex::decode(key).ok())
            .unwrap_or_default();

        let mut record = TxRecord::new(account, signing_pub_key);
        record.hash = fields.hash.or(outer_hash);
        record.ledger_index = fields.ledger_index.or(outer_index).map(|index| index.0);
        Some(record)
    }
}

/// Convert a list of entries, keeping their order
pub fn into_records(entries: Vec<TxEntry>) -> Vec<TxRecord> {
    entries.into_iter().filter_map(TxEntry::into_record).collect()
}

/// `ledger` with `transactions` and `expand`
#[derive(Debug, Deserialize)]
pub struct LedgerResult {
    pub ledger: LedgerBody,
}

#[derive(Debug, Deserialize)]
pub struct LedgerBody {
    #[serde(default)]
    pub ledger_index: Option<LedgerIndex>,
    #[serde(default)]
    pub transactions: Vec<TxEntry>,
}

impl LedgerBody {
    /// Records of this ledger, stamped with its index
    pub fn into_records(self) -> Vec<TxRecord> {
        let index = self.ledger_index.map(|index| index.0);
        into_records(self.transactions)
            .into_iter()
            .map(|mut record| {
                record.ledger_index = record.ledger_index.or(index);
                record
            })
            .collect()
    }
}

/// `tx_history`
#[derive(Debug, Deserialize)]
pub struct TxHistoryResult {
    pub txs: Vec<TxEntry>,
}

/// `account_tx`
#[derive(Debug, Deserialize)]
pub struct AccountTxResult {
    pub transactions: Vec<TxEntry>,
}

/// `account_info`
#[derive(Debug, Deserialize)]
pub struct AccountInfoResult {
    pub account_data: AccountData,
}

#[derive(Debug, Deserialize)]
pub struct AccountData {
    #[serde(rename = "Balance")]
    pub balance: String,
}

impl AccountInfoResult {
    /// Balance in drops
    pub fn balance_drops(&self) -> Result<u64, TransportError> {
        self.account_data.balance.parse().map_err(|_| {
            TransportError::Malformed(format!(
                "balance is not a drop amount: {}",
                self.account_data.balance
            ))
        })
    }
}
