//! Ledger access abstraction
//!
//! The core never talks to the network itself. Everything it needs from a
//! ledger node goes through [`LedgerClient`]; `keyscan-rpc` provides the
//! JSON-RPC implementation and tests use in-memory ones.

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::address::Address;
use crate::error::{Error, Result};

/// Failure reported by a ledger collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (connection, TLS, timeout)
    #[error("request failed: {0}")]
    Request(String),

    /// The node answered with an error status
    #[error("node error: {0}")]
    Node(String),

    /// The queried account does not exist in the validated ledger
    #[error("account not found")]
    AccountNotFound,

    /// The response could not be understood
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The part of a transaction the scanner cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    /// Account the transaction claims to originate from
    pub account: String,

    /// Key that signed it; empty for multi-signed transactions
    #[serde(with = "hex::serde")]
    pub signing_pub_key: Vec<u8>,

    /// Transaction hash, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Validated ledger the transaction was included in, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_index: Option<u64>,
}

impl TxRecord {
    pub fn new(account: impl Into<String>, signing_pub_key: impl Into<Vec<u8>>) -> Self {
        Self {
            account: account.into(),
            signing_pub_key: signing_pub_key.into(),
            hash: None,
            ledger_index: None,
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn with_ledger_index(mut self, ledger_index: u64) -> Self {
        self.ledger_index = Some(ledger_index);
        self
    }
}

/// Capability to query a ledger node
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Open a session with the node
    async fn connect(&self) -> std::result::Result<(), TransportError>;

    /// Release the session
    async fn disconnect(&self) -> std::result::Result<(), TransportError>;

    /// A batch of recently validated transactions.
    ///
    /// Records should carry their `ledger_index` so a scan can tell a new
    /// batch from one it already processed.
    async fn fetch_recent_transactions(&self) -> std::result::Result<Vec<TxRecord>, TransportError>;

    /// The latest transactions of an account, most recent first
    async fn fetch_latest_transactions(
        &self,
        address: &Address,
    ) -> std::result::Result<Vec<TxRecord>, TransportError>;

    /// Account balance in drops; [`TransportError::AccountNotFound`] when the
    /// account does not exist
    async fn fetch_balance(&self, address: &Address) -> std::result::Result<u64, TransportError>;

    /// Short name used in logs
    fn client_type(&self) -> &'static str;
}

/// Run `body` inside a connected session, disconnecting on every exit path.
///
/// If the body fails, its error is returned and a failing disconnect is only
/// logged. If the body succeeds, a failing disconnect is reported.
pub async fn with_session<'a, C, T, F, Fut>(client: &'a C, body: F) -> Result<T>
where
    C: LedgerClient + ?Sized,
    F: FnOnce(&'a C) -> Fut,
    Fut: Future<Output = Result<T>> + 'a,
{
    client.connect().await.map_err(Error::Transport)?;

    let outcome = body(client).await;
    let closed = client.disconnect().await;

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(Error::Transport(e)),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!(
                client = client.client_type(),
                "disconnect failed after error: {}", close_err
            );
            Err(e)
        }
    }
}
