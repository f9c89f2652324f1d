//! XRPL JSON-RPC implementation of [`LedgerClient`]

use async_trait::async_trait;
use keyscan_core::{Address, LedgerClient, TransportError, TxRecord};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::{HistorySource, LedgerConfig};
use crate::error::{transport_error, Result};
use crate::wire::{
    into_records, parse_result, AccountInfoResult, AccountTxResult, LedgerResult, RpcRequest,
    TxHistoryResult,
};

/// Ledger client speaking rippled's JSON-RPC over HTTP(S).
///
/// HTTP is stateless, so a session is just a liveness probe on connect.
#[derive(Debug, Clone)]
pub struct XrplClient {
    http: Client,
    config: LedgerConfig,
}

impl XrplClient {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> std::result::Result<T, TransportError> {
        debug!(method, url = %self.config.rpc_url, "rpc request");

        let response = self
            .http
            .post(&self.config.rpc_url)
            .json(&RpcRequest::new(method, params))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Request(format!(
                "{method}: HTTP {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(format!("{method}: {e}")))?;
        parse_result(body)
    }
}

#[async_trait]
impl LedgerClient for XrplClient {
    async fn connect(&self) -> std::result::Result<(), TransportError> {
        let info: Value = self.call("server_info", json!({})).await?;
        let version = info
            .pointer("/info/build_version")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(url = %self.config.rpc_url, version, "connected to ledger node");
        Ok(())
    }

    async fn disconnect(&self) -> std::result::Result<(), TransportError> {
        debug!(url = %self.config.rpc_url, "session closed");
        Ok(())
    }

    async fn fetch_recent_transactions(&self) -> std::result::Result<Vec<TxRecord>, TransportError> {
        let records = match self.config.history_source {
            HistorySource::Ledger => {
                let result: LedgerResult = self
                    .call(
                        "ledger",
                        json!({
                            "ledger_index": "validated",
                            "transactions": true,
                            "expand": true,
                        }),
                    )
                    .await?;
                result.ledger.into_records()
            }
            HistorySource::TxHistory => {
                let result: TxHistoryResult =
                    self.call("tx_history", json!({ "start": 0 })).await?;
                into_records(result.txs)
            }
        };

        let newest = records.iter().filter_map(|r| r.ledger_index).max();
        debug!(count = records.len(), ?newest, "fetched recent transactions");
        Ok(records)
    }

    async fn fetch_latest_transactions(
        &self,
        address: &Address,
    ) -> std::result::Result<Vec<TxRecord>, TransportError> {
        let result: AccountTxResult = self
            .call(
                "account_tx",
                json!({
                    "account": address.as_str(),
                    "binary": false,
                    "forward": false,
                    "limit": self.config.latest_tx_limit,
                }),
            )
            .await?;
        Ok(into_records(result.transactions))
    }

    async fn fetch_balance(&self, address: &Address) -> std::result::Result<u64, TransportError> {
        let result: AccountInfoResult = self
            .call(
                "account_info",
                json!({
                    "account": address.as_str(),
                    "ledger_index": "validated",
                }),
            )
            .await?;
        result.balance_drops()
    }

    fn client_type(&self) -> &'static str {
        "xrpl-jsonrpc"
    }
}
