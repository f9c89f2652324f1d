//! Keyscan RPC - XRP Ledger access over JSON-RPC
//!
//! Provides [`XrplClient`], the network implementation of
//! [`keyscan_core::LedgerClient`], and its [`LedgerConfig`].

pub mod client;
pub mod config;
pub mod error;
pub mod wire;

pub use client::XrplClient;
pub use config::{HistorySource, LedgerConfig, DEFAULT_RPC_URL, ENV_RPC_URL, ENV_TIMEOUT_SECS};
pub use error::{ConfigError, Result};
