//! Keyscan CLI - recover XRPL public keys and scan the ledger for accounts
//!
//! All results are written to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyscan_core::{
    decode_address, recover_account_from_addresses, recover_account_from_pubkeys, with_session,
    Address, AddressScan, CancelToken, CurveFilter, PublicKeyRef, ScanCriteria, ScanGuard,
    DEFAULT_POLL_INTERVAL_MS,
};
use keyscan_rpc::{LedgerConfig, XrplClient};

#[derive(Parser)]
#[command(name = "keyscan")]
#[command(about = "Recover public keys behind XRP Ledger accounts", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, env = "KEYSCAN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint, overrides configuration and environment
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the classic address of a public key
    Address {
        /// 33-byte public key (hex)
        pubkey: String,
    },

    /// Decode a classic address to its account id
    Decode {
        /// Classic address (r...)
        address: String,
    },

    /// Recover full public key points from ledger public keys
    RecoverPubkey {
        /// 33-byte public keys (hex)
        #[arg(required = true)]
        pubkeys: Vec<String>,
    },

    /// Recover public keys of accounts from their ledger history
    RecoverAddress {
        /// Classic addresses
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Scan recent ledger activity for funded accounts
    Scan {
        /// Minimum balance in drops
        #[arg(long, default_value_t = 0)]
        min_balance: u64,

        /// Number of accounts to find
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,

        /// Curve family to accept: all, secp256k1 or ed25519
        #[arg(long, default_value_t = CurveFilter::All)]
        curve: CurveFilter,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Minimum pause between ledger polls, in milliseconds
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
        poll_ms: u64,
    },
}

#[derive(Serialize)]
struct AddressInfo {
    address: String,
    account_id: String,
    curve: String,
}

#[derive(Serialize)]
struct ScanReport {
    addresses: Vec<Address>,
    complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyscan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Address { pubkey } => {
            let key = PublicKeyRef::from_hex(&pubkey)?;
            print_json(&AddressInfo {
                address: key.address().to_string(),
                account_id: key.account_id().to_hex(),
                curve: key.curve().to_string(),
            })
        }

        Commands::Decode { address } => {
            let account_id = decode_address(&address)?;
            print_json(&serde_json::json!({
                "address": address,
                "account_id": account_id.to_hex(),
            }))
        }

        Commands::RecoverPubkey { pubkeys } => {
            let keys = pubkeys
                .iter()
                .map(|k| PublicKeyRef::from_hex(k).with_context(|| format!("bad public key {k}")))
                .collect::<Result<Vec<_>>>()?;
            print_json(&recover_account_from_pubkeys(&keys)?)
        }

        Commands::RecoverAddress { addresses } => {
            let addresses = addresses
                .iter()
                .map(|a| Address::parse(a).with_context(|| format!("bad address {a}")))
                .collect::<Result<Vec<_>>>()?;

            let config = load_config(cli.config.as_deref(), cli.rpc_url)?;
            let options = config.recovery_options();
            let client = XrplClient::new(config)?;
            let guard = ScanGuard::new(cancel_on_ctrl_c());

            let accounts =
                recover_account_from_addresses(&client, &addresses, &options, &guard).await?;
            print_json(&accounts)
        }

        Commands::Scan {
            min_balance,
            count,
            curve,
            timeout_secs,
            poll_ms,
        } => {
            let config = load_config(cli.config.as_deref(), cli.rpc_url)?;
            let client = XrplClient::new(config)?;

            let mut guard = ScanGuard::new(cancel_on_ctrl_c());
            if let Some(secs) = timeout_secs {
                guard = guard.with_timeout(Duration::from_secs(secs));
            }

            let criteria = ScanCriteria::new(min_balance, count)
                .with_curve_filter(curve)
                .with_poll_interval(Duration::from_millis(poll_ms));
            info!(min_balance, count, %curve, poll_ms, "starting scan");

            let (addresses, aborted) = with_session(&client, |client| async move {
                let mut scan = AddressScan::new(client, criteria);
                let result = scan.run(&guard).await;
                Ok((scan.into_discovered(), result.err()))
            })
            .await?;

            print_json(&ScanReport {
                addresses,
                complete: aborted.is_none(),
                error: aborted.as_ref().map(|e| e.to_string()),
            })?;

            match aborted {
                Some(e) => Err(e.into()),
                None => Ok(()),
            }
        }
    }
}

/// Resolve configuration: file, then environment, then command-line flags
fn load_config(path: Option<&Path>, rpc_url: Option<String>) -> Result<LedgerConfig> {
    let config = match path {
        Some(path) if path.exists() => LedgerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        Some(path) => {
            warn!("Config file {} not found, using defaults", path.display());
            LedgerConfig::default()
        }
        None => LedgerConfig::default(),
    };

    let mut config = config.apply_env()?;
    if let Some(url) = rpc_url {
        config.rpc_url = url;
        config.validate()?;
    }
    Ok(config)
}

/// Token tripped by the first Ctrl-C
fn cancel_on_ctrl_c() -> CancelToken {
    let token = CancelToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            trigger.cancel();
        }
    });
    token
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
