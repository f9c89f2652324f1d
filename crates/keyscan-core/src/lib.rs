//! Keyscan Core - public key recovery and account discovery for the XRP Ledger
//!
//! Accounts on the ledger only ever reveal a compressed secp256k1 key or an
//! encoded ed25519 key. This crate recovers the full curve point behind such
//! keys, derives and decodes classic addresses, and scans ledger history for
//! accounts whose signer can be verified, filtered by curve and balance.
//!
//! Network access goes through the [`LedgerClient`] trait.

pub mod account;
pub mod address;
pub mod cancel;
pub mod crypto;
pub mod curve;
pub mod error;
pub mod ledger;
pub mod modmath;
pub mod scan;
pub mod sqrt;
pub mod types;

pub use account::{
    recover_account_from_addresses, recover_account_from_pubkeys, select_signing_key,
    verified_signer, Account, RecoveryOptions, DEFAULT_MAX_CONCURRENT,
};
pub use address::{
    account_id, decode_address, encode_account_id, encode_address, Address,
    ACCOUNT_ADDRESS_PREFIX,
};
pub use cancel::{CancelToken, ScanGuard};
pub use crypto::{PublicKeyRef, ED25519_KEY_PREFIX, PUBLIC_KEY_LENGTH};
pub use curve::{recover_point, CurveFamily, Point};
pub use error::{Error, Result};
pub use ledger::{with_session, LedgerClient, TransportError, TxRecord};
pub use scan::{
    scan_addresses, AddressScan, CurveFilter, ScanCriteria, ScanState, DEFAULT_POLL_INTERVAL_MS,
};
pub use sqrt::sqrt_mod_prime;
pub use types::AccountId;
