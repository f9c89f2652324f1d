//! Error types for keyscan core

use thiserror::Error;

use crate::curve::CurveFamily;
use crate::ledger::TransportError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Unknown public key prefix: 0x{0:02x}")]
    UnknownKeyPrefix(u8),

    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Domain error: {0}")]
    Domain(String),

    #[error("No square root exists modulo p")]
    NoSquareRoot,

    #[error("Point is not on the {0} curve")]
    PointNotOnCurve(CurveFamily),

    /// The modulus handed to the square root solver was not prime.
    #[error("Fatal invariant violated: {0}")]
    FatalInvariant(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Address checksum mismatch")]
    ChecksumMismatch,

    #[error("No verified signer found in the latest transactions of {0}")]
    NoVerifiedSigner(String),

    #[error("Transaction history unavailable: {0}")]
    HistoryUnavailable(#[source] TransportError),

    #[error("Ledger transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out")]
    Timeout,
}
