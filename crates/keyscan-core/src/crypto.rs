//! Public key references and digest primitives

use ripemd::Ripemd160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::address::{self, Address};
use crate::curve::CurveFamily;
use crate::error::{Error, Result};
use crate::types::AccountId;

/// Length of a public key as it appears on the ledger
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Marker byte in front of ed25519 keys (rendered "ED" in hex)
pub const ED25519_KEY_PREFIX: u8 = 0xED;

/// Prefix of a compressed secp256k1 key with even y
pub const SECP256K1_EVEN_PREFIX: u8 = 0x02;

/// Prefix of a compressed secp256k1 key with odd y
pub const SECP256K1_ODD_PREFIX: u8 = 0x03;

/// A public key as observed on the ledger, tagged by curve family.
///
/// Constructed once from raw bytes; downstream code matches on the variant
/// instead of re-inspecting prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKeyRef {
    /// Parity prefix (`0x02`/`0x03`) followed by the 32-byte x-coordinate
    Secp256k1Compressed([u8; 33]),
    /// RFC 8032 encoded point, without the `0xED` marker
    Ed25519Encoded([u8; 32]),
}

impl PublicKeyRef {
    /// Parse the 33-byte ledger representation
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_LENGTH {
            return Err(Error::InvalidKeyLength {
                expected: PUBLIC_KEY_LENGTH,
                got: bytes.len(),
            });
        }

        match bytes[0] {
            ED25519_KEY_PREFIX => {
                let mut point = [0u8; 32];
                point.copy_from_slice(&bytes[1..]);
                Ok(Self::Ed25519Encoded(point))
            }
            SECP256K1_EVEN_PREFIX | SECP256K1_ODD_PREFIX => {
                let mut key = [0u8; 33];
                key.copy_from_slice(bytes);
                Ok(Self::Secp256k1Compressed(key))
            }
            other => Err(Error::UnknownKeyPrefix(other)),
        }
    }

    /// Parse from hex (either case)
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())?;
        Self::from_bytes(&bytes)
    }

    /// The 33-byte ledger representation
    pub fn to_bytes(&self) -> [u8; 33] {
        match self {
            Self::Secp256k1Compressed(key) => *key,
            Self::Ed25519Encoded(point) => {
                let mut bytes = [0u8; 33];
                bytes[0] = ED25519_KEY_PREFIX;
                bytes[1..].copy_from_slice(point);
                bytes
            }
        }
    }

    /// Uppercase hex, as the ledger renders `SigningPubKey`
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.to_bytes())
    }

    pub fn curve(&self) -> CurveFamily {
        match self {
            Self::Secp256k1Compressed(_) => CurveFamily::Secp256k1,
            Self::Ed25519Encoded(_) => CurveFamily::Ed25519,
        }
    }

    /// Compute the AccountId (RIPEMD160 of SHA256 of the ledger bytes)
    pub fn account_id(&self) -> AccountId {
        AccountId::new(hash160(&self.to_bytes()))
    }

    /// Classic address of the account controlled by this key
    pub fn address(&self) -> Address {
        address::encode_account_id(&self.account_id())
    }
}

impl Serialize for PublicKeyRef {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKeyRef {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for PublicKeyRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// Hash data using SHA256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA256 applied twice
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}
