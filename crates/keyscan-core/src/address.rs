//! XRPL classic address codec
//!
//! `address = base58(0x00 || account_id || checksum)` where the checksum is the
//! first four bytes of SHA256(SHA256(0x00 || account_id)), written with the
//! ledger's own base-58 alphabet
//! (`rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::{hash160, sha256d, PUBLIC_KEY_LENGTH};
use crate::error::{Error, Result};
use crate::types::AccountId;

/// Type prefix of a classic account address
pub const ACCOUNT_ADDRESS_PREFIX: u8 = 0x00;

const CHECKSUM_LENGTH: usize = 4;
const PAYLOAD_LENGTH: usize = 1 + 20;
const DECODED_LENGTH: usize = PAYLOAD_LENGTH + CHECKSUM_LENGTH;

/// A checksummed classic address, e.g. `rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh`.
///
/// Only produced by encoding an [`AccountId`] or by successfully decoding a
/// string, so the text and the account id always agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    encoded: String,
    account_id: AccountId,
}

impl Address {
    /// Decode and validate an address string
    pub fn parse(s: &str) -> Result<Self> {
        let account_id = decode_address(s)?;
        Ok(Self {
            encoded: s.to_string(),
            account_id,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.encoded
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.encoded)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// AccountId of a 33-byte ledger public key
pub fn account_id(pubkey: &[u8]) -> Result<AccountId> {
    if pubkey.len() != PUBLIC_KEY_LENGTH {
        return Err(Error::InvalidKeyLength {
            expected: PUBLIC_KEY_LENGTH,
            got: pubkey.len(),
        });
    }
    Ok(AccountId::new(hash160(pubkey)))
}

/// Derive the classic address of a 33-byte ledger public key
pub fn encode_address(pubkey: &[u8]) -> Result<Address> {
    Ok(encode_account_id(&account_id(pubkey)?))
}

/// Encode an AccountId as a classic address
pub fn encode_account_id(account_id: &AccountId) -> Address {
    let mut data = Vec::with_capacity(DECODED_LENGTH);
    data.push(ACCOUNT_ADDRESS_PREFIX);
    data.extend_from_slice(account_id.as_bytes());
    let checksum = checksum(&data);
    data.extend_from_slice(&checksum);

    Address {
        encoded: bs58::encode(data)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .into_string(),
        account_id: *account_id,
    }
}

/// Decode a classic address back to its AccountId, verifying the checksum
pub fn decode_address(s: &str) -> Result<AccountId> {
    let data = bs58::decode(s)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_vec()
        .map_err(|e| Error::InvalidAddress(e.to_string()))?;

    if data.len() != DECODED_LENGTH {
        return Err(Error::InvalidAddress(format!(
            "expected {} decoded bytes, got {}",
            DECODED_LENGTH,
            data.len()
        )));
    }

    let (payload, check) = data.split_at(PAYLOAD_LENGTH);
    if checksum(payload).as_slice() != check {
        return Err(Error::ChecksumMismatch);
    }
    if payload[0] != ACCOUNT_ADDRESS_PREFIX {
        return Err(Error::InvalidAddress(format!(
            "unexpected type prefix 0x{:02x}",
            payload[0]
        )));
    }

    let mut id = [0u8; 20];
    id.copy_from_slice(&payload[1..]);
    Ok(AccountId::new(id))
}

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LENGTH] {
    let digest = sha256d(payload);
    let mut out = [0u8; CHECKSUM_LENGTH];
    out.copy_from_slice(&digest[..CHECKSUM_LENGTH]);
    out
}
