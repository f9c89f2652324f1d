//! Account recovery from public keys and from ledger history

use futures_util::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::address::Address;
use crate::cancel::ScanGuard;
use crate::crypto::PublicKeyRef;
use crate::curve::{recover_point, CurveFamily, Point};
use crate::error::{Error, Result};
use crate::ledger::{with_session, LedgerClient, TransportError, TxRecord};

/// Default number of addresses resolved concurrently
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// A recovered identity: the address and the full public key point behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub public_key: Point,
    pub curve: CurveFamily,
}

impl Account {
    /// Recover the account controlled by `key`
    pub fn from_key(key: &PublicKeyRef) -> Result<Self> {
        let public_key = recover_point(key)?;
        Ok(Self {
            address: key.address(),
            curve: public_key.curve,
            public_key,
        })
    }
}

/// Options for [`recover_account_from_addresses`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryOptions {
    /// Upper bound on in-flight ledger lookups
    pub max_concurrent: usize,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// Recover one account per key, in input order
pub fn recover_account_from_pubkeys(keys: &[PublicKeyRef]) -> Result<Vec<Account>> {
    keys.iter().map(Account::from_key).collect()
}

/// The signing key of `record`, if it really belongs to the claimed account.
///
/// Unparsable or empty keys and keys deriving to another address yield `None`.
pub fn verified_signer(record: &TxRecord) -> Option<PublicKeyRef> {
    let key = match PublicKeyRef::from_bytes(&record.signing_pub_key) {
        Ok(key) => key,
        Err(e) => {
            debug!(account = %record.account, "skipping record with unusable key: {}", e);
            return None;
        }
    };

    let derived = key.address();
    if derived.as_str() != record.account {
        debug!(
            account = %record.account,
            derived = %derived,
            "signing key does not belong to the claimed account"
        );
        return None;
    }
    Some(key)
}

/// First key among `records` that was signed by `address` itself
pub fn select_signing_key(address: &Address, records: &[TxRecord]) -> Result<PublicKeyRef> {
    records
        .iter()
        .filter(|record| record.account == address.as_str())
        .find_map(verified_signer)
        .ok_or_else(|| Error::NoVerifiedSigner(address.to_string()))
}

/// Recover accounts by looking up the keys they signed with on the ledger.
///
/// Results keep the order of `addresses`. The first failure aborts the whole
/// batch.
#[instrument(skip_all, fields(addresses = addresses.len(), client = client.client_type()))]
pub async fn recover_account_from_addresses<C>(
    client: &C,
    addresses: &[Address],
    options: &RecoveryOptions,
    guard: &ScanGuard,
) -> Result<Vec<Account>>
where
    C: LedgerClient + ?Sized,
{
    if addresses.is_empty() {
        return Ok(Vec::new());
    }

    with_session(client, |client| async move {
        stream::iter(addresses)
            .map(|address| recover_one(client, address, guard))
            .buffered(options.max_concurrent.max(1))
            .try_collect::<Vec<_>>()
            .await
    })
    .await
}

async fn recover_one<C>(client: &C, address: &Address, guard: &ScanGuard) -> Result<Account>
where
    C: LedgerClient + ?Sized,
{
    let records = match guard.run(client.fetch_latest_transactions(address)).await? {
        Ok(records) => records,
        // Unfunded or deleted: nothing on the ledger can vouch for a key
        Err(TransportError::AccountNotFound) => Vec::new(),
        Err(e) => return Err(Error::HistoryUnavailable(e)),
    };

    let key = select_signing_key(address, &records)?;
    debug!(address = %address, curve = %key.curve(), "found verified signer");
    Account::from_key(&key)
}
