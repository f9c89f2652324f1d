//! Ledger scanning for accounts matching curve and balance criteria
//!
//! A scan works in rounds. Each round pulls one batch of recent transactions,
//! drops the records from ledgers an earlier round already processed, keeps
//! the signers whose key verifiably belongs to the sending account, and
//! queries the balance of every new candidate that passes the curve filter.
//! Rounds start at most once per poll interval and repeat until enough
//! accounts have been found or the [`ScanGuard`] trips.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

use crate::account::verified_signer;
use crate::address::Address;
use crate::cancel::ScanGuard;
use crate::curve::CurveFamily;
use crate::error::{Error, Result};
use crate::ledger::{with_session, LedgerClient, TransportError, TxRecord};

/// Pause between two rounds; validated ledgers close every few seconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Which curve families a scan accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveFilter {
    #[default]
    All,
    Secp256k1,
    Ed25519,
}

impl CurveFilter {
    pub fn matches(&self, curve: CurveFamily) -> bool {
        match self {
            Self::All => true,
            Self::Secp256k1 => curve == CurveFamily::Secp256k1,
            Self::Ed25519 => curve == CurveFamily::Ed25519,
        }
    }
}

impl From<CurveFamily> for CurveFilter {
    fn from(curve: CurveFamily) -> Self {
        match curve {
            CurveFamily::Secp256k1 => Self::Secp256k1,
            CurveFamily::Ed25519 => Self::Ed25519,
        }
    }
}

impl fmt::Display for CurveFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Secp256k1 => f.write_str("secp256k1"),
            Self::Ed25519 => f.write_str("ed25519"),
        }
    }
}

impl FromStr for CurveFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<CurveFamily>().map(Self::from)
    }
}

/// What a scan is looking for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCriteria {
    /// Minimum balance in drops, inclusive
    pub min_balance: u64,
    /// Number of accounts to find
    pub count: usize,
    #[serde(default)]
    pub curve_filter: CurveFilter,
    /// Minimum time between the starts of two rounds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl ScanCriteria {
    pub fn new(min_balance: u64, count: usize) -> Self {
        Self {
            min_balance,
            count,
            curve_filter: CurveFilter::All,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    pub fn with_curve_filter(mut self, curve_filter: CurveFilter) -> Self {
        self.curve_filter = curve_filter;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Never shorter than a millisecond
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Accounts found so far, the newest ledger already processed and the
/// number of completed rounds
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    discovered: Vec<Address>,
    seen: HashSet<Address>,
    cursor: Option<u64>,
    rounds: u64,
}

impl ScanState {
    pub fn discovered(&self) -> &[Address] {
        &self.discovered
    }

    /// Highest ledger index whose records have been processed
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.seen.contains(address)
    }

    /// Records without a ledger index are always treated as new
    pub fn is_unprocessed(&self, record: &TxRecord) -> bool {
        match (record.ledger_index, self.cursor) {
            (Some(index), Some(cursor)) => index > cursor,
            _ => true,
        }
    }

    fn advance(&mut self, newest: Option<u64>) {
        self.cursor = self.cursor.max(newest);
        self.rounds += 1;
    }

    fn push(&mut self, address: Address) -> bool {
        if !self.seen.insert(address.clone()) {
            return false;
        }
        self.discovered.push(address);
        true
    }
}

/// A scan in progress over one ledger client.
///
/// The state survives an aborted round, so [`AddressScan::discovered`] is a
/// valid partial result after a cancellation or timeout.
pub struct AddressScan<'c, C: ?Sized> {
    client: &'c C,
    criteria: ScanCriteria,
    state: ScanState,
}

impl<'c, C> AddressScan<'c, C>
where
    C: LedgerClient + ?Sized,
{
    pub fn new(client: &'c C, criteria: ScanCriteria) -> Self {
        Self {
            client,
            criteria,
            state: ScanState::default(),
        }
    }

    pub fn criteria(&self) -> &ScanCriteria {
        &self.criteria
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn discovered(&self) -> &[Address] {
        self.state.discovered()
    }

    pub fn into_discovered(self) -> Vec<Address> {
        self.state.discovered
    }

    pub fn is_complete(&self) -> bool {
        self.state.discovered.len() >= self.criteria.count
    }

    /// Process one batch of recent transactions. Returns how many accounts
    /// were added.
    ///
    /// Accounts missing from the validated ledger (deleted since they signed)
    /// are skipped like accounts below the balance threshold.
    pub async fn run_round(&mut self, guard: &ScanGuard) -> Result<usize> {
        guard.check()?;

        let records = guard
            .run(self.client.fetch_recent_transactions())
            .await?
            .map_err(Error::HistoryUnavailable)?;

        let fresh: Vec<&TxRecord> = records
            .iter()
            .filter(|record| self.state.is_unprocessed(record))
            .collect();
        let newest = fresh.iter().filter_map(|record| record.ledger_index).max();
        if fresh.is_empty() && !records.is_empty() {
            debug!(cursor = ?self.state.cursor, "no new ledger since last round");
        }

        let mut checked = HashSet::new();
        let mut added = 0;
        for record in fresh {
            if self.is_complete() {
                break;
            }

            let Some(key) = verified_signer(record) else {
                continue;
            };

            let curve = key.curve();
            if !self.criteria.curve_filter.matches(curve) {
                debug!(account = %record.account, %curve, "curve filtered");
                continue;
            }

            let address = key.address();
            if self.state.contains(&address) || !checked.insert(address.clone()) {
                continue;
            }

            let balance = match guard.run(self.client.fetch_balance(&address)).await? {
                Ok(balance) => balance,
                Err(TransportError::AccountNotFound) => {
                    debug!(address = %address, "account no longer exists");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if balance < self.criteria.min_balance {
                debug!(address = %address, balance, "balance below threshold");
                continue;
            }

            if self.state.push(address) {
                added += 1;
            }
        }

        self.state.advance(newest);
        info!(
            round = self.state.rounds,
            cursor = ?self.state.cursor,
            records = records.len(),
            added,
            total = self.state.discovered.len(),
            "scan round complete"
        );
        Ok(added)
    }

    /// Run rounds until the target count is reached
    pub async fn run(&mut self, guard: &ScanGuard) -> Result<Vec<Address>> {
        let mut pace = tokio::time::interval(self.criteria.poll_interval());
        pace.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.is_complete() {
            // The first tick completes immediately
            guard.run(pace.tick()).await?;
            self.run_round(guard).await?;
        }

        Ok(self
            .state
            .discovered
            .iter()
            .take(self.criteria.count)
            .cloned()
            .collect())
    }
}

/// Find `criteria.count` accounts in one ledger session
#[instrument(
    skip_all,
    fields(
        client = client.client_type(),
        count = criteria.count,
        min_balance = criteria.min_balance,
        curve = %criteria.curve_filter
    )
)]
pub async fn scan_addresses<C>(
    client: &C,
    criteria: &ScanCriteria,
    guard: &ScanGuard,
) -> Result<Vec<Address>>
where
    C: LedgerClient + ?Sized,
{
    if criteria.count == 0 {
        return Ok(Vec::new());
    }

    with_session(client, |client| async move {
        let mut scan = AddressScan::new(client, criteria.clone());
        scan.run(guard).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_filter_matches() {
        assert!(CurveFilter::All.matches(CurveFamily::Secp256k1));
        assert!(CurveFilter::All.matches(CurveFamily::Ed25519));
        assert!(CurveFilter::Ed25519.matches(CurveFamily::Ed25519));
        assert!(!CurveFilter::Ed25519.matches(CurveFamily::Secp256k1));
        assert!(!CurveFilter::Secp256k1.matches(CurveFamily::Ed25519));
    }

    #[test]
    fn test_curve_filter_parse() {
        assert_eq!("ALL".parse::<CurveFilter>().unwrap(), CurveFilter::All);
        assert_eq!(
            "secp256k1".parse::<CurveFilter>().unwrap(),
            CurveFilter::Secp256k1
        );
        assert_eq!("Ed25519".parse::<CurveFilter>().unwrap(), CurveFilter::Ed25519);
        assert!(matches!(
            "p256".parse::<CurveFilter>(),
            Err(Error::Domain(_))
        ));
        assert_eq!(CurveFilter::Ed25519.to_string(), "ed25519");
    }

    #[test]
    fn test_criteria_defaults_to_all_curves() {
        let criteria: ScanCriteria =
            serde_json::from_str(r#"{"min_balance": 10, "count": 2}"#).unwrap();
        assert_eq!(criteria, ScanCriteria::new(10, 2));
        assert_eq!(criteria.curve_filter, CurveFilter::All);
        assert_eq!(
            criteria.poll_interval(),
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
        );
    }

    #[test]
    fn test_poll_interval_has_a_floor() {
        let criteria = ScanCriteria::new(0, 1).with_poll_interval(Duration::ZERO);
        assert_eq!(criteria.poll_interval_ms, 0);
        assert_eq!(criteria.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_cursor_filters_processed_ledgers() {
        let record = |index: Option<u64>| {
            let record = TxRecord::new("rA", Vec::new());
            match index {
                Some(index) => record.with_ledger_index(index),
                None => record,
            }
        };

        let mut state = ScanState::default();
        assert!(state.is_unprocessed(&record(Some(5))));

        state.advance(Some(5));
        assert_eq!(state.cursor(), Some(5));
        assert!(!state.is_unprocessed(&record(Some(4))));
        assert!(!state.is_unprocessed(&record(Some(5))));
        assert!(state.is_unprocessed(&record(Some(6))));
        assert!(state.is_unprocessed(&record(None)));

        // A batch without indexes never moves the cursor back
        state.advance(None);
        assert_eq!(state.cursor(), Some(5));
        assert_eq!(state.rounds(), 2);
    }

    #[test]
    fn test_state_is_duplicate_free() {
        let address: Address = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".parse().unwrap();
        let mut state = ScanState::default();
        assert!(state.push(address.clone()));
        assert!(!state.push(address.clone()));
        assert_eq!(state.discovered(), &[address]);
        assert_eq!(state.cursor(), None);
        assert_eq!(state.rounds(), 0);
    }
}
