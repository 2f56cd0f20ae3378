//! Transaction ids, transaction status tracking, and snapshot visibility.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{HeapScanError, Result};

/// Transaction identifier. Zero is never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxnId(pub u64);

impl TxnId {
    /// Marker stored in tuple headers for "no transaction".
    pub const INVALID: TxnId = TxnId(0);

    /// First id handed out by a fresh transaction manager.
    pub const FIRST: TxnId = TxnId(1);

    #[must_use]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn {}", self.0)
    }
}

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnStatus {
    Running,
    Committed,
    Aborted,
}

/// Point-in-time view deciding which tuple versions a scan sees.
#[derive(Debug, Clone)]
pub enum Snapshot {
    /// Sees every tuple regardless of its transaction stamps.
    Any,
    /// Multi-version snapshot taken on behalf of `txn`.
    Mvcc {
        /// Owning transaction; its own writes are visible.
        txn: TxnId,
        /// First id not yet assigned when the snapshot was taken.
        xmax: TxnId,
        /// Transactions running when the snapshot was taken.
        in_progress: HashSet<TxnId>,
        /// Transactions known to have aborted.
        aborted: Arc<HashSet<TxnId>>,
    },
}

impl Snapshot {
    /// Returns true if the effects of `id` are visible to this snapshot.
    #[must_use]
    pub fn sees_txn(&self, id: TxnId) -> bool {
        match self {
            Snapshot::Any => true,
            Snapshot::Mvcc {
                txn,
                xmax,
                in_progress,
                aborted,
            } => {
                if id == *txn {
                    return true;
                }
                id.is_valid() && id < *xmax && !in_progress.contains(&id) && !aborted.contains(&id)
            }
        }
    }

    /// Returns true if a tuple stamped with `xmin`/`xmax` is visible.
    #[must_use]
    pub fn is_visible(&self, xmin: TxnId, xmax: TxnId) -> bool {
        match self {
            Snapshot::Any => true,
            Snapshot::Mvcc { .. } => {
                self.sees_txn(xmin) && (!xmax.is_valid() || !self.sees_txn(xmax))
            }
        }
    }
}

/// Hands out transaction ids and records their outcome.
#[derive(Debug)]
pub struct TransactionManager {
    next_txn_id: TxnId,
    statuses: HashMap<TxnId, TxnStatus>,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    /// Creates a manager with no transaction history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_txn_id: TxnId::FIRST,
            statuses: HashMap::new(),
        }
    }

    /// Restores a manager from persisted statuses.
    ///
    /// Transactions that were still running when the statuses were saved
    /// can never commit, so they are recorded as aborted.
    #[must_use]
    pub fn from_statuses(statuses: HashMap<TxnId, TxnStatus>) -> Self {
        let next_txn_id = statuses
            .keys()
            .max()
            .map_or(TxnId::FIRST, |max| TxnId(max.0 + 1));
        let statuses = statuses
            .into_iter()
            .map(|(id, status)| match status {
                TxnStatus::Running => (id, TxnStatus::Aborted),
                other => (id, other),
            })
            .collect();
        Self {
            next_txn_id,
            statuses,
        }
    }

    /// Returns all recorded statuses.
    #[must_use]
    pub fn statuses(&self) -> &HashMap<TxnId, TxnStatus> {
        &self.statuses
    }

    /// Returns the status of a transaction.
    #[must_use]
    pub fn status(&self, txn: TxnId) -> Option<TxnStatus> {
        self.statuses.get(&txn).copied()
    }

    /// Starts a new transaction.
    pub fn begin(&mut self) -> TxnId {
        let txn = self.next_txn_id;
        self.next_txn_id = TxnId(txn.0 + 1);
        self.statuses.insert(txn, TxnStatus::Running);
        txn
    }

    /// Commits a running transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is unknown or already finished.
    pub fn commit(&mut self, txn: TxnId) -> Result<()> {
        self.finish(txn, TxnStatus::Committed)
    }

    /// Aborts a running transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is unknown or already finished.
    pub fn abort(&mut self, txn: TxnId) -> Result<()> {
        self.finish(txn, TxnStatus::Aborted)
    }

    fn finish(&mut self, txn: TxnId, outcome: TxnStatus) -> Result<()> {
        self.ensure_running(txn)?;
        self.statuses.insert(txn, outcome);
        Ok(())
    }

    /// Fails unless `txn` is currently running.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError` otherwise.
    pub fn ensure_running(&self, txn: TxnId) -> Result<()> {
        match self.statuses.get(&txn) {
            Some(TxnStatus::Running) => Ok(()),
            Some(status) => Err(HeapScanError::TransactionError(format!(
                "{txn} is already {status:?}"
            ))),
            None => Err(HeapScanError::TransactionError(format!("{txn} does not exist"))),
        }
    }

    /// Takes a snapshot on behalf of a running transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if `txn` is not running.
    pub fn snapshot(&self, txn: TxnId) -> Result<Snapshot> {
        self.ensure_running(txn)?;
        let mut in_progress = HashSet::new();
        let mut aborted = HashSet::new();
        for (&id, &status) in &self.statuses {
            match status {
                TxnStatus::Running if id != txn => {
                    in_progress.insert(id);
                }
                TxnStatus::Aborted => {
                    aborted.insert(id);
                }
                _ => {}
            }
        }
        Ok(Snapshot::Mvcc {
            txn,
            xmax: self.next_txn_id,
            in_progress,
            aborted: Arc::new(aborted),
        })
    }
}
