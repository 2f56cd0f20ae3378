//! Table-level locks.
//!
//! Acquisition never waits: a request that conflicts with a held lock
//! fails immediately with an access error, leaving retry to the caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{AccessFailure, HeapScanError, Result};

/// Table lock modes, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Taken by scans.
    AccessShare,
    /// Taken by inserts and deletes.
    RowExclusive,
    /// Taken by maintenance that must exclude every other user.
    AccessExclusive,
}

impl LockMode {
    /// Returns true if the two modes cannot be held at the same time.
    #[must_use]
    pub fn conflicts_with(self, other: LockMode) -> bool {
        self == LockMode::AccessExclusive || other == LockMode::AccessExclusive
    }

    fn index(self) -> usize {
        match self {
            LockMode::AccessShare => 0,
            LockMode::RowExclusive => 1,
            LockMode::AccessExclusive => 2,
        }
    }

    const ALL: [LockMode; 3] = [
        LockMode::AccessShare,
        LockMode::RowExclusive,
        LockMode::AccessExclusive,
    ];
}

/// Holders per mode for one table.
#[derive(Debug, Default, Clone, Copy)]
struct Holders([usize; 3]);

impl Holders {
    fn is_empty(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }

    fn admits(&self, mode: LockMode) -> bool {
        LockMode::ALL
            .iter()
            .all(|&held| self.0[held.index()] == 0 || !held.conflicts_with(mode))
    }
}

/// Tracks which table locks are held.
#[derive(Default)]
pub struct LockManager {
    tables: Mutex<HashMap<String, Holders>>,
}

impl LockManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires `mode` on `table` without waiting.
    ///
    /// # Errors
    ///
    /// Returns `AccessError` with [`AccessFailure::LockConflict`] if a
    /// conflicting lock is held.
    pub fn acquire(self: &Arc<Self>, table: &str, mode: LockMode) -> Result<TableLock> {
        let mut tables = self.tables.lock();
        let holders = tables.entry(table.to_string()).or_default();
        if !holders.admits(mode) {
            if holders.is_empty() {
                tables.remove(table);
            }
            return Err(HeapScanError::access(table, AccessFailure::LockConflict));
        }
        holders.0[mode.index()] += 1;
        Ok(TableLock {
            manager: Arc::clone(self),
            table: table.to_string(),
            mode,
        })
    }

    /// Number of holders of `mode` on `table`.
    #[must_use]
    pub fn holders(&self, table: &str, mode: LockMode) -> usize {
        self.tables
            .lock()
            .get(table)
            .map_or(0, |h| h.0[mode.index()])
    }

    fn release(&self, table: &str, mode: LockMode) {
        let mut tables = self.tables.lock();
        if let Some(holders) = tables.get_mut(table) {
            let count = &mut holders.0[mode.index()];
            *count = count.saturating_sub(1);
            if holders.is_empty() {
                tables.remove(table);
            }
        }
    }
}

/// A held table lock, released on drop.
pub struct TableLock {
    manager: Arc<LockManager>,
    table: String,
    mode: LockMode,
}

impl TableLock {
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl fmt::Debug for TableLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableLock")
            .field("table", &self.table)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Drop for TableLock {
    fn drop(&mut self) {
        self.manager.release(&self.table, self.mode);
    }
}
