//! Sequential scan state: single-row and batched fetch over one cursor.
//!
//! A [`SeqScanState`] owns one [`TableScanCursor`] and one [`SlotPool`].
//! Its strategy is fixed when it is opened:
//!
//! - [`ScanStrategy::Single`] pulls one tuple per [`SeqScanState::fetch_one`]
//!   into a single slot.
//! - [`ScanStrategy::Batched`] pulls up to `capacity` tuples per
//!   [`SeqScanState::fill_batch`], filling slots `0..filled` in cursor order.
//!
//! [`SeqScanState::next_slot`] consumes either strategy one slot at a time.
//! A batch taken with `fill_batch` counts as returned in full, and
//! `fill_batch` refuses to run while `next_slot` still owns unreturned
//! slots, so mixing the two never repeats or skips a row.
//! Every store into a slot takes a page pin and every clear releases it;
//! by the end of [`SeqScanState::shutdown`] the two counts are equal.

use tracing::{debug, trace, warn};

use super::access::{AccessMethod, ScanDirection, TableScanCursor};
use super::slot::{SlotPool, TupleSlot};
use super::ScanConfig;
use crate::error::{HeapScanError, Result};
use crate::storage::mvcc::Snapshot;

/// How a scan pulls tuples from its cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStrategy {
    /// One tuple per fetch.
    Single,
    /// Up to `capacity` tuples per fetch.
    Batched { capacity: usize },
}

impl ScanStrategy {
    /// Number of slots the strategy needs.
    #[must_use]
    pub fn capacity(&self) -> usize {
        match self {
            ScanStrategy::Single => 1,
            ScanStrategy::Batched { capacity } => *capacity,
        }
    }
}

/// Progress through the current batch of an open scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    /// No unconsumed slots; the next pull goes to the cursor.
    NeedsFetch,
    /// `next_slot` has not yet returned every slot of the current batch.
    Partial,
    /// The table is exhausted and every slot has been consumed.
    Exhausted,
}

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Open(BatchPhase),
    Closed,
}

/// Cursor, slots, and batch position of one sequential scan.
pub struct SeqScanState {
    table: String,
    strategy: ScanStrategy,
    direction: ScanDirection,
    /// `None` once shut down.
    cursor: Option<Box<dyn TableScanCursor>>,
    pool: SlotPool,
    /// Occupied slots of the current batch.
    filled: usize,
    /// Slots of the current batch already handed out by `next_slot`.
    consumed: usize,
    end_of_table: bool,
}

impl SeqScanState {
    /// Opens a scan of `table` through `access`.
    ///
    /// The slot pool is allocated before the cursor is opened, so a failed
    /// allocation never holds a table lock.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a bad configuration, `ResourceExhaustion`
    /// if the slot pool cannot be allocated, and `AccessError` if the
    /// table cannot be opened.
    pub fn open(
        access: &dyn AccessMethod,
        table: &str,
        snapshot: Snapshot,
        config: &ScanConfig,
    ) -> Result<Self> {
        config.validate()?;
        let pool = SlotPool::allocate(config.strategy.capacity())?;
        let cursor = access.begin_scan(table, snapshot, config.direction)?;
        Ok(Self::with_parts(cursor, pool, config))
    }

    /// Wraps an already open cursor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` or `ResourceExhaustion` as [`Self::open`];
    /// the cursor is ended on failure.
    pub fn from_cursor(cursor: Box<dyn TableScanCursor>, config: &ScanConfig) -> Result<Self> {
        let pool = match config
            .validate()
            .and_then(|()| SlotPool::allocate(config.strategy.capacity()))
        {
            Ok(pool) => pool,
            Err(e) => {
                cursor.end_scan();
                return Err(e);
            }
        };
        Ok(Self::with_parts(cursor, pool, config))
    }

    fn with_parts(cursor: Box<dyn TableScanCursor>, pool: SlotPool, config: &ScanConfig) -> Self {
        let table = cursor.table().to_string();
        debug!(
            table = %table,
            strategy = ?config.strategy,
            direction = ?config.direction,
            "sequential scan opened"
        );
        Self {
            table,
            strategy: config.strategy,
            direction: config.direction,
            cursor: Some(cursor),
            pool,
            filled: 0,
            consumed: 0,
            end_of_table: false,
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn strategy(&self) -> ScanStrategy {
        self.strategy
    }

    #[must_use]
    pub fn direction(&self) -> ScanDirection {
        self.direction
    }

    /// Number of slots in the pool.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Tuples stored into slots so far.
    #[must_use]
    pub fn stores(&self) -> u64 {
        self.pool.stores()
    }

    /// Slot pins released so far.
    #[must_use]
    pub fn releases(&self) -> u64 {
        self.pool.releases()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> ScanPhase {
        if self.cursor.is_none() {
            ScanPhase::Closed
        } else if self.consumed < self.filled {
            ScanPhase::Open(BatchPhase::Partial)
        } else if self.end_of_table {
            ScanPhase::Open(BatchPhase::Exhausted)
        } else {
            ScanPhase::Open(BatchPhase::NeedsFetch)
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.cursor.is_none() {
            return Err(HeapScanError::ScanClosed(self.table.clone()));
        }
        Ok(())
    }

    fn ensure_strategy(&self, batched: bool, operation: &str) -> Result<()> {
        self.ensure_open()?;
        let is_batched = matches!(self.strategy, ScanStrategy::Batched { .. });
        if is_batched != batched {
            return Err(HeapScanError::UnsupportedOperation(format!(
                "{operation} on a {:?} scan of '{}'",
                self.strategy, self.table
            )));
        }
        Ok(())
    }

    /// Fetches the next tuple into the scan's single slot.
    ///
    /// Returns `None` at end of table, leaving the slot empty.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` on a batched scan, `ScanClosed`
    /// after shutdown, and any cursor error unchanged.
    pub fn fetch_one(&mut self) -> Result<Option<&TupleSlot>> {
        self.ensure_strategy(false, "fetch_one")?;
        Ok(self.fetch_single()?.then(|| &self.pool.slots()[0]))
    }

    fn fetch_single(&mut self) -> Result<bool> {
        self.pool.clear(0);
        self.filled = 0;
        self.consumed = 0;
        if self.end_of_table {
            return Ok(false);
        }
        let cursor = self
            .cursor
            .as_mut()
            .ok_or_else(|| HeapScanError::ScanClosed(self.table.clone()))?;
        match cursor.next(self.direction)? {
            Some(tuple) => {
                self.pool.store(0, tuple)?;
                self.filled = 1;
                self.consumed = 1;
                Ok(true)
            }
            None => {
                self.end_of_table = true;
                Ok(false)
            }
        }
    }

    /// Refills the slot pool and returns how many slots hold tuples.
    ///
    /// Slots are filled in ascending order and the whole batch is handed to
    /// the caller through [`Self::batch`]. A count below the capacity
    /// means the table ran out during this call; later calls return 0
    /// without touching the cursor. An error from the cursor clears the
    /// whole batch before it is returned.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` on a single-row scan or while
    /// [`Self::next_slot`] still has unreturned slots, `ScanClosed` after
    /// shutdown, and any cursor error unchanged.
    pub fn fill_batch(&mut self) -> Result<usize> {
        self.ensure_strategy(true, "fill_batch")?;
        if self.consumed < self.filled {
            return Err(HeapScanError::UnsupportedOperation(format!(
                "fill_batch on '{}' would drop {} slots not yet returned by next_slot",
                self.table,
                self.filled - self.consumed
            )));
        }
        let filled = self.refill()?;
        self.consumed = filled;
        Ok(filled)
    }

    /// Replaces the current batch with the next one; every new slot starts
    /// unconsumed.
    fn refill(&mut self) -> Result<usize> {
        self.filled = 0;
        self.consumed = 0;
        if self.end_of_table {
            self.pool.clear_all();
            return Ok(0);
        }
        match self.fill_slots() {
            Ok(filled) => {
                self.filled = filled;
                trace!(table = %self.table, filled, "batch filled");
                Ok(filled)
            }
            Err(e) => {
                self.pool.clear_all();
                Err(e)
            }
        }
    }

    fn fill_slots(&mut self) -> Result<usize> {
        let cursor = self
            .cursor
            .as_mut()
            .ok_or_else(|| HeapScanError::ScanClosed(self.table.clone()))?;
        for idx in 0..self.pool.capacity() {
            self.pool.clear(idx);
            match cursor.next(self.direction)? {
                Some(tuple) => self.pool.store(idx, tuple)?,
                None => {
                    self.end_of_table = true;
                    self.pool.clear_from(idx);
                    return Ok(idx);
                }
            }
        }
        Ok(self.pool.capacity())
    }

    /// Occupied slots of the current batch, in cursor order.
    #[must_use]
    pub fn batch(&self) -> &[TupleSlot] {
        &self.pool.slots()[..self.filled]
    }

    /// Mutable access to the current batch, for recording qualification.
    pub fn batch_mut(&mut self) -> &mut [TupleSlot] {
        &mut self.pool.slots_mut()[..self.filled]
    }

    /// Returns the next slot under either strategy, fetching as needed.
    ///
    /// On a batched scan a batch obtained from [`Self::fill_batch`] counts
    /// as already returned, so the next call starts a fresh batch.
    ///
    /// # Errors
    ///
    /// Returns `ScanClosed` after shutdown and any cursor error unchanged.
    pub fn next_slot(&mut self) -> Result<Option<&mut TupleSlot>> {
        self.ensure_open()?;
        match self.strategy {
            ScanStrategy::Single => {
                if !self.fetch_single()? {
                    return Ok(None);
                }
                Ok(self.pool.slots_mut().first_mut())
            }
            ScanStrategy::Batched { .. } => {
                if self.consumed == self.filled && self.refill()? == 0 {
                    return Ok(None);
                }
                let idx = self.consumed;
                self.consumed += 1;
                Ok(self.pool.slots_mut().get_mut(idx))
            }
        }
    }

    /// Rewinds the scan to the start of the table.
    ///
    /// Every slot is cleared, so the next fetch starts a fresh batch. If
    /// the cursor cannot rewind, the scan keeps its current position.
    ///
    /// # Errors
    ///
    /// Returns `ScanClosed` after shutdown and any cursor error unchanged.
    pub fn reinitialize(&mut self) -> Result<()> {
        let cursor = self
            .cursor
            .as_mut()
            .ok_or_else(|| HeapScanError::ScanClosed(self.table.clone()))?;
        cursor.rescan()?;
        self.pool.clear_all();
        self.filled = 0;
        self.consumed = 0;
        self.end_of_table = false;
        debug!(table = %self.table, "sequential scan rewound");
        Ok(())
    }

    /// Clears every slot and ends the cursor. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        let Some(cursor) = self.cursor.take() else {
            return;
        };
        self.pool.clear_all();
        self.filled = 0;
        self.consumed = 0;
        cursor.end_scan();
        debug!(
            table = %self.table,
            stores = self.pool.stores(),
            releases = self.pool.releases(),
            "sequential scan closed"
        );
    }
}

impl Drop for SeqScanState {
    fn drop(&mut self) {
        if self.cursor.is_some() {
            warn!(table = %self.table, "sequential scan dropped without shutdown");
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for SeqScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeqScanState")
            .field("table", &self.table)
            .field("strategy", &self.strategy)
            .field("direction", &self.direction)
            .field("phase", &self.phase())
            .field("filled", &self.filled)
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}
