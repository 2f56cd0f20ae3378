//! Interface between the scan executor and a storage access method.

use crate::error::Result;
use crate::storage::buffer_pool::PinnedPage;
use crate::storage::heap::TupleDescriptor;
use crate::storage::mvcc::Snapshot;
use crate::types::Value;

/// Direction in which a scan walks the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanDirection {
    #[default]
    Forward,
    Backward,
}

/// A tuple returned by [`TableScanCursor::next`].
///
/// Both fields borrow the cursor: the descriptor lives in the cursor's
/// single internal buffer and the page is the cursor's own pin. A caller
/// that needs the tuple past the next call must copy the descriptor and
/// take its own pin with [`PinnedPage::share`].
#[derive(Debug, Clone, Copy)]
pub struct ScanTuple<'c> {
    pub descriptor: &'c TupleDescriptor,
    pub page: &'c PinnedPage,
}

impl ScanTuple<'_> {
    /// Decodes the tuple's column values.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be decoded.
    pub fn values(&self) -> Result<Vec<Value>> {
        self.descriptor.values(self.page)
    }
}

/// An open scan over one table.
pub trait TableScanCursor {
    /// Name of the scanned table.
    fn table(&self) -> &str;

    /// Advances one visible tuple in `direction`.
    ///
    /// Returns `Ok(None)` once the table is exhausted in that direction,
    /// and keeps returning it without side effects on further calls.
    ///
    /// # Errors
    ///
    /// Storage failures (page read, checksum, buffer pool) are returned unchanged.
    fn next(&mut self, direction: ScanDirection) -> Result<Option<ScanTuple<'_>>>;

    /// Resets the position to the start of the table for the scan's
    /// direction, keeping the table lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the table can no longer be resolved.
    fn rescan(&mut self) -> Result<()>;

    /// Releases the cursor's page pin and its table lock.
    fn end_scan(self: Box<Self>);
}

/// Opens scan cursors over tables.
pub trait AccessMethod {
    /// Opens a cursor over `table`.
    ///
    /// # Errors
    ///
    /// Returns `AccessError` if the table does not exist, is not a heap
    /// table, or is locked in a conflicting mode.
    fn begin_scan(
        &self,
        table: &str,
        snapshot: Snapshot,
        direction: ScanDirection,
    ) -> Result<Box<dyn TableScanCursor>>;
}
