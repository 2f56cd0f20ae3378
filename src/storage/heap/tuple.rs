//! Heap tuple identity, MVCC header, and payload encoding.

use std::fmt;

use crate::error::{HeapScanError, Result};
use crate::storage::buffer_pool::PinnedPage;
use crate::storage::mvcc::TxnId;
use crate::storage::page::{HeapPageRef, PageId};
use crate::types::Value;

/// Physical address of a tuple: page plus slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    #[must_use]
    pub const fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id.index(), self.slot)
    }
}

/// Inserting and deleting transaction of a tuple version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleHeader {
    pub xmin: TxnId,
    pub xmax: TxnId,
}

/// Fixed-size description of a tuple that stays on its page.
///
/// Copying a descriptor never copies tuple bytes; reading the values
/// needs a pin on the page named by `rid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleDescriptor {
    pub rid: RecordId,
    pub header: TupleHeader,
    /// Payload length in bytes.
    pub len: u16,
}

impl TupleDescriptor {
    /// Builds the descriptor of slot `slot` on `page`, if the slot is used.
    #[must_use]
    pub fn read(page_id: PageId, page: HeapPageRef<'_>, slot: u16) -> Option<Self> {
        let (xmin, xmax) = page.tuple_header(slot)?;
        let len = page.payload(slot)?.len() as u16;
        Some(Self {
            rid: RecordId::new(page_id, slot),
            header: TupleHeader {
                xmin: TxnId(xmin),
                xmax: TxnId(xmax),
            },
            len,
        })
    }

    /// Decodes the tuple's column values from its pinned page.
    ///
    /// # Errors
    ///
    /// Returns an error if `page` is not the tuple's page or the payload
    /// cannot be decoded.
    pub fn values(&self, page: &PinnedPage) -> Result<Vec<Value>> {
        if page.page_id() != self.rid.page_id {
            return Err(HeapScanError::ExecutionError(format!(
                "tuple {} read through {}",
                self.rid,
                page.page_id()
            )));
        }
        page.read(|bytes| {
            let payload = HeapPageRef(bytes).payload(self.rid.slot).ok_or_else(|| {
                HeapScanError::PageError(format!("tuple {} has no payload", self.rid))
            })?;
            decode_values(payload)
        })
    }
}

/// Encodes column values into a tuple payload.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_values(values: &[Value]) -> Result<Vec<u8>> {
    bincode::serialize(values)
        .map_err(|e| HeapScanError::StorageError(format!("Failed to encode tuple: {e}")))
}

/// Decodes a tuple payload into column values.
///
/// # Errors
///
/// Returns an error if the payload is malformed.
pub fn decode_values(payload: &[u8]) -> Result<Vec<Value>> {
    bincode::deserialize(payload)
        .map_err(|e| HeapScanError::PageError(format!("Failed to decode tuple: {e}")))
}
