//! Tuple insertion and deletion on a table's heap pages.

use std::sync::Arc;

use tracing::trace;

use super::tuple::{encode_values, RecordId};
use crate::error::{HeapScanError, Result};
use crate::storage::buffer_pool::BufferPool;
use crate::storage::mvcc::TxnId;
use crate::storage::page::{HeapPageMut, HeapPageRef, PageId, SLOT_ENTRY_SIZE, TUPLE_HEADER_SIZE};
use crate::types::Value;

/// Where an inserted tuple landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub rid: RecordId,
    /// Set when the tuple needed a fresh page, which the caller must
    /// append to the table's page list.
    pub new_page: Option<PageId>,
}

/// Appends a tuple to the last page of a table, extending it when full.
///
/// # Errors
///
/// Returns an error if the tuple is larger than a page or a page cannot
/// be pinned or allocated.
pub fn insert_tuple(
    pool: &Arc<BufferPool>,
    table_id: u32,
    pages: &[PageId],
    xmin: TxnId,
    values: &[Value],
) -> Result<InsertOutcome> {
    let payload = encode_values(values)?;
    if payload.len() > HeapPageMut::max_payload() {
        return Err(HeapScanError::StorageError(format!(
            "Tuple of {} bytes does not fit in a page (max {})",
            payload.len(),
            HeapPageMut::max_payload()
        )));
    }

    if let Some(&last) = pages.last() {
        let page = pool.pin(last)?;
        let needed = payload.len() + TUPLE_HEADER_SIZE + SLOT_ENTRY_SIZE;
        if page.read(|bytes| HeapPageRef(bytes).free_space() >= needed) {
            if let Some(slot) = page.write(|bytes| HeapPageMut(bytes).insert(xmin.0, &payload)) {
                return Ok(InsertOutcome {
                    rid: RecordId::new(last, slot),
                    new_page: None,
                });
            }
        }
    }

    let page = pool.new_page()?;
    let page_id = page.page_id();
    let slot = page
        .write(|bytes| {
            let mut heap = HeapPageMut(bytes);
            heap.init(table_id);
            heap.insert(xmin.0, &payload)
        })
        .ok_or_else(|| HeapScanError::StorageError("Tuple does not fit in an empty page".into()))?;
    trace!(table_id, %page_id, "extended heap");
    Ok(InsertOutcome {
        rid: RecordId::new(page_id, slot),
        new_page: Some(page_id),
    })
}

/// Stamps `xmax` on a tuple.
///
/// `deleter_is_live` tells whether an existing deleter still counts
/// (running or committed); a tuple whose deleter aborted can be deleted
/// again.
///
/// # Errors
///
/// Returns an error if the slot holds no tuple or a live transaction
/// already deleted it.
pub fn delete_tuple(
    pool: &Arc<BufferPool>,
    rid: RecordId,
    xmax: TxnId,
    deleter_is_live: impl Fn(TxnId) -> bool,
) -> Result<()> {
    let page = pool.pin(rid.page_id)?;
    page.write(|bytes| {
        let (_, existing) = HeapPageRef(bytes)
            .tuple_header(rid.slot)
            .ok_or_else(|| HeapScanError::StorageError(format!("No tuple at {rid}")))?;
        let existing = TxnId(existing);
        if existing.is_valid() && deleter_is_live(existing) {
            return Err(HeapScanError::StorageError(format!(
                "Tuple {rid} already deleted by {existing}"
            )));
        }
        HeapPageMut(bytes).set_xmax(rid.slot, xmax.0);
        Ok(())
    })
}
