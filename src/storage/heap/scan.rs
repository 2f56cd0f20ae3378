//! Sequential heap access method.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::tuple::TupleDescriptor;
use crate::catalog::{Catalog, RelationKind};
use crate::error::{AccessFailure, HeapScanError, Result};
use crate::executor::{AccessMethod, ScanDirection, ScanTuple, TableScanCursor};
use crate::storage::buffer_pool::{BufferPool, PinnedPage};
use crate::storage::lock::{LockManager, LockMode, TableLock};
use crate::storage::mvcc::Snapshot;
use crate::storage::page::{page_type_of, table_id_of, HeapPageRef, PageId, PageType};

/// Opens [`HeapCursor`]s over heap tables.
#[derive(Clone)]
pub struct HeapAccess {
    pool: Arc<BufferPool>,
    catalog: Arc<RwLock<Catalog>>,
    locks: Arc<LockManager>,
}

impl HeapAccess {
    #[must_use]
    pub fn new(pool: Arc<BufferPool>, catalog: Arc<RwLock<Catalog>>, locks: Arc<LockManager>) -> Self {
        Self {
            pool,
            catalog,
            locks,
        }
    }

    /// Opens a heap cursor, returning the concrete type.
    ///
    /// # Errors
    ///
    /// See [`AccessMethod::begin_scan`].
    pub fn open(&self, table: &str, snapshot: Snapshot, direction: ScanDirection) -> Result<HeapCursor> {
        let (table_id, pages) = resolve(&self.catalog, table)?;
        let lock = self.locks.acquire(table, LockMode::AccessShare)?;
        debug!(table, pages = pages.len(), ?direction, "heap scan started");
        Ok(HeapCursor {
            table: table.to_string(),
            table_id,
            pool: Arc::clone(&self.pool),
            catalog: Arc::clone(&self.catalog),
            snapshot,
            pages,
            position: Position::Unstarted,
            current: None,
            descriptor: None,
            _lock: lock,
        })
    }
}

impl AccessMethod for HeapAccess {
    fn begin_scan(
        &self,
        table: &str,
        snapshot: Snapshot,
        direction: ScanDirection,
    ) -> Result<Box<dyn TableScanCursor>> {
        Ok(Box::new(self.open(table, snapshot, direction)?))
    }
}

fn resolve(catalog: &RwLock<Catalog>, table: &str) -> Result<(u32, Vec<PageId>)> {
    let catalog = catalog.read();
    let schema = catalog
        .get_table(table)
        .ok_or_else(|| HeapScanError::access(table, AccessFailure::NotFound))?;
    if schema.kind != RelationKind::Table {
        return Err(HeapScanError::access(
            table,
            AccessFailure::WrongRelationKind(schema.kind),
        ));
    }
    Ok((schema.table_id, schema.pages.clone()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Fresh or rescanned: the first call starts at whichever end its
    /// direction points away from.
    Unstarted,
    On { page_idx: usize, slot: u16 },
    BeforeFirst,
    AfterLast,
}

/// Slots of one page still to be examined.
#[derive(Debug, Clone, Copy)]
enum SlotRange {
    /// Ascending from this slot.
    From(u16),
    /// Descending from below this slot, or from the last slot.
    Below(Option<u16>),
}

/// Cursor over the pages a heap table had when the scan started.
pub struct HeapCursor {
    table: String,
    table_id: u32,
    pool: Arc<BufferPool>,
    catalog: Arc<RwLock<Catalog>>,
    snapshot: Snapshot,
    pages: Vec<PageId>,
    position: Position,
    /// Pin on the page under `position`.
    current: Option<PinnedPage>,
    /// The one descriptor buffer handed out by `next`.
    descriptor: Option<TupleDescriptor>,
    _lock: TableLock,
}

impl HeapCursor {
    /// Returns true while the cursor holds a page pin.
    #[must_use]
    pub fn holds_pin(&self) -> bool {
        self.current.is_some()
    }

    fn pin_page(&mut self, page_idx: usize) -> Result<()> {
        let page_id = self.pages[page_idx];
        if self.current.as_ref().map(PinnedPage::page_id) != Some(page_id) {
            self.current = None;
            self.current = Some(self.pool.pin(page_id)?);
        }
        Ok(())
    }

    /// Finds the first visible tuple of page `page_idx` within `slots`.
    fn search(&mut self, page_idx: usize, slots: SlotRange) -> Result<Option<TupleDescriptor>> {
        self.pin_page(page_idx)?;
        let page = self
            .current
            .as_ref()
            .ok_or_else(|| HeapScanError::ExecutionError("cursor lost its page pin".into()))?;
        let page_id = page.page_id();
        let table_id = self.table_id;
        let snapshot = &self.snapshot;
        page.read(|bytes| {
            if page_type_of(bytes)? != PageType::Heap || table_id_of(bytes) != table_id {
                return Err(HeapScanError::PageError(format!(
                    "{page_id} is not a heap page of table {table_id}"
                )));
            }
            let heap = HeapPageRef(bytes);
            let visible = |slot| {
                TupleDescriptor::read(page_id, heap, slot)
                    .filter(|desc| snapshot.is_visible(desc.header.xmin, desc.header.xmax))
            };
            let n = heap.num_slots();
            Ok(match slots {
                SlotRange::From(start) => (start..n).find_map(visible),
                SlotRange::Below(end) => (0..end.map_or(n, |e| e.min(n))).rev().find_map(visible),
            })
        })
    }

    fn step_forward(&mut self) -> Result<Option<TupleDescriptor>> {
        let (mut page_idx, mut from) = match self.position {
            Position::Unstarted | Position::BeforeFirst => (0, 0u16),
            Position::On { page_idx, slot } => (page_idx, slot + 1),
            Position::AfterLast => return Ok(None),
        };
        while page_idx < self.pages.len() {
            if let Some(desc) = self.search(page_idx, SlotRange::From(from))? {
                self.position = Position::On {
                    page_idx,
                    slot: desc.rid.slot,
                };
                return Ok(Some(desc));
            }
            page_idx += 1;
            from = 0;
        }
        self.position = Position::AfterLast;
        Ok(None)
    }

    fn step_backward(&mut self) -> Result<Option<TupleDescriptor>> {
        let (mut page_idx, mut below) = match self.position {
            Position::Unstarted | Position::AfterLast => match self.pages.len() {
                0 => {
                    self.position = Position::BeforeFirst;
                    return Ok(None);
                }
                n => (n - 1, None),
            },
            Position::On { page_idx, slot } => (page_idx, Some(slot)),
            Position::BeforeFirst => return Ok(None),
        };
        loop {
            if let Some(desc) = self.search(page_idx, SlotRange::Below(below))? {
                self.position = Position::On {
                    page_idx,
                    slot: desc.rid.slot,
                };
                return Ok(Some(desc));
            }
            if page_idx == 0 {
                break;
            }
            page_idx -= 1;
            below = None;
        }
        self.position = Position::BeforeFirst;
        Ok(None)
    }
}

impl TableScanCursor for HeapCursor {
    fn table(&self) -> &str {
        &self.table
    }

    fn next(&mut self, direction: ScanDirection) -> Result<Option<ScanTuple<'_>>> {
        let found = match direction {
            ScanDirection::Forward => self.step_forward()?,
            ScanDirection::Backward => self.step_backward()?,
        };
        self.descriptor = found;
        if found.is_none() {
            self.current = None;
        }
        match (self.descriptor.as_ref(), self.current.as_ref()) {
            (Some(descriptor), Some(page)) => Ok(Some(ScanTuple { descriptor, page })),
            _ => Ok(None),
        }
    }

    fn rescan(&mut self) -> Result<()> {
        let (_, pages) = resolve(&self.catalog, &self.table)?;
        self.pages = pages;
        self.position = Position::Unstarted;
        self.descriptor = None;
        self.current = None;
        debug!(table = %self.table, pages = self.pages.len(), "heap scan rewound");
        Ok(())
    }

    fn end_scan(self: Box<Self>) {
        debug!(table = %self.table, "heap scan ended");
    }
}
