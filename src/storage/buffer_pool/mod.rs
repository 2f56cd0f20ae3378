//! Buffer pool management for page caching.
//!
//! This module implements a fixed-capacity cache of heap pages. It provides:
//! - Page pinning and unpinning with per-frame pin counts
//! - LRU eviction of unpinned frames, flushing dirty ones first
//! - [`PinnedPage`], a shared page reference that owns exactly one pin
//!
//! # Example
//!
//! ```ignore
//! let pool = Arc::new(BufferPool::new(capacity, disk_manager)?);
//! let page = pool.pin(page_id)?;
//! let num_slots = page.read(|bytes| HeapPageRef(bytes).num_slots());
//! // The pin is released when `page` drops.
//! ```

mod buffer_frame;
mod eviction;

pub use buffer_frame::BufferFrame;
pub use eviction::LruEvictionQueue;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{HeapScanError, Result};
use crate::storage::page::{DiskManager, Page, PageId, PAGE_SIZE};

type PageBytes = Box<[u8; PAGE_SIZE]>;

/// Frame bookkeeping guarded by a single lock.
///
/// Lock order is always state, then a frame's data latch, then the disk.
struct PoolState {
    frames: Vec<BufferFrame>,
    page_table: HashMap<PageId, usize>,
    eviction_queue: LruEvictionQueue,
}

/// Buffer pool for managing in-memory page cache.
pub struct BufferPool {
    /// Frame metadata, page table and eviction queue.
    state: Mutex<PoolState>,
    /// Page bytes, one latch per frame.
    data: Vec<RwLock<PageBytes>>,
    /// Maximum number of pages in the pool.
    capacity: usize,
    /// Disk manager for page I/O.
    disk_manager: Mutex<DiskManager>,
    /// Monotonically increasing access counter.
    access_counter: AtomicU64,
    /// Counter for cache hits (page found in buffer pool).
    cache_hits: AtomicU64,
    /// Counter for cache misses (page had to be loaded from disk).
    cache_misses: AtomicU64,
    /// Counter for number of pages evicted.
    evictions: AtomicU64,
    /// Total pins taken, including `PinnedPage::share`.
    pins: AtomicU64,
    /// Total pins released.
    unpins: AtomicU64,
}

impl BufferPool {
    /// Creates a new buffer pool with the given capacity and disk manager.
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is zero.
    pub fn new(capacity: usize, disk_manager: DiskManager) -> Result<Self> {
        if capacity == 0 {
            return Err(HeapScanError::BufferPoolError(
                "Buffer pool capacity must be greater than 0".into(),
            ));
        }

        Ok(Self {
            state: Mutex::new(PoolState {
                frames: (0..capacity).map(BufferFrame::new).collect(),
                page_table: HashMap::with_capacity(capacity),
                eviction_queue: LruEvictionQueue::new(capacity),
            }),
            data: (0..capacity)
                .map(|_| RwLock::new(Box::new([0u8; PAGE_SIZE])))
                .collect(),
            capacity,
            disk_manager: Mutex::new(disk_manager),
            access_counter: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            pins: AtomicU64::new(0),
            unpins: AtomicU64::new(0),
        })
    }

    /// Returns the capacity of the buffer pool.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of pages currently in the buffer pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Returns the total number of pages allocated in the data file.
    #[must_use]
    pub fn file_page_count(&self) -> u32 {
        self.disk_manager.lock().num_pages()
    }

    /// Returns the current pin count of a cached page.
    #[must_use]
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|&idx| state.frames[idx].pin_count)
    }

    /// Pins a page, loading it from disk if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be read or every frame is pinned.
    pub fn pin(self: &Arc<Self>, page_id: PageId) -> Result<PinnedPage> {
        let mut state = self.state.lock();
        let access = self.access_counter.fetch_add(1, Ordering::Relaxed);

        if let Some(&frame_idx) = state.page_table.get(&page_id) {
            let frame = &mut state.frames[frame_idx];
            frame.pin();
            frame.last_access = access;
            state.eviction_queue.remove(frame_idx);
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(self.handle(frame_idx, page_id));
        }

        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        let frame_idx = self.find_or_evict_frame(&mut state)?;
        let page = self.disk_manager.lock().read_page(page_id)?;
        self.data[frame_idx].write().copy_from_slice(&page.data);

        state.frames[frame_idx].load(page_id, false, access);
        state.page_table.insert(page_id, frame_idx);
        Ok(self.handle(frame_idx, page_id))
    }

    /// Allocates a new zeroed page and pins it.
    ///
    /// # Errors
    ///
    /// Returns an error if no frames are available or allocation fails.
    pub fn new_page(self: &Arc<Self>) -> Result<PinnedPage> {
        let mut state = self.state.lock();
        let frame_idx = self.find_or_evict_frame(&mut state)?;
        let page_id = self.disk_manager.lock().allocate_page()?;
        self.data[frame_idx].write().fill(0);

        let access = self.access_counter.fetch_add(1, Ordering::Relaxed);
        state.frames[frame_idx].load(page_id, true, access);
        state.page_table.insert(page_id, frame_idx);
        Ok(self.handle(frame_idx, page_id))
    }

    fn handle(self: &Arc<Self>, frame_idx: usize, page_id: PageId) -> PinnedPage {
        self.pins.fetch_add(1, Ordering::Relaxed);
        PinnedPage {
            pool: Arc::clone(self),
            frame_idx,
            page_id,
        }
    }

    /// Flushes a specific page to disk if it's dirty.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be written to disk.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.state.lock();
        let Some(&frame_idx) = state.page_table.get(&page_id) else {
            return Ok(());
        };
        if state.frames[frame_idx].dirty {
            self.write_frame(frame_idx, page_id)?;
            state.frames[frame_idx].dirty = false;
        }
        Ok(())
    }

    /// Flushes all dirty pages to disk and syncs the data file.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be written to disk.
    pub fn flush_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        for frame_idx in 0..state.frames.len() {
            let frame = &state.frames[frame_idx];
            if let (Some(page_id), true) = (frame.page_id, frame.dirty) {
                self.write_frame(frame_idx, page_id)?;
                state.frames[frame_idx].dirty = false;
            }
        }
        self.disk_manager.lock().sync()
    }

    /// Writes a frame's bytes with a fresh checksum.
    fn write_frame(&self, frame_idx: usize, page_id: PageId) -> Result<()> {
        let mut page = Page::from_data(page_id, **self.data[frame_idx].read());
        page.update_checksum();
        self.disk_manager.lock().write_page(&page)
    }

    fn mark_dirty(&self, frame_idx: usize) {
        self.state.lock().frames[frame_idx].dirty = true;
    }

    fn add_pin(&self, frame_idx: usize) {
        self.state.lock().frames[frame_idx].pin();
        self.pins.fetch_add(1, Ordering::Relaxed);
    }

    /// Releases one pin (called when a `PinnedPage` is dropped).
    fn unpin(&self, frame_idx: usize) {
        let mut state = self.state.lock();
        match state.frames[frame_idx].unpin() {
            Some(0) => state.eviction_queue.push(frame_idx),
            Some(_) => {}
            None => {
                warn!(frame_idx, "unpin of a frame with no pins");
                return;
            }
        }
        self.unpins.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns an empty frame, evicting the least recently released one if needed.
    fn find_or_evict_frame(&self, state: &mut PoolState) -> Result<usize> {
        if let Some(frame) = state.frames.iter().find(|f| f.is_empty()) {
            return Ok(frame.frame_id);
        }

        while let Some(frame_idx) = state.eviction_queue.pop() {
            if !state.frames[frame_idx].is_evictable() {
                continue;
            }
            if let Some(page_id) = state.frames[frame_idx].page_id {
                if state.frames[frame_idx].dirty {
                    self.write_frame(frame_idx, page_id)?;
                }
                state.page_table.remove(&page_id);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(%page_id, frame_idx, "evicted page");
            }
            state.frames[frame_idx].reset();
            return Ok(frame_idx);
        }

        Err(HeapScanError::BufferPoolError(format!(
            "Buffer pool is full: all {} frames are pinned",
            self.capacity
        )))
    }

    /// Returns buffer pool statistics.
    #[must_use]
    pub fn stats(&self) -> BufferPoolStats {
        let state = self.state.lock();
        let loaded = state.frames.iter().filter(|f| !f.is_empty());
        let (dirty_pages, pinned_pages) = loaded.fold((0, 0), |(dirty, pinned), f| {
            (dirty + usize::from(f.dirty), pinned + usize::from(f.pin_count > 0))
        });

        BufferPoolStats {
            capacity: self.capacity,
            pages_used: state.page_table.len(),
            dirty_pages,
            pinned_pages,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            pins: self.pins.load(Ordering::Relaxed),
            unpins: self.unpins.load(Ordering::Relaxed),
        }
    }

    /// Resets the cache statistics counters.
    ///
    /// Pin and unpin totals are reset too, so only call this while no
    /// page is pinned if the two are compared afterwards.
    pub fn reset_stats(&self) {
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.pins.store(0, Ordering::Relaxed);
        self.unpins.store(0, Ordering::Relaxed);
    }
}

/// A shared reference to a buffered page holding exactly one pin.
///
/// The frame cannot be evicted while any `PinnedPage` for it is alive.
/// Dropping the value releases its pin.
pub struct PinnedPage {
    pool: Arc<BufferPool>,
    frame_idx: usize,
    page_id: PageId,
}

impl PinnedPage {
    /// Returns the page ID.
    #[must_use]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Takes an additional pin on the same page.
    #[must_use]
    pub fn share(&self) -> PinnedPage {
        self.pool.add_pin(self.frame_idx);
        PinnedPage {
            pool: Arc::clone(&self.pool),
            frame_idx: self.frame_idx,
            page_id: self.page_id,
        }
    }

    /// Runs `f` over the page bytes under a shared latch.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let bytes = self.pool.data[self.frame_idx].read();
        f(&bytes[..])
    }

    /// Runs `f` over the page bytes under an exclusive latch and marks the page dirty.
    pub fn write<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        self.pool.mark_dirty(self.frame_idx);
        let mut bytes = self.pool.data[self.frame_idx].write();
        f(&mut bytes[..])
    }

    /// Releases the pin now.
    pub fn release(self) {
        drop(self);
    }

    /// Returns true if both references point at the same page.
    #[must_use]
    pub fn same_page(&self, other: &PinnedPage) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool) && self.frame_idx == other.frame_idx
    }
}

impl fmt::Debug for PinnedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedPage")
            .field("page_id", &self.page_id)
            .field("frame_idx", &self.frame_idx)
            .finish()
    }
}

impl Drop for PinnedPage {
    fn drop(&mut self) {
        self.pool.unpin(self.frame_idx);
    }
}

/// Statistics about the buffer pool state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPoolStats {
    /// Maximum number of pages the pool can hold.
    pub capacity: usize,
    /// Current number of pages in the pool.
    pub pages_used: usize,
    /// Number of dirty pages.
    pub dirty_pages: usize,
    /// Number of pages with at least one pin.
    pub pinned_pages: usize,
    /// Number of cache hits (page found in buffer pool).
    pub cache_hits: u64,
    /// Number of cache misses (page had to be loaded from disk).
    pub cache_misses: u64,
    /// Number of pages evicted.
    pub evictions: u64,
    /// Pins taken.
    pub pins: u64,
    /// Pins released.
    pub unpins: u64,
}

impl BufferPoolStats {
    /// Calculates the cache hit rate as a fraction (0.0 to 1.0).
    ///
    /// Returns `None` if there have been no cache accesses.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.total_accesses();
        if total == 0 {
            None
        } else {
            Some(self.cache_hits as f64 / total as f64)
        }
    }

    /// Returns the total number of cache accesses (hits + misses).
    #[must_use]
    pub fn total_accesses(&self) -> u64 {
        self.cache_hits + self.cache_misses
    }

    /// Pins currently outstanding.
    #[must_use]
    pub fn outstanding_pins(&self) -> u64 {
        self.pins.saturating_sub(self.unpins)
    }
}
