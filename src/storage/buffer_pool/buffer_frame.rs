//! Bookkeeping for a single buffer pool frame.

use crate::storage::page::PageId;

/// Metadata of a frame in the buffer pool.
///
/// The page bytes live beside the frame under their own latch; this
/// record is only touched while the pool's state lock is held.
#[derive(Debug)]
pub struct BufferFrame {
    /// Index of this frame in the buffer pool.
    pub frame_id: usize,
    /// The page currently loaded in this frame, if any.
    pub page_id: Option<PageId>,
    /// Number of live `PinnedPage` references to this frame.
    pub pin_count: u32,
    /// Whether the page has been modified since last flush.
    pub dirty: bool,
    /// Access counter value at the last pin, for diagnostics.
    pub last_access: u64,
}

impl BufferFrame {
    /// Creates a new empty buffer frame.
    #[must_use]
    pub fn new(frame_id: usize) -> Self {
        Self {
            frame_id,
            page_id: None,
            pin_count: 0,
            dirty: false,
            last_access: 0,
        }
    }

    /// Installs `page_id` in this frame with a single pin.
    pub fn load(&mut self, page_id: PageId, dirty: bool, access: u64) {
        self.page_id = Some(page_id);
        self.pin_count = 1;
        self.dirty = dirty;
        self.last_access = access;
    }

    /// Increments the pin count.
    pub fn pin(&mut self) {
        self.pin_count += 1;
    }

    /// Decrements the pin count and returns the new value.
    ///
    /// An unpin of an unpinned frame is a bookkeeping bug upstream; the
    /// count saturates at zero and the caller logs it.
    pub fn unpin(&mut self) -> Option<u32> {
        self.pin_count = self.pin_count.checked_sub(1)?;
        Some(self.pin_count)
    }

    /// Returns whether this frame can be evicted.
    #[must_use]
    pub fn is_evictable(&self) -> bool {
        self.page_id.is_some() && self.pin_count == 0
    }

    /// Returns whether this frame is empty (no page loaded).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.page_id.is_none()
    }

    /// Resets the frame to empty state.
    pub fn reset(&mut self) {
        self.page_id = None;
        self.pin_count = 0;
        self.dirty = false;
        self.last_access = 0;
    }
}
