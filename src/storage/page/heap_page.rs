//! Slotted heap page layout.
//!
//! ```text
//! [0..16)            common header (num_slots @8, free_end @10)
//! [16..16+4*n)       slot array: (offset: u16, len: u16) per slot
//! [free_end..4096)   tuple bytes, growing downward
//! ```
//!
//! A slot with `len == 0` is unused. Tuples start with a 16-byte header
//! holding `xmin` and `xmax`.

use super::{read_u16, read_u64, write_common_header, write_u16, write_u64, PageType, PAGE_SIZE};

/// Size of the heap page header.
pub const HEAP_PAGE_HEADER_SIZE: usize = 16;

/// Size of one slot array entry.
pub const SLOT_ENTRY_SIZE: usize = 4;

/// Size of the per-tuple MVCC header.
pub const TUPLE_HEADER_SIZE: usize = 16;

const NUM_SLOTS_OFFSET: usize = 8;
const FREE_END_OFFSET: usize = 10;

/// Location of a tuple within its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEntry {
    /// Byte offset of the tuple from the start of the page.
    pub offset: u16,
    /// Tuple length in bytes, header included.
    pub len: u16,
}

impl SlotEntry {
    /// Returns true if the slot holds a tuple.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.len != 0
    }
}

fn slot_at(data: &[u8], idx: u16) -> Option<SlotEntry> {
    if idx >= read_u16(data, NUM_SLOTS_OFFSET) {
        return None;
    }
    let pos = HEAP_PAGE_HEADER_SIZE + usize::from(idx) * SLOT_ENTRY_SIZE;
    Some(SlotEntry {
        offset: read_u16(data, pos),
        len: read_u16(data, pos + 2),
    })
}

/// Read-only view of a heap page.
#[derive(Clone, Copy)]
pub struct HeapPageRef<'a>(pub &'a [u8]);

impl<'a> HeapPageRef<'a> {
    /// Number of slots in the slot array, used or not.
    #[must_use]
    pub fn num_slots(&self) -> u16 {
        read_u16(self.0, NUM_SLOTS_OFFSET)
    }

    /// Returns the slot entry at `idx`.
    #[must_use]
    pub fn slot(&self, idx: u16) -> Option<SlotEntry> {
        slot_at(self.0, idx)
    }

    /// Returns `(xmin, xmax)` of the tuple in slot `idx`.
    #[must_use]
    pub fn tuple_header(&self, idx: u16) -> Option<(u64, u64)> {
        let entry = self.slot(idx).filter(SlotEntry::is_used)?;
        let off = usize::from(entry.offset);
        Some((read_u64(self.0, off), read_u64(self.0, off + 8)))
    }

    /// Returns the payload bytes of the tuple in slot `idx`.
    #[must_use]
    pub fn payload(&self, idx: u16) -> Option<&'a [u8]> {
        let entry = self.slot(idx).filter(SlotEntry::is_used)?;
        let start = usize::from(entry.offset) + TUPLE_HEADER_SIZE;
        let end = usize::from(entry.offset) + usize::from(entry.len);
        self.0.get(start..end)
    }

    /// Bytes available for one more tuple including its slot entry.
    #[must_use]
    pub fn free_space(&self) -> usize {
        free_space(self.0)
    }
}

fn free_end(data: &[u8]) -> usize {
    match read_u16(data, FREE_END_OFFSET) {
        // A full 4096-byte page cannot store its end offset in u16.
        0 => PAGE_SIZE,
        v => usize::from(v),
    }
}

fn free_space(data: &[u8]) -> usize {
    let slots_end =
        HEAP_PAGE_HEADER_SIZE + usize::from(read_u16(data, NUM_SLOTS_OFFSET)) * SLOT_ENTRY_SIZE;
    free_end(data).saturating_sub(slots_end)
}

/// Mutable view of a heap page.
pub struct HeapPageMut<'a>(pub &'a mut [u8]);

impl HeapPageMut<'_> {
    /// Formats the page as an empty heap page owned by `table_id`.
    pub fn init(&mut self, table_id: u32) {
        self.0[..HEAP_PAGE_HEADER_SIZE].fill(0);
        write_common_header(self.0, PageType::Heap, table_id);
        write_u16(self.0, NUM_SLOTS_OFFSET, 0);
        write_u16(self.0, FREE_END_OFFSET, 0);
    }

    /// Returns a read-only view.
    #[must_use]
    pub fn as_ref(&self) -> HeapPageRef<'_> {
        HeapPageRef(self.0)
    }

    /// Largest payload a freshly initialized page can hold.
    #[must_use]
    pub const fn max_payload() -> usize {
        PAGE_SIZE - HEAP_PAGE_HEADER_SIZE - SLOT_ENTRY_SIZE - TUPLE_HEADER_SIZE
    }

    /// Appends a tuple, returning its slot index, or `None` if the page is full.
    pub fn insert(&mut self, xmin: u64, payload: &[u8]) -> Option<u16> {
        let tuple_len = TUPLE_HEADER_SIZE + payload.len();
        if tuple_len + SLOT_ENTRY_SIZE > free_space(self.0) {
            return None;
        }
        let num_slots = read_u16(self.0, NUM_SLOTS_OFFSET);
        let offset = free_end(self.0) - tuple_len;

        write_u64(self.0, offset, xmin);
        write_u64(self.0, offset + 8, 0);
        self.0[offset + TUPLE_HEADER_SIZE..offset + tuple_len].copy_from_slice(payload);

        let pos = HEAP_PAGE_HEADER_SIZE + usize::from(num_slots) * SLOT_ENTRY_SIZE;
        write_u16(self.0, pos, offset as u16);
        write_u16(self.0, pos + 2, tuple_len as u16);
        write_u16(self.0, NUM_SLOTS_OFFSET, num_slots + 1);
        write_u16(self.0, FREE_END_OFFSET, offset as u16);
        Some(num_slots)
    }

    /// Stamps the deleting transaction on the tuple in slot `idx`.
    ///
    /// Returns false if the slot does not hold a tuple.
    pub fn set_xmax(&mut self, idx: u16, xmax: u64) -> bool {
        match slot_at(self.0, idx).filter(SlotEntry::is_used) {
            Some(entry) => {
                write_u64(self.0, usize::from(entry.offset) + 8, xmax);
                true
            }
            None => false,
        }
    }
}
