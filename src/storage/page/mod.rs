//! Page-level storage primitives.
//!
//! This module defines the core page abstractions:
//! - `PageId`: Index of a page in the data file
//! - `Page`: Fixed-size data block (4KB)
//! - `DiskManager`: File I/O abstraction
//! - `PageType`: Type discriminator stored in every page header
//! - `HeapPageRef` / `HeapPageMut`: Slotted layout for heap tuples
//!
//! Every page starts with a common 16-byte header:
//! ```text
//! [0..4)   page_type: u32
//! [4..8)   table_id: u32
//! [8..12)  layout-specific
//! [12..16) checksum: u32
//! ```

mod disk_manager;
mod heap_page;
mod page_id;

pub use disk_manager::DiskManager;
pub use heap_page::{
    HeapPageMut, HeapPageRef, SlotEntry, HEAP_PAGE_HEADER_SIZE, SLOT_ENTRY_SIZE, TUPLE_HEADER_SIZE,
};
pub use page_id::PageId;

use crate::error::{HeapScanError, Result};

/// Page size in bytes (4KB).
pub const PAGE_SIZE: usize = 4096;

const PAGE_TYPE_OFFSET: usize = 0;
const TABLE_ID_OFFSET: usize = 4;
const CHECKSUM_OFFSET: usize = 12;

/// Size of the header shared by every page type.
pub const COMMON_HEADER_SIZE: usize = 16;

/// Type of page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PageType {
    /// Allocated but never initialized.
    Free = 0,
    /// Slotted heap page holding table tuples.
    Heap = 1,
}

impl PageType {
    /// Converts from u32 to `PageType`.
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(PageType::Free),
            1 => Some(PageType::Heap),
            _ => None,
        }
    }
}

/// A fixed-size page of data.
#[derive(Clone)]
pub struct Page {
    /// Unique identifier for this page.
    pub id: PageId,
    /// Raw page data.
    pub data: [u8; PAGE_SIZE],
}

impl Page {
    /// Creates a new zeroed page with the given ID.
    #[must_use]
    pub fn new(id: PageId) -> Self {
        Self {
            id,
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Creates a page from existing data.
    #[must_use]
    pub fn from_data(id: PageId, data: [u8; PAGE_SIZE]) -> Self {
        Self { id, data }
    }

    /// Returns the page type recorded in the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header carries an unknown type tag.
    pub fn page_type(&self) -> Result<PageType> {
        page_type_of(&self.data)
    }

    /// Returns true if no byte of the page has ever been written.
    #[must_use]
    pub fn is_zeroed(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    /// Computes the CRC32 of the page, skipping the checksum field.
    #[must_use]
    pub fn checksum(&self) -> u32 {
        compute_checksum(&self.data)
    }

    /// Stamps the current checksum into the header.
    pub fn update_checksum(&mut self) {
        let checksum = self.checksum();
        self.data[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verifies the stored checksum. Zeroed pages are always valid.
    ///
    /// # Errors
    ///
    /// Returns `ChecksumError` if the stored and computed values differ.
    pub fn verify_checksum(&self) -> Result<()> {
        if self.is_zeroed() {
            return Ok(());
        }
        let stored = read_u32(&self.data, CHECKSUM_OFFSET);
        let computed = self.checksum();
        if stored != computed {
            return Err(HeapScanError::ChecksumError(format!(
                "{}: stored {stored:#010x}, computed {computed:#010x}",
                self.id
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("data_len", &self.data.len())
            .finish()
    }
}

fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&data[..CHECKSUM_OFFSET]);
    hasher.update(&data[CHECKSUM_OFFSET + 4..]);
    hasher.finalize()
}

/// Reads the page type tag of raw page bytes.
///
/// # Errors
///
/// Returns `PageError` for an unknown tag.
pub fn page_type_of(data: &[u8]) -> Result<PageType> {
    let raw = read_u32(data, PAGE_TYPE_OFFSET);
    PageType::from_u32(raw).ok_or_else(|| HeapScanError::PageError(format!("Invalid page type: {raw}")))
}

/// Reads the owning table ID of raw page bytes.
#[must_use]
pub fn table_id_of(data: &[u8]) -> u32 {
    read_u32(data, TABLE_ID_OFFSET)
}

/// Writes the common header fields.
pub fn write_common_header(data: &mut [u8], page_type: PageType, table_id: u32) {
    data[PAGE_TYPE_OFFSET..PAGE_TYPE_OFFSET + 4].copy_from_slice(&(page_type as u32).to_le_bytes());
    data[TABLE_ID_OFFSET..TABLE_ID_OFFSET + 4].copy_from_slice(&table_id.to_le_bytes());
}

pub(crate) fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

pub(crate) fn write_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

pub(crate) fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

pub(crate) fn write_u64(data: &mut [u8], offset: usize, value: u64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}
