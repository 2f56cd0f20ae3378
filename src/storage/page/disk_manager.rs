//! Disk manager for page-level I/O.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{HeapScanError, Result};
use crate::storage::page::{Page, PageId, PAGE_SIZE};

/// Manages disk I/O for the heap data file.
///
/// Pages are verified against their header checksum on read; pages
/// beyond the end of the file read back as zeroed pages.
pub struct DiskManager {
    /// Path to the data file.
    path: PathBuf,
    /// File handle for the data file.
    file: File,
    /// Next page index to hand out.
    next_page_idx: u32,
}

impl DiskManager {
    /// Opens or creates a data file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn new(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| HeapScanError::StorageError(format!("Failed to open data file: {e}")))?;

        let file_len = file
            .metadata()
            .map_err(|e| HeapScanError::StorageError(format!("Failed to get file metadata: {e}")))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_page_idx: file_len.div_ceil(PAGE_SIZE as u64) as u32,
        })
    }

    /// Returns the path to the data file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of pages allocated in the data file.
    #[must_use]
    pub fn num_pages(&self) -> u32 {
        self.next_page_idx
    }

    /// Reads a page from disk and verifies its checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the checksum does not match.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        self.file
            .seek(SeekFrom::Start(page_id.offset()))
            .map_err(|e| HeapScanError::StorageError(format!("Failed to seek to {page_id}: {e}")))?;

        let mut data = [0u8; PAGE_SIZE];
        let page = match self.file.read_exact(&mut data) {
            Ok(()) => Page::from_data(page_id, data),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Page::new(page_id),
            Err(e) => {
                return Err(HeapScanError::StorageError(format!(
                    "Failed to read {page_id}: {e}"
                )))
            }
        };
        page.verify_checksum()?;
        Ok(page)
    }

    /// Writes a page to disk. The caller stamps the checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn write_page(&mut self, page: &Page) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(page.id.offset()))
            .map_err(|e| HeapScanError::StorageError(format!("Failed to seek to {}: {e}", page.id)))?;
        self.file
            .write_all(&page.data)
            .map_err(|e| HeapScanError::StorageError(format!("Failed to write {}: {e}", page.id)))
    }

    /// Allocates a new page and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be extended.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        let page_id = PageId::new(self.next_page_idx);
        let new_size = (u64::from(self.next_page_idx) + 1) * PAGE_SIZE as u64;
        self.file
            .set_len(new_size)
            .map_err(|e| HeapScanError::StorageError(format!("Failed to extend file: {e}")))?;
        self.next_page_idx += 1;
        Ok(page_id)
    }

    /// Flushes all buffered writes to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&mut self) -> Result<()> {
        self.file
            .sync_all()
            .map_err(|e| HeapScanError::StorageError(format!("Failed to sync file: {e}")))
    }
}
