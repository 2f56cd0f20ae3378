//! Storage layer for heap tables.
//!
//! This module provides everything below the scan executor:
//! - Page-level I/O and the slotted heap page format ([`page`])
//! - Buffer pool management with shared page pins ([`buffer_pool`])
//! - Transaction status and snapshot visibility ([`mvcc`])
//! - Table-level locks ([`lock`])
//! - Heap tuples and the sequential access method ([`heap`])
//! - Bulk CSV import ([`copy`])

pub mod buffer_pool;
pub mod copy;
pub mod heap;
pub mod lock;
pub mod mvcc;
pub mod page;

// Re-export commonly used types
pub use buffer_pool::{BufferPool, BufferPoolStats, PinnedPage};
pub use copy::{CsvImportConfig, ImportResult};
pub use heap::{HeapAccess, HeapCursor, RecordId, TupleDescriptor, TupleHeader};
pub use lock::{LockManager, LockMode, TableLock};
pub use mvcc::{Snapshot, TransactionManager, TxnId, TxnStatus};
pub use page::{DiskManager, Page, PageId, PageType, PAGE_SIZE};
