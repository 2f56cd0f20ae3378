//! Heap tables: tuple layout, modification, and sequential access.
//!
//! A heap table is an ordered list of slotted pages recorded in the
//! catalog. Tuples are appended to the last page and never move, so a
//! [`RecordId`] stays valid for the life of the tuple. Deletion only
//! stamps `xmax`; whether a scan sees a tuple is decided by its
//! [`Snapshot`](crate::storage::mvcc::Snapshot).

mod scan;
mod table;
mod tuple;

pub use scan::{HeapAccess, HeapCursor};
pub use table::{delete_tuple, insert_tuple, InsertOutcome};
pub use tuple::{decode_values, encode_values, RecordId, TupleDescriptor, TupleHeader};
