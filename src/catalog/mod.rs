//! Catalog for managing relation schemas.

mod schema;

pub use schema::{Catalog, ColumnDef, RelationKind, TableSchema};
