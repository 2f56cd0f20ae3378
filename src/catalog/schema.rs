//! Relation schemas and the catalog that owns them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{HeapScanError, Result};
use crate::storage::PageId;
use crate::types::DataType;

/// Kind of a catalog relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Heap table; the only kind a sequential scan accepts.
    Table,
    /// Secondary index.
    Index,
    /// View with no storage of its own.
    View,
}

impl RelationKind {
    /// Returns a lowercase name for messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::Table => "table",
            RelationKind::Index => "index",
            RelationKind::View => "view",
        }
    }
}

/// Central registry of relation schemas and their heap pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Relations by name.
    relations: HashMap<String, TableSchema>,
    /// Next table ID for auto-increment.
    next_table_id: u32,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Creates a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Catalog {
            relations: HashMap::new(),
            next_table_id: 1,
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_table_id;
        self.next_table_id += 1;
        id
    }

    /// Registers a new relation in the catalog and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if a relation with the same name already exists.
    pub fn create_table(&mut self, mut schema: TableSchema) -> Result<u32> {
        if self.relations.contains_key(&schema.name) {
            return Err(HeapScanError::SchemaError(format!(
                "Relation '{}' already exists",
                schema.name
            )));
        }
        let table_id = self.next_id();
        schema.table_id = table_id;
        schema.pages.clear();
        self.relations.insert(schema.name.clone(), schema);
        Ok(table_id)
    }

    /// Retrieves a relation schema by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<Arc<TableSchema>> {
        self.relations.get(name).map(|s| Arc::new(s.clone()))
    }

    /// Checks if a relation exists in the catalog.
    #[must_use]
    pub fn table_exists(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Returns all relation names.
    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.relations.keys().map(String::as_str).collect()
    }

    /// Returns the heap page list of a relation, in storage order.
    #[must_use]
    pub fn pages(&self, name: &str) -> Option<&[PageId]> {
        self.relations.get(name).map(|s| s.pages.as_slice())
    }

    /// Appends a newly allocated heap page to a relation.
    ///
    /// # Errors
    ///
    /// Returns an error if the relation does not exist.
    pub fn append_page(&mut self, name: &str, page_id: PageId) -> Result<()> {
        let schema = self
            .relations
            .get_mut(name)
            .ok_or_else(|| HeapScanError::CatalogError(format!("Unknown relation '{name}'")))?;
        schema.pages.push(page_id);
        Ok(())
    }
}

/// Schema definition for a relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Internal table ID.
    pub table_id: u32,
    /// Relation name.
    pub name: String,
    /// What kind of relation this is.
    pub kind: RelationKind,
    /// Ordered list of column definitions.
    pub columns: Vec<ColumnDef>,
    /// Heap pages in storage order (empty for indexes and views).
    pub pages: Vec<PageId>,
}

impl TableSchema {
    /// Creates a new heap table schema with validation.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (empty columns, duplicate names).
    pub fn new(name: String, columns: Vec<ColumnDef>) -> Result<Self> {
        Self::with_kind(name, RelationKind::Table, columns)
    }

    /// Creates a schema for a relation of the given kind.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn with_kind(name: String, kind: RelationKind, columns: Vec<ColumnDef>) -> Result<Self> {
        let schema = TableSchema {
            table_id: 0, // Will be set by catalog
            name,
            kind,
            columns,
            pages: Vec::new(),
        };
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(HeapScanError::SchemaError(
                "Relation name cannot be empty".into(),
            ));
        }

        if self.columns.is_empty() {
            return Err(HeapScanError::SchemaError(
                "Table must have at least one column".into(),
            ));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(&col.name) {
                return Err(HeapScanError::SchemaError(format!(
                    "Duplicate column name '{}'",
                    col.name
                )));
            }
        }

        Ok(())
    }

    /// Finds a column definition by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Finds the index of a column by name.
    #[must_use]
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Definition of a single column in a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Column data type.
    pub data_type: DataType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
}

impl ColumnDef {
    /// Creates a new nullable column definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the column name is empty.
    pub fn new(name: String, data_type: DataType) -> Result<Self> {
        if name.is_empty() {
            return Err(HeapScanError::SchemaError(
                "Column name cannot be empty".into(),
            ));
        }
        Ok(ColumnDef {
            name,
            data_type,
            nullable: true,
        })
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}
