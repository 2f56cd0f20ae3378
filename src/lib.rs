//! heapscan - batched sequential scans over MVCC heap tables.
//!
//! The crate is layered bottom-up:
//! - [`storage`]: pages, buffer pool, transactions, table locks, and the
//!   heap access method
//! - [`executor`]: the sequential scan state with single-row and batched
//!   fetch, plus row operators on top of it
//! - [`Database`]: a facade that owns the storage components and opens scans
//!
//! # Example
//!
//! ```ignore
//! let db = Database::open(&dir, DatabaseConfig::default())?;
//! let txn = db.begin();
//! let mut scan = db.seq_scan("orders", db.snapshot(txn)?)?;
//! while let Some(slot) = scan.next_slot()? {
//!     println!("{:?}", slot.values()?);
//! }
//! scan.shutdown();
//! ```

pub mod catalog;
pub mod error;
pub mod executor;
pub mod storage;
pub mod types;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use error::{AccessFailure, HeapScanError, Result};
pub use types::{DataType, Row, Value};

use catalog::{Catalog, RelationKind, TableSchema};
use executor::{ScanConfig, ScanOperator, SeqScanState};
use storage::heap::{delete_tuple, insert_tuple, RecordId};
use storage::{
    BufferPool, BufferPoolStats, CsvImportConfig, DiskManager, HeapAccess, ImportResult,
    LockManager, LockMode, Snapshot, TableLock, TransactionManager, TxnId, TxnStatus,
};

const DATA_FILE: &str = "heap.db";
const CATALOG_FILE: &str = "catalog.bin";

/// Configuration for opening or creating a database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Buffer pool size in pages (default: 1024, i.e. 4MB).
    pub buffer_pool_pages: usize,
    /// Configuration used by [`Database::seq_scan`].
    pub scan: ScanConfig,
    /// Open in read-only mode (default: false).
    pub read_only: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            buffer_pool_pages: 1024,
            scan: ScanConfig::default(),
            read_only: false,
        }
    }
}

impl DatabaseConfig {
    /// Sets the buffer pool size in pages.
    #[must_use]
    pub fn with_buffer_pool_pages(mut self, pages: usize) -> Self {
        self.buffer_pool_pages = pages;
        self
    }

    /// Sets the default scan configuration.
    #[must_use]
    pub fn with_scan(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    /// Sets read-only mode.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// Everything persisted besides the heap pages themselves.
#[derive(Serialize, Deserialize)]
struct Metadata {
    catalog: Catalog,
    txns: HashMap<TxnId, TxnStatus>,
}

impl Metadata {
    /// Encodes as `[crc32: u32 LE][bincode]`.
    fn encode(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)
            .map_err(|e| HeapScanError::CatalogError(format!("Failed to serialize catalog: {e}")))?;
        let mut bytes = Vec::with_capacity(body.len() + 4);
        bytes.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(HeapScanError::CatalogError(
                "Catalog file too short for checksum".into(),
            ));
        }
        let (crc, body) = bytes.split_at(4);
        let stored = u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]);
        let computed = crc32fast::hash(body);
        if stored != computed {
            return Err(HeapScanError::ChecksumError(format!(
                "{CATALOG_FILE}: stored {stored:#010x}, computed {computed:#010x}"
            )));
        }
        bincode::deserialize(body)
            .map_err(|e| HeapScanError::CatalogError(format!("Failed to deserialize catalog: {e}")))
    }
}

/// A disk-backed heap database.
///
/// All methods take `&self`; the catalog, transaction table, and buffer
/// pool are internally synchronized so scans and writers can share one
/// `Database` across threads.
pub struct Database {
    /// Database directory.
    path: PathBuf,
    /// Database configuration.
    config: DatabaseConfig,
    pool: Arc<BufferPool>,
    catalog: Arc<RwLock<Catalog>>,
    locks: Arc<LockManager>,
    txns: Mutex<TransactionManager>,
    /// Set once `close` has persisted everything.
    closed: bool,
}

impl Database {
    /// Opens or creates a database in the directory `path`.
    ///
    /// Transactions left running by a previous process are treated as
    /// aborted.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created (or is missing in read-only mode)
    /// - The catalog file is corrupted
    /// - The buffer pool size is zero
    pub fn open(path: &Path, config: DatabaseConfig) -> Result<Self> {
        if !path.exists() {
            if config.read_only {
                return Err(HeapScanError::StorageError(format!(
                    "Database directory {} does not exist",
                    path.display()
                )));
            }
            fs::create_dir_all(path).map_err(|e| {
                HeapScanError::StorageError(format!("Failed to create database directory: {e}"))
            })?;
        }

        let disk_manager = DiskManager::new(&path.join(DATA_FILE))?;
        let pool = Arc::new(BufferPool::new(config.buffer_pool_pages, disk_manager)?);

        let catalog_path = path.join(CATALOG_FILE);
        let (catalog, txns) = if catalog_path.exists() {
            let bytes = fs::read(&catalog_path).map_err(|e| {
                HeapScanError::CatalogError(format!("Failed to read {CATALOG_FILE}: {e}"))
            })?;
            let metadata = Metadata::decode(&bytes)?;
            (
                metadata.catalog,
                TransactionManager::from_statuses(metadata.txns),
            )
        } else {
            (Catalog::new(), TransactionManager::new())
        };

        debug!(
            path = %path.display(),
            tables = catalog.table_names().len(),
            pool_pages = config.buffer_pool_pages,
            read_only = config.read_only,
            "database opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            config,
            pool,
            catalog: Arc::new(RwLock::new(catalog)),
            locks: Arc::new(LockManager::new()),
            txns: Mutex::new(txns),
            closed: false,
        })
    }

    /// Flushes all pages and writes the catalog.
    ///
    /// This is called automatically when the Database is dropped, but
    /// calling it explicitly allows error handling.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing pages or writing the catalog fails.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if !self.config.read_only {
            self.checkpoint()?;
        }
        self.closed = true;
        debug!(path = %self.path.display(), "database closed");
        Ok(())
    }

    /// Writes dirty pages and the catalog without closing.
    ///
    /// # Errors
    ///
    /// Returns an error in read-only mode or if any write fails.
    pub fn checkpoint(&self) -> Result<()> {
        self.ensure_writable()?;
        self.pool.flush_all()?;

        let metadata = Metadata {
            catalog: self.catalog.read().clone(),
            txns: self.txns.lock().statuses().clone(),
        };
        let bytes = metadata.encode()?;
        let tmp = self.path.join(format!("{CATALOG_FILE}.tmp"));
        fs::write(&tmp, &bytes)
            .and_then(|()| fs::rename(&tmp, self.path.join(CATALOG_FILE)))
            .map_err(|e| HeapScanError::CatalogError(format!("Failed to write {CATALOG_FILE}: {e}")))
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.config.read_only {
            return Err(HeapScanError::StorageError(
                "Database is open in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Returns the database configuration.
    #[must_use]
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Registers a new relation.
    ///
    /// # Errors
    ///
    /// Returns an error in read-only mode or if the name is taken.
    pub fn create_table(&self, schema: TableSchema) -> Result<u32> {
        self.ensure_writable()?;
        let name = schema.name.clone();
        let table_id = self.catalog.write().create_table(schema)?;
        debug!(table = %name, table_id, "relation created");
        Ok(table_id)
    }

    /// Returns a relation's schema.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<Arc<TableSchema>> {
        self.catalog.read().get_table(name)
    }

    /// Returns all relation names.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.catalog
            .read()
            .table_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn heap_table(&self, name: &str) -> Result<Arc<TableSchema>> {
        let schema = self
            .table(name)
            .ok_or_else(|| HeapScanError::access(name, AccessFailure::NotFound))?;
        if schema.kind != RelationKind::Table {
            return Err(HeapScanError::access(
                name,
                AccessFailure::WrongRelationKind(schema.kind),
            ));
        }
        Ok(schema)
    }

    // ==================== Transactions ====================

    /// Starts a transaction.
    pub fn begin(&self) -> TxnId {
        self.txns.lock().begin()
    }

    /// Commits a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not running.
    pub fn commit(&self, txn: TxnId) -> Result<()> {
        self.txns.lock().commit(txn)
    }

    /// Aborts a transaction; its inserts become invisible and its
    /// deletes are undone.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not running.
    pub fn abort(&self, txn: TxnId) -> Result<()> {
        self.txns.lock().abort(txn)
    }

    /// Takes a snapshot for a running transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not running.
    pub fn snapshot(&self, txn: TxnId) -> Result<Snapshot> {
        self.txns.lock().snapshot(txn)
    }

    /// Returns the status of a transaction.
    #[must_use]
    pub fn txn_status(&self, txn: TxnId) -> Option<TxnStatus> {
        self.txns.lock().status(txn)
    }

    // ==================== Data modification ====================

    /// Inserts a row into a heap table.
    ///
    /// # Errors
    ///
    /// Returns `AccessError` if the table cannot be opened or is locked
    /// exclusively, `SchemaError`/`TypeError` if the values do not match
    /// the columns, and storage errors unchanged.
    pub fn insert(&self, txn: TxnId, table: &str, values: Vec<Value>) -> Result<RecordId> {
        self.ensure_writable()?;
        self.txns.lock().ensure_running(txn)?;
        let schema = self.heap_table(table)?;
        check_row(&schema, &values)?;
        let _lock = self.locks.acquire(table, LockMode::RowExclusive)?;

        let pages = self.catalog.read().pages(table).map(<[_]>::to_vec).unwrap_or_default();
        let outcome = insert_tuple(&self.pool, schema.table_id, &pages, txn, &values)?;
        if let Some(page_id) = outcome.new_page {
            self.catalog.write().append_page(table, page_id)?;
        }
        Ok(outcome.rid)
    }

    /// Marks a tuple deleted by `txn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tuple does not belong to `table`, is
    /// already deleted by a live transaction, or the table is locked
    /// exclusively.
    pub fn delete(&self, txn: TxnId, table: &str, rid: RecordId) -> Result<()> {
        self.ensure_writable()?;
        self.txns.lock().ensure_running(txn)?;
        let _schema = self.heap_table(table)?;
        let _lock = self.locks.acquire(table, LockMode::RowExclusive)?;
        let owns_page = self
            .catalog
            .read()
            .pages(table)
            .is_some_and(|pages| pages.contains(&rid.page_id));
        if !owns_page {
            return Err(HeapScanError::StorageError(format!(
                "Tuple {rid} is not part of '{table}'"
            )));
        }
        let txns = &self.txns;
        delete_tuple(&self.pool, rid, txn, |deleter| {
            txns.lock().status(deleter) != Some(TxnStatus::Aborted)
        })
    }

    /// Loads a CSV file into `table` within `txn`.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` for malformed input and any insert error.
    pub fn import_csv(
        &self,
        table: &str,
        path: &Path,
        config: &CsvImportConfig,
        txn: TxnId,
    ) -> Result<ImportResult> {
        let schema = self.heap_table(table)?;
        let (rows, result) = storage::copy::read_csv(path, &schema, config)?;
        for values in rows {
            self.insert(txn, table, values)?;
        }
        debug!(
            table,
            rows = result.rows_imported,
            failed = result.rows_failed,
            "csv import finished"
        );
        Ok(result)
    }

    /// Takes a table lock held until the returned guard drops.
    ///
    /// # Errors
    ///
    /// Returns `AccessError` if the table does not exist or the lock conflicts.
    pub fn lock_table(&self, table: &str, mode: LockMode) -> Result<TableLock> {
        if !self.catalog.read().table_exists(table) {
            return Err(HeapScanError::access(table, AccessFailure::NotFound));
        }
        self.locks.acquire(table, mode)
    }

    // ==================== Scans ====================

    /// Returns the heap access method over this database.
    #[must_use]
    pub fn access(&self) -> HeapAccess {
        HeapAccess::new(
            Arc::clone(&self.pool),
            Arc::clone(&self.catalog),
            Arc::clone(&self.locks),
        )
    }

    /// Opens a sequential scan with the database's default scan configuration.
    ///
    /// # Errors
    ///
    /// See [`SeqScanState::open`].
    pub fn seq_scan(&self, table: &str, snapshot: Snapshot) -> Result<SeqScanState> {
        self.seq_scan_with(table, snapshot, &self.config.scan)
    }

    /// Opens a sequential scan with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`SeqScanState::open`].
    pub fn seq_scan_with(
        &self,
        table: &str,
        snapshot: Snapshot,
        config: &ScanConfig,
    ) -> Result<SeqScanState> {
        SeqScanState::open(&self.access(), table, snapshot, config)
    }

    /// Opens a row-producing scan operator keyed by the table's column names.
    ///
    /// # Errors
    ///
    /// See [`SeqScanState::open`].
    pub fn scan_operator(
        &self,
        table: &str,
        snapshot: Snapshot,
        config: &ScanConfig,
    ) -> Result<ScanOperator> {
        let schema = self.heap_table(table)?;
        let columns = schema.columns.iter().map(|c| c.name.clone()).collect();
        Ok(ScanOperator::new(self.seq_scan_with(table, snapshot, config)?, columns))
    }

    /// Returns buffer pool statistics.
    #[must_use]
    pub fn buffer_pool_stats(&self) -> BufferPoolStats {
        self.pool.stats()
    }
}

/// Checks arity, nullability, and types of a row against its schema.
fn check_row(schema: &TableSchema, values: &[Value]) -> Result<()> {
    if values.len() != schema.columns.len() {
        return Err(HeapScanError::SchemaError(format!(
            "Table '{}' has {} columns, got {} values",
            schema.name,
            schema.columns.len(),
            values.len()
        )));
    }
    for (col, value) in schema.columns.iter().zip(values) {
        match value.data_type() {
            None if !col.nullable => {
                return Err(HeapScanError::SchemaError(format!(
                    "Column '{}' is NOT NULL",
                    col.name
                )));
            }
            Some(actual) if actual != col.data_type => {
                return Err(HeapScanError::TypeError {
                    expected: col.data_type.name().to_string(),
                    actual: actual.name().to_string(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close database cleanly");
        }
    }
}
