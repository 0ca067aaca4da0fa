use crate::access::{HeapFile, TableScanCursor, TupleDesc};
use crate::catalog::{Catalog, TableId};
use crate::config::DbConfig;
use crate::storage::buffer::BufferPool;
use crate::storage::error::StorageResult;
use crate::transaction::{TransactionId, TransactionIdGenerator};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

/// Ties the catalog, buffer pool and configuration together.
pub struct Database {
    config: DbConfig,
    catalog: Arc<Catalog>,
    buffer_pool: BufferPool,
    txn_ids: TransactionIdGenerator,
}

impl Database {
    /// An empty database with no tables.
    pub fn new(config: DbConfig) -> StorageResult<Self> {
        config.validate()?;
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = BufferPool::new(catalog.clone(), config.buffer_pool_pages);

        Ok(Self {
            config,
            catalog,
            buffer_pool,
            txn_ids: TransactionIdGenerator::new(),
        })
    }

    /// A database whose tables are listed in a catalog file.
    pub fn open(config: DbConfig, catalog_path: &Path) -> StorageResult<Self> {
        let db = Self::new(config)?;
        let tables = db.catalog.load_schema(catalog_path, config.page_size)?;
        info!("Loaded {} tables from {:?}", tables.len(), catalog_path);
        Ok(db)
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    /// A fresh transaction id.
    pub fn begin(&self) -> TransactionId {
        self.txn_ids.next()
    }

    /// Open (or create) a heap file at `path` and register it as `name`.
    pub fn create_table(
        &self,
        path: &Path,
        name: &str,
        schema: Arc<TupleDesc>,
        primary_key: Option<&str>,
    ) -> StorageResult<TableId> {
        let file = HeapFile::open(path, schema, self.config.page_size)?;
        Ok(self.catalog.add_table(file.into(), name, primary_key))
    }

    /// An unopened cursor over `table_id`.
    pub fn scan(&self, txn: TransactionId, table_id: TableId) -> StorageResult<TableScanCursor> {
        TableScanCursor::for_table(&self.buffer_pool, txn, table_id)
    }

    /// Write every dirty cached page.
    pub fn flush(&self) -> StorageResult<()> {
        self.buffer_pool.flush_all_pages()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Best effort flush on drop
        if let Err(e) = self.flush() {
            warn!("Failed to flush buffer pool on shutdown: {}", e);
        }
    }
}
