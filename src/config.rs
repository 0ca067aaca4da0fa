//! Database configuration.

use crate::storage::disk::DEFAULT_PAGE_SIZE;
use crate::storage::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const DEFAULT_POOL_PAGES: usize = 50;

/// Settings fixed for the lifetime of a [`Database`](crate::database::Database).
///
/// Can be read from a JSON file; missing keys take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Bytes per page in every table file.
    pub page_size: usize,
    /// Maximum number of pages the buffer pool caches.
    pub buffer_pool_pages: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            buffer_pool_pages: DEFAULT_POOL_PAGES,
        }
    }
}

impl DbConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_buffer_pool_pages(mut self, pages: usize) -> Self {
        self.buffer_pool_pages = pages;
        self
    }

    /// Read a JSON config file and validate it.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: DbConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.page_size == 0 {
            return Err(StorageError::IllegalState("page size must be positive"));
        }
        if self.buffer_pool_pages == 0 {
            return Err(StorageError::IllegalState(
                "buffer pool must hold at least one page",
            ));
        }
        Ok(())
    }
}
