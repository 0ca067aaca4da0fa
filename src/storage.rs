//! Storage layer implementation for slotdb.
//!
//! This module provides the foundation for persistent data storage using a page-based
//! architecture. Key components:
//!
//! - **Page**: Fixed-size blocks of data (4KB by default), the basic unit of I/O
//! - **PageManager**: Handles reading/writing raw pages of one file
//! - **HeapPage**: Bitmap-slotted page format for fixed-width tuples
//! - **BufferPool**: Bounded in-memory cache of decoded pages with LRU eviction
//!
//! Page size is a runtime property of each file, never a compiled-in constant;
//! [`DEFAULT_PAGE_SIZE`] is only the default.

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;

pub use buffer::{BufferPool, PageAccess, PoolStats};
pub use disk::{PageManager, DEFAULT_PAGE_SIZE};
pub use error::{ErrorKind, StorageError, StorageResult};
pub use page::{HeapPage, Page, PageId, PageRef, SlotLayout};
