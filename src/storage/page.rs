pub mod heap_page;

use crate::access::Tuple;
use crate::catalog::TableId;
use crate::storage::error::StorageResult;
use crate::transaction::TransactionId;
use bytes::Bytes;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

pub use heap_page::{HeapPage, SlotLayout};

/// Identity of a page: the owning table and the page's position in its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub table_id: TableId,
    pub page_number: u32,
}

impl PageId {
    pub fn new(table_id: TableId, page_number: u32) -> Self {
        Self {
            table_id,
            page_number,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_id, self.page_number)
    }
}

/// A cached page shared between the buffer pool and its readers.
pub type PageRef = Arc<RwLock<Page>>;

/// Every page kind the buffer pool can hold.
///
/// The pool only talks to pages through the methods below, so adding a kind
/// means extending this enum and its store, not the pool.
#[derive(Debug, Clone)]
pub enum Page {
    Heap(HeapPage),
}

impl Page {
    pub fn into_ref(self) -> PageRef {
        Arc::new(RwLock::new(self))
    }

    pub fn page_id(&self) -> PageId {
        match self {
            Page::Heap(page) => page.page_id(),
        }
    }

    /// Encoded on-disk image of the page.
    pub fn page_data(&self) -> Bytes {
        match self {
            Page::Heap(page) => page.encode(),
        }
    }

    pub fn mark_dirty(&mut self, txn: Option<TransactionId>) {
        match self {
            Page::Heap(page) => page.mark_dirty(txn),
        }
    }

    /// The transaction that last dirtied this page, `None` when clean.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        match self {
            Page::Heap(page) => page.dirtied_by(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtied_by().is_some()
    }

    pub fn before_image(&self) -> StorageResult<Page> {
        match self {
            Page::Heap(page) => Ok(Page::Heap(page.before_image()?)),
        }
    }

    pub fn set_before_image(&mut self) {
        match self {
            Page::Heap(page) => page.set_before_image(),
        }
    }

    pub fn num_slots(&self) -> usize {
        match self {
            Page::Heap(page) => page.num_slots(),
        }
    }

    pub fn tuple_at(&self, slot: usize) -> Option<&Tuple> {
        match self {
            Page::Heap(page) => page.tuple_at(slot),
        }
    }

    /// First occupied slot at or after `from`.
    pub fn next_used_slot(&self, from: usize) -> Option<usize> {
        match self {
            Page::Heap(page) => page.next_used_slot(from),
        }
    }
}

impl From<HeapPage> for Page {
    fn from(page: HeapPage) -> Self {
        Page::Heap(page)
    }
}
