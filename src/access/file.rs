use crate::access::heap::HeapFile;
use crate::access::{Tuple, TupleDesc};
use crate::catalog::TableId;
use crate::storage::buffer::PageAccess;
use crate::storage::error::StorageResult;
use crate::storage::page::{Page, PageId, PageRef};
use crate::transaction::TransactionId;
use std::path::Path;
use std::sync::Arc;

/// Persistent storage for one table's pages.
///
/// Mutations go through `pages` so that the buffer pool stays the only owner
/// of cached pages; the returned pages are the ones that were modified.
pub trait PageStore {
    fn id(&self) -> TableId;

    fn schema(&self) -> &Arc<TupleDesc>;

    fn page_size(&self) -> usize;

    fn read_page(&self, page_id: PageId) -> StorageResult<Page>;

    fn write_page(&self, page: &Page) -> StorageResult<()>;

    fn num_pages(&self) -> StorageResult<u32>;

    fn insert_tuple(
        &self,
        txn: TransactionId,
        tuple: &mut Tuple,
        pages: &mut dyn PageAccess,
    ) -> StorageResult<Vec<PageRef>>;

    fn delete_tuple(
        &self,
        txn: TransactionId,
        tuple: &Tuple,
        pages: &mut dyn PageAccess,
    ) -> StorageResult<Vec<PageRef>>;
}

/// Every table store kind the catalog can hold.
#[derive(Debug)]
pub enum TableFile {
    Heap(HeapFile),
}

impl TableFile {
    pub fn path(&self) -> &Path {
        match self {
            TableFile::Heap(file) => file.path(),
        }
    }
}

impl From<HeapFile> for TableFile {
    fn from(file: HeapFile) -> Self {
        TableFile::Heap(file)
    }
}

impl PageStore for TableFile {
    fn id(&self) -> TableId {
        match self {
            TableFile::Heap(file) => file.id(),
        }
    }

    fn schema(&self) -> &Arc<TupleDesc> {
        match self {
            TableFile::Heap(file) => file.schema(),
        }
    }

    fn page_size(&self) -> usize {
        match self {
            TableFile::Heap(file) => file.page_size(),
        }
    }

    fn read_page(&self, page_id: PageId) -> StorageResult<Page> {
        match self {
            TableFile::Heap(file) => file.read_page(page_id),
        }
    }

    fn write_page(&self, page: &Page) -> StorageResult<()> {
        match self {
            TableFile::Heap(file) => file.write_page(page),
        }
    }

    fn num_pages(&self) -> StorageResult<u32> {
        match self {
            TableFile::Heap(file) => file.num_pages(),
        }
    }

    fn insert_tuple(
        &self,
        txn: TransactionId,
        tuple: &mut Tuple,
        pages: &mut dyn PageAccess,
    ) -> StorageResult<Vec<PageRef>> {
        match self {
            TableFile::Heap(file) => file.insert_tuple(txn, tuple, pages),
        }
    }

    fn delete_tuple(
        &self,
        txn: TransactionId,
        tuple: &Tuple,
        pages: &mut dyn PageAccess,
    ) -> StorageResult<Vec<PageRef>> {
        match self {
            TableFile::Heap(file) => file.delete_tuple(txn, tuple, pages),
        }
    }
}
