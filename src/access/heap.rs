use crate::access::file::PageStore;
use crate::access::scan::TableScanCursor;
use crate::access::{Tuple, TupleDesc};
use crate::catalog::TableId;
use crate::storage::buffer::{BufferPool, PageAccess};
use crate::storage::disk::PageManager;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPage, Page, PageId, PageRef, SlotLayout};
use crate::transaction::{Permissions, TransactionId};
use log::debug;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A table stored as an unordered sequence of heap pages in one file.
#[derive(Debug)]
pub struct HeapFile {
    id: TableId,
    path: PathBuf,
    schema: Arc<TupleDesc>,
    page_size: usize,
    pages: Mutex<PageManager>,
}

impl HeapFile {
    /// Open the file at `path`, creating it empty if missing.
    ///
    /// The table id is derived from the canonical path, so the same file
    /// always gets the same id.
    pub fn open(
        path: impl AsRef<Path>,
        schema: Arc<TupleDesc>,
        page_size: usize,
    ) -> StorageResult<Self> {
        if SlotLayout::new(page_size, schema.size()).num_slots == 0 {
            return Err(StorageError::InvalidSchema(format!(
                "a {}-byte tuple does not fit in a {}-byte page",
                schema.size(),
                page_size
            )));
        }

        let pages = PageManager::open(path.as_ref(), page_size)?;
        let path = path.as_ref().canonicalize()?;
        let id = table_id_for(&path);
        debug!("Opened heap file {:?} as table {}", path, id);

        Ok(Self {
            id,
            path,
            schema,
            page_size,
            pages: Mutex::new(pages),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A cursor over this table's tuples, reading pages through `pool`.
    pub fn scan_cursor(&self, txn: TransactionId, pool: &BufferPool) -> TableScanCursor {
        TableScanCursor::new(pool.clone(), txn, self.id, self.schema.clone())
    }

    fn check_owner(&self, page_id: PageId) -> StorageResult<()> {
        if page_id.table_id != self.id {
            return Err(StorageError::NotOnPage(page_id));
        }
        Ok(())
    }

    /// Append a zeroed page to the file.
    fn allocate_page(&self) -> StorageResult<PageId> {
        let page_number = self.pages.lock().allocate_page()?;
        let page_id = PageId::new(self.id, page_number);
        debug!("Appended page {}", page_id);
        Ok(page_id)
    }
}

impl PageStore for HeapFile {
    fn id(&self) -> TableId {
        self.id
    }

    fn schema(&self) -> &Arc<TupleDesc> {
        &self.schema
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_page(&self, page_id: PageId) -> StorageResult<Page> {
        self.check_owner(page_id)?;
        let mut buf = vec![0u8; self.page_size];
        self.pages.lock().read_page(page_id, &mut buf)?;
        Ok(HeapPage::decode(page_id, &buf, self.schema.clone())?.into())
    }

    fn write_page(&self, page: &Page) -> StorageResult<()> {
        let page_id = page.page_id();
        self.check_owner(page_id)?;
        self.pages.lock().write_page(page_id, &page.page_data())
    }

    fn num_pages(&self) -> StorageResult<u32> {
        self.pages.lock().num_pages()
    }

    fn insert_tuple(
        &self,
        txn: TransactionId,
        tuple: &mut Tuple,
        pages: &mut dyn PageAccess,
    ) -> StorageResult<Vec<PageRef>> {
        if **tuple.desc() != *self.schema {
            return Err(StorageError::SchemaMismatch {
                expected: self.schema.to_string(),
                actual: tuple.desc().to_string(),
            });
        }

        // The file lock is never held across a page fetch: a fetch may evict
        // and flush a page of this same file.
        let num_pages = self.num_pages()?;
        for page_number in 0..num_pages {
            let page_id = PageId::new(self.id, page_number);
            let page_ref = pages.fetch_page(txn, page_id, Permissions::ReadWrite)?;
            let mut page = page_ref.write();
            match &mut *page {
                Page::Heap(heap) if heap.count_empty_slots() > 0 => {
                    heap.insert_tuple(tuple)?;
                }
                Page::Heap(_) => continue,
            }
            drop(page);
            return Ok(vec![page_ref]);
        }

        let page_id = self.allocate_page()?;
        let page_ref = pages.fetch_page(txn, page_id, Permissions::ReadWrite)?;
        match &mut *page_ref.write() {
            Page::Heap(heap) => {
                heap.insert_tuple(tuple)?;
            }
        }
        Ok(vec![page_ref])
    }

    fn delete_tuple(
        &self,
        txn: TransactionId,
        tuple: &Tuple,
        pages: &mut dyn PageAccess,
    ) -> StorageResult<Vec<PageRef>> {
        let record_id = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        let page_id = record_id.page_id;
        if page_id.table_id != self.id || page_id.page_number >= self.num_pages()? {
            return Err(StorageError::NotOnPage(page_id));
        }

        let page_ref = pages.fetch_page(txn, page_id, Permissions::ReadWrite)?;
        match &mut *page_ref.write() {
            Page::Heap(heap) => heap.delete_tuple(tuple)?,
        }
        Ok(vec![page_ref])
    }
}

fn table_id_for(path: &Path) -> TableId {
    crc32fast::hash(path.to_string_lossy().as_bytes())
}
