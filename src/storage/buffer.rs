//! Bounded cache of decoded pages.
//!
//! All pool state sits behind one mutex that is held across the whole of each
//! operation, disk I/O included. Stores reach pages during `insert_tuple` and
//! `delete_tuple` through [`PageAccess`], which borrows the already-locked
//! state instead of locking again.

pub mod lru;
pub mod replacer;

use crate::access::{PageStore, RecordId, Tuple};
use crate::catalog::{Catalog, TableId};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, PageRef};
use crate::transaction::{Permissions, TransactionId};
use log::{debug, warn};
use lru::LruReplacer;
use parking_lot::Mutex;
use replacer::Replacer;
use std::collections::HashMap;
use std::sync::Arc;

/// Counters describing pool activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub flushes: u64,
}

/// Page lookup for stores that mutate pages on behalf of the pool.
pub trait PageAccess {
    fn fetch_page(
        &mut self,
        txn: TransactionId,
        page_id: PageId,
        perm: Permissions,
    ) -> StorageResult<PageRef>;
}

#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    catalog: Arc<Catalog>,
    capacity: usize,
    state: Mutex<PoolState>,
}

#[derive(Debug)]
struct PoolState {
    page_table: HashMap<PageId, PageRef>,
    replacer: Box<dyn Replacer>,
    stats: PoolStats,
}

/// [`PageAccess`] over a pool whose state is already locked.
struct LockedPool<'a> {
    inner: &'a BufferPoolInner,
    state: &'a mut PoolState,
}

impl PageAccess for LockedPool<'_> {
    fn fetch_page(
        &mut self,
        _txn: TransactionId,
        page_id: PageId,
        _perm: Permissions,
    ) -> StorageResult<PageRef> {
        self.inner.fetch(self.state, page_id)
    }
}

impl BufferPool {
    /// Create a pool caching at most `capacity` pages.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(catalog: Arc<Catalog>, capacity: usize) -> Self {
        assert!(capacity > 0, "buffer pool capacity must be positive");
        Self {
            inner: Arc::new(BufferPoolInner {
                catalog,
                capacity,
                state: Mutex::new(PoolState {
                    page_table: HashMap::with_capacity(capacity),
                    replacer: Box::new(LruReplacer::new()),
                    stats: PoolStats::default(),
                }),
            }),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.catalog
    }

    /// Return the cached page, loading it from its table's store on a miss.
    pub fn get_page(
        &self,
        txn: TransactionId,
        page_id: PageId,
        perm: Permissions,
    ) -> StorageResult<PageRef> {
        let mut state = self.inner.state.lock();
        LockedPool {
            inner: &self.inner,
            state: &mut state,
        }
        .fetch_page(txn, page_id, perm)
    }

    /// Insert `tuple` into `table_id`; the tuple receives its record id.
    pub fn insert_tuple(
        &self,
        txn: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> StorageResult<RecordId> {
        let mut state = self.inner.state.lock();
        let file = self.inner.catalog.table_file(table_id)?;
        let dirtied = file.insert_tuple(
            txn,
            tuple,
            &mut LockedPool {
                inner: &self.inner,
                state: &mut state,
            },
        )?;
        self.inner.install_dirty(&mut state, txn, dirtied)?;
        tuple.record_id().ok_or(StorageError::MissingRecordId)
    }

    /// Delete `tuple` from the table named by its record id.
    pub fn delete_tuple(&self, txn: TransactionId, tuple: &Tuple) -> StorageResult<()> {
        let record_id = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        let mut state = self.inner.state.lock();
        let file = self.inner.catalog.table_file(record_id.page_id.table_id)?;
        let dirtied = file.delete_tuple(
            txn,
            tuple,
            &mut LockedPool {
                inner: &self.inner,
                state: &mut state,
            },
        )?;
        self.inner.install_dirty(&mut state, txn, dirtied)
    }

    /// Write the page to its store if it is cached and dirty.
    pub fn flush_page(&self, page_id: PageId) -> StorageResult<()> {
        let mut state = self.inner.state.lock();
        self.inner.flush(&mut state, page_id)
    }

    pub fn flush_all_pages(&self) -> StorageResult<()> {
        let mut state = self.inner.state.lock();
        let page_ids: Vec<PageId> = state.page_table.keys().copied().collect();
        for page_id in page_ids {
            self.inner.flush(&mut state, page_id)?;
        }
        Ok(())
    }

    /// Flush every cached page last dirtied by `txn`.
    pub fn flush_pages(&self, txn: TransactionId) -> StorageResult<()> {
        let mut state = self.inner.state.lock();
        let page_ids: Vec<PageId> = state
            .page_table
            .iter()
            .filter(|(_, page)| page.read().dirtied_by() == Some(txn))
            .map(|(page_id, _)| *page_id)
            .collect();
        for page_id in page_ids {
            self.inner.flush(&mut state, page_id)?;
        }
        Ok(())
    }

    /// Drop a page from the cache without writing it.
    pub fn discard_page(&self, page_id: PageId) {
        let mut state = self.inner.state.lock();
        if state.page_table.remove(&page_id).is_some() {
            state.replacer.remove(&page_id);
            debug!("Discarded page {}", page_id);
        }
    }

    /// Page locks are not enforced; this is a no-op.
    pub fn release_page(&self, _txn: TransactionId, _page_id: PageId) {}

    /// Page locks are not enforced, so no transaction ever holds one.
    pub fn holds_lock(&self, _txn: TransactionId, _page_id: PageId) -> bool {
        false
    }

    pub fn transaction_complete(&self, txn: TransactionId, commit: bool) {
        debug!(
            "{} completed ({})",
            txn,
            if commit { "commit" } else { "abort" }
        );
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().page_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.inner.state.lock().page_table.contains_key(&page_id)
    }

    pub fn stats(&self) -> PoolStats {
        self.inner.state.lock().stats
    }
}

impl BufferPoolInner {
    fn fetch(&self, state: &mut PoolState, page_id: PageId) -> StorageResult<PageRef> {
        if let Some(page) = state.page_table.get(&page_id).cloned() {
            state.replacer.record_access(page_id);
            state.stats.hits += 1;
            return Ok(page);
        }

        state.stats.misses += 1;
        let file = self.catalog.table_file(page_id.table_id)?;
        if state.page_table.len() >= self.capacity {
            self.evict(state)?;
        }
        let page = file.read_page(page_id)?.into_ref();
        debug!("Loaded page {}", page_id);

        state.page_table.insert(page_id, page.clone());
        state.replacer.record_access(page_id);
        Ok(page)
    }

    /// Put pages returned by a store mutation back in the cache, dirtied by `txn`.
    fn install_dirty(
        &self,
        state: &mut PoolState,
        txn: TransactionId,
        pages: Vec<PageRef>,
    ) -> StorageResult<()> {
        for page in pages {
            let page_id = page.read().page_id();
            if !state.page_table.contains_key(&page_id) && state.page_table.len() >= self.capacity {
                self.evict(state)?;
            }
            page.write().mark_dirty(Some(txn));
            state.page_table.insert(page_id, page);
            state.replacer.record_access(page_id);
        }
        Ok(())
    }

    /// Evict the least recently used clean page, or the least recently used
    /// page when every cached page is dirty.
    fn evict(&self, state: &mut PoolState) -> StorageResult<()> {
        let page_table = &state.page_table;
        let victim = state
            .replacer
            .victim(&|page_id| {
                page_table
                    .get(page_id)
                    .is_some_and(|page| !page.read().is_dirty())
            })
            .ok_or(StorageError::IllegalState("no page available for eviction"))?;

        let dirty = state
            .page_table
            .get(&victim)
            .is_some_and(|page| page.read().is_dirty());
        if dirty {
            // Writes a page that may belong to an uncommitted transaction.
            warn!(
                "All {} cached pages are dirty; evicting dirty page {}",
                state.page_table.len(),
                victim
            );
            self.flush(state, victim)?;
        }

        state.page_table.remove(&victim);
        state.replacer.remove(&victim);
        state.stats.evictions += 1;
        debug!("Evicted page {}", victim);
        Ok(())
    }

    fn flush(&self, state: &mut PoolState, page_id: PageId) -> StorageResult<()> {
        let Some(page) = state.page_table.get(&page_id) else {
            return Ok(());
        };
        let mut page = page.write();
        if !page.is_dirty() {
            return Ok(());
        }

        let file = self.catalog.table_file(page_id.table_id)?;
        file.write_page(&page)?;
        page.mark_dirty(None);
        state.stats.flushes += 1;
        debug!("Flushed page {}", page_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{DataType, HeapFile, TableFile, TupleDesc, Value};
    use crate::storage::disk::DEFAULT_PAGE_SIZE;
    use crate::storage::error::ErrorKind;
    use crate::storage::page::Page;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        pool: BufferPool,
        desc: Arc<TupleDesc>,
        table_id: TableId,
    }

    /// One-int table whose file starts with `pages` empty pages.
    fn fixture(capacity: usize, pages: usize) -> StorageResult<Fixture> {
        let dir = tempdir()?;
        let path = dir.path().join("t.dat");
        std::fs::write(&path, vec![0u8; pages * DEFAULT_PAGE_SIZE])?;

        let desc = Arc::new(TupleDesc::named(&[(DataType::Int32, "v")])?);
        let file = HeapFile::open(&path, desc.clone(), DEFAULT_PAGE_SIZE)?;
        let catalog = Arc::new(Catalog::new());
        let table_id = catalog.add_table(TableFile::Heap(file), "t", None);

        Ok(Fixture {
            _dir: dir,
            pool: BufferPool::new(catalog, capacity),
            desc,
            table_id,
        })
    }

    fn row(desc: &Arc<TupleDesc>, v: i32) -> Tuple {
        Tuple::new(desc.clone(), vec![Value::Int32(v)]).unwrap()
    }

    fn txn() -> TransactionId {
        TransactionId::new(1)
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_panics() {
        BufferPool::new(Arc::new(Catalog::new()), 0);
    }

    #[test]
    fn test_cache_hit_returns_same_page() -> StorageResult<()> {
        let f = fixture(4, 1)?;
        let pid = PageId::new(f.table_id, 0);

        let first = f.pool.get_page(txn(), pid, Permissions::ReadOnly)?;
        let second = f.pool.get_page(txn(), pid, Permissions::ReadOnly)?;
        assert!(Arc::ptr_eq(&first, &second));

        let stats = f.pool.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        Ok(())
    }

    #[test]
    fn test_capacity_never_exceeded() -> StorageResult<()> {
        let f = fixture(2, 5)?;
        for n in 0..5 {
            f.pool
                .get_page(txn(), PageId::new(f.table_id, n), Permissions::ReadOnly)?;
            assert!(f.pool.len() <= 2);
        }
        assert_eq!(f.pool.stats().evictions, 3);
        assert!(f.pool.is_cached(PageId::new(f.table_id, 4)));
        assert!(!f.pool.is_cached(PageId::new(f.table_id, 0)));
        Ok(())
    }

    #[test]
    fn test_lru_order() -> StorageResult<()> {
        let f = fixture(2, 3)?;
        let pid = |n| PageId::new(f.table_id, n);

        f.pool.get_page(txn(), pid(0), Permissions::ReadOnly)?;
        f.pool.get_page(txn(), pid(1), Permissions::ReadOnly)?;
        // Touch page 0 so page 1 becomes least recently used.
        f.pool.get_page(txn(), pid(0), Permissions::ReadOnly)?;
        f.pool.get_page(txn(), pid(2), Permissions::ReadOnly)?;

        assert!(f.pool.is_cached(pid(0)));
        assert!(!f.pool.is_cached(pid(1)));
        Ok(())
    }

    #[test]
    fn test_eviction_prefers_clean_pages() -> StorageResult<()> {
        let f = fixture(2, 3)?;
        let pid = |n| PageId::new(f.table_id, n);

        // Dirties page 0, the least recently used page.
        f.pool.insert_tuple(txn(), f.table_id, &mut row(&f.desc, 1))?;
        f.pool.get_page(txn(), pid(1), Permissions::ReadOnly)?;
        f.pool.get_page(txn(), pid(2), Permissions::ReadOnly)?;

        assert!(f.pool.is_cached(pid(0)));
        assert!(!f.pool.is_cached(pid(1)));
        assert_eq!(f.pool.stats().flushes, 0);
        Ok(())
    }

    #[test]
    fn test_all_dirty_eviction_flushes_victim() -> StorageResult<()> {
        let f = fixture(1, 2)?;
        let pid = |n| PageId::new(f.table_id, n);

        let rid = f.pool.insert_tuple(txn(), f.table_id, &mut row(&f.desc, 42))?;
        assert_eq!(rid.page_id, pid(0));

        f.pool.get_page(txn(), pid(1), Permissions::ReadOnly)?;
        assert!(!f.pool.is_cached(pid(0)));
        assert_eq!(f.pool.stats().flushes, 1);

        let file = f.pool.catalog().table_file(f.table_id)?;
        let Page::Heap(page) = file.read_page(pid(0))?;
        let values: Vec<_> = page.tuples().map(|t| t.get_field(0).unwrap().clone()).collect();
        assert_eq!(values, vec![Value::Int32(42)]);
        Ok(())
    }

    #[test]
    fn test_failed_eviction_flush_keeps_victim() -> StorageResult<()> {
        let f = fixture(1, 1)?;
        let victim = PageId::new(f.table_id, 0);
        f.pool.insert_tuple(txn(), f.table_id, &mut row(&f.desc, 7))?;

        // The dirty victim's table is gone, so writing it back fails.
        let catalog = f.pool.catalog();
        catalog.clear();
        let path = f._dir.path().join("other.dat");
        std::fs::write(&path, vec![0u8; DEFAULT_PAGE_SIZE])?;
        let other = HeapFile::open(&path, f.desc.clone(), DEFAULT_PAGE_SIZE)?;
        let other_id = catalog.add_table(other.into(), "other", None);

        let err = f
            .pool
            .get_page(txn(), PageId::new(other_id, 0), Permissions::ReadOnly)
            .unwrap_err();
        assert!(matches!(err, StorageError::NoSuchTable(_)));
        assert!(f.pool.is_cached(victim));
        assert!(f.pool.len() <= f.pool.capacity());
        assert_eq!(f.pool.stats().evictions, 0);
        Ok(())
    }

    #[test]
    fn test_insert_marks_page_dirty() -> StorageResult<()> {
        let f = fixture(4, 1)?;
        let rid = f.pool.insert_tuple(TransactionId::new(7), f.table_id, &mut row(&f.desc, 3))?;

        let page = f.pool.get_page(txn(), rid.page_id, Permissions::ReadOnly)?;
        assert_eq!(page.read().dirtied_by(), Some(TransactionId::new(7)));
        assert_eq!(page.read().tuple_at(rid.slot).map(|t| t.record_id()), Some(Some(rid)));
        Ok(())
    }

    #[test]
    fn test_insert_into_empty_file_appends_page() -> StorageResult<()> {
        let f = fixture(4, 0)?;
        let rid = f.pool.insert_tuple(txn(), f.table_id, &mut row(&f.desc, 1))?;
        assert_eq!(rid, RecordId::new(PageId::new(f.table_id, 0), 0));

        let file = f.pool.catalog().table_file(f.table_id)?;
        assert_eq!(file.num_pages()?, 1);
        Ok(())
    }

    #[test]
    fn test_flush_page_clears_dirty() -> StorageResult<()> {
        let f = fixture(4, 1)?;
        let rid = f.pool.insert_tuple(txn(), f.table_id, &mut row(&f.desc, 5))?;

        f.pool.flush_page(rid.page_id)?;
        let page = f.pool.get_page(txn(), rid.page_id, Permissions::ReadOnly)?;
        assert!(!page.read().is_dirty());

        // Flushing a clean page writes nothing.
        f.pool.flush_page(rid.page_id)?;
        assert_eq!(f.pool.stats().flushes, 1);
        Ok(())
    }

    #[test]
    fn test_flush_pages_by_transaction() -> StorageResult<()> {
        let f = fixture(4, 2)?;
        let a = TransactionId::new(1);
        let b = TransactionId::new(2);
        let pid = |n| PageId::new(f.table_id, n);

        f.pool.insert_tuple(a, f.table_id, &mut row(&f.desc, 1))?;
        // Page 1 becomes dirty by b through a direct page mutation.
        let page = f.pool.get_page(b, pid(1), Permissions::ReadWrite)?;
        page.write().mark_dirty(Some(b));

        f.pool.flush_pages(a)?;
        assert!(!f.pool.get_page(a, pid(0), Permissions::ReadOnly)?.read().is_dirty());
        assert!(f.pool.get_page(b, pid(1), Permissions::ReadOnly)?.read().is_dirty());
        Ok(())
    }

    #[test]
    fn test_discard_drops_changes() -> StorageResult<()> {
        let f = fixture(4, 1)?;
        let rid = f.pool.insert_tuple(txn(), f.table_id, &mut row(&f.desc, 9))?;

        f.pool.discard_page(rid.page_id);
        assert!(!f.pool.is_cached(rid.page_id));

        let page = f.pool.get_page(txn(), rid.page_id, Permissions::ReadOnly)?;
        assert_eq!(page.read().tuple_at(rid.slot), None);
        Ok(())
    }

    #[test]
    fn test_delete_tuple() -> StorageResult<()> {
        let f = fixture(4, 1)?;
        let mut tuple = row(&f.desc, 8);
        f.pool.insert_tuple(txn(), f.table_id, &mut tuple)?;

        f.pool.delete_tuple(txn(), &tuple)?;
        let err = f.pool.delete_tuple(txn(), &tuple).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SlotError);

        let unplaced = row(&f.desc, 8);
        assert!(matches!(
            f.pool.delete_tuple(txn(), &unplaced),
            Err(StorageError::MissingRecordId)
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_table() -> StorageResult<()> {
        let f = fixture(4, 1)?;
        let err = f
            .pool
            .get_page(txn(), PageId::new(f.table_id.wrapping_add(1), 0), Permissions::ReadOnly)
            .unwrap_err();
        assert!(matches!(err, StorageError::NoSuchTable(_)));

        let err = f
            .pool
            .insert_tuple(txn(), f.table_id.wrapping_add(1), &mut row(&f.desc, 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[test]
    fn test_lock_stubs() -> StorageResult<()> {
        let f = fixture(4, 1)?;
        let pid = PageId::new(f.table_id, 0);
        f.pool.get_page(txn(), pid, Permissions::ReadWrite)?;
        assert!(!f.pool.holds_lock(txn(), pid));
        f.pool.release_page(txn(), pid);
        f.pool.transaction_complete(txn(), true);
        assert!(f.pool.is_cached(pid));
        Ok(())
    }
}
