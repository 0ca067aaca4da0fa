use crate::access::file::PageStore;
use crate::access::{Tuple, TupleDesc};
use crate::catalog::TableId;
use crate::storage::buffer::BufferPool;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::transaction::{Permissions, TransactionId};
use std::sync::Arc;

/// Pull-based iteration over tuples.
///
/// `has_next`, `next` and `rewind` fail with `IllegalState` unless the
/// iterator is open.
pub trait TupleIterator {
    fn open(&mut self) -> StorageResult<()>;

    fn has_next(&mut self) -> StorageResult<bool>;

    /// The next tuple; `NoMoreTuples` once exhausted.
    fn next(&mut self) -> StorageResult<Tuple>;

    fn rewind(&mut self) -> StorageResult<()>;

    fn close(&mut self);

    fn tuple_desc(&self) -> &Arc<TupleDesc>;
}

/// Open `iter`, read every remaining tuple, and close it again.
pub fn collect_tuples<I: TupleIterator + ?Sized>(iter: &mut I) -> StorageResult<Vec<Tuple>> {
    iter.open()?;
    let mut tuples = Vec::new();
    while iter.has_next()? {
        tuples.push(iter.next()?);
    }
    iter.close();
    Ok(tuples)
}

/// Walks a table's pages in order, and each page's occupied slots in order.
///
/// Each step fetches its page through the buffer pool, so the cursor always
/// reads the pool's copy. The page count is taken at `open` (and again at
/// `rewind`); pages appended later are not visited.
pub struct TableScanCursor {
    pool: BufferPool,
    txn: TransactionId,
    table_id: TableId,
    schema: Arc<TupleDesc>,
    is_open: bool,
    num_pages: u32,
    page_number: u32,
    next_slot: usize,
    pending: Option<Tuple>,
}

impl TableScanCursor {
    pub fn new(
        pool: BufferPool,
        txn: TransactionId,
        table_id: TableId,
        schema: Arc<TupleDesc>,
    ) -> Self {
        Self {
            pool,
            txn,
            table_id,
            schema,
            is_open: false,
            num_pages: 0,
            page_number: 0,
            next_slot: 0,
            pending: None,
        }
    }

    /// A cursor over a table registered in the pool's catalog.
    pub fn for_table(
        pool: &BufferPool,
        txn: TransactionId,
        table_id: TableId,
    ) -> StorageResult<Self> {
        let schema = pool.catalog().schema(table_id)?;
        Ok(Self::new(pool.clone(), txn, table_id, schema))
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    fn check_open(&self) -> StorageResult<()> {
        if !self.is_open {
            return Err(StorageError::IllegalState("scan cursor is not open"));
        }
        Ok(())
    }

    fn reset(&mut self) -> StorageResult<()> {
        let file = self.pool.catalog().table_file(self.table_id)?;
        self.num_pages = file.num_pages()?;
        self.page_number = 0;
        self.next_slot = 0;
        self.pending = None;
        Ok(())
    }

    /// Advance to the next occupied slot, loading pages as needed.
    fn advance(&mut self) -> StorageResult<Option<Tuple>> {
        while self.page_number < self.num_pages {
            let page_id = PageId::new(self.table_id, self.page_number);
            let page_ref = self.pool.get_page(self.txn, page_id, Permissions::ReadOnly)?;
            let page = page_ref.read();
            while let Some(slot) = page.next_used_slot(self.next_slot) {
                self.next_slot = slot + 1;
                if let Some(tuple) = page.tuple_at(slot) {
                    return Ok(Some(tuple.clone()));
                }
            }

            self.page_number += 1;
            self.next_slot = 0;
        }
        Ok(None)
    }
}

impl TupleIterator for TableScanCursor {
    fn open(&mut self) -> StorageResult<()> {
        self.reset()?;
        self.is_open = true;
        Ok(())
    }

    fn has_next(&mut self) -> StorageResult<bool> {
        self.check_open()?;
        if self.pending.is_none() {
            self.pending = self.advance()?;
        }
        Ok(self.pending.is_some())
    }

    fn next(&mut self) -> StorageResult<Tuple> {
        if !self.has_next()? {
            return Err(StorageError::NoMoreTuples);
        }
        self.pending.take().ok_or(StorageError::NoMoreTuples)
    }

    fn rewind(&mut self) -> StorageResult<()> {
        self.check_open()?;
        self.reset()
    }

    fn close(&mut self) {
        self.is_open = false;
        self.pending = None;
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.schema
    }
}

/// Sequential scan of one table under an alias.
///
/// Tuples come back as stored; only the reported descriptor carries the
/// `alias.field` names.
pub struct SeqScan {
    cursor: TableScanCursor,
    alias: String,
    desc: Arc<TupleDesc>,
}

impl SeqScan {
    /// Scan `table_id`, aliased as `alias` or else by the table's name.
    pub fn new(
        pool: &BufferPool,
        txn: TransactionId,
        table_id: TableId,
        alias: Option<&str>,
    ) -> StorageResult<Self> {
        let cursor = TableScanCursor::for_table(pool, txn, table_id)?;
        let alias = match alias {
            Some(alias) => alias.to_string(),
            None => pool.catalog().table_name(table_id)?,
        };
        let desc = Arc::new(cursor.tuple_desc().with_alias(&alias));
        Ok(Self {
            cursor,
            alias,
            desc,
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn table_id(&self) -> TableId {
        self.cursor.table_id()
    }
}

impl TupleIterator for SeqScan {
    fn open(&mut self) -> StorageResult<()> {
        self.cursor.open()
    }

    fn has_next(&mut self) -> StorageResult<bool> {
        self.cursor.has_next()
    }

    fn next(&mut self) -> StorageResult<Tuple> {
        self.cursor.next()
    }

    fn rewind(&mut self) -> StorageResult<()> {
        self.cursor.rewind()
    }

    fn close(&mut self) {
        self.cursor.close()
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{DataType, HeapFile, TableFile, Value};
    use crate::catalog::Catalog;
    use crate::storage::disk::DEFAULT_PAGE_SIZE;
    use crate::storage::error::ErrorKind;
    use crate::storage::page::HeapPage;
    use tempfile::{tempdir, TempDir};

    fn desc() -> Arc<TupleDesc> {
        Arc::new(TupleDesc::named(&[(DataType::Int32, "id"), (DataType::Varchar, "name")]).unwrap())
    }

    fn row(v: i32) -> Tuple {
        Tuple::new(desc(), vec![Value::Int32(v), Value::String(format!("n{}", v))]).unwrap()
    }

    fn txn() -> TransactionId {
        TransactionId::new(1)
    }

    fn setup(capacity: usize) -> StorageResult<(TempDir, BufferPool, Arc<TableFile>)> {
        let dir = tempdir()?;
        let file = HeapFile::open(dir.path().join("people.dat"), desc(), DEFAULT_PAGE_SIZE)?;
        let catalog = Arc::new(Catalog::new());
        let table_id = catalog.add_table(TableFile::Heap(file), "people", Some("id"));
        let table = catalog.table_file(table_id)?;
        Ok((dir, BufferPool::new(catalog, capacity), table))
    }

    fn ids(tuples: &[Tuple]) -> Vec<i32> {
        tuples
            .iter()
            .map(|t| t.get_field(0).unwrap().as_i32().unwrap())
            .collect()
    }

    #[test]
    fn test_scan_empty_table() -> StorageResult<()> {
        let (_dir, pool, table) = setup(10)?;
        let mut cursor = TableScanCursor::for_table(&pool, txn(), table.id())?;
        cursor.open()?;
        assert!(!cursor.has_next()?);
        assert!(matches!(cursor.next(), Err(StorageError::NoMoreTuples)));
        Ok(())
    }

    #[test]
    fn test_skips_empty_leading_page() -> StorageResult<()> {
        let (_dir, pool, table) = setup(10)?;
        let page0 = HeapPage::empty(PageId::new(table.id(), 0), desc(), DEFAULT_PAGE_SIZE)?;
        let mut page1 = HeapPage::empty(PageId::new(table.id(), 1), desc(), DEFAULT_PAGE_SIZE)?;
        for v in [10, 20, 30] {
            page1.insert_tuple(&mut row(v))?;
        }
        table.write_page(&page0.into())?;
        table.write_page(&page1.into())?;

        let mut cursor = TableScanCursor::for_table(&pool, txn(), table.id())?;
        let tuples = collect_tuples(&mut cursor)?;
        assert_eq!(ids(&tuples), vec![10, 20, 30]);

        let slots: Vec<_> = tuples
            .iter()
            .map(|t| t.record_id().unwrap())
            .map(|rid| (rid.page_id.page_number, rid.slot))
            .collect();
        assert_eq!(slots, vec![(1, 0), (1, 1), (1, 2)]);
        Ok(())
    }

    #[test]
    fn test_scan_order_across_pages() -> StorageResult<()> {
        let (_dir, pool, table) = setup(3)?;
        // 30 two-field tuples fit on a 4096-byte page.
        for v in 0..75 {
            pool.insert_tuple(txn(), table.id(), &mut row(v))?;
        }
        assert_eq!(table.num_pages()?, 3);

        let mut cursor = table_cursor(&pool, &table);
        let tuples = collect_tuples(&mut cursor)?;
        assert_eq!(ids(&tuples), (0..75).collect::<Vec<_>>());
        assert!(pool.len() <= 3);
        Ok(())
    }

    fn table_cursor(pool: &BufferPool, table: &TableFile) -> TableScanCursor {
        match table {
            TableFile::Heap(file) => file.scan_cursor(txn(), pool),
        }
    }

    #[test]
    fn test_closed_cursor_is_illegal_state() -> StorageResult<()> {
        let (_dir, pool, table) = setup(10)?;
        let mut cursor = TableScanCursor::for_table(&pool, txn(), table.id())?;

        assert_eq!(cursor.has_next().unwrap_err().kind(), ErrorKind::IllegalState);
        assert_eq!(cursor.next().unwrap_err().kind(), ErrorKind::IllegalState);
        assert_eq!(cursor.rewind().unwrap_err().kind(), ErrorKind::IllegalState);

        cursor.open()?;
        cursor.close();
        assert!(cursor.has_next().is_err());
        Ok(())
    }

    #[test]
    fn test_rewind_restarts() -> StorageResult<()> {
        let (_dir, pool, table) = setup(10)?;
        for v in 0..5 {
            pool.insert_tuple(txn(), table.id(), &mut row(v))?;
        }

        let mut cursor = TableScanCursor::for_table(&pool, txn(), table.id())?;
        cursor.open()?;
        let first = cursor.next()?;
        cursor.next()?;
        cursor.rewind()?;
        assert_eq!(cursor.next()?, first);
        Ok(())
    }

    #[test]
    fn test_page_count_snapshot_at_open() -> StorageResult<()> {
        let (_dir, pool, table) = setup(10)?;
        let mut cursor = TableScanCursor::for_table(&pool, txn(), table.id())?;
        cursor.open()?;

        pool.insert_tuple(txn(), table.id(), &mut row(1))?;
        assert!(!cursor.has_next()?);

        cursor.rewind()?;
        assert!(cursor.has_next()?);
        Ok(())
    }

    #[test]
    fn test_scan_sees_changes_made_after_eviction() -> StorageResult<()> {
        let (dir, pool, table) = setup(1)?;
        let other = HeapFile::open(dir.path().join("other.dat"), desc(), DEFAULT_PAGE_SIZE)?;
        let other_id = pool.catalog().add_table(other.into(), "other", None);

        let mut rows: Vec<Tuple> = (0..3).map(row).collect();
        for tuple in rows.iter_mut() {
            pool.insert_tuple(txn(), table.id(), tuple)?;
        }

        let mut cursor = TableScanCursor::for_table(&pool, txn(), table.id())?;
        cursor.open()?;
        assert_eq!(ids(&[cursor.next()?]), vec![0]);

        // Evicts the page under the cursor, then reloads it for the delete.
        pool.insert_tuple(txn(), other_id, &mut row(100))?;
        assert!(!pool.is_cached(PageId::new(table.id(), 0)));
        pool.delete_tuple(txn(), &rows[1])?;

        let mut rest = Vec::new();
        while cursor.has_next()? {
            rest.push(cursor.next()?);
        }
        assert_eq!(ids(&rest), vec![2]);
        assert_eq!(pool.len(), 1);
        Ok(())
    }

    #[test]
    fn test_seq_scan_alias() -> StorageResult<()> {
        let (_dir, pool, table) = setup(10)?;
        pool.insert_tuple(txn(), table.id(), &mut row(7))?;

        let mut scan = SeqScan::new(&pool, txn(), table.id(), Some("p"))?;
        assert_eq!(scan.tuple_desc().field_name(0)?, Some("p.id"));
        assert_eq!(scan.tuple_desc().field_name(1)?, Some("p.name"));
        assert_eq!(ids(&collect_tuples(&mut scan)?), vec![7]);

        let default_alias = SeqScan::new(&pool, txn(), table.id(), None)?;
        assert_eq!(default_alias.alias(), "people");
        Ok(())
    }

    #[test]
    fn test_unknown_table() -> StorageResult<()> {
        let (_dir, pool, table) = setup(10)?;
        let result = TableScanCursor::for_table(&pool, txn(), table.id().wrapping_add(1));
        assert!(matches!(result, Err(StorageError::NoSuchTable(_))));
        Ok(())
    }
}
