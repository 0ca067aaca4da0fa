//! Registry of tables: id, name, schema, primary key and backing store.

use crate::access::{DataType, HeapFile, PageStore, TableFile, TupleDesc};
use crate::storage::error::{StorageError, StorageResult};
use dashmap::DashMap;
use log::{debug, info};
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub type TableId = u32;

#[derive(Debug, Clone)]
struct TableEntry {
    file: Arc<TableFile>,
    name: String,
    primary_key: Option<String>,
}

/// In-memory catalog. When two tables share a name or an id, the one added
/// last wins.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: DashMap<TableId, TableEntry>,
    names: DashMap<String, TableId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under `name` and return its table id.
    pub fn add_table(&self, file: TableFile, name: &str, primary_key: Option<&str>) -> TableId {
        let table_id = file.id();
        debug!("Adding table {:?} ({}) from {:?}", name, table_id, file.path());
        self.tables.insert(
            table_id,
            TableEntry {
                file: Arc::new(file),
                name: name.to_string(),
                primary_key: primary_key.map(str::to_string),
            },
        );
        self.names.insert(name.to_string(), table_id);
        table_id
    }

    fn entry(&self, table_id: TableId) -> StorageResult<TableEntry> {
        self.tables
            .get(&table_id)
            .map(|entry| entry.value().clone())
            .ok_or(StorageError::NoSuchTable(table_id))
    }

    /// The store and schema of a table.
    pub fn resolve_table(
        &self,
        table_id: TableId,
    ) -> StorageResult<(Arc<TableFile>, Arc<TupleDesc>)> {
        let entry = self.entry(table_id)?;
        let schema = entry.file.schema().clone();
        Ok((entry.file, schema))
    }

    pub fn table_file(&self, table_id: TableId) -> StorageResult<Arc<TableFile>> {
        self.entry(table_id).map(|entry| entry.file)
    }

    pub fn schema(&self, table_id: TableId) -> StorageResult<Arc<TupleDesc>> {
        self.resolve_table(table_id).map(|(_, schema)| schema)
    }

    pub fn table_id(&self, name: &str) -> StorageResult<TableId> {
        self.names
            .get(name)
            .map(|id| *id.value())
            .ok_or_else(|| StorageError::NoSuchTableName(name.to_string()))
    }

    pub fn table_name(&self, table_id: TableId) -> StorageResult<String> {
        self.entry(table_id).map(|entry| entry.name)
    }

    pub fn primary_key(&self, table_id: TableId) -> StorageResult<Option<String>> {
        self.entry(table_id).map(|entry| entry.primary_key)
    }

    /// Ids of every registered table, ascending.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.tables.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn clear(&self) {
        self.tables.clear();
        self.names.clear();
    }

    /// Load table definitions from a catalog file, one table per line:
    ///
    /// ```text
    /// employees (id int pk, name string, dept int)
    /// ```
    ///
    /// Each table's data lives next to the catalog file in `<name>.dat`.
    pub fn load_schema(&self, path: &Path, page_size: usize) -> StorageResult<Vec<TableId>> {
        let text = fs::read_to_string(path)?;
        let base = path
            .canonicalize()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut loaded = Vec::new();
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let (name, schema, primary_key) = parse_table_line(line)?;
            let file = HeapFile::open(
                base.join(format!("{}.dat", name)),
                Arc::new(schema),
                page_size,
            )?;
            let schema = file.schema().clone();
            let table_id = self.add_table(file.into(), &name, primary_key.as_deref());
            info!("Added table {} with schema {}", name, schema);
            loaded.push(table_id);
        }
        Ok(loaded)
    }
}

fn parse_table_line(line: &str) -> StorageResult<(String, TupleDesc, Option<String>)> {
    let invalid = |reason: &str| StorageError::InvalidSchema(format!("{}: {:?}", reason, line));

    let (open, close) = match (line.find('('), line.rfind(')')) {
        (Some(open), Some(close)) if open < close => (open, close),
        _ => return Err(invalid("expected `name (field type, ...)`")),
    };
    let name = line[..open].trim();
    if name.is_empty() {
        return Err(invalid("missing table name"));
    }

    let mut types = Vec::new();
    let mut names = Vec::new();
    let mut primary_key = None;
    for field in line[open + 1..close].split(',') {
        let parts: Vec<&str> = field.split_whitespace().collect();
        let (field_name, type_name, annotation) = match parts.as_slice() {
            [n, t] => (*n, *t, None),
            [n, t, a] => (*n, *t, Some(*a)),
            _ => return Err(invalid("expected `field type [pk]`")),
        };
        let field_type = DataType::parse(type_name)
            .ok_or_else(|| invalid(&format!("unknown type {}", type_name)))?;
        match annotation {
            None => {}
            Some("pk") => primary_key = Some(field_name.to_string()),
            Some(other) => return Err(invalid(&format!("unknown annotation {}", other))),
        }
        types.push(field_type);
        names.push(Some(field_name.to_string()));
    }

    Ok((name.to_string(), TupleDesc::new(types, names)?, primary_key))
}
