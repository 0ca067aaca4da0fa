//! Tuple descriptors: the schema of a row.

use crate::access::value::DataType;
use crate::storage::error::{StorageError, StorageResult};
use std::fmt;
use std::hash::{Hash, Hasher};

/// One field of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TdItem {
    pub field_type: DataType,
    pub field_name: Option<String>,
}

impl fmt::Display for TdItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field_name {
            Some(name) => write!(f, "{}({})", self.field_type, name),
            None => write!(f, "{}(null)", self.field_type),
        }
    }
}

/// Ordered list of typed, optionally named fields. Never empty.
///
/// Equality and hashing only look at the field types; names are ignored.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Build a descriptor from types and matching names.
    pub fn new(types: Vec<DataType>, names: Vec<Option<String>>) -> StorageResult<Self> {
        if types.len() != names.len() {
            return Err(StorageError::InvalidSchema(format!(
                "{} types but {} names",
                types.len(),
                names.len()
            )));
        }
        let items = types
            .into_iter()
            .zip(names)
            .map(|(field_type, field_name)| TdItem {
                field_type,
                field_name,
            })
            .collect();
        Self::from_items(items)
    }

    /// Build a descriptor with unnamed fields.
    pub fn from_types(types: &[DataType]) -> StorageResult<Self> {
        Self::new(types.to_vec(), vec![None; types.len()])
    }

    /// Build a descriptor from `(type, name)` pairs.
    pub fn named(fields: &[(DataType, &str)]) -> StorageResult<Self> {
        Self::new(
            fields.iter().map(|(t, _)| *t).collect(),
            fields.iter().map(|(_, n)| Some(n.to_string())).collect(),
        )
    }

    fn from_items(items: Vec<TdItem>) -> StorageResult<Self> {
        if items.is_empty() {
            return Err(StorageError::InvalidSchema(
                "a tuple descriptor needs at least one field".to_string(),
            ));
        }
        Ok(Self { items })
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn field_type(&self, index: usize) -> StorageResult<DataType> {
        self.item(index).map(|item| item.field_type)
    }

    /// The (possibly absent) name of field `index`.
    pub fn field_name(&self, index: usize) -> StorageResult<Option<&str>> {
        self.item(index).map(|item| item.field_name.as_deref())
    }

    fn item(&self, index: usize) -> StorageResult<&TdItem> {
        self.items
            .get(index)
            .ok_or(StorageError::FieldIndexOutOfRange {
                index,
                num_fields: self.items.len(),
            })
    }

    /// Index of the first field called `name`. Unnamed fields never match.
    pub fn index_of(&self, name: &str) -> StorageResult<usize> {
        self.items
            .iter()
            .position(|item| item.field_name.as_deref() == Some(name))
            .ok_or_else(|| StorageError::FieldNotFound(name.to_string()))
    }

    /// Serialized size in bytes of a tuple with this descriptor.
    pub fn size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.byte_len()).sum()
    }

    pub fn types(&self) -> impl Iterator<Item = DataType> + '_ {
        self.items.iter().map(|item| item.field_type)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TdItem> {
        self.items.iter()
    }

    /// Fields of `first` followed by fields of `second`.
    pub fn merge(first: &TupleDesc, second: &TupleDesc) -> TupleDesc {
        let mut items = Vec::with_capacity(first.num_fields() + second.num_fields());
        items.extend(first.items.iter().cloned());
        items.extend(second.items.iter().cloned());
        TupleDesc { items }
    }

    /// Copy of this descriptor with every name prefixed by `alias.`.
    pub fn with_alias(&self, alias: &str) -> TupleDesc {
        let items = self
            .items
            .iter()
            .map(|item| TdItem {
                field_type: item.field_type,
                field_name: Some(format!(
                    "{}.{}",
                    alias,
                    item.field_name.as_deref().unwrap_or("null")
                )),
            })
            .collect();
        TupleDesc { items }
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.num_fields() == other.num_fields() && self.types().eq(other.types())
    }
}

impl Eq for TupleDesc {}

impl Hash for TupleDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for field_type in self.types() {
            field_type.hash(state);
        }
    }
}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TupleDesc {
    type Item = &'a TdItem;
    type IntoIter = std::slice::Iter<'a, TdItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
