use crate::access::desc::TupleDesc;
use crate::access::value::Value;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use bytes::BufMut;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Storage location of a tuple: a page and a slot on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        // First compare by page, then by slot
        match self.page_id.cmp(&other.page_id) {
            Ordering::Equal => self.slot.cmp(&other.slot),
            other => other,
        }
    }
}

/// Represents a row in the database
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Value>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Build a tuple, checking the values against the descriptor.
    pub fn new(desc: Arc<TupleDesc>, fields: Vec<Value>) -> StorageResult<Self> {
        if fields.len() != desc.num_fields() {
            return Err(StorageError::SchemaMismatch {
                expected: desc.to_string(),
                actual: format!("{} values", fields.len()),
            });
        }
        for (index, (value, field_type)) in fields.iter().zip(desc.types()).enumerate() {
            if !value.is_compatible_with(field_type) {
                return Err(StorageError::TypeMismatch {
                    index,
                    expected: field_type.to_string(),
                });
            }
        }
        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }

    pub(crate) fn from_parts(
        desc: Arc<TupleDesc>,
        fields: Vec<Value>,
        record_id: Option<RecordId>,
    ) -> Self {
        Self {
            desc,
            fields,
            record_id,
        }
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn get_field(&self, index: usize) -> StorageResult<&Value> {
        self.fields
            .get(index)
            .ok_or(StorageError::FieldIndexOutOfRange {
                index,
                num_fields: self.fields.len(),
            })
    }

    pub fn set_field(&mut self, index: usize, value: Value) -> StorageResult<()> {
        let expected = self.desc.field_type(index)?;
        if !value.is_compatible_with(expected) {
            return Err(StorageError::TypeMismatch {
                index,
                expected: expected.to_string(),
            });
        }
        self.fields[index] = value;
        Ok(())
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Append exactly `desc().size()` bytes, fields in declared order.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        for value in &self.fields {
            value.write_to(buf);
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}
