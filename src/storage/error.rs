//! Storage layer error types.

use crate::catalog::TableId;
use crate::storage::page::PageId;
use thiserror::Error;

/// Coarse classification of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    IllegalState,
    SchemaMismatch,
    SlotError,
    IoFailure,
}

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("No such table: {0}")]
    NoSuchTable(TableId),

    #[error("No table named {0:?}")]
    NoSuchTableName(String),

    #[error("No field named {0:?}")]
    FieldNotFound(String),

    #[error("Field index {index} out of range (fields: {num_fields})")]
    FieldIndexOutOfRange { index: usize, num_fields: usize },

    #[error("No more tuples")]
    NoMoreTuples,

    #[error("Illegal state: {0}")]
    IllegalState(&'static str),

    #[error("Schema mismatch: expected [{expected}], got [{actual}]")]
    SchemaMismatch { expected: String, actual: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Type mismatch at field {index}: expected {expected}")]
    TypeMismatch { index: usize, expected: String },

    #[error("Page is full: {0}")]
    PageFull(PageId),

    #[error("Tuple is not on page {0}")]
    NotOnPage(PageId),

    #[error("Slot {slot} on page {page_id} is already empty")]
    SlotAlreadyEmpty { page_id: PageId, slot: usize },

    #[error("Invalid slot ID: {slot} (slots: {num_slots})")]
    SlotOutOfRange { slot: usize, num_slots: usize },

    #[error("Tuple has no record id")]
    MissingRecordId,

    #[error("Short read on page {page_id}: expected {expected} bytes")]
    ShortRead { page_id: PageId, expected: usize },

    #[error("Corrupt page {page_id}: {reason}")]
    Corrupt { page_id: PageId, reason: String },

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NoSuchTable(_)
            | StorageError::NoSuchTableName(_)
            | StorageError::FieldNotFound(_)
            | StorageError::FieldIndexOutOfRange { .. }
            | StorageError::NoMoreTuples => ErrorKind::NotFound,
            StorageError::IllegalState(_) | StorageError::Config(_) => ErrorKind::IllegalState,
            StorageError::SchemaMismatch { .. }
            | StorageError::InvalidSchema(_)
            | StorageError::TypeMismatch { .. } => ErrorKind::SchemaMismatch,
            StorageError::PageFull(_)
            | StorageError::NotOnPage(_)
            | StorageError::SlotAlreadyEmpty { .. }
            | StorageError::SlotOutOfRange { .. }
            | StorageError::MissingRecordId => ErrorKind::SlotError,
            StorageError::ShortRead { .. }
            | StorageError::Corrupt { .. }
            | StorageError::Io(_) => ErrorKind::IoFailure,
        }
    }

    /// Corrupt pages and I/O failures; the caller should abort the operation.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::IoFailure
    }

    pub(crate) fn corrupt(page_id: PageId, reason: impl Into<String>) -> Self {
        StorageError::Corrupt {
            page_id,
            reason: reason.into(),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
