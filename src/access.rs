//! Access layer for tuple-oriented operations.
//!
//! - **TupleDesc / Tuple / Value**: typed, fixed-width rows
//! - **HeapFile**: a table stored as an unordered sequence of heap pages
//! - **PageStore / TableFile**: the capability set every table store provides
//! - **TableScanCursor / SeqScan**: page-by-page iteration through the buffer pool

pub mod desc;
pub mod file;
pub mod heap;
pub mod scan;
pub mod tuple;
pub mod value;

pub use desc::{TdItem, TupleDesc};
pub use file::{PageStore, TableFile};
pub use heap::HeapFile;
pub use scan::{collect_tuples, SeqScan, TableScanCursor, TupleIterator};
pub use tuple::{RecordId, Tuple};
pub use value::{DataType, Value, STRING_LEN};
