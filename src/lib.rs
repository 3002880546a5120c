//! A columnar, chunk-oriented, in-memory relational storage and scan engine.
//!
//! This crate covers the storage core only: building tables from chunked,
//! typed columnar segments, compressing chunks into dictionary-encoded
//! segments, and evaluating predicate scans that produce result tables of
//! reference segments. SQL parsing, query planning, transactions, on-disk
//! durability, and a full catalog surface are collaborators this crate
//! expects to sit underneath, not things it implements itself.

pub mod attribute_vector;
pub mod chunk;
pub mod error;
pub mod operators;
pub mod segment;
pub mod storage_manager;
pub mod table;
pub mod types;

pub use attribute_vector::{AttributeVector, Fitted16AttributeVector, Fitted32AttributeVector, Fitted8AttributeVector};
pub use chunk::Chunk;
pub use error::{Error, Result};
pub use operators::{Operator, ScanType, TableScan};
pub use segment::{new_value_segment, DictionarySegment, ReferenceSegment, Segment, ValueSegment};
pub use storage_manager::{StorageManager, TableSummary, DEFAULT_STORAGE_MANAGER};
pub use table::Table;
pub use types::{
    type_name_of, with_data_type, AllTypeVariant, ChunkID, ChunkOffset, ColumnDataType, ColumnID,
    PosList, RowID, ValueID, WithColumnType, INVALID_VALUE_ID,
};
