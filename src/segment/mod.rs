//! The segment family (C3): value, dictionary and reference segments,
//! unified under one object-safe capability set.
//!
//! The source re-architects a C++ `BaseSegment` inheritance hierarchy with
//! runtime `dynamic_pointer_cast` into `Segment`, an object-safe trait that
//! also exposes `as_any` so callers that need to recover the concrete
//! variant (chiefly `TableScan`) can downcast once the element type `T` has
//! been resolved via [`crate::types::with_data_type`]. No virtual dispatch
//! beyond this is required.

mod dictionary;
mod reference;
mod value;

pub use dictionary::DictionarySegment;
pub use reference::ReferenceSegment;
pub use value::ValueSegment;

use std::any::Any;
use std::fmt;

use crate::error::Result;
use crate::types::{with_data_type, AllTypeVariant, ColumnDataType, WithColumnType};

/// Capability set every segment variant satisfies.
pub trait Segment: fmt::Debug + Send + Sync + Any {
    /// Number of rows stored in this segment.
    fn size(&self) -> usize;

    /// Read-only random access. May allocate (e.g. for strings resolved
    /// through a dictionary or a chain of reference segments).
    fn get(&self, offset: usize) -> Result<AllTypeVariant>;

    /// Only value segments accept appends; dictionary and reference
    /// segments fail with `Immutable`.
    fn append(&mut self, value: AllTypeVariant) -> Result<()>;

    /// Recover the concrete type for downcasting by callers (notably
    /// `TableScan`) that already know, from schema lookup, which element
    /// type and which segment variant they are dealing with.
    fn as_any(&self) -> &dyn Any;
}

struct MakeValueSegment;

impl WithColumnType for MakeValueSegment {
    type Output = Box<dyn Segment>;

    fn call<T: ColumnDataType>(self) -> Self::Output {
        Box::new(ValueSegment::<T>::new())
    }
}

/// Build a fresh, empty `ValueSegment<T>` for the schema type named
/// `type_name`, boxed as a non-generic `Segment`. Shared by `Table` (new
/// chunks, schema mutation) and `TableScan` (the empty-result policy).
pub fn new_value_segment(type_name: &str) -> Result<Box<dyn Segment>> {
    with_data_type(type_name, MakeValueSegment)
}
