//! The closed element-type system (C1) and the small set of ID newtypes the
//! rest of the crate indexes by.
//!
//! `ColumnID`, `ChunkID`, `ChunkOffset` and `ValueID` are distinct unsigned
//! integer newtypes on purpose: mixing up "the 3rd column" with "the 3rd
//! chunk" is a real bug class in a hand-rolled storage engine, and the type
//! checker should catch it for us.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Result, TypeMismatchSnafu, UnknownTypeSnafu};
use snafu::OptionExt;

/// Index of a column within a chunk/table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnID(pub u16);

/// Index of a chunk within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkID(pub u32);

/// Index of a row within a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkOffset(pub u32);

/// Index into the dictionary of a `DictionarySegment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueID(pub u32);

/// Sentinel returned by `lower_bound`/`upper_bound` when the search value is
/// outside the dictionary's range.
pub const INVALID_VALUE_ID: ValueID = ValueID(u32::MAX);

macro_rules! impl_id_newtype {
    ($name:ident, $repr:ty) => {
        impl $name {
            pub const fn new(v: $repr) -> Self {
                Self(v)
            }

            pub const fn get(self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$repr> for $name {
            fn from(v: $repr) -> Self {
                Self(v)
            }
        }
    };
}

impl_id_newtype!(ColumnID, u16);
impl_id_newtype!(ChunkID, u32);
impl_id_newtype!(ChunkOffset, u32);
impl_id_newtype!(ValueID, u32);

/// A row identified by the chunk it lives in and its offset within that
/// chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowID {
    pub chunk_id: ChunkID,
    pub chunk_offset: ChunkOffset,
}

impl RowID {
    pub fn new(chunk_id: ChunkID, chunk_offset: ChunkOffset) -> Self {
        Self {
            chunk_id,
            chunk_offset,
        }
    }
}

/// An ordered, duplicate-tolerant sequence of `RowID`s. Order is meaningful
/// and preserved by every consumer downstream of a scan.
pub type PosList = Vec<RowID>;

/// A tagged union over the closed set of element types this engine supports.
#[derive(Debug, Clone, PartialEq)]
pub enum AllTypeVariant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl fmt::Display for AllTypeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
        }
    }
}

/// Implemented for exactly the five element types this engine knows about.
/// `ValueSegment<T>`, `DictionarySegment<T>` and the scan inner loop are all
/// generic over `T: ColumnDataType`, and are selected at runtime through
/// [`with_data_type`].
pub trait ColumnDataType: Clone + fmt::Debug + Send + Sync + 'static {
    /// The schema type-name this Rust type corresponds to.
    const TYPE_NAME: &'static str;

    fn from_variant(value: &AllTypeVariant) -> Result<Self>;

    fn into_variant(self) -> AllTypeVariant;

    /// A total order over `T`. For `f32`/`f64` this is `ordered_float`'s
    /// total order rather than `PartialOrd`, so dictionaries can be sorted
    /// and binary-searched even though IEEE floats aren't `Ord`.
    fn cmp_order(&self, other: &Self) -> Ordering;
}

impl ColumnDataType for i32 {
    const TYPE_NAME: &'static str = "int";

    fn from_variant(value: &AllTypeVariant) -> Result<Self> {
        match value {
            AllTypeVariant::Int(v) => Ok(*v),
            other => TypeMismatchSnafu {
                detail: format!("expected int, got {other:?}"),
            }
            .fail(),
        }
    }

    fn into_variant(self) -> AllTypeVariant {
        AllTypeVariant::Int(self)
    }

    fn cmp_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl ColumnDataType for i64 {
    const TYPE_NAME: &'static str = "long";

    fn from_variant(value: &AllTypeVariant) -> Result<Self> {
        match value {
            AllTypeVariant::Long(v) => Ok(*v),
            other => TypeMismatchSnafu {
                detail: format!("expected long, got {other:?}"),
            }
            .fail(),
        }
    }

    fn into_variant(self) -> AllTypeVariant {
        AllTypeVariant::Long(self)
    }

    fn cmp_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl ColumnDataType for f32 {
    const TYPE_NAME: &'static str = "float";

    fn from_variant(value: &AllTypeVariant) -> Result<Self> {
        match value {
            AllTypeVariant::Float(v) => Ok(*v),
            other => TypeMismatchSnafu {
                detail: format!("expected float, got {other:?}"),
            }
            .fail(),
        }
    }

    fn into_variant(self) -> AllTypeVariant {
        AllTypeVariant::Float(self)
    }

    fn cmp_order(&self, other: &Self) -> Ordering {
        ordered_float::OrderedFloat(*self).cmp(&ordered_float::OrderedFloat(*other))
    }
}

impl ColumnDataType for f64 {
    const TYPE_NAME: &'static str = "double";

    fn from_variant(value: &AllTypeVariant) -> Result<Self> {
        match value {
            AllTypeVariant::Double(v) => Ok(*v),
            other => TypeMismatchSnafu {
                detail: format!("expected double, got {other:?}"),
            }
            .fail(),
        }
    }

    fn into_variant(self) -> AllTypeVariant {
        AllTypeVariant::Double(self)
    }

    fn cmp_order(&self, other: &Self) -> Ordering {
        ordered_float::OrderedFloat(*self).cmp(&ordered_float::OrderedFloat(*other))
    }
}

impl ColumnDataType for String {
    const TYPE_NAME: &'static str = "string";

    fn from_variant(value: &AllTypeVariant) -> Result<Self> {
        match value {
            AllTypeVariant::String(v) => Ok(v.clone()),
            other => TypeMismatchSnafu {
                detail: format!("expected string, got {other:?}"),
            }
            .fail(),
        }
    }

    fn into_variant(self) -> AllTypeVariant {
        AllTypeVariant::String(self)
    }

    fn cmp_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

/// Visitor invoked by [`with_data_type`] once the type name has been
/// resolved to a concrete `T: ColumnDataType`. This is the Rust stand-in for
/// the source's `make_unique_by_data_type<Base, Derived>(type_name, args...)`
/// function-template dispatch: since Rust closures cannot be generic over a
/// type parameter, the "generic factory" is instead a trait with a generic
/// method.
pub trait WithColumnType {
    type Output;

    fn call<T: ColumnDataType>(self) -> Self::Output;
}

/// Resolve `type_name` to one of the five supported element types and invoke
/// `f` monomorphized over it. Fails with `UnknownType` for any other string.
pub fn with_data_type<F: WithColumnType>(type_name: &str, f: F) -> Result<F::Output> {
    match type_name {
        "int" => Ok(f.call::<i32>()),
        "long" => Ok(f.call::<i64>()),
        "float" => Ok(f.call::<f32>()),
        "double" => Ok(f.call::<f64>()),
        "string" => Ok(f.call::<String>()),
        _ => UnknownTypeSnafu {
            type_name: type_name.to_owned(),
        }
        .fail(),
    }
}

/// Returns the canonical type-name for one of the five supported Rust types.
pub fn type_name_of<T: ColumnDataType>() -> &'static str {
    T::TYPE_NAME
}

pub(crate) fn checked_index(index: usize, size: usize) -> Result<usize> {
    (index < size)
        .then_some(index)
        .context(crate::error::OutOfRangeSnafu { index, size })
}
