use std::any::Any;

use super::Segment;
use crate::error::Result;
use crate::types::{checked_index, AllTypeVariant, ColumnDataType};

/// An ordered, mutable array of `T`. `append` is O(1) amortized.
#[derive(Debug, Clone)]
pub struct ValueSegment<T: ColumnDataType> {
    values: Vec<T>,
}

impl<T: ColumnDataType> ValueSegment<T> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn push(&mut self, value: T) {
        self.values.push(value);
    }
}

impl<T: ColumnDataType> Default for ValueSegment<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ColumnDataType> Segment for ValueSegment<T> {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn get(&self, offset: usize) -> Result<AllTypeVariant> {
        let offset = checked_index(offset, self.values.len())?;
        Ok(self.values[offset].clone().into_variant())
    }

    fn append(&mut self, value: AllTypeVariant) -> Result<()> {
        self.values.push(T::from_variant(&value)?);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_get_round_trips() {
        let mut seg: ValueSegment<i32> = ValueSegment::new();
        seg.append(AllTypeVariant::Int(4)).unwrap();
        seg.append(AllTypeVariant::Int(6)).unwrap();
        assert_eq!(seg.size(), 2);
        assert_eq!(seg.get(0).unwrap(), AllTypeVariant::Int(4));
        assert_eq!(seg.get(1).unwrap(), AllTypeVariant::Int(6));
    }

    #[test]
    fn append_rejects_mismatched_type() {
        let mut seg: ValueSegment<i32> = ValueSegment::new();
        assert!(seg.append(AllTypeVariant::String("x".into())).is_err());
    }

    #[test]
    fn get_out_of_range_fails() {
        let seg: ValueSegment<i32> = ValueSegment::new();
        assert!(seg.get(0).is_err());
    }
}
