use std::any::Any;
use std::cmp::Ordering;

use super::Segment;
use crate::attribute_vector::{make_attribute_vector, AttributeVector};
use crate::error::{ImmutableSnafu, Result};
use crate::types::{checked_index, AllTypeVariant, ColumnDataType, ValueID, INVALID_VALUE_ID};

/// An immutable pair of a sorted, duplicate-free dictionary `D: Vec<T>` and
/// an attribute vector `A` of `ValueID`s with `A.len() == source row count`,
/// such that for every row `i`, `D[A[i]]` equals the original value.
#[derive(Debug)]
pub struct DictionarySegment<T: ColumnDataType> {
    dictionary: Vec<T>,
    attribute_vector: Box<dyn AttributeVector>,
}

impl<T: ColumnDataType> DictionarySegment<T> {
    /// Build a dictionary segment from any segment of logical type `T`:
    /// collect the distinct values into a sorted dictionary, then encode
    /// each row as the index of its value in that dictionary.
    pub fn from_segment(base: &dyn Segment) -> Result<Self> {
        let row_count = base.size();
        let mut rows = Vec::with_capacity(row_count);
        for i in 0..row_count {
            rows.push(T::from_variant(&base.get(i)?)?);
        }

        let mut dictionary = rows.clone();
        dictionary.sort_by(|a, b| a.cmp_order(b));
        dictionary.dedup_by(|a, b| a.cmp_order(b) == Ordering::Equal);

        let mut attribute_vector = make_attribute_vector(row_count, dictionary.len() as u32);
        for (i, value) in rows.iter().enumerate() {
            let index = dictionary
                .binary_search_by(|probe| probe.cmp_order(value))
                .expect("every row's value was inserted into the dictionary above");
            attribute_vector.set(i, ValueID::new(index as u32))?;
        }

        Ok(Self {
            dictionary,
            attribute_vector,
        })
    }

    pub fn dictionary(&self) -> &[T] {
        &self.dictionary
    }

    pub fn attribute_vector(&self) -> &dyn AttributeVector {
        self.attribute_vector.as_ref()
    }

    pub fn unique_values_count(&self) -> usize {
        self.dictionary.len()
    }

    /// Resolve row `i` straight to `T`.
    pub fn get_typed(&self, i: usize) -> Result<T> {
        let id = self.attribute_vector.get(i)?;
        Ok(self.dictionary[id.get() as usize].clone())
    }

    /// Resolve a `ValueID` straight to `T` without going through a row.
    pub fn value_by_value_id(&self, value_id: ValueID) -> Result<T> {
        let index = checked_index(value_id.get() as usize, self.dictionary.len())?;
        Ok(self.dictionary[index].clone())
    }

    /// First index `i` with `D[i] >= value`, or `INVALID_VALUE_ID` if none.
    pub fn lower_bound(&self, value: &AllTypeVariant) -> Result<ValueID> {
        Ok(self.lower_bound_typed(&T::from_variant(value)?))
    }

    pub fn lower_bound_typed(&self, value: &T) -> ValueID {
        let index = match self.dictionary.binary_search_by(|probe| probe.cmp_order(value)) {
            Ok(i) | Err(i) => i,
        };
        self.index_or_invalid(index)
    }

    /// First index `i` with `D[i] > value`, or `INVALID_VALUE_ID` if none.
    pub fn upper_bound(&self, value: &AllTypeVariant) -> Result<ValueID> {
        Ok(self.upper_bound_typed(&T::from_variant(value)?))
    }

    pub fn upper_bound_typed(&self, value: &T) -> ValueID {
        // The dictionary is strictly sorted and duplicate-free, so an exact
        // match's successor is the first strictly-greater element, and a
        // miss's insertion point already is.
        let index = match self.dictionary.binary_search_by(|probe| probe.cmp_order(value)) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        self.index_or_invalid(index)
    }

    fn index_or_invalid(&self, index: usize) -> ValueID {
        if index >= self.dictionary.len() {
            INVALID_VALUE_ID
        } else {
            ValueID::new(index as u32)
        }
    }
}

impl<T: ColumnDataType> Segment for DictionarySegment<T> {
    fn size(&self) -> usize {
        self.attribute_vector.size()
    }

    fn get(&self, offset: usize) -> Result<AllTypeVariant> {
        Ok(self.get_typed(offset)?.into_variant())
    }

    fn append(&mut self, _value: AllTypeVariant) -> Result<()> {
        ImmutableSnafu {
            segment_kind: "dictionary",
        }
        .fail()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
