use std::any::Any;
use std::sync::Arc;

use super::Segment;
use crate::error::{ImmutableSnafu, Result};
use crate::table::Table;
use crate::types::{checked_index, AllTypeVariant, ColumnID, PosList};

/// A segment that materializes its values by indirection: a pointer to
/// another table, a column within it, and a position list of `(chunk, row)`
/// pairs to resolve through. Not parameterized on `T` — the referenced
/// column's element type is whatever the referenced table's schema says it
/// is.
#[derive(Debug, Clone)]
pub struct ReferenceSegment {
    referenced_table: Arc<Table>,
    referenced_column_id: ColumnID,
    pos_list: Arc<PosList>,
}

impl ReferenceSegment {
    pub fn new(
        referenced_table: Arc<Table>,
        referenced_column_id: ColumnID,
        pos_list: Arc<PosList>,
    ) -> Self {
        Self {
            referenced_table,
            referenced_column_id,
            pos_list,
        }
    }

    pub fn referenced_table(&self) -> &Arc<Table> {
        &self.referenced_table
    }

    pub fn referenced_column_id(&self) -> ColumnID {
        self.referenced_column_id
    }

    pub fn pos_list(&self) -> &Arc<PosList> {
        &self.pos_list
    }
}

impl Segment for ReferenceSegment {
    fn size(&self) -> usize {
        self.pos_list.len()
    }

    fn get(&self, offset: usize) -> Result<AllTypeVariant> {
        let offset = checked_index(offset, self.pos_list.len())?;
        let row = self.pos_list[offset];
        let chunk = self.referenced_table.get_chunk(row.chunk_id)?;
        let segment = chunk.get_segment(self.referenced_column_id)?;
        segment.get(row.chunk_offset.get() as usize)
    }

    fn append(&mut self, _value: AllTypeVariant) -> Result<()> {
        ImmutableSnafu {
            segment_kind: "reference",
        }
        .fail()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
