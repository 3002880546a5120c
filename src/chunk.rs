//! A chunk (C4): an ordered list of segments, one per column, sharing a
//! common row count.

use snafu::ensure;

use crate::error::{ArityMismatchSnafu, InvariantViolatedSnafu, Result};
use crate::segment::Segment;
use crate::types::{checked_index, AllTypeVariant, ColumnID};

const MAX_COLUMN_COUNT: usize = u16::MAX as usize;

#[derive(Debug, Default)]
pub struct Chunk {
    segments: Vec<Box<dyn Segment>>,
}

impl Chunk {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Grow the column list by one segment. Used at table construction and
    /// during compression.
    pub fn add_segment(&mut self, segment: Box<dyn Segment>) -> Result<()> {
        ensure!(
            self.segments.len() < MAX_COLUMN_COUNT,
            InvariantViolatedSnafu {
                detail: "max number of segments reached",
            }
        );
        self.segments.push(segment);
        Ok(())
    }

    /// Append a row, component-wise, across all segments. `row.len()` must
    /// equal `column_count()`.
    pub fn append(&mut self, row: Vec<AllTypeVariant>) -> Result<()> {
        ensure!(
            row.len() == self.segments.len(),
            ArityMismatchSnafu {
                row_len: row.len(),
                column_count: self.segments.len(),
            }
        );
        for (segment, value) in self.segments.iter_mut().zip(row) {
            segment.append(value)?;
        }
        Ok(())
    }

    pub fn get_segment(&self, column_id: ColumnID) -> Result<&dyn Segment> {
        let index = checked_index(column_id.get() as usize, self.segments.len())?;
        Ok(self.segments[index].as_ref())
    }

    pub fn column_count(&self) -> u16 {
        self.segments.len() as u16
    }

    pub fn size(&self) -> usize {
        self.segments.first().map(|s| s.size()).unwrap_or(0)
    }
}
