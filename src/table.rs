//! A table (C5): an ordered sequence of chunks sharing a column schema and
//! a fixed target chunk size.

use std::sync::Arc;

use parking_lot::RwLock;
use snafu::ensure;
use tracing::debug;

use crate::chunk::Chunk;
use crate::error::{ArityMismatchSnafu, InvariantViolatedSnafu, Result};
use crate::segment::{new_value_segment, DictionarySegment, Segment};
use crate::types::{
    checked_index, with_data_type, AllTypeVariant, ChunkID, ColumnDataType, ColumnID,
    WithColumnType,
};

/// An ordered sequence of chunks sharing a column schema and a fixed target
/// chunk size.
///
/// `append`, `add_column` and `create_new_chunk` are not safe to call
/// concurrently with readers: they are single-writer build-phase
/// operations. `get_chunk` and `compress_chunk` synchronize through a
/// single reader-writer lock over the chunk list, so a reader never
/// observes a chunk mid-compression.
#[derive(Debug)]
pub struct Table {
    column_names: Vec<String>,
    column_types: Vec<String>,
    chunk_size: u32,
    chunks: RwLock<Vec<Arc<Chunk>>>,
}

struct MakeDictionarySegment<'a> {
    base: &'a dyn Segment,
}

impl<'a> WithColumnType for MakeDictionarySegment<'a> {
    type Output = Result<Box<dyn Segment>>;

    fn call<T: ColumnDataType>(self) -> Self::Output {
        let dict = DictionarySegment::<T>::from_segment(self.base)?;
        Ok(Box::new(dict) as Box<dyn Segment>)
    }
}

impl Table {
    /// Construct a table with one empty chunk and no columns.
    pub fn new(chunk_size: u32) -> Self {
        Self {
            column_names: Vec::new(),
            column_types: Vec::new(),
            chunk_size,
            chunks: RwLock::new(vec![Arc::new(Chunk::new())]),
        }
    }

    /// Append a schema entry only, without touching any chunk. Used by
    /// operators (chiefly `TableScan`) that build up a result schema before
    /// they have assembled the chunks that go with it.
    pub fn add_column_definition(&mut self, name: &str, type_name: &str) {
        self.column_names.push(name.to_owned());
        self.column_types.push(type_name.to_owned());
    }

    /// Append a schema entry and a fresh empty value segment of that type to
    /// the (unique) active chunk.
    pub fn add_column(&mut self, name: &str, type_name: &str) -> Result<()> {
        ensure!(
            self.chunk_count() == 1,
            InvariantViolatedSnafu {
                detail: "add_column requires exactly one chunk",
            }
        );
        ensure!(
            self.row_count() == 0,
            InvariantViolatedSnafu {
                detail: "add_column requires zero rows",
            }
        );
        ensure!(
            !self.column_names.iter().any(|n| n == name),
            InvariantViolatedSnafu {
                detail: format!("column name '{name}' already exists"),
            }
        );

        let segment = new_value_segment(type_name)?;
        Arc::get_mut(&mut self.chunks.get_mut()[0])
            .ok_or_else(|| {
                InvariantViolatedSnafu {
                    detail: "cannot add column: active chunk is concurrently shared",
                }
                .build()
            })?
            .add_segment(segment)?;
        self.column_names.push(name.to_owned());
        self.column_types.push(type_name.to_owned());
        Ok(())
    }

    /// Append a row. Starts a new chunk first if the active chunk is full.
    pub fn append(&mut self, row: Vec<AllTypeVariant>) -> Result<()> {
        ensure!(
            row.len() == self.column_names.len(),
            ArityMismatchSnafu {
                row_len: row.len(),
                column_count: self.column_names.len(),
            }
        );
        if self.should_open_new_chunk() {
            self.create_new_chunk();
        }
        let active = self
            .chunks
            .get_mut()
            .last_mut()
            .expect("Table::new always leaves at least one chunk in place");
        Arc::get_mut(active)
            .ok_or_else(|| InvariantViolatedSnafu {
                detail: "cannot append: active chunk is concurrently shared",
            }.build())?
            .append(row)
    }

    fn should_open_new_chunk(&self) -> bool {
        self.chunks.read().last().expect("at least one chunk").size() as u32 >= self.chunk_size
    }

    /// Append a fresh chunk with one empty value segment per column type.
    pub fn create_new_chunk(&mut self) {
        let mut chunk = Chunk::new();
        for type_name in &self.column_types {
            let segment = new_value_segment(type_name)
                .expect("column_types only ever holds previously-validated type names");
            chunk
                .add_segment(segment)
                .expect("column_count is bounded well below u16::MAX in practice");
        }
        self.chunks.get_mut().push(Arc::new(chunk));
        debug!(chunk_count = self.chunks.get_mut().len(), "opened new chunk");
    }

    /// Replace the active chunk in place if it is empty, otherwise append.
    /// This is the hook operators use to assemble result tables.
    pub fn emplace_chunk(&mut self, chunk: Chunk) {
        let chunks = self.chunks.get_mut();
        if chunks.last().expect("at least one chunk").size() == 0 {
            *chunks.last_mut().expect("at least one chunk") = Arc::new(chunk);
        } else {
            chunks.push(Arc::new(chunk));
        }
    }

    /// Replace a full chunk with an equivalent chunk of dictionary segments.
    pub fn compress_chunk(&self, chunk_id: ChunkID) -> Result<()> {
        let index = checked_index(chunk_id.get() as usize, self.chunk_count() as usize)?;
        let old_chunk = Arc::clone(&self.chunks.read()[index]);
        ensure!(
            old_chunk.size() as u32 == self.chunk_size,
            InvariantViolatedSnafu {
                detail: "compress_chunk requires a full chunk",
            }
        );

        let mut new_chunk = Chunk::new();
        for (column_id, type_name) in self.column_types.iter().enumerate() {
            let base = old_chunk.get_segment(ColumnID::new(column_id as u16))?;
            let dict_segment = with_data_type(type_name, MakeDictionarySegment { base })??;
            new_chunk.add_segment(dict_segment)?;
        }

        debug!(chunk_id = chunk_id.get(), "compressing chunk");
        self.chunks.write()[index] = Arc::new(new_chunk);
        Ok(())
    }

    pub fn column_count(&self) -> u16 {
        self.column_names.len() as u16
    }

    pub fn row_count(&self) -> u64 {
        self.chunks.read().iter().map(|c| c.size() as u64).sum()
    }

    pub fn chunk_count(&self) -> u32 {
        self.chunks.read().len() as u32
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_name(&self, column_id: ColumnID) -> Result<&str> {
        let index = checked_index(column_id.get() as usize, self.column_names.len())?;
        Ok(&self.column_names[index])
    }

    pub fn column_type(&self, column_id: ColumnID) -> Result<&str> {
        let index = checked_index(column_id.get() as usize, self.column_types.len())?;
        Ok(&self.column_types[index])
    }

    pub fn column_id_by_name(&self, name: &str) -> Result<ColumnID> {
        self.column_names
            .iter()
            .position(|n| n == name)
            .map(|i| ColumnID::new(i as u16))
            .ok_or_else(|| {
                InvariantViolatedSnafu {
                    detail: format!("column '{name}' is not in the schema"),
                }
                .build()
            })
    }

    pub fn get_chunk(&self, chunk_id: ChunkID) -> Result<Arc<Chunk>> {
        let chunks = self.chunks.read();
        let index = checked_index(chunk_id.get() as usize, chunks.len())?;
        Ok(Arc::clone(&chunks[index]))
    }
}
