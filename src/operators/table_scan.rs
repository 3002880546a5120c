//! `TableScan` (C8): a type-dispatched, segment-aware predicate scan that
//! produces a result table of reference segments.

use std::sync::Arc;

use tracing::trace;

use super::{Operator, OperatorState};
use crate::attribute_vector::AttributeVector;
use crate::error::{InvariantViolatedSnafu, Result};
use crate::segment::{new_value_segment, DictionarySegment, ReferenceSegment, Segment, ValueSegment};
use crate::table::Table;
use crate::types::{
    with_data_type, AllTypeVariant, ChunkID, ChunkOffset, ColumnDataType, ColumnID, PosList, RowID,
    ValueID, WithColumnType,
};

/// The six comparison predicates this engine supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    Eq,
    Neq,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A predicate scan over one column of an input operator's output, emitting
/// a result table of `ReferenceSegment`s with the same schema as the input.
#[derive(Debug)]
pub struct TableScan {
    state: OperatorState,
    column_id: ColumnID,
    scan_type: ScanType,
    search_value: AllTypeVariant,
}

impl TableScan {
    pub fn new(
        input: Arc<dyn Operator>,
        column_id: ColumnID,
        scan_type: ScanType,
        search_value: AllTypeVariant,
    ) -> Self {
        Self {
            state: OperatorState::new(Some(input), None),
            column_id,
            scan_type,
            search_value,
        }
    }

    pub fn column_id(&self) -> ColumnID {
        self.column_id
    }

    pub fn scan_type(&self) -> ScanType {
        self.scan_type
    }

    pub fn search_value(&self) -> &AllTypeVariant {
        &self.search_value
    }
}

impl Operator for TableScan {
    fn state(&self) -> &OperatorState {
        &self.state
    }

    fn on_execute(&self) -> Result<Table> {
        let input_table = self
            .input_left()
            .expect("TableScan always has a left input")
            .get_output()?;
        let type_name = input_table.column_type(self.column_id)?.to_owned();
        trace!(column_id = self.column_id.get(), scan_type = ?self.scan_type, "scanning column");
        let visitor = ScanVisitor {
            table: &input_table,
            column_id: self.column_id,
            scan_type: self.scan_type,
            search_value: &self.search_value,
        };
        with_data_type(&type_name, visitor)?
    }
}

struct ScanVisitor<'a> {
    table: &'a Arc<Table>,
    column_id: ColumnID,
    scan_type: ScanType,
    search_value: &'a AllTypeVariant,
}

impl<'a> WithColumnType for ScanVisitor<'a> {
    type Output = Result<Table>;

    fn call<T: ColumnDataType>(self) -> Self::Output {
        let search_value = T::from_variant(self.search_value)?;
        scan_typed::<T>(self.table, self.column_id, self.scan_type, &search_value)
    }
}

fn scan_typed<T: ColumnDataType>(
    table: &Arc<Table>,
    column_id: ColumnID,
    scan_type: ScanType,
    search_value: &T,
) -> Result<Table> {
    let mut result = Table::new(table.chunk_size());
    for idx in 0..table.column_count() {
        let column_id = ColumnID::new(idx);
        result.add_column_definition(table.column_name(column_id)?, table.column_type(column_id)?);
    }

    let mut pos_list: PosList = Vec::new();
    let mut last_referenced_table: Option<Arc<Table>> = None;
    let mut flushed_any = false;

    for chunk_index in 0..table.chunk_count() {
        let chunk_id = ChunkID::new(chunk_index);
        let chunk = table.get_chunk(chunk_id)?;
        let segment_to_scan = chunk.get_segment(column_id)?;

        if let Some(value_segment) = segment_to_scan.as_any().downcast_ref::<ValueSegment<T>>() {
            maybe_flush(&mut result, &mut pos_list, &last_referenced_table, table, &mut flushed_any)?;
            last_referenced_table = Some(Arc::clone(table));
            scan_value_segment(chunk_id, value_segment, scan_type, search_value, &mut pos_list);
        } else if let Some(dict_segment) =
            segment_to_scan.as_any().downcast_ref::<DictionarySegment<T>>()
        {
            maybe_flush(&mut result, &mut pos_list, &last_referenced_table, table, &mut flushed_any)?;
            last_referenced_table = Some(Arc::clone(table));
            scan_dictionary_segment(chunk_id, dict_segment, scan_type, search_value, &mut pos_list)?;
        } else if let Some(reference_segment) =
            segment_to_scan.as_any().downcast_ref::<ReferenceSegment>()
        {
            let referenced_table = reference_segment.referenced_table();
            maybe_flush(&mut result, &mut pos_list, &last_referenced_table, referenced_table, &mut flushed_any)?;
            last_referenced_table = Some(Arc::clone(referenced_table));
            scan_reference_segment::<T>(reference_segment, scan_type, search_value, &mut pos_list)?;
        } else {
            return InvariantViolatedSnafu {
                detail: "scanned segment is neither a value, dictionary, nor reference segment",
            }
            .fail();
        }
    }

    if !pos_list.is_empty() {
        let referenced_table = last_referenced_table
            .as_ref()
            .expect("a non-empty position list was only ever built against a referenced table");
        flush_chunk(&mut result, &mut pos_list, referenced_table)?;
    } else if !flushed_any {
        // Nothing was ever flushed: this is a genuine no-match scan, not just
        // the tail end of a coalescing run. Mirrors the original's
        // `last_chunk.column_count() == 0` guard.
        emit_empty_chunk(&mut result)?;
    }

    Ok(result)
}

/// Flush the pending chunk when the table the current run of matches would
/// reference differs from the one the last flushed chunk referenced. A
/// `ReferenceSegment` is bound to exactly one table, so a change in
/// referenced table forces a new result chunk.
fn maybe_flush(
    result: &mut Table,
    pos_list: &mut PosList,
    last_referenced_table: &Option<Arc<Table>>,
    incoming_referenced_table: &Arc<Table>,
    flushed_any: &mut bool,
) -> Result<()> {
    if let Some(last) = last_referenced_table {
        if !Arc::ptr_eq(last, incoming_referenced_table) && !pos_list.is_empty() {
            flush_chunk(result, pos_list, last)?;
            *flushed_any = true;
        }
    }
    Ok(())
}

fn flush_chunk(result: &mut Table, pos_list: &mut PosList, referenced_table: &Arc<Table>) -> Result<()> {
    let shared_pos_list = Arc::new(std::mem::take(pos_list));
    let mut chunk = crate::chunk::Chunk::new();
    for idx in 0..referenced_table.column_count() {
        let segment = ReferenceSegment::new(
            Arc::clone(referenced_table),
            ColumnID::new(idx),
            Arc::clone(&shared_pos_list),
        );
        chunk.add_segment(Box::new(segment))?;
    }
    result.emplace_chunk(chunk);
    Ok(())
}

fn emit_empty_chunk(result: &mut Table) -> Result<()> {
    let mut chunk = crate::chunk::Chunk::new();
    for idx in 0..result.column_count() {
        let type_name = result.column_type(ColumnID::new(idx))?;
        chunk.add_segment(new_value_segment(type_name)?)?;
    }
    result.emplace_chunk(chunk);
    Ok(())
}

fn scan_value_segment<T: ColumnDataType>(
    chunk_id: ChunkID,
    segment: &ValueSegment<T>,
    scan_type: ScanType,
    search_value: &T,
    pos_list: &mut PosList,
) {
    for (offset, value) in segment.values().iter().enumerate() {
        if matches_search_value(value, scan_type, search_value) {
            pos_list.push(RowID::new(chunk_id, ChunkOffset::new(offset as u32)));
        }
    }
}

fn scan_dictionary_segment<T: ColumnDataType>(
    chunk_id: ChunkID,
    segment: &DictionarySegment<T>,
    scan_type: ScanType,
    search_value: &T,
    pos_list: &mut PosList,
) -> Result<()> {
    let lower_bound = segment.lower_bound_typed(search_value);
    let upper_bound = segment.upper_bound_typed(search_value);
    let unique_values_count = segment.unique_values_count() as u32;
    let attribute_vector = segment.attribute_vector();

    for offset in 0..segment.size() {
        let value_id = attribute_vector.get(offset)?;
        if matches_value_id(value_id, scan_type, lower_bound, upper_bound, unique_values_count) {
            pos_list.push(RowID::new(chunk_id, ChunkOffset::new(offset as u32)));
        }
    }
    Ok(())
}

fn scan_reference_segment<T: ColumnDataType>(
    segment: &ReferenceSegment,
    scan_type: ScanType,
    search_value: &T,
    pos_list: &mut PosList,
) -> Result<()> {
    let referenced_table = segment.referenced_table();
    for &row in segment.pos_list().iter() {
        let chunk = referenced_table.get_chunk(row.chunk_id)?;
        let referenced_segment = chunk.get_segment(segment.referenced_column_id())?;
        let offset = row.chunk_offset.get() as usize;

        let matched = if let Some(value_segment) =
            referenced_segment.as_any().downcast_ref::<ValueSegment<T>>()
        {
            let value = T::from_variant(&value_segment.get(offset)?)?;
            matches_search_value(&value, scan_type, search_value)
        } else if let Some(dict_segment) =
            referenced_segment.as_any().downcast_ref::<DictionarySegment<T>>()
        {
            matches_search_value(&dict_segment.get_typed(offset)?, scan_type, search_value)
        } else {
            return InvariantViolatedSnafu {
                detail: "reference segment did not point to a value or dictionary segment",
            }
            .fail();
        };

        if matched {
            pos_list.push(row);
        }
    }
    Ok(())
}

fn matches_search_value<T: ColumnDataType>(value: &T, scan_type: ScanType, search_value: &T) -> bool {
    use std::cmp::Ordering::*;
    match (scan_type, value.cmp_order(search_value)) {
        (ScanType::Eq, ord) => ord == Equal,
        (ScanType::Neq, ord) => ord != Equal,
        (ScanType::Gt, ord) => ord == Greater,
        (ScanType::Ge, ord) => ord != Less,
        (ScanType::Lt, ord) => ord == Less,
        (ScanType::Le, ord) => ord != Greater,
    }
}

fn matches_value_id(
    value_id: ValueID,
    scan_type: ScanType,
    lower_bound: ValueID,
    upper_bound: ValueID,
    unique_values_count: u32,
) -> bool {
    match scan_type {
        ScanType::Eq => value_id >= lower_bound && value_id < upper_bound,
        ScanType::Neq => value_id < lower_bound || value_id >= upper_bound,
        ScanType::Gt => value_id >= upper_bound && value_id.get() < unique_values_count,
        ScanType::Ge => value_id >= lower_bound && value_id.get() < unique_values_count,
        ScanType::Lt => value_id < lower_bound,
        ScanType::Le => value_id < upper_bound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkOffset as CO, RowID as RID};
    use parking_lot::Mutex;

    /// A fixed-output operator with no inputs, standing in for whatever
    /// upstream operator would normally have produced the table under test.
    #[derive(Debug)]
    struct ConstOp {
        state: OperatorState,
        table: Mutex<Option<Table>>,
    }

    impl ConstOp {
        fn new(table: Table) -> Self {
            Self {
                state: OperatorState::new(None, None),
                table: Mutex::new(Some(table)),
            }
        }
    }

    impl Operator for ConstOp {
        fn state(&self) -> &OperatorState {
            &self.state
        }
        fn on_execute(&self) -> Result<Table> {
            Ok(self.table.lock().take().expect("on_execute runs at most once"))
        }
    }

    fn scan_table(
        table: Table,
        column_id: ColumnID,
        scan_type: ScanType,
        search_value: AllTypeVariant,
    ) -> Arc<Table> {
        let input = Arc::new(ConstOp::new(table)) as Arc<dyn Operator>;
        input.execute().unwrap();
        let scan = TableScan::new(input, column_id, scan_type, search_value);
        scan.execute().unwrap();
        scan.get_output().unwrap()
    }

    fn int_column_table(chunk_size: u32, values: &[i32]) -> Table {
        let mut table = Table::new(chunk_size);
        table.add_column("a", "int").unwrap();
        for v in values {
            table.append(vec![AllTypeVariant::Int(*v)]).unwrap();
        }
        table
    }

    fn collect_ints(table: &Table) -> Vec<i32> {
        let mut out = Vec::new();
        for chunk_index in 0..table.chunk_count() {
            let chunk = table.get_chunk(ChunkID::new(chunk_index)).unwrap();
            let segment = chunk.get_segment(ColumnID::new(0)).unwrap();
            for i in 0..segment.size() {
                match segment.get(i).unwrap() {
                    AllTypeVariant::Int(v) => out.push(v),
                    other => panic!("unexpected variant: {other:?}"),
                }
            }
        }
        out
    }

    #[test]
    fn scan_over_value_segments_ge() {
        let table = int_column_table(2, &[1, 2, 3, 4, 5]);
        let result = scan_table(table, ColumnID::new(0), ScanType::Ge, AllTypeVariant::Int(3));
        assert_eq!(collect_ints(&result), vec![3, 4, 5]);
    }

    #[test]
    fn scan_over_dictionary_segments_ge() {
        let table = int_column_table(5, &[1, 2, 3, 4, 5]);
        table.compress_chunk(ChunkID::new(0)).unwrap();
        let result = scan_table(table, ColumnID::new(0), ScanType::Ge, AllTypeVariant::Int(3));
        assert_eq!(collect_ints(&result), vec![3, 4, 5]);
    }

    #[test]
    fn eq_with_missing_value_yields_one_empty_chunk() {
        let table = int_column_table(10, &[1, 2, 4, 5]);
        let result = scan_table(table, ColumnID::new(0), ScanType::Eq, AllTypeVariant::Int(3));
        assert_eq!(result.chunk_count(), 1);
        assert_eq!(result.row_count(), 0);
        let chunk = result.get_chunk(ChunkID::new(0)).unwrap();
        assert_eq!(chunk.column_count(), 1);
    }

    #[test]
    fn reference_coalescing_splits_by_referenced_table() {
        let mut table_a = Table::new(10);
        table_a.add_column("x", "int").unwrap();
        for v in [1, 2, 3] {
            table_a.append(vec![AllTypeVariant::Int(v)]).unwrap();
        }
        let table_a = Arc::new(table_a);

        let mut table_b = Table::new(10);
        table_b.add_column("x", "int").unwrap();
        for v in [10, 20, 30] {
            table_b.append(vec![AllTypeVariant::Int(v)]).unwrap();
        }
        let table_b = Arc::new(table_b);

        let mut middle = Table::new(10);
        middle.add_column_definition("x", "int");

        let mut chunk0 = crate::chunk::Chunk::new();
        chunk0
            .add_segment(Box::new(ReferenceSegment::new(
                Arc::clone(&table_a),
                ColumnID::new(0),
                Arc::new(vec![
                    RID::new(ChunkID::new(0), CO::new(0)),
                    RID::new(ChunkID::new(0), CO::new(2)),
                ]),
            )))
            .unwrap();
        middle.emplace_chunk(chunk0);

        let mut chunk1 = crate::chunk::Chunk::new();
        chunk1
            .add_segment(Box::new(ReferenceSegment::new(
                Arc::clone(&table_b),
                ColumnID::new(0),
                Arc::new(vec![RID::new(ChunkID::new(0), CO::new(1))]),
            )))
            .unwrap();
        middle.emplace_chunk(chunk1);

        let result = scan_table(middle, ColumnID::new(0), ScanType::Gt, AllTypeVariant::Int(0));

        assert_eq!(result.chunk_count(), 2);

        let first = result.get_chunk(ChunkID::new(0)).unwrap();
        let first_segment = first
            .get_segment(ColumnID::new(0))
            .unwrap()
            .as_any()
            .downcast_ref::<ReferenceSegment>()
            .unwrap();
        assert!(Arc::ptr_eq(first_segment.referenced_table(), &table_a));
        assert_eq!(
            first_segment.pos_list().as_slice(),
            &[
                RID::new(ChunkID::new(0), CO::new(0)),
                RID::new(ChunkID::new(0), CO::new(2)),
            ]
        );

        let second = result.get_chunk(ChunkID::new(1)).unwrap();
        let second_segment = second
            .get_segment(ColumnID::new(0))
            .unwrap()
            .as_any()
            .downcast_ref::<ReferenceSegment>()
            .unwrap();
        assert!(Arc::ptr_eq(second_segment.referenced_table(), &table_b));
        assert_eq!(
            second_segment.pos_list().as_slice(),
            &[RID::new(ChunkID::new(0), CO::new(1))]
        );
    }

    /// Regression test: a mid-loop flush followed by a tail run with zero
    /// matches must not grow a spurious extra chunk of empty value segments.
    /// The empty-result synthesis is only for the case where *nothing* was
    /// ever flushed.
    #[test]
    fn empty_tail_after_flush_does_not_append_extra_chunk() {
        let mut table_a = Table::new(10);
        table_a.add_column("x", "int").unwrap();
        for v in [1, 2, 3] {
            table_a.append(vec![AllTypeVariant::Int(v)]).unwrap();
        }
        let table_a = Arc::new(table_a);

        let mut table_b = Table::new(10);
        table_b.add_column("x", "int").unwrap();
        for v in [10, 20, 30] {
            table_b.append(vec![AllTypeVariant::Int(v)]).unwrap();
        }
        let table_b = Arc::new(table_b);

        let mut middle = Table::new(10);
        middle.add_column_definition("x", "int");

        let mut chunk0 = crate::chunk::Chunk::new();
        chunk0
            .add_segment(Box::new(ReferenceSegment::new(
                Arc::clone(&table_a),
                ColumnID::new(0),
                Arc::new(vec![
                    RID::new(ChunkID::new(0), CO::new(0)),
                    RID::new(ChunkID::new(0), CO::new(1)),
                    RID::new(ChunkID::new(0), CO::new(2)),
                ]),
            )))
            .unwrap();
        middle.emplace_chunk(chunk0);

        let mut chunk1 = crate::chunk::Chunk::new();
        chunk1
            .add_segment(Box::new(ReferenceSegment::new(
                Arc::clone(&table_b),
                ColumnID::new(0),
                Arc::new(vec![RID::new(ChunkID::new(0), CO::new(0))]),
            )))
            .unwrap();
        middle.emplace_chunk(chunk1);

        // Every `table_a` row is < 5, and `table_b`'s referenced row (10) is
        // not: the first run flushes, the second run matches nothing.
        let result = scan_table(middle, ColumnID::new(0), ScanType::Lt, AllTypeVariant::Int(5));

        assert_eq!(result.chunk_count(), 1);
        let only_chunk = result.get_chunk(ChunkID::new(0)).unwrap();
        let segment = only_chunk
            .get_segment(ColumnID::new(0))
            .unwrap()
            .as_any()
            .downcast_ref::<ReferenceSegment>()
            .unwrap();
        assert!(Arc::ptr_eq(segment.referenced_table(), &table_a));
        assert_eq!(
            segment.pos_list().as_slice(),
            &[
                RID::new(ChunkID::new(0), CO::new(0)),
                RID::new(ChunkID::new(0), CO::new(1)),
                RID::new(ChunkID::new(0), CO::new(2)),
            ]
        );
    }
}
