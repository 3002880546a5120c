//! The operator DAG (C7): a uniform one-shot execution contract shared by
//! every node. [`TableScan`] is the only concrete operator this crate ships;
//! the trait itself is the seam a query layer built on top would extend.

mod table_scan;

pub use table_scan::{ScanType, TableScan};

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use snafu::{ensure, OptionExt};

use crate::error::{AlreadyExecutedSnafu, NoOutputSnafu, NotReadySnafu, Result};
use crate::table::Table;

/// The state every operator carries, regardless of what it computes:
/// up to two input operators, held by strong reference so their output
/// tables stay alive for as long as this operator might be asked to read
/// them, and a write-once cell for this operator's own output.
#[derive(Debug)]
pub struct OperatorState {
    input_left: Option<Arc<dyn Operator>>,
    input_right: Option<Arc<dyn Operator>>,
    output: OnceCell<Arc<Table>>,
}

impl OperatorState {
    pub fn new(
        input_left: Option<Arc<dyn Operator>>,
        input_right: Option<Arc<dyn Operator>>,
    ) -> Self {
        Self {
            input_left,
            input_right,
            output: OnceCell::new(),
        }
    }
}

/// Common contract for every node in the operator DAG.
///
/// A consumer constructs operators bottom-up, then for each one (in
/// dependency order) calls [`execute`](Operator::execute) followed by
/// [`get_output`](Operator::get_output). `execute` may run at most once per
/// operator and requires every input operator to already have a materialized
/// output.
pub trait Operator: fmt::Debug + Send + Sync {
    /// Access to the shared bookkeeping (inputs, output cell) an
    /// implementor embeds. Kept separate from the trait's own state so
    /// `execute`/`get_output` can live as default methods instead of being
    /// reimplemented by every operator.
    fn state(&self) -> &OperatorState;

    /// Produce this operator's output table. Called exactly once, by
    /// `execute`, after every input's output has already been materialized.
    fn on_execute(&self) -> Result<Table>;

    fn input_left(&self) -> Option<&Arc<dyn Operator>> {
        self.state().input_left.as_ref()
    }

    fn input_right(&self) -> Option<&Arc<dyn Operator>> {
        self.state().input_right.as_ref()
    }

    /// Materialize this operator's output. Fails with `NotReady` if an
    /// input operator has not yet been executed, or `AlreadyExecuted` if
    /// called a second time.
    fn execute(&self) -> Result<()> {
        ensure!(self.state().output.get().is_none(), AlreadyExecutedSnafu);
        for input in [self.input_left(), self.input_right()].into_iter().flatten() {
            ensure!(input.state().output.get().is_some(), NotReadySnafu);
        }
        let output = self.on_execute()?;
        self.state()
            .output
            .set(Arc::new(output))
            .map_err(|_| AlreadyExecutedSnafu.build())?;
        Ok(())
    }

    /// This operator's output table. Fails with `NoOutput` before `execute`
    /// has run.
    fn get_output(&self) -> Result<Arc<Table>> {
        self.state().output.get().cloned().context(NoOutputSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AllTypeVariant;

    #[derive(Debug)]
    struct ConstantTable {
        state: OperatorState,
        chunk_size: u32,
    }

    impl ConstantTable {
        fn new(chunk_size: u32) -> Self {
            Self {
                state: OperatorState::new(None, None),
                chunk_size,
            }
        }
    }

    impl Operator for ConstantTable {
        fn state(&self) -> &OperatorState {
            &self.state
        }

        fn on_execute(&self) -> Result<Table> {
            let mut table = Table::new(self.chunk_size);
            table.add_column("a", "int")?;
            table.append(vec![AllTypeVariant::Int(1)])?;
            Ok(table)
        }
    }

    #[derive(Debug)]
    struct PassThrough {
        state: OperatorState,
    }

    impl PassThrough {
        fn new(input: Arc<dyn Operator>) -> Self {
            Self {
                state: OperatorState::new(Some(input), None),
            }
        }
    }

    impl Operator for PassThrough {
        fn state(&self) -> &OperatorState {
            &self.state
        }

        fn on_execute(&self) -> Result<Table> {
            let input = self.input_left().expect("always has a left input");
            let table = input.get_output()?;
            Ok(Table::new(table.chunk_size()))
        }
    }

    #[test]
    fn get_output_before_execute_fails() {
        let op = ConstantTable::new(10);
        assert!(op.get_output().is_err());
    }

    #[test]
    fn execute_then_get_output_succeeds() {
        let op = ConstantTable::new(10);
        op.execute().unwrap();
        assert_eq!(op.get_output().unwrap().row_count(), 1);
    }

    #[test]
    fn second_execute_fails_already_executed() {
        let op = ConstantTable::new(10);
        op.execute().unwrap();
        assert!(op.execute().is_err());
    }

    #[test]
    fn execute_before_input_ready_fails_not_ready() {
        let input = Arc::new(ConstantTable::new(10));
        let downstream = PassThrough::new(input);
        assert!(downstream.execute().is_err());
    }

    #[test]
    fn execute_after_input_ready_succeeds() {
        let input = Arc::new(ConstantTable::new(10));
        input.execute().unwrap();
        let downstream = PassThrough::new(input);
        downstream.execute().unwrap();
        assert!(downstream.get_output().is_ok());
    }
}
