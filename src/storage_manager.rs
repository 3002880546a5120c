//! A process-wide-ish name -> table catalog (C6).
//!
//! The source's `StorageManager` is a true singleton (`StorageManager::get()`
//! returning a static instance). Per the design note in spec.md §9, this is
//! re-architected as an explicitly owned value a consumer constructs and
//! passes around; [`default_instance`] keeps a thin `once_cell`-backed
//! default around purely for tests and CLI convenience, exactly as that note
//! suggests.

use std::sync::Arc;

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use snafu::ensure;
use tracing::debug;

use crate::error::{InvariantViolatedSnafu, Result};
use crate::table::Table;

/// A row of the debug/print surface named (but not formatted) by spec.md
/// §6: "a storage manager may emit a tabular summary (name, #columns,
/// #rows, #chunks) for operational inspection." Formatting is left to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub name: String,
    pub column_count: u16,
    pub row_count: u64,
    pub chunk_count: u32,
}

#[derive(Debug, Default)]
pub struct StorageManager {
    tables: HashMap<String, Arc<Table>>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, name: impl Into<String>, table: Arc<Table>) -> Result<()> {
        let name = name.into();
        ensure!(
            !self.tables.contains_key(&name),
            InvariantViolatedSnafu {
                detail: format!("table '{name}' already exists"),
            }
        );
        debug!(table = %name, "adding table");
        self.tables.insert(name, table);
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        ensure!(
            self.tables.remove(name).is_some(),
            InvariantViolatedSnafu {
                detail: format!("table '{name}' does not exist"),
            }
        );
        debug!(table = %name, "dropping table");
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Result<Arc<Table>> {
        self.tables.get(name).cloned().ok_or_else(|| {
            InvariantViolatedSnafu {
                detail: format!("table '{name}' does not exist"),
            }
            .build()
        })
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Replace this instance with a fresh, empty one. The hook used by
    /// tests to reset shared state between cases.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// A tabular summary (name, #columns, #rows, #chunks) per table, for
    /// operational inspection. No ordering is guaranteed.
    pub fn summary(&self) -> Vec<TableSummary> {
        self.tables
            .iter()
            .map(|(name, table)| TableSummary {
                name: name.clone(),
                column_count: table.column_count(),
                row_count: table.row_count(),
                chunk_count: table.chunk_count(),
            })
            .collect()
    }
}

/// A process-wide default instance, for tests and CLI convenience. Real
/// callers should prefer constructing and threading their own
/// `StorageManager`.
pub static DEFAULT_STORAGE_MANAGER: Lazy<RwLock<StorageManager>> =
    Lazy::new(|| RwLock::new(StorageManager::new()));
