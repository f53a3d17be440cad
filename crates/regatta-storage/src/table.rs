use std::sync::Arc;

use regatta_common::error::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::Column;

/// An ordered sequence of equal-length columns.
///
/// Columns are shared (`Arc`); a table is immutable once built and its
/// backing storage is released when the last reference drops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Arc<Column>>,
    row_count: usize,
}

impl Table {
    /// Groups existing columns into a table. All columns must have the same
    /// length.
    pub fn try_new(columns: Vec<Column>) -> Result<Self> {
        Self::from_arc_columns(columns.into_iter().map(Arc::new).collect())
    }

    pub fn from_arc_columns(columns: Vec<Arc<Column>>) -> Result<Self> {
        let row_count = columns.first().map(|c| c.len()).unwrap_or(0);
        for (idx, col) in columns.iter().enumerate() {
            if col.len() != row_count {
                return Err(Error::schema_mismatch(format!(
                    "column {} has {} rows, expected {}",
                    idx,
                    col.len(),
                    row_count
                )));
            }
        }
        Ok(Self { columns, row_count })
    }

    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            row_count: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn num_rows(&self) -> usize {
        self.row_count
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx).map(|arc| arc.as_ref())
    }

    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    pub fn get_column_arc(&self, idx: usize) -> Option<Arc<Column>> {
        self.columns.get(idx).map(Arc::clone)
    }

    pub fn into_columns(self) -> Vec<Arc<Column>> {
        self.columns
    }
}
