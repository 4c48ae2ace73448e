//! Forward-only result sets returned by driver calls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::column_name_cache::ColumnNameCache;
use super::exception::{SqlException, SqlResult};
use crate::core::value::SqlValue;

/// Serialisable shape of a query result (column labels plus rows).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<SqlValue>>,
}

/// A forward-only cursor over rows.
///
/// Label lookups are case-insensitive, as with JDBC `findColumn`, and go
/// through a [`ColumnNameCache`] that may be shared with other result sets
/// of the same shape.
#[derive(Debug)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    position: Option<usize>,
    column_name_cache: Arc<ColumnNameCache>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        let column_name_cache = Arc::new(ColumnNameCache::new(columns.len()));
        Self {
            columns,
            rows,
            position: None,
            column_name_cache,
        }
    }

    /// Empty result with the given labels.
    pub fn empty(columns: &[&str]) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect(), Vec::new())
    }

    /// Share a column name cache with other result sets of the same shape.
    pub fn with_column_name_cache(mut self, cache: Arc<ColumnNameCache>) -> Self {
        self.column_name_cache = cache;
        self
    }

    pub fn column_name_cache(&self) -> &Arc<ColumnNameCache> {
        &self.column_name_cache
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_labels(&self) -> &[String] {
        &self.columns
    }

    /// Label of the 1-based column `position`.
    pub fn column_label(&self, position: usize) -> SqlResult<&str> {
        position
            .checked_sub(1)
            .and_then(|i| self.columns.get(i))
            .map(String::as_str)
            .ok_or_else(|| SqlException::new(format!("Invalid column index: {}", position)))
    }

    /// Advance to the next row. Returns false once exhausted.
    pub fn next_row(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            true
        } else {
            self.position = Some(self.rows.len());
            false
        }
    }

    /// 1-based index of the column labelled `label`.
    pub fn find_column(&self, label: &str) -> SqlResult<usize> {
        let columns = &self.columns;
        self.column_name_cache
            .get_index_for_column_name(label, |name| {
                columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(name))
                    .map(|i| i + 1)
                    .ok_or_else(|| {
                        SqlException::new(format!("Column not found: {}", name))
                            .with_sql_state("S0022")
                    })
            })
    }

    pub fn current_row(&self) -> SqlResult<&[SqlValue]> {
        self.position
            .and_then(|p| self.rows.get(p))
            .map(Vec::as_slice)
            .ok_or_else(|| SqlException::new("Result set is not positioned on a row"))
    }

    /// Value of the 1-based column `position` in the current row.
    pub fn get_value(&self, position: usize) -> SqlResult<&SqlValue> {
        let row = self.current_row()?;
        position
            .checked_sub(1)
            .and_then(|i| row.get(i))
            .ok_or_else(|| SqlException::new(format!("Invalid column index: {}", position)))
    }

    pub fn get(&self, label: &str) -> SqlResult<&SqlValue> {
        let position = self.find_column(label)?;
        self.get_value(position)
    }

    pub fn get_string(&self, label: &str) -> SqlResult<Option<String>> {
        Ok(self.get(label)?.as_string())
    }

    pub fn get_i64(&self, label: &str) -> SqlResult<Option<i64>> {
        Ok(self.get(label)?.as_i64())
    }

    /// # Errors
    ///
    /// SQLSTATE `22003` when the value does not fit an `i32`.
    pub fn get_i32(&self, label: &str) -> SqlResult<Option<i32>> {
        self.get_i64(label)?.map(|v| narrow(label, v)).transpose()
    }

    /// Like [`get`](Self::get) but NULL for a label that is not present.
    pub fn get_optional(&self, label: &str) -> SqlResult<SqlValue> {
        match self.find_column(label) {
            Ok(position) => Ok(self.get_value(position)?.clone()),
            Err(_) => Ok(SqlValue::Null),
        }
    }

    /// Like [`get_i32`](Self::get_i32) but NULL for a label that is not present.
    pub fn get_optional_i32(&self, label: &str) -> SqlResult<Option<i32>> {
        self.get_optional(label)?
            .as_i64()
            .map(|v| narrow(label, v))
            .transpose()
    }
}

fn narrow(label: &str, value: i64) -> SqlResult<i32> {
    i32::try_from(value).map_err(|_| {
        SqlException::new(format!("Value {} of column {} is out of integer range", value, label))
            .with_sql_state("22003")
    })
}

impl From<RowSet> for ResultSet {
    fn from(rows: RowSet) -> Self {
        ResultSet::new(rows.columns, rows.rows)
    }
}
