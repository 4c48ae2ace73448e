//! Turns driver rows into assembled domain values.

use tracing::debug;

use super::domain::{DomainResult, DomainValue, SqlSelection};
use crate::core::value::SqlValue;
use crate::error::{OrmError, Result};
use crate::jdbc::ResultSet;

/// The resolved results of one statement plus the selections they read.
#[derive(Debug, Clone, PartialEq)]
pub struct RowReader {
    results: Vec<DomainResult>,
    selections: Vec<SqlSelection>,
}

impl RowReader {
    pub fn new(results: Vec<DomainResult>, selections: Vec<SqlSelection>) -> Self {
        Self {
            results,
            selections,
        }
    }

    pub fn results(&self) -> &[DomainResult] {
        &self.results
    }

    pub fn selections(&self) -> &[SqlSelection] {
        &self.selections
    }

    /// Assemble every result from one JDBC row.
    ///
    /// # Errors
    ///
    /// `IllegalState` when the row is shorter than a selected position.
    pub fn read_row(&self, row: &[SqlValue]) -> Result<Vec<DomainValue>> {
        let values = self
            .selections
            .iter()
            .map(|selection| {
                selection
                    .jdbc_position
                    .checked_sub(1)
                    .and_then(|i| row.get(i))
                    .cloned()
                    .ok_or_else(|| {
                        OrmError::IllegalState(format!(
                            "Row has {} columns, selection reads position {}",
                            row.len(),
                            selection.jdbc_position
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.results.iter().map(|r| r.assemble(&values)).collect())
    }

    /// Read all remaining rows of `result_set`.
    pub fn read_all(&self, result_set: &mut ResultSet) -> Result<Vec<Vec<DomainValue>>> {
        let mut rows = Vec::new();
        while result_set.next_row() {
            rows.push(self.read_row(result_set.current_row()?)?);
        }
        debug!(rows = rows.len(), results = self.results.len(), "Read result rows");
        Ok(rows)
    }
}
