//! Cache of column-label to column-index resolution for result sets.
//!
//! A result-set wrapper may be shared between threads reading different
//! rows, so the cache is a concurrent map. Lookups are get-then-insert
//! rather than an atomic upsert: on a race both threads resolve the same
//! index, which is stable, so the duplicate work is harmless.

use dashmap::DashMap;

use super::exception::SqlResult;

/// Load factor used to size the backing map.
const LOAD_FACTOR: f32 = 0.75;

/// Concurrent column name to 1-based column index cache.
#[derive(Debug, Default)]
pub struct ColumnNameCache {
    column_name_to_index_cache: DashMap<String, usize>,
}

impl ColumnNameCache {
    /// Create a cache sized for `column_count` columns.
    pub fn new(column_count: usize) -> Self {
        // extra headroom so the map never resizes while being filled
        let capacity = column_count + (column_count as f32 * LOAD_FACTOR) as usize + 1;
        Self {
            column_name_to_index_cache: DashMap::with_capacity(capacity),
        }
    }

    /// Resolve `column_name`, consulting `resolve` only on a cache miss.
    pub fn get_index_for_column_name<F>(&self, column_name: &str, resolve: F) -> SqlResult<usize>
    where
        F: FnOnce(&str) -> SqlResult<usize>,
    {
        if let Some(index) = self.column_name_to_index_cache.get(column_name) {
            return Ok(*index);
        }
        let index = resolve(column_name)?;
        self.column_name_to_index_cache
            .insert(column_name.to_string(), index);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.column_name_to_index_cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column_name_to_index_cache.is_empty()
    }
}
