//! Shape of the column set an executed statement returned.

use std::sync::Arc;

use crate::jdbc::{ColumnNameCache, ResultSet, SqlException};

/// Column labels and types of an executed statement. Positions are 1-based.
pub trait JdbcValuesMetadata {
    fn column_count(&self) -> usize;

    /// Position of the column labelled `alias`, ignoring ASCII case.
    fn resolve_column_position(&self, alias: &str) -> Option<usize>;

    fn resolve_column_name(&self, position: usize) -> Option<&str>;

    /// JDBC type code of the column, when the driver reported one.
    fn type_code(&self, position: usize) -> Option<i32>;
}

/// Metadata held in memory. Alias lookups go through a shared
/// [`ColumnNameCache`].
#[derive(Debug, Clone)]
pub struct SimpleJdbcValuesMetadata {
    labels: Vec<String>,
    type_codes: Vec<Option<i32>>,
    cache: Arc<ColumnNameCache>,
}

impl SimpleJdbcValuesMetadata {
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let type_codes = vec![None; labels.len()];
        let cache = Arc::new(ColumnNameCache::new(labels.len()));
        Self {
            labels,
            type_codes,
            cache,
        }
    }

    /// Labels of `result_set`, sharing its column name cache.
    pub fn from_result_set(result_set: &ResultSet) -> Self {
        Self {
            labels: result_set.column_labels().to_vec(),
            type_codes: vec![None; result_set.column_count()],
            cache: Arc::clone(result_set.column_name_cache()),
        }
    }

    pub fn with_type_code(mut self, position: usize, type_code: i32) -> Self {
        if let Some(slot) = position.checked_sub(1).and_then(|i| self.type_codes.get_mut(i)) {
            *slot = Some(type_code);
        }
        self
    }
}

impl JdbcValuesMetadata for SimpleJdbcValuesMetadata {
    fn column_count(&self) -> usize {
        self.labels.len()
    }

    fn resolve_column_position(&self, alias: &str) -> Option<usize> {
        let labels = &self.labels;
        self.cache
            .get_index_for_column_name(alias, |name| {
                labels
                    .iter()
                    .position(|l| l.eq_ignore_ascii_case(name))
                    .map(|i| i + 1)
                    .ok_or_else(|| SqlException::new(format!("Column not found: {}", name)))
            })
            .ok()
    }

    fn resolve_column_name(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
    }

    fn type_code(&self, position: usize) -> Option<i32> {
        position
            .checked_sub(1)
            .and_then(|i| self.type_codes.get(i).copied().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlValue;

    #[test]
    fn test_positions_are_one_based_and_case_insensitive() {
        let metadata = SimpleJdbcValuesMetadata::new(["ID", "name"]).with_type_code(1, -5);
        assert_eq!(metadata.column_count(), 2);
        assert_eq!(metadata.resolve_column_position("id"), Some(1));
        assert_eq!(metadata.resolve_column_position("NAME"), Some(2));
        assert_eq!(metadata.resolve_column_position("email"), None);
        assert_eq!(metadata.resolve_column_name(2), Some("name"));
        assert_eq!(metadata.resolve_column_name(0), None);
        assert_eq!(metadata.type_code(1), Some(-5));
        assert_eq!(metadata.type_code(2), None);
    }

    #[test]
    fn test_from_result_set_shares_cache() {
        let result_set = ResultSet::new(
            vec!["id".into(), "name".into()],
            vec![vec![SqlValue::Int(1), SqlValue::Text("a".into())]],
        );
        let metadata = SimpleJdbcValuesMetadata::from_result_set(&result_set);
        assert_eq!(metadata.resolve_column_position("NAME"), Some(2));
        assert_eq!(result_set.column_name_cache().len(), 1);
    }
}
