//! State threaded through every builder while a result graph resolves.

use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
use tracing::debug;

use super::complete::CompleteFetchBuilder;
use super::domain::SqlSelection;
use super::jdbc_values::JdbcValuesMetadata;
use super::navigable_path::NavigablePath;
use crate::error::{OrmError, Result};

/// Explicit fetch builders keyed by dotted attribute path relative to the
/// node that pushed them.
#[derive(Debug, Clone, Default)]
pub struct ExplicitFetchScope {
    entries: IndexMap<String, CompleteFetchBuilder>,
}

impl ExplicitFetchScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, relative_path: impl Into<String>, builder: CompleteFetchBuilder) -> Self {
        self.entries.insert(relative_path.into(), builder);
        self
    }

    pub fn get(&self, relative_path: &str) -> Option<&CompleteFetchBuilder> {
        self.entries.get(relative_path)
    }

    /// Entries below `prefix`, with `prefix.` stripped.
    pub fn below(&self, prefix: &str) -> ExplicitFetchScope {
        let entries = self
            .entries
            .iter()
            .filter_map(|(path, builder)| {
                path.strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .map(|rest| (rest.to_string(), builder.clone()))
            })
            .collect();
        ExplicitFetchScope { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, CompleteFetchBuilder)> for ExplicitFetchScope {
    fn from_iter<T: IntoIterator<Item = (K, CompleteFetchBuilder)>>(iter: T) -> Self {
        ExplicitFetchScope {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Resolution context for one statement's column set.
///
/// Selections are registered once per JDBC position no matter how many
/// builders read the column. Builders without an explicit alias consume
/// positions in order from a shared counter when positional selections are
/// allowed.
pub struct DomainResultCreationState<'m> {
    metadata: &'m dyn JdbcValuesMetadata,
    positional_selections_allowed: bool,
    next_position: usize,
    selections: IndexMap<usize, SqlSelection>,
    fetch_scopes: Vec<ExplicitFetchScope>,
}

impl<'m> DomainResultCreationState<'m> {
    pub fn new(metadata: &'m dyn JdbcValuesMetadata, positional_selections_allowed: bool) -> Self {
        Self {
            metadata,
            positional_selections_allowed,
            next_position: 1,
            selections: IndexMap::new(),
            fetch_scopes: Vec::new(),
        }
    }

    pub fn metadata(&self) -> &'m dyn JdbcValuesMetadata {
        self.metadata
    }

    pub fn are_positional_selections_allowed(&self) -> bool {
        self.positional_selections_allowed
    }

    /// The 1-based JDBC position the next positional builder consumes.
    pub fn next_position(&self) -> usize {
        self.next_position
    }

    /// Resolve a column by alias, or positionally when no alias was given.
    ///
    /// # Errors
    ///
    /// `MissingSqlSelection` when the alias is absent from the result set or
    /// the positional counter ran past the last column, and
    /// `PositionalSelectionsNotAllowed` when `alias` is `None` and
    /// positional resolution is disabled.
    pub fn resolve_sql_selection(
        &mut self,
        alias: Option<&str>,
        path: &NavigablePath,
    ) -> Result<SqlSelection> {
        let jdbc_position = match alias {
            Some(alias) => self.metadata.resolve_column_position(alias).ok_or_else(|| {
                OrmError::MissingSqlSelection {
                    alias: alias.to_string(),
                    path: path.full_path().to_string(),
                }
            })?,
            None => {
                if !self.positional_selections_allowed {
                    return Err(OrmError::PositionalSelectionsNotAllowed(format!(
                        "Positional SQL selection resolution not allowed ({})",
                        path
                    )));
                }
                let position = self.next_position;
                if position > self.metadata.column_count() {
                    return Err(OrmError::MissingSqlSelection {
                        alias: format!("#{}", position),
                        path: path.full_path().to_string(),
                    });
                }
                self.next_position += 1;
                position
            }
        };
        Ok(self.register_selection(jdbc_position))
    }

    /// The selection reading `jdbc_position`, registering it on first use.
    pub fn register_selection(&mut self, jdbc_position: usize) -> SqlSelection {
        let next_index = self.selections.len();
        *self
            .selections
            .entry(jdbc_position)
            .or_insert_with(|| SqlSelection {
                jdbc_position,
                values_array_position: next_index,
            })
    }

    /// Registered selections in values-buffer order.
    pub fn selections(&self) -> Vec<SqlSelection> {
        self.selections.values().copied().collect()
    }

    /// Make `scope` the innermost explicit fetch scope until the guard drops.
    pub fn push_explicit_fetch_scope(&mut self, scope: ExplicitFetchScope) -> FetchScopeGuard<'_, 'm> {
        debug!(depth = self.fetch_scopes.len() + 1, "Pushing explicit fetch scope");
        self.fetch_scopes.push(scope);
        FetchScopeGuard { state: self }
    }

    pub fn current_fetch_scope(&self) -> Option<&ExplicitFetchScope> {
        self.fetch_scopes.last()
    }

    /// Explicit builder for `relative_path` in the innermost scope.
    pub fn explicit_fetch_builder(&self, relative_path: &str) -> Option<&CompleteFetchBuilder> {
        self.current_fetch_scope()?.get(relative_path)
    }

    pub fn fetch_scope_depth(&self) -> usize {
        self.fetch_scopes.len()
    }
}

impl std::fmt::Debug for DomainResultCreationState<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainResultCreationState")
            .field("positional_selections_allowed", &self.positional_selections_allowed)
            .field("next_position", &self.next_position)
            .field("selections", &self.selections.len())
            .field("fetch_scopes", &self.fetch_scopes.len())
            .finish()
    }
}

/// Pops its fetch scope when dropped, on every exit path.
pub struct FetchScopeGuard<'s, 'm> {
    state: &'s mut DomainResultCreationState<'m>,
}

impl<'m> Deref for FetchScopeGuard<'_, 'm> {
    type Target = DomainResultCreationState<'m>;

    fn deref(&self) -> &Self::Target {
        self.state
    }
}

impl<'m> DerefMut for FetchScopeGuard<'_, 'm> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.state
    }
}

impl Drop for FetchScopeGuard<'_, '_> {
    fn drop(&mut self) {
        self.state.fetch_scopes.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::complete::CompleteFetchBuilderBasicPart;
    use crate::results::jdbc_values::SimpleJdbcValuesMetadata;
    use crate::results::mapping::BasicAttributeMapping;
    use std::sync::Arc;

    fn city_builder(alias: &str) -> CompleteFetchBuilder {
        CompleteFetchBuilder::BasicPart(CompleteFetchBuilderBasicPart::new(
            NavigablePath::new("Customer").append("address").append("city"),
            Arc::new(BasicAttributeMapping::new("city", "city")),
            Some(alias.to_string()),
        ))
    }

    #[test]
    fn test_alias_resolution_and_deduplication() {
        let metadata = SimpleJdbcValuesMetadata::new(["id", "name"]);
        let mut state = DomainResultCreationState::new(&metadata, false);
        let path = NavigablePath::new("Customer");
        let name = state.resolve_sql_selection(Some("NAME"), &path).unwrap();
        let again = state.resolve_sql_selection(Some("name"), &path).unwrap();
        let id = state.resolve_sql_selection(Some("id"), &path).unwrap();
        assert_eq!(name, again);
        assert_eq!(name.jdbc_position, 2);
        assert_eq!(name.values_array_position, 0);
        assert_eq!(id.values_array_position, 1);
        assert_eq!(state.selections().len(), 2);
        assert_eq!(state.next_position(), 1);
    }

    #[test]
    fn test_missing_alias() {
        let metadata = SimpleJdbcValuesMetadata::new(["id"]);
        let mut state = DomainResultCreationState::new(&metadata, true);
        let err = state
            .resolve_sql_selection(Some("email"), &NavigablePath::new("Customer").append("email"))
            .unwrap_err();
        assert!(matches!(
            err,
            OrmError::MissingSqlSelection { ref alias, ref path } if alias == "email" && path == "Customer.email"
        ));
    }

    #[test]
    fn test_positional_counter_runs_out() {
        let metadata = SimpleJdbcValuesMetadata::new(["a"]);
        let mut state = DomainResultCreationState::new(&metadata, true);
        let path = NavigablePath::new("x");
        assert_eq!(state.resolve_sql_selection(None, &path).unwrap().jdbc_position, 1);
        assert!(matches!(
            state.resolve_sql_selection(None, &path),
            Err(OrmError::MissingSqlSelection { .. })
        ));
        assert_eq!(state.next_position(), 2);
    }

    #[test]
    fn test_fetch_scope_guard_pops_on_drop() {
        let metadata = SimpleJdbcValuesMetadata::new(["city"]);
        let mut state = DomainResultCreationState::new(&metadata, false);
        {
            let scope = ExplicitFetchScope::new().with("address.city", city_builder("city"));
            let mut guard = state.push_explicit_fetch_scope(scope);
            assert_eq!(guard.fetch_scope_depth(), 1);
            let inner = guard
                .current_fetch_scope()
                .map(|s| s.below("address"))
                .unwrap_or_default();
            let nested = guard.push_explicit_fetch_scope(inner);
            assert!(nested.explicit_fetch_builder("city").is_some());
            assert_eq!(nested.fetch_scope_depth(), 2);
        }
        assert_eq!(state.fetch_scope_depth(), 0);
    }

    #[test]
    fn test_fetch_scope_popped_on_error_path() {
        fn failing(state: &mut DomainResultCreationState<'_>) -> Result<SqlSelection> {
            let mut guard = state.push_explicit_fetch_scope(ExplicitFetchScope::new());
            guard.resolve_sql_selection(Some("missing"), &NavigablePath::new("x"))
        }
        let metadata = SimpleJdbcValuesMetadata::new(["a"]);
        let mut state = DomainResultCreationState::new(&metadata, false);
        assert!(failing(&mut state).is_err());
        assert_eq!(state.fetch_scope_depth(), 0);
    }

    #[test]
    fn test_scope_below_strips_prefix() {
        let scope = ExplicitFetchScope::new()
            .with("address.city", city_builder("c"))
            .with("addressee", city_builder("x"))
            .with("name", city_builder("n"));
        let below = scope.below("address");
        assert!(below.get("city").is_some());
        assert!(below.get("addressee").is_none());
        assert!(scope.below("name").is_empty());
    }
}
