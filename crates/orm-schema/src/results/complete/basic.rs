//! Builders for single-column results and fetches.

use std::sync::Arc;

use super::{FetchBuilder, ResultBuilder};
use crate::error::Result;
use crate::results::creation_state::DomainResultCreationState;
use crate::results::domain::{DomainResult, Fetch};
use crate::results::mapping::BasicAttributeMapping;
use crate::results::navigable_path::NavigablePath;

/// A scalar column result not tied to any model part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompleteResultBuilderBasicValuedStandard {
    navigable_path: NavigablePath,
    explicit_column_name: Option<String>,
    type_code: Option<i32>,
}

impl CompleteResultBuilderBasicValuedStandard {
    pub fn new(explicit_column_name: Option<String>, type_code: Option<i32>) -> Self {
        let root = explicit_column_name.clone().unwrap_or_else(|| "?".to_string());
        Self {
            navigable_path: NavigablePath::new(root),
            explicit_column_name,
            type_code,
        }
    }

    pub fn explicit_column_name(&self) -> Option<&str> {
        self.explicit_column_name.as_deref()
    }

    pub fn type_code(&self) -> Option<i32> {
        self.type_code
    }
}

impl ResultBuilder for CompleteResultBuilderBasicValuedStandard {
    fn navigable_path(&self) -> &NavigablePath {
        &self.navigable_path
    }

    fn build_result(&self, state: &mut DomainResultCreationState<'_>) -> Result<DomainResult> {
        let selection =
            state.resolve_sql_selection(self.explicit_column_name.as_deref(), &self.navigable_path)?;
        Ok(DomainResult::Basic {
            path: self.navigable_path.clone(),
            selection,
        })
    }
}

/// A top-level result reading one basic attribute by alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompleteResultBuilderBasicModelPart {
    navigable_path: NavigablePath,
    model_part: Arc<BasicAttributeMapping>,
    column_alias: String,
}

impl CompleteResultBuilderBasicModelPart {
    pub fn new(
        navigable_path: NavigablePath,
        model_part: Arc<BasicAttributeMapping>,
        column_alias: impl Into<String>,
    ) -> Self {
        Self {
            navigable_path,
            model_part,
            column_alias: column_alias.into(),
        }
    }

    pub fn model_part(&self) -> &BasicAttributeMapping {
        &self.model_part
    }
}

impl ResultBuilder for CompleteResultBuilderBasicModelPart {
    fn navigable_path(&self) -> &NavigablePath {
        &self.navigable_path
    }

    fn build_result(&self, state: &mut DomainResultCreationState<'_>) -> Result<DomainResult> {
        let selection = state.resolve_sql_selection(Some(&self.column_alias), &self.navigable_path)?;
        Ok(DomainResult::Basic {
            path: self.navigable_path.clone(),
            selection,
        })
    }
}

/// A basic attribute fetch. Without an alias it reads the next positional
/// column, when the creation state allows that.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompleteFetchBuilderBasicPart {
    navigable_path: NavigablePath,
    referenced_part: Arc<BasicAttributeMapping>,
    selection_alias: Option<String>,
}

impl CompleteFetchBuilderBasicPart {
    pub fn new(
        navigable_path: NavigablePath,
        referenced_part: Arc<BasicAttributeMapping>,
        selection_alias: Option<String>,
    ) -> Self {
        Self {
            navigable_path,
            referenced_part,
            selection_alias,
        }
    }

    pub fn referenced_part(&self) -> &BasicAttributeMapping {
        &self.referenced_part
    }

    pub fn selection_alias(&self) -> Option<&str> {
        self.selection_alias.as_deref()
    }
}

impl FetchBuilder for CompleteFetchBuilderBasicPart {
    fn navigable_path(&self) -> &NavigablePath {
        &self.navigable_path
    }

    fn build_fetch(&self, state: &mut DomainResultCreationState<'_>) -> Result<Fetch> {
        let selection =
            state.resolve_sql_selection(self.selection_alias.as_deref(), &self.navigable_path)?;
        Ok(Fetch::Basic {
            path: self.navigable_path.clone(),
            attribute: self.referenced_part.name.clone(),
            selection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrmError;
    use crate::results::jdbc_values::SimpleJdbcValuesMetadata;

    fn name_part() -> Arc<BasicAttributeMapping> {
        Arc::new(BasicAttributeMapping::new("name", "name"))
    }

    fn positional_name_fetch() -> CompleteFetchBuilderBasicPart {
        CompleteFetchBuilderBasicPart::new(
            NavigablePath::new("Customer").append("name"),
            name_part(),
            None,
        )
    }

    #[test]
    fn test_positional_fetch_rejected_when_disallowed() {
        let metadata = SimpleJdbcValuesMetadata::new(["id", "name"]);
        let mut state = DomainResultCreationState::new(&metadata, false);
        let err = positional_name_fetch().build_fetch(&mut state).unwrap_err();
        assert!(matches!(err, OrmError::PositionalSelectionsNotAllowed(_)));
        assert_eq!(state.next_position(), 1);
        assert!(state.selections().is_empty());
    }

    #[test]
    fn test_positional_fetch_consumes_next_position() {
        let metadata = SimpleJdbcValuesMetadata::new(["id", "name"]);
        let mut state = DomainResultCreationState::new(&metadata, true);
        assert_eq!(state.next_position(), 1);
        let fetch = positional_name_fetch().build_fetch(&mut state).unwrap();
        assert_eq!(state.next_position(), 2);
        let Fetch::Basic { selection, attribute, .. } = fetch else {
            panic!("expected a basic fetch");
        };
        assert_eq!(attribute, "name");
        assert_eq!(selection.jdbc_position, 1);
    }

    #[test]
    fn test_aliased_fetch_leaves_counter_alone() {
        let metadata = SimpleJdbcValuesMetadata::new(["id", "c_name"]);
        let mut state = DomainResultCreationState::new(&metadata, true);
        let builder = CompleteFetchBuilderBasicPart::new(
            NavigablePath::new("Customer").append("name"),
            name_part(),
            Some("C_NAME".into()),
        );
        let Fetch::Basic { selection, .. } = builder.build_fetch(&mut state).unwrap() else {
            panic!("expected a basic fetch");
        };
        assert_eq!(selection.jdbc_position, 2);
        assert_eq!(state.next_position(), 1);
    }

    #[test]
    fn test_scalar_results() {
        let metadata = SimpleJdbcValuesMetadata::new(["total", "name"]);
        let mut state = DomainResultCreationState::new(&metadata, true);
        let total = CompleteResultBuilderBasicValuedStandard::new(Some("total".into()), Some(4));
        let DomainResult::Basic { path, selection } = total.build_result(&mut state).unwrap() else {
            panic!("expected a basic result");
        };
        assert_eq!(path.full_path(), "total");
        assert_eq!(selection.jdbc_position, 1);

        let name = CompleteResultBuilderBasicModelPart::new(
            NavigablePath::new("Customer").append("name"),
            name_part(),
            "name",
        );
        assert!(name.build_result(&mut state).is_ok());
        assert_eq!(state.selections().len(), 2);
    }

    #[test]
    fn test_equal_builders_hash_alike() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(positional_name_fetch());
        assert!(set.contains(&positional_name_fetch()));
    }
}
