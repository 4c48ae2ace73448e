//! Options shared by every schema action.

use std::collections::BTreeSet;

use super::action::SourceType;
use super::exception_handler::ExceptionHandler;
use super::script::ScriptSourceInput;
use crate::config::settings::{self, Settings};
use crate::core::model::{Contributable, Namespace, Sequence, Table};
use crate::error::{OrmError, Result};

/// Narrows which namespaces, tables and sequences an action touches.
pub trait SchemaFilter: Send + Sync {
    fn include_namespace(&self, _namespace: &Namespace) -> bool {
        true
    }

    fn include_table(&self, _table: &Table) -> bool {
        true
    }

    fn include_sequence(&self, _sequence: &Sequence) -> bool {
        true
    }
}

/// Includes everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSchemaFilter;

impl SchemaFilter for DefaultSchemaFilter {}

/// Selects objects by contributor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContributableMatcher {
    #[default]
    All,
    Contributors(BTreeSet<String>),
}

impl ContributableMatcher {
    pub fn only(contributors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ContributableMatcher::Contributors(contributors.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, contributed: &dyn Contributable) -> bool {
        match self {
            ContributableMatcher::All => true,
            ContributableMatcher::Contributors(names) => names.contains(contributed.contributor()),
        }
    }
}

/// How migration treats unique constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniqueConstraintSchemaUpdateStrategy {
    /// Drop each constraint quietly, then create it quietly.
    #[default]
    DropRecreateQuietly,
    /// Create quietly, ignoring failures for constraints that exist.
    RecreateQuietly,
    /// Leave unique constraints alone.
    Skip,
}

impl UniqueConstraintSchemaUpdateStrategy {
    pub fn interpret(value: Option<&str>) -> Result<Self> {
        let Some(value) = value else {
            return Ok(Self::default());
        };
        match value.trim().to_uppercase().replace('-', "_").as_str() {
            "" | "DROP_RECREATE_QUIETLY" => Ok(Self::DropRecreateQuietly),
            "RECREATE_QUIETLY" => Ok(Self::RecreateQuietly),
            "SKIP" => Ok(Self::Skip),
            other => Err(OrmError::Config(format!(
                "Unrecognized unique constraint schema update strategy: {}",
                other
            ))),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::interpret(
            settings
                .get_str(settings::UNIQUE_CONSTRAINT_SCHEMA_UPDATE_STRATEGY)
                .as_deref(),
        )
    }
}

/// Settings, failure policy and namespace handling of one action run.
#[derive(Clone, Copy)]
pub struct ExecutionOptions<'a> {
    settings: &'a Settings,
    manage_namespaces: bool,
    exception_handler: &'a dyn ExceptionHandler,
    schema_filter: &'a dyn SchemaFilter,
}

impl<'a> ExecutionOptions<'a> {
    pub fn new(settings: &'a Settings, exception_handler: &'a dyn ExceptionHandler) -> Self {
        Self {
            settings,
            manage_namespaces: false,
            exception_handler,
            schema_filter: &DefaultSchemaFilter,
        }
    }

    pub fn with_manage_namespaces(mut self, manage_namespaces: bool) -> Self {
        self.manage_namespaces = manage_namespaces;
        self
    }

    pub fn with_schema_filter(mut self, schema_filter: &'a dyn SchemaFilter) -> Self {
        self.schema_filter = schema_filter;
        self
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    pub fn should_manage_namespaces(&self) -> bool {
        self.manage_namespaces
    }

    pub fn exception_handler(&self) -> &'a dyn ExceptionHandler {
        self.exception_handler
    }

    pub fn schema_filter(&self) -> &'a dyn SchemaFilter {
        self.schema_filter
    }
}

impl std::fmt::Debug for ExecutionOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionOptions")
            .field("settings", &self.settings)
            .field("manage_namespaces", &self.manage_namespaces)
            .finish()
    }
}

/// Where create or drop commands come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub source_type: SourceType,
    pub script_source: Option<ScriptSourceInput>,
}

impl SourceDescriptor {
    pub fn metadata() -> Self {
        Self {
            source_type: SourceType::Metadata,
            script_source: None,
        }
    }

    pub fn script(script: ScriptSourceInput) -> Self {
        Self {
            source_type: SourceType::Script,
            script_source: Some(script),
        }
    }

    /// # Errors
    ///
    /// `Config` when the source type includes a script but none is given.
    pub fn new(source_type: SourceType, script_source: Option<ScriptSourceInput>) -> Result<Self> {
        if source_type.includes_script() && script_source.is_none() {
            return Err(OrmError::Config(
                "Schema generation configuration indicated to include scripts, but no script was specified"
                    .into(),
            ));
        }
        Ok(Self {
            source_type,
            script_source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identifier::Identifier;
    use crate::schema::exception_handler::ExceptionHandlerHaltImpl;

    #[test]
    fn test_contributable_matcher() {
        let billing = Table::new(Identifier::unquoted("invoice")).with_contributor("billing");
        let core = Table::new(Identifier::unquoted("customer"));
        let matcher = ContributableMatcher::only(["billing"]);
        assert!(matcher.matches(&billing));
        assert!(!matcher.matches(&core));
        assert!(ContributableMatcher::All.matches(&core));
    }

    #[test]
    fn test_unique_constraint_strategy() {
        assert_eq!(
            UniqueConstraintSchemaUpdateStrategy::interpret(None).unwrap(),
            UniqueConstraintSchemaUpdateStrategy::DropRecreateQuietly
        );
        assert_eq!(
            UniqueConstraintSchemaUpdateStrategy::interpret(Some("recreate-quietly")).unwrap(),
            UniqueConstraintSchemaUpdateStrategy::RecreateQuietly
        );
        assert_eq!(
            UniqueConstraintSchemaUpdateStrategy::interpret(Some("skip")).unwrap(),
            UniqueConstraintSchemaUpdateStrategy::Skip
        );
        assert!(UniqueConstraintSchemaUpdateStrategy::interpret(Some("always")).is_err());
    }

    #[test]
    fn test_execution_options_defaults() {
        let settings = Settings::new();
        let options = ExecutionOptions::new(&settings, &ExceptionHandlerHaltImpl);
        assert!(!options.should_manage_namespaces());
        assert!(options
            .schema_filter()
            .include_table(&Table::new(Identifier::unquoted("t"))));
        assert!(options.with_manage_namespaces(true).should_manage_namespaces());
    }

    #[test]
    fn test_script_source_required() {
        assert!(SourceDescriptor::new(SourceType::MetadataThenScript, None).is_err());
        assert!(SourceDescriptor::new(SourceType::Metadata, None).is_ok());
    }
}
