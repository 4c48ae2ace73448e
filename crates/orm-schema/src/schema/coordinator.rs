//! Turns settings into schema actions and runs them.
//!
//! Each contributor gets a database action and a script action. The
//! database action comes from `jakarta.persistence.schema-generation.database.action`,
//! then its `javax` form, then `hibernate.hbm2ddl.auto`, each first in its
//! `.<contributor>` scoped form. The script action only has the JPA forms.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use super::action::{Action, SourceType};
use super::dropper::DelayedDropRegistry;
use super::helper::{exception_handler_for, resolve_jpa_setting, should_manage_namespaces};
use super::options::{ContributableMatcher, ExecutionOptions, SourceDescriptor};
use super::script::{Charset, ScriptSourceInput, ScriptTargetOutput};
use super::target::{target_refs, TargetDescriptor};
use super::tool::SchemaManagementTool;
use crate::config::settings::{self, Settings};
use crate::core::model::Database;
use crate::error::{OrmError, Result};

/// The actions requested for one contributor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionGrouping {
    pub contributor: String,
    pub database_action: Action,
    pub script_action: Action,
}

impl ActionGrouping {
    /// Resolve the actions of every contributor of `database`.
    pub fn interpret(database: &Database, settings: &Settings) -> Result<Vec<ActionGrouping>> {
        database
            .contributors()
            .into_iter()
            .map(|contributor| {
                Ok(ActionGrouping {
                    database_action: determine_database_action(settings, &contributor)?,
                    script_action: determine_script_action(settings, &contributor)?,
                    contributor,
                })
            })
            .collect()
    }
}

fn scoped(settings: &Settings, key: &str, contributor: &str) -> Option<String> {
    settings
        .get_str(&format!("{}.{}", key, contributor))
        .or_else(|| settings.get_str(key))
}

fn scoped_jpa(settings: &Settings, jakarta: &str, javax: &str, contributor: &str) -> Option<String> {
    if let Some(value) = scoped(settings, jakarta, contributor) {
        return Some(value);
    }
    let value = scoped(settings, javax, contributor)?;
    warn!(
        "{} is deprecated and will be removed; use {} instead",
        javax,
        jakarta
    );
    Some(value)
}

fn determine_database_action(settings: &Settings, contributor: &str) -> Result<Action> {
    if let Some(value) = scoped_jpa(
        settings,
        settings::JAKARTA_HBM2DDL_DATABASE_ACTION,
        settings::HBM2DDL_DATABASE_ACTION,
        contributor,
    ) {
        return Action::interpret_jpa_setting(Some(&value));
    }
    Action::interpret_hbm2ddl_setting(scoped(settings, settings::HBM2DDL_AUTO, contributor).as_deref())
}

fn determine_script_action(settings: &Settings, contributor: &str) -> Result<Action> {
    Action::interpret_jpa_setting(
        scoped_jpa(
            settings,
            settings::JAKARTA_HBM2DDL_SCRIPTS_ACTION,
            settings::HBM2DDL_SCRIPTS_ACTION,
            contributor,
        )
        .as_deref(),
    )
}

/// Run the configured actions against `tool`. Script actions run first,
/// then database actions, each once per distinct action with every
/// contributor that asked for it.
///
/// # Errors
///
/// `Config` for unrecognized settings or missing script targets, plus
/// whatever the actions raise.
pub fn process(
    database: &Database,
    tool: &SchemaManagementTool<'_>,
    settings: &Settings,
    registry: &mut dyn DelayedDropRegistry,
) -> Result<()> {
    let groupings = ActionGrouping::interpret(database, settings)?;

    let mut database_actions: BTreeMap<Action, BTreeSet<String>> = BTreeMap::new();
    let mut script_actions: BTreeMap<Action, BTreeSet<String>> = BTreeMap::new();
    for grouping in groupings {
        if grouping.database_action != Action::None {
            database_actions
                .entry(grouping.database_action)
                .or_default()
                .insert(grouping.contributor.clone());
        }
        if grouping.script_action != Action::None {
            script_actions
                .entry(grouping.script_action)
                .or_default()
                .insert(grouping.contributor);
        }
    }

    if database_actions.is_empty() && script_actions.is_empty() {
        debug!("No schema actions requested");
        return Ok(());
    }

    let options = ExecutionOptions::new(settings, exception_handler_for(settings))
        .with_manage_namespaces(should_manage_namespaces(settings));

    for (action, contributors) in script_actions {
        info!("Performing script action {} for {:?}", action, contributors);
        perform_script_action(action, database, tool, &options, &ContributableMatcher::Contributors(contributors))?;
    }
    for (action, contributors) in database_actions {
        info!("Performing database action {} for {:?}", action, contributors);
        let matcher = ContributableMatcher::Contributors(contributors);
        perform_database_action(action, database, tool, &options, &matcher)?;
        if action == Action::CreateDrop {
            let delayed = tool.schema_dropper().build_delayed_action(
                database,
                &options,
                &matcher,
                &drop_source(settings)?,
            )?;
            registry.register_on_close_action(delayed);
        }
    }
    Ok(())
}

fn perform_database_action(
    action: Action,
    database: &Database,
    tool: &SchemaManagementTool<'_>,
    options: &ExecutionOptions<'_>,
    matcher: &ContributableMatcher,
) -> Result<()> {
    let settings = options.settings();
    let mut boxed = match action {
        Action::None | Action::Validate => Vec::new(),
        _ => tool.build_generation_targets(TargetDescriptor::database(), settings)?,
    };
    let mut targets = target_refs(&mut boxed);

    match action {
        Action::None => Ok(()),
        Action::CreateOnly => tool.schema_creator().do_creation(
            database,
            options,
            matcher,
            &create_source(settings)?,
            &mut targets,
        ),
        Action::Create | Action::CreateDrop => {
            tool.schema_dropper().do_drop(
                database,
                options,
                matcher,
                &drop_source(settings)?,
                &mut targets,
            )?;
            tool.schema_creator().do_creation(
                database,
                options,
                matcher,
                &create_source(settings)?,
                &mut targets,
            )
        }
        Action::Drop => tool.schema_dropper().do_drop(
            database,
            options,
            matcher,
            &drop_source(settings)?,
            &mut targets,
        ),
        Action::Update => tool
            .schema_migrator()?
            .do_migration(database, options, matcher, &mut targets),
        Action::Validate => tool
            .schema_validator()?
            .do_validation(database, options, matcher),
        Action::Truncate => tool
            .schema_truncator()
            .do_truncate(database, options, matcher, &mut targets),
        Action::Populate => tool.schema_populator().do_population(options, &mut targets),
    }
}

fn perform_script_action(
    action: Action,
    database: &Database,
    tool: &SchemaManagementTool<'_>,
    options: &ExecutionOptions<'_>,
    matcher: &ContributableMatcher,
) -> Result<()> {
    let settings = options.settings();
    match action {
        Action::CreateOnly => create_to_script(database, tool, options, matcher),
        Action::Create | Action::CreateDrop => {
            drop_to_script(database, tool, options, matcher)?;
            create_to_script(database, tool, options, matcher)
        }
        Action::Drop => drop_to_script(database, tool, options, matcher),
        Action::Update => {
            let mut boxed = tool.build_generation_targets(
                script_target(settings, settings::JAKARTA_HBM2DDL_SCRIPTS_CREATE_TARGET, settings::HBM2DDL_SCRIPTS_CREATE_TARGET)?,
                settings,
            )?;
            let mut targets = target_refs(&mut boxed);
            tool.schema_migrator()?
                .do_migration(database, options, matcher, &mut targets)
        }
        other => {
            debug!("Ignoring script action {}", other);
            Ok(())
        }
    }
}

fn create_to_script(
    database: &Database,
    tool: &SchemaManagementTool<'_>,
    options: &ExecutionOptions<'_>,
    matcher: &ContributableMatcher,
) -> Result<()> {
    let settings = options.settings();
    let mut boxed = tool.build_generation_targets(
        script_target(
            settings,
            settings::JAKARTA_HBM2DDL_SCRIPTS_CREATE_TARGET,
            settings::HBM2DDL_SCRIPTS_CREATE_TARGET,
        )?,
        settings,
    )?;
    let mut targets = target_refs(&mut boxed);
    tool.schema_creator()
        .do_creation(database, options, matcher, &create_source(settings)?, &mut targets)
}

fn drop_to_script(
    database: &Database,
    tool: &SchemaManagementTool<'_>,
    options: &ExecutionOptions<'_>,
    matcher: &ContributableMatcher,
) -> Result<()> {
    let settings = options.settings();
    let mut boxed = tool.build_generation_targets(
        script_target(
            settings,
            settings::JAKARTA_HBM2DDL_SCRIPTS_DROP_TARGET,
            settings::HBM2DDL_SCRIPTS_DROP_TARGET,
        )?,
        settings,
    )?;
    let mut targets = target_refs(&mut boxed);
    tool.schema_dropper()
        .do_drop(database, options, matcher, &drop_source(settings)?, &mut targets)
}

fn script_target(settings: &Settings, jakarta: &str, javax: &str) -> Result<TargetDescriptor> {
    let path = resolve_jpa_setting(settings, jakarta, javax).ok_or_else(|| {
        OrmError::Config("Writing to script was requested, but no script file was specified".into())
    })?;
    let charset = Charset::from_settings(settings)?;
    let append = settings.get_bool_or(settings::HBM2DDL_SCRIPTS_CREATE_APPEND, true);
    Ok(TargetDescriptor::script(ScriptTargetOutput::to_file(path, charset, append)))
}

fn source_descriptor(
    settings: &Settings,
    source: (&str, &str),
    script: (&str, &str),
) -> Result<SourceDescriptor> {
    let script = resolve_jpa_setting(settings, script.0, script.1);
    let source_type = SourceType::interpret(
        resolve_jpa_setting(settings, source.0, source.1).as_deref(),
        script.is_some(),
    )?;
    let charset = Charset::from_settings(settings)?;
    SourceDescriptor::new(
        source_type,
        script.map(|path| ScriptSourceInput::from_file(path, charset)),
    )
}

/// Where `create` commands come from, per the create-source settings.
pub fn create_source(settings: &Settings) -> Result<SourceDescriptor> {
    source_descriptor(
        settings,
        (settings::JAKARTA_HBM2DDL_CREATE_SOURCE, settings::HBM2DDL_CREATE_SOURCE),
        (
            settings::JAKARTA_HBM2DDL_CREATE_SCRIPT_SOURCE,
            settings::HBM2DDL_CREATE_SCRIPT_SOURCE,
        ),
    )
}

/// Where `drop` commands come from, per the drop-source settings.
pub fn drop_source(settings: &Settings) -> Result<SourceDescriptor> {
    source_descriptor(
        settings,
        (settings::JAKARTA_HBM2DDL_DROP_SOURCE, settings::HBM2DDL_DROP_SOURCE),
        (
            settings::JAKARTA_HBM2DDL_DROP_SCRIPT_SOURCE,
            settings::HBM2DDL_DROP_SCRIPT_SOURCE,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identifier::Identifier;
    use crate::core::model::{Column, Namespace, Table};
    use crate::dialect::{Dialect, H2Dialect, PostgresDialect};
    use crate::jdbc::{ColumnEntry, InMemoryConnection, TableEntry};
    use crate::schema::dropper::DelayedDropActions;
    use std::sync::Arc;

    fn id(name: &str) -> Identifier {
        Identifier::unquoted(name)
    }

    fn database() -> Database {
        Database::new().with_namespace(
            Namespace::default_namespace()
                .with_table(Table::new(id("customer")).with_column(Column::new(id("id"), "bigint")))
                .with_table(
                    Table::new(id("invoice"))
                        .with_column(Column::new(id("id"), "bigint"))
                        .with_contributor("billing"),
                ),
        )
    }

    fn h2() -> InMemoryConnection {
        InMemoryConnection::new(H2Dialect::new().name_storage())
            .with_current_schema("PUBLIC")
            .with_schema(None, "PUBLIC")
    }

    // =========================================================================
    // Action resolution
    // =========================================================================

    #[test]
    fn test_scoped_setting_wins_per_contributor() {
        let settings = Settings::new()
            .with(settings::JAKARTA_HBM2DDL_DATABASE_ACTION, "drop-and-create")
            .with(
                format!("{}.billing", settings::JAKARTA_HBM2DDL_DATABASE_ACTION),
                "none",
            );
        let groupings = ActionGrouping::interpret(&database(), &settings).unwrap();
        let billing = groupings.iter().find(|g| g.contributor == "billing").unwrap();
        let orm = groupings.iter().find(|g| g.contributor == "orm").unwrap();
        assert_eq!(billing.database_action, Action::None);
        assert_eq!(orm.database_action, Action::Create);
    }

    #[test]
    fn test_precedence_jakarta_javax_hbm2ddl() {
        let settings = Settings::new()
            .with(settings::HBM2DDL_AUTO, "validate")
            .with(settings::HBM2DDL_DATABASE_ACTION, "drop");
        assert_eq!(determine_database_action(&settings, "orm").unwrap(), Action::Drop);

        let settings = settings.with(settings::JAKARTA_HBM2DDL_DATABASE_ACTION, "create");
        assert_eq!(determine_database_action(&settings, "orm").unwrap(), Action::CreateOnly);

        let settings = Settings::new().with(settings::HBM2DDL_AUTO, "update");
        assert_eq!(determine_database_action(&settings, "orm").unwrap(), Action::Update);
    }

    #[test]
    fn test_unrecognized_action_is_config_error() {
        let settings = Settings::new().with(settings::HBM2DDL_AUTO, "sometimes");
        let err = ActionGrouping::interpret(&database(), &settings).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    #[test]
    fn test_create_drop_executes_and_registers_delayed_drop() {
        let connection = h2();
        let tool = SchemaManagementTool::connected(Arc::new(H2Dialect::new()), &connection).unwrap();
        let settings = Settings::new().with(settings::HBM2DDL_AUTO, "create-drop");
        let mut registry = DelayedDropActions::new();
        process(&database(), &tool, &settings, &mut registry).unwrap();

        let executed = connection.executed();
        assert_eq!(executed[0], "drop table if exists customer cascade");
        assert!(executed.iter().any(|c| c.starts_with("create table invoice")));
        assert_eq!(registry.actions().len(), 1);
        assert_eq!(
            registry.actions()[0].commands(),
            ["drop table if exists customer cascade", "drop table if exists invoice cascade"]
        );
    }

    #[test]
    fn test_only_requested_contributor_is_created() {
        let connection = h2();
        let tool = SchemaManagementTool::connected(Arc::new(H2Dialect::new()), &connection).unwrap();
        let settings = Settings::new()
            .with(format!("{}.billing", settings::JAKARTA_HBM2DDL_DATABASE_ACTION), "create");
        process(&database(), &tool, &settings, &mut DelayedDropActions::new()).unwrap();
        assert_eq!(connection.executed(), vec!["create table invoice (id bigint)"]);
    }

    #[test]
    fn test_script_action_writes_create_target() {
        let dir = tempfile::tempdir().unwrap();
        let create = dir.path().join("create.sql");
        let tool = SchemaManagementTool::offline(Arc::new(PostgresDialect::new()));
        let settings = Settings::new()
            .with(settings::JAKARTA_HBM2DDL_SCRIPTS_ACTION, "create")
            .with(settings::JAKARTA_HBM2DDL_SCRIPTS_CREATE_TARGET, create.display().to_string())
            .with(settings::HBM2DDL_DELIMITER, ";");
        process(&database(), &tool, &settings, &mut DelayedDropActions::new()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&create).unwrap(),
            "create table customer (id bigint);\ncreate table invoice (id bigint);\n"
        );
    }

    #[test]
    fn test_script_action_without_target_fails() {
        let tool = SchemaManagementTool::offline(Arc::new(PostgresDialect::new()));
        let settings = Settings::new().with(settings::JAKARTA_HBM2DDL_SCRIPTS_ACTION, "drop");
        let err = process(&database(), &tool, &settings, &mut DelayedDropActions::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Writing to script was requested, but no script file was specified"
        );
    }

    #[test]
    fn test_validate_reports_missing_table() {
        let connection = h2().with_table(
            TableEntry::new(Some("PUBLIC"), "CUSTOMER").column(ColumnEntry::new("ID", -5, "BIGINT")),
        );
        let tool = SchemaManagementTool::connected(Arc::new(H2Dialect::new()), &connection).unwrap();
        let settings = Settings::new().with(settings::HBM2DDL_AUTO, "validate");
        let err = process(&database(), &tool, &settings, &mut DelayedDropActions::new()).unwrap_err();
        assert_eq!(err.to_string(), "Schema-validation: missing table [invoice]");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_database_action_without_connection_fails() {
        let tool = SchemaManagementTool::offline(Arc::new(PostgresDialect::new()));
        let settings = Settings::new().with(settings::HBM2DDL_AUTO, "create");
        assert!(process(&database(), &tool, &settings, &mut DelayedDropActions::new()).is_err());
    }
}
