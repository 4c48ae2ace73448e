//! Schema dropping, plus the drop that `create-drop` runs when the
//! session factory closes.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use super::action::SourceType;
use super::exception_handler::{ExceptionHandler, ExceptionHandlerLoggedImpl};
use super::formatter::Formatter;
use super::helper::{
    apply_script, apply_sql_strings, check_export_identifier, included_namespaces,
    included_sequences, included_tables,
};
use super::options::{ContributableMatcher, ExecutionOptions, SourceDescriptor};
use super::script::SqlScriptCommandExtractorImpl;
use super::target::{
    prepare_all, release_all, GenerationTarget, GenerationTargetCollector, GenerationTargetToDatabase,
};
use crate::core::model::{Database, Exportable};
use crate::dialect::Dialect;
use crate::error::{OrmError, Result};
use crate::jdbc::{JdbcConnection, JdbcEnvironment};

/// Drops schema objects.
#[derive(Debug, Clone, Copy)]
pub struct SchemaDropper<'e> {
    environment: &'e JdbcEnvironment,
}

impl<'e> SchemaDropper<'e> {
    pub fn new(environment: &'e JdbcEnvironment) -> Self {
        Self { environment }
    }

    /// Prepare the targets, drop, then release the targets.
    pub fn do_drop(
        &self,
        database: &Database,
        options: &ExecutionOptions<'_>,
        matcher: &ContributableMatcher,
        source: &SourceDescriptor,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }
        prepare_all(targets)?;
        let outcome = self.perform_drop(database, options, matcher, source, targets);
        release_all(targets, outcome)
    }

    /// Drop against targets that are already prepared.
    pub fn perform_drop(
        &self,
        database: &Database,
        options: &ExecutionOptions<'_>,
        matcher: &ContributableMatcher,
        source: &SourceDescriptor,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        let formatter = Formatter::from_settings(options.settings());
        info!("Dropping schema from {:?}", source.source_type);

        match source.source_type {
            SourceType::Metadata => {
                self.drop_from_metadata(database, options, matcher, formatter, targets)
            }
            SourceType::Script => self.drop_from_script(source, options, formatter, targets),
            SourceType::MetadataThenScript => {
                self.drop_from_metadata(database, options, matcher, formatter, targets)?;
                self.drop_from_script(source, options, formatter, targets)
            }
            SourceType::ScriptThenMetadata => {
                self.drop_from_script(source, options, formatter, targets)?;
                self.drop_from_metadata(database, options, matcher, formatter, targets)
            }
        }
    }

    fn drop_from_script(
        &self,
        source: &SourceDescriptor,
        options: &ExecutionOptions<'_>,
        formatter: Formatter,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        let script = source.script_source.as_ref().ok_or_else(|| {
            OrmError::Config("Drop source includes a script, but no script was specified".into())
        })?;
        let extractor = SqlScriptCommandExtractorImpl::from_settings(options.settings())?;
        apply_script(script, &extractor, formatter, options, targets)
    }

    /// Emit the model's `drop` commands, the reverse of creation.
    pub fn drop_from_metadata(
        &self,
        database: &Database,
        options: &ExecutionOptions<'_>,
        matcher: &ContributableMatcher,
        formatter: Formatter,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        let dialect = self.environment.dialect();
        let ddl = self.environment.ddl();
        let namespaces = included_namespaces(database.namespaces(), options);
        let mut export_identifiers = HashSet::with_capacity(50);

        for object in database.auxiliary_objects().iter().rev() {
            if !object.before_tables && object.applies_to(dialect.name()) {
                apply_sql_strings(false, &object.drop, formatter, options, targets)?;
            }
        }

        if dialect.drop_constraints() && dialect.has_alter_table() {
            for namespace in &namespaces {
                for table in included_tables(namespace, options, matcher) {
                    for foreign_key in &table.foreign_keys {
                        apply_sql_strings(
                            false,
                            ddl.foreign_key_drop(table, foreign_key),
                            formatter,
                            options,
                            targets,
                        )?;
                    }
                }
            }
        }

        for namespace in &namespaces {
            for table in included_tables(namespace, options, matcher) {
                check_export_identifier(table.export_identifier(), &mut export_identifiers)?;
                apply_sql_strings(false, ddl.table_drop(table), formatter, options, targets)?;
            }
            if dialect.supports_sequences() {
                for sequence in included_sequences(namespace, options, matcher) {
                    check_export_identifier(sequence.export_identifier(), &mut export_identifiers)?;
                    apply_sql_strings(false, ddl.sequence_drop(sequence), formatter, options, targets)?;
                }
            }
        }

        for object in database.auxiliary_objects().iter().rev() {
            if object.before_tables && object.applies_to(dialect.name()) {
                apply_sql_strings(false, &object.drop, formatter, options, targets)?;
            }
        }

        if options.should_manage_namespaces() && dialect.can_create_schema() {
            for namespace in namespaces.iter().rev() {
                apply_sql_strings(false, ddl.namespace_drop(&namespace.name), formatter, options, targets)?;
            }
        }
        Ok(())
    }

    /// Render the drop now so it can be executed later, after the
    /// model is gone.
    pub fn build_delayed_action(
        &self,
        database: &Database,
        options: &ExecutionOptions<'_>,
        matcher: &ContributableMatcher,
        source: &SourceDescriptor,
    ) -> Result<DelayedDropAction> {
        let mut collector = GenerationTargetCollector::new();
        {
            let mut targets: [&mut dyn GenerationTarget; 1] = [&mut collector];
            self.do_drop(database, options, matcher, source, &mut targets)?;
        }
        Ok(DelayedDropAction::new(collector.into_commands()))
    }
}

// ===== Delayed drop =====

/// Pre-rendered drop commands run at shutdown. Failures are logged and
/// do not stop the remaining commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelayedDropAction {
    commands: Vec<String>,
}

impl DelayedDropAction {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn perform(&self, connection: &dyn JdbcConnection, dialect: Arc<dyn Dialect>) -> Result<()> {
        info!("Performing delayed schema drop of {} commands", self.commands.len());
        let handler = ExceptionHandlerLoggedImpl;
        let mut target = GenerationTargetToDatabase::new(connection, dialect);
        target.prepare()?;
        for command in &self.commands {
            if let Err(e) = target.accept(command) {
                handler.handle_exception(e)?;
            }
        }
        target.release()
    }
}

/// Receives delayed drops to run when the owner shuts down.
pub trait DelayedDropRegistry {
    fn register_on_close_action(&mut self, action: DelayedDropAction);
}

/// Holds registered drops until [`DelayedDropActions::perform_all`].
#[derive(Debug, Default)]
pub struct DelayedDropActions {
    actions: Vec<DelayedDropAction>,
}

impl DelayedDropActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> &[DelayedDropAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every registered drop, most recent first, then forget them.
    pub fn perform_all(&mut self, connection: &dyn JdbcConnection, dialect: Arc<dyn Dialect>) -> Result<()> {
        while let Some(action) = self.actions.pop() {
            action.perform(connection, dialect.clone())?;
        }
        Ok(())
    }
}

impl DelayedDropRegistry for DelayedDropActions {
    fn register_on_close_action(&mut self, action: DelayedDropAction) {
        debug!("Registered delayed drop of {} commands", action.commands().len());
        self.actions.push(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;
    use crate::core::identifier::{Identifier, NamespaceName, ObjectName};
    use crate::core::model::{AuxiliaryDatabaseObject, ForeignKey, Namespace, Sequence, Table};
    use crate::dialect::{H2Dialect, PostgresDialect};
    use crate::extract::NameStorageFlags;
    use crate::jdbc::InMemoryConnection;
    use crate::schema::exception_handler::ExceptionHandlerHaltImpl;
    use std::collections::BTreeSet;

    fn id(name: &str) -> Identifier {
        Identifier::unquoted(name)
    }

    fn shop() -> Database {
        let orders = Table::new(id("orders")).with_foreign_key(ForeignKey {
            name: id("fk_orders_customer"),
            columns: vec![id("customer_id")],
            references: ObjectName::simple(id("customer")),
            referenced_columns: vec![id("id")],
            cascade_delete: false,
        });
        let mut database = Database::new().with_namespace(
            Namespace::new(NamespaceName::new(None, Some(id("shop"))))
                .with_table(Table::new(id("customer")))
                .with_table(orders)
                .with_sequence(Sequence::new(id("order_seq"))),
        );
        database.add_auxiliary_object(AuxiliaryDatabaseObject {
            name: "money".into(),
            create: vec!["create domain money as numeric(19, 2)".into()],
            drop: vec!["drop domain money".into()],
            dialects: BTreeSet::from(["postgres".to_string()]),
            before_tables: true,
        });
        database
    }

    #[test]
    fn test_drop_order() {
        let environment = JdbcEnvironment::offline(Arc::new(PostgresDialect::new()));
        let settings = Settings::new();
        let options = ExecutionOptions::new(&settings, &ExceptionHandlerHaltImpl)
            .with_manage_namespaces(true);
        let mut collector = GenerationTargetCollector::new();
        {
            let mut targets: [&mut dyn GenerationTarget; 1] = [&mut collector];
            SchemaDropper::new(&environment)
                .do_drop(
                    &shop(),
                    &options,
                    &ContributableMatcher::All,
                    &SourceDescriptor::metadata(),
                    &mut targets,
                )
                .unwrap();
        }
        let commands = collector.commands();
        assert_eq!(
            commands[0],
            "alter table shop.orders drop constraint if exists fk_orders_customer"
        );
        assert!(commands[1].starts_with("drop table if exists shop.customer"));
        assert!(commands[2].starts_with("drop table if exists shop.orders"));
        assert!(commands[3].contains("sequence"));
        assert_eq!(commands[4], "drop domain money");
        assert!(commands[5].starts_with("drop schema"));
        assert_eq!(commands.len(), 6);
    }

    #[test]
    fn test_delayed_action_logs_failures_and_continues() {
        let environment = JdbcEnvironment::offline(Arc::new(H2Dialect::new()));
        let settings = Settings::new();
        let options = ExecutionOptions::new(&settings, &ExceptionHandlerHaltImpl);
        let action = SchemaDropper::new(&environment)
            .build_delayed_action(
                &shop(),
                &options,
                &ContributableMatcher::All,
                &SourceDescriptor::metadata(),
            )
            .unwrap();
        assert!(!action.commands().is_empty());

        let connection = InMemoryConnection::new(NameStorageFlags::default()).rejecting("constraint");
        let mut registry = DelayedDropActions::new();
        registry.register_on_close_action(action.clone());
        registry
            .perform_all(&connection, environment.shared_dialect())
            .unwrap();
        assert!(registry.is_empty());
        assert_eq!(connection.executed().len(), action.commands().len() - 1);
    }
}
