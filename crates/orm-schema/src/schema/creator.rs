//! Schema creation: render the model (and/or a script) as `create` commands.

use std::collections::HashSet;

use tracing::{debug, info};

use super::action::SourceType;
use super::formatter::Formatter;
use super::helper::{
    apply_import_sources, apply_script, apply_sql_strings, check_export_identifier,
    included_namespaces, included_sequences, included_tables, namespace_export_identifier,
};
use super::options::{ContributableMatcher, ExecutionOptions, SourceDescriptor};
use super::script::SqlScriptCommandExtractorImpl;
use super::target::{prepare_all, release_all, GenerationTarget};
use crate::core::model::{Database, Exportable};
use crate::error::{OrmError, Result};
use crate::jdbc::JdbcEnvironment;

/// Creates schema objects.
#[derive(Debug, Clone, Copy)]
pub struct SchemaCreator<'e> {
    environment: &'e JdbcEnvironment,
}

impl<'e> SchemaCreator<'e> {
    pub fn new(environment: &'e JdbcEnvironment) -> Self {
        Self { environment }
    }

    /// Prepare the targets, create, then release the targets.
    ///
    /// # Errors
    ///
    /// Whatever the exception handler raises for rejected commands, plus
    /// duplicate export identifiers and unreadable scripts.
    pub fn do_creation(
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
        let outcome = self.perform_creation(database, options, matcher, source, targets);
        release_all(targets, outcome)
    }

    /// Create against targets that are already prepared.
    pub fn perform_creation(
        &self,
        database: &Database,
        options: &ExecutionOptions<'_>,
        matcher: &ContributableMatcher,
        source: &SourceDescriptor,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        let formatter = Formatter::from_settings(options.settings());
        info!("Creating schema from {:?}", source.source_type);

        match source.source_type {
            SourceType::Metadata => {
                self.create_from_metadata(database, options, matcher, formatter, targets)?;
            }
            SourceType::Script => {
                self.create_from_script(source, options, formatter, targets)?;
            }
            SourceType::MetadataThenScript => {
                self.create_from_metadata(database, options, matcher, formatter, targets)?;
                self.create_from_script(source, options, formatter, targets)?;
            }
            SourceType::ScriptThenMetadata => {
                self.create_from_script(source, options, formatter, targets)?;
                self.create_from_metadata(database, options, matcher, formatter, targets)?;
            }
        }

        apply_import_sources(options, formatter, targets)
    }

    fn create_from_script(
        &self,
        source: &SourceDescriptor,
        options: &ExecutionOptions<'_>,
        formatter: Formatter,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        let script = source.script_source.as_ref().ok_or_else(|| {
            OrmError::Config("Create source includes a script, but no script was specified".into())
        })?;
        let extractor = SqlScriptCommandExtractorImpl::from_settings(options.settings())?;
        apply_script(script, &extractor, formatter, options, targets)
    }

    /// Emit the model's `create` commands in dependency order.
    pub fn create_from_metadata(
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

        if options.should_manage_namespaces() && dialect.can_create_schema() {
            for namespace in &namespaces {
                if namespace.name.schema.is_none() {
                    continue;
                }
                check_export_identifier(
                    namespace_export_identifier(&namespace.name),
                    &mut export_identifiers,
                )?;
                apply_sql_strings(false, ddl.namespace_create(&namespace.name), formatter, options, targets)?;
            }
        }

        for object in database.auxiliary_objects() {
            if object.before_tables && object.applies_to(dialect.name()) {
                check_export_identifier(object.export_identifier(), &mut export_identifiers)?;
                apply_sql_strings(false, &object.create, formatter, options, targets)?;
            }
        }

        for namespace in &namespaces {
            if dialect.supports_sequences() {
                for sequence in included_sequences(namespace, options, matcher) {
                    check_export_identifier(sequence.export_identifier(), &mut export_identifiers)?;
                    apply_sql_strings(false, ddl.sequence_create(sequence), formatter, options, targets)?;
                }
            }

            let tables = included_tables(namespace, options, matcher);
            for table in &tables {
                check_export_identifier(table.export_identifier(), &mut export_identifiers)?;
                apply_sql_strings(false, ddl.table_create(table), formatter, options, targets)?;
            }

            for table in &tables {
                if !dialect.supports_unique_constraint_in_create_table() {
                    for unique_key in &table.unique_keys {
                        check_export_identifier(unique_key.export_identifier(table), &mut export_identifiers)?;
                        apply_sql_strings(false, ddl.unique_key_create(table, unique_key), formatter, options, targets)?;
                    }
                }
                for index in &table.indexes {
                    check_export_identifier(index.export_identifier(table), &mut export_identifiers)?;
                    apply_sql_strings(false, ddl.index_create(table, index), formatter, options, targets)?;
                }
            }
        }

        // Foreign keys last, once every table they may reference exists.
        if dialect.has_alter_table() {
            for namespace in &namespaces {
                for table in included_tables(namespace, options, matcher) {
                    for foreign_key in &table.foreign_keys {
                        let referenced_name = foreign_key.referenced_table_name(table);
                        let Some(referenced) = database
                            .locate_table(&referenced_name)
                            .filter(|t| t.physical)
                        else {
                            debug!(
                                "Skipping foreign key {} of {}: {} is not a physical table",
                                foreign_key.name,
                                table.qualified_name(),
                                referenced_name
                            );
                            continue;
                        };
                        check_export_identifier(foreign_key.export_identifier(table), &mut export_identifiers)?;
                        apply_sql_strings(
                            false,
                            ddl.foreign_key_create(table, foreign_key, Some(referenced)),
                            formatter,
                            options,
                            targets,
                        )?;
                    }
                }
            }
        }

        for object in database.auxiliary_objects() {
            if !object.before_tables && object.applies_to(dialect.name()) {
                check_export_identifier(object.export_identifier(), &mut export_identifiers)?;
                apply_sql_strings(false, &object.create, formatter, options, targets)?;
            }
        }

        for command in database.init_commands() {
            apply_sql_strings(false, &command.statements, formatter, options, targets)?;
        }
        Ok(())
    }
}
