//! Schema migration: create what the database lacks, never drop what it has.

use std::collections::HashSet;

use tracing::{debug, info};

use super::formatter::Formatter;
use super::helper::{
    apply_sql_strings, check_export_identifier, included_namespaces, included_sequences,
    included_tables, namespace_export_identifier,
};
use super::options::{ContributableMatcher, ExecutionOptions, UniqueConstraintSchemaUpdateStrategy};
use super::target::{prepare_all, release_all, GenerationTarget};
use crate::core::identifier::ObjectName;
use crate::core::model::{Database, Exportable, ForeignKey, Table};
use crate::error::Result;
use crate::extract::{DatabaseInformation, ExtractionContext, TableView};

/// Brings an existing database up to the model by adding missing
/// namespaces, sequences, tables, columns, indexes, unique keys and
/// foreign keys.
#[derive(Debug, Clone, Copy)]
pub struct SchemaMigrator<'c> {
    context: ExtractionContext<'c>,
}

impl<'c> SchemaMigrator<'c> {
    pub fn new(context: ExtractionContext<'c>) -> Self {
        Self { context }
    }

    /// Read the database, then prepare the targets, migrate and release.
    pub fn do_migration(
        &self,
        database: &Database,
        options: &ExecutionOptions<'_>,
        matcher: &ContributableMatcher,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }
        let information = DatabaseInformation::for_model(self.context, database)?;
        prepare_all(targets)?;
        let outcome = self.perform_migration(&information, database, options, matcher, targets);
        release_all(targets, outcome)
    }

    pub fn perform_migration(
        &self,
        information: &DatabaseInformation<'_>,
        database: &Database,
        options: &ExecutionOptions<'_>,
        matcher: &ContributableMatcher,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        let environment = self.context.environment;
        let dialect = environment.dialect();
        let ddl = environment.ddl();
        let formatter = Formatter::from_settings(options.settings());
        let strategy = UniqueConstraintSchemaUpdateStrategy::from_settings(options.settings())?;
        let namespaces = included_namespaces(database.namespaces(), options);
        let mut export_identifiers = HashSet::with_capacity(50);
        info!("Updating schema");

        if options.should_manage_namespaces() && dialect.can_create_schema() {
            for namespace in &namespaces {
                if namespace.name.schema.is_none() || information.namespace_exists(&namespace.name)? {
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
                apply_sql_strings(true, &object.drop, formatter, options, targets)?;
                apply_sql_strings(false, &object.create, formatter, options, targets)?;
            }
        }

        let mut created_tables: HashSet<ObjectName> = HashSet::new();
        for namespace in &namespaces {
            if dialect.supports_sequences() {
                for sequence in included_sequences(namespace, options, matcher) {
                    check_export_identifier(sequence.export_identifier(), &mut export_identifiers)?;
                    if information
                        .get_sequence_information(&sequence.qualified_name())
                        .is_none()
                    {
                        apply_sql_strings(false, ddl.sequence_create(sequence), formatter, options, targets)?;
                    }
                }
            }

            let tables = included_tables(namespace, options, matcher);
            for table in &tables {
                check_export_identifier(table.export_identifier(), &mut export_identifiers)?;
                match information.get_table_information(&table.qualified_name()) {
                    None => {
                        apply_sql_strings(false, ddl.table_create(table), formatter, options, targets)?;
                        created_tables.insert(table.qualified_name());
                    }
                    Some(existing) if existing.is_physical_table() => {
                        for column in &table.columns {
                            if existing.column(&column.name)?.is_none() {
                                apply_sql_strings(false, ddl.add_column(table, column), formatter, options, targets)?;
                            }
                        }
                    }
                    Some(_) => {
                        debug!("{} exists but is not a physical table", table.qualified_name());
                    }
                }
            }

            for table in &tables {
                let existing = information.get_table_information(&table.qualified_name());
                let created = created_tables.contains(&table.qualified_name());

                for index in &table.indexes {
                    check_export_identifier(index.export_identifier(table), &mut export_identifiers)?;
                    let exists = match &existing {
                        Some(existing) => existing.index(&index.name)?.is_some(),
                        None => false,
                    };
                    if !exists {
                        apply_sql_strings(false, ddl.index_create(table, index), formatter, options, targets)?;
                    }
                }

                if strategy == UniqueConstraintSchemaUpdateStrategy::Skip
                    || (created && dialect.supports_unique_constraint_in_create_table())
                {
                    continue;
                }
                for unique_key in &table.unique_keys {
                    check_export_identifier(unique_key.export_identifier(table), &mut export_identifiers)?;
                    let exists = match &existing {
                        Some(existing) => existing.index(&unique_key.name)?.is_some(),
                        None => false,
                    };
                    if exists {
                        continue;
                    }
                    if strategy == UniqueConstraintSchemaUpdateStrategy::DropRecreateQuietly && !created {
                        apply_sql_strings(true, ddl.unique_key_drop(table, unique_key), formatter, options, targets)?;
                    }
                    apply_sql_strings(true, ddl.unique_key_create(table, unique_key), formatter, options, targets)?;
                }
            }
        }

        if dialect.has_alter_table() {
            for namespace in &namespaces {
                for table in included_tables(namespace, options, matcher) {
                    let existing = information.get_table_information(&table.qualified_name());
                    for foreign_key in &table.foreign_keys {
                        let referenced_name = foreign_key.referenced_table_name(table);
                        let Some(referenced) = database
                            .locate_table(&referenced_name)
                            .filter(|t| t.physical)
                        else {
                            continue;
                        };
                        check_export_identifier(foreign_key.export_identifier(table), &mut export_identifiers)?;
                        if let Some(existing) = &existing {
                            if foreign_key_exists(existing, table, foreign_key)? {
                                continue;
                            }
                        }
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
                apply_sql_strings(true, &object.drop, formatter, options, targets)?;
                apply_sql_strings(false, &object.create, formatter, options, targets)?;
            }
        }
        Ok(())
    }
}

/// A key with the same name, or one over the same columns pointing at the
/// same table, counts as existing.
fn foreign_key_exists(existing: &TableView<'_>, table: &Table, foreign_key: &ForeignKey) -> Result<bool> {
    if existing.foreign_key(&foreign_key.name)?.is_some() {
        return Ok(true);
    }
    let referenced = foreign_key.referenced_table_name(table);
    for candidate in existing.foreign_keys()?.values() {
        let same_table = candidate
            .referenced_table()
            .map_or(false, |name| same_table(name, &referenced));
        let columns: Vec<_> = candidate
            .column_reference_mappings()
            .iter()
            .map(|m| &m.referencing_column.column_name)
            .collect();
        if same_table && columns.iter().copied().eq(foreign_key.columns.iter()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Names match; catalog and schema only count when both sides give one.
fn same_table(found: &ObjectName, expected: &ObjectName) -> bool {
    fn part_matches<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
    found.name == expected.name
        && part_matches(&found.catalog, &expected.catalog)
        && part_matches(&found.schema, &expected.schema)
}
