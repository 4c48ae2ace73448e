//! Table truncation, with foreign keys out of the way while it runs.

use tracing::info;

use super::formatter::Formatter;
use super::helper::{apply_import_sources, apply_sql_strings, included_namespaces, included_tables};
use super::options::{ContributableMatcher, ExecutionOptions};
use super::target::{prepare_all, release_all, GenerationTarget};
use crate::core::model::{Database, Table};
use crate::error::Result;
use crate::jdbc::JdbcEnvironment;

/// Empties every included table, then re-runs the import scripts.
#[derive(Debug, Clone, Copy)]
pub struct SchemaTruncator<'e> {
    environment: &'e JdbcEnvironment,
}

impl<'e> SchemaTruncator<'e> {
    pub fn new(environment: &'e JdbcEnvironment) -> Self {
        Self { environment }
    }

    pub fn do_truncate(
        &self,
        database: &Database,
        options: &ExecutionOptions<'_>,
        matcher: &ContributableMatcher,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }
        prepare_all(targets)?;
        let outcome = self.perform_truncate(database, options, matcher, targets);
        release_all(targets, outcome)
    }

    pub fn perform_truncate(
        &self,
        database: &Database,
        options: &ExecutionOptions<'_>,
        matcher: &ContributableMatcher,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        let dialect = self.environment.dialect();
        let ddl = self.environment.ddl();
        let formatter = Formatter::from_settings(options.settings());
        info!("Truncating tables");

        for namespace in included_namespaces(database.namespaces(), options) {
            let tables = included_tables(namespace, options, matcher);
            if tables.is_empty() {
                continue;
            }
            let table_names: Vec<String> = tables.iter().map(|t| ddl.table_name(t)).collect();

            if dialect.can_disable_constraints() {
                apply_sql_strings(
                    false,
                    dialect.disable_constraints_statements(&table_names),
                    formatter,
                    options,
                    targets,
                )?;
            } else {
                self.drop_foreign_keys(&tables, options, formatter, targets)?;
            }

            apply_sql_strings(
                false,
                dialect.truncate_table_statements(&table_names),
                formatter,
                options,
                targets,
            )?;

            if dialect.can_disable_constraints() {
                apply_sql_strings(
                    false,
                    dialect.enable_constraints_statements(&table_names),
                    formatter,
                    options,
                    targets,
                )?;
            } else {
                self.recreate_foreign_keys(database, &tables, options, formatter, targets)?;
            }
        }

        apply_import_sources(options, formatter, targets)
    }

    fn drop_foreign_keys(
        &self,
        tables: &[&Table],
        options: &ExecutionOptions<'_>,
        formatter: Formatter,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        if !self.environment.dialect().has_alter_table() {
            return Ok(());
        }
        let ddl = self.environment.ddl();
        for table in tables {
            for foreign_key in &table.foreign_keys {
                apply_sql_strings(false, ddl.foreign_key_drop(table, foreign_key), formatter, options, targets)?;
            }
        }
        Ok(())
    }

    fn recreate_foreign_keys(
        &self,
        database: &Database,
        tables: &[&Table],
        options: &ExecutionOptions<'_>,
        formatter: Formatter,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        if !self.environment.dialect().has_alter_table() {
            return Ok(());
        }
        let ddl = self.environment.ddl();
        for table in tables {
            for foreign_key in &table.foreign_keys {
                let referenced = database.locate_table(&foreign_key.referenced_table_name(table));
                apply_sql_strings(
                    false,
                    ddl.foreign_key_create(table, foreign_key, referenced),
                    formatter,
                    options,
                    targets,
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{self, Settings};
    use crate::core::identifier::{Identifier, ObjectName};
    use crate::core::model::{ForeignKey, Namespace};
    use crate::dialect::{Dialect, H2Dialect, PostgresDialect};
    use crate::extract::NameStorageFlags;
    use crate::schema::exception_handler::ExceptionHandlerHaltImpl;
    use crate::schema::target::GenerationTargetCollector;
    use std::io::Write as _;
    use std::sync::Arc;

    fn id(name: &str) -> Identifier {
        Identifier::unquoted(name)
    }

    fn database() -> Database {
        Database::new().with_namespace(
            Namespace::default_namespace()
                .with_table(Table::new(id("customer")))
                .with_table(Table::new(id("orders")).with_foreign_key(ForeignKey {
                    name: id("fk_orders_customer"),
                    columns: vec![id("customer_id")],
                    references: ObjectName::simple(id("customer")),
                    referenced_columns: vec![id("id")],
                    cascade_delete: false,
                })),
        )
    }

    fn truncate(environment: &JdbcEnvironment, settings: &Settings) -> Vec<String> {
        let options = ExecutionOptions::new(settings, &ExceptionHandlerHaltImpl);
        let mut collector = GenerationTargetCollector::new();
        {
            let mut targets: [&mut dyn GenerationTarget; 1] = [&mut collector];
            SchemaTruncator::new(environment)
                .do_truncate(&database(), &options, &ContributableMatcher::All, &mut targets)
                .unwrap();
        }
        collector.into_commands()
    }

    #[test]
    fn test_h2_disables_referential_integrity() {
        let environment = JdbcEnvironment::offline(Arc::new(H2Dialect::new()));
        assert_eq!(
            truncate(&environment, &Settings::new()),
            vec![
                "set referential_integrity false",
                "truncate table customer",
                "truncate table orders",
                "set referential_integrity true",
            ]
        );
    }

    #[test]
    fn test_postgres_truncates_together() {
        let environment = JdbcEnvironment::offline(Arc::new(PostgresDialect::new()));
        assert_eq!(
            truncate(&environment, &Settings::new()),
            vec!["truncate table customer, orders restart identity cascade"]
        );
    }

    struct PlainDialect;

    impl Dialect for PlainDialect {
        fn name(&self) -> &str {
            "plain"
        }

        fn name_storage(&self) -> NameStorageFlags {
            NameStorageFlags::default()
        }
    }

    #[test]
    fn test_foreign_keys_dropped_and_recreated_when_constraints_cannot_be_disabled() {
        let environment = JdbcEnvironment::offline(Arc::new(PlainDialect));
        assert_eq!(
            truncate(&environment, &Settings::new()),
            vec![
                "alter table orders drop constraint fk_orders_customer",
                "truncate table customer",
                "truncate table orders",
                "alter table orders add constraint fk_orders_customer foreign key (customer_id) references customer (id)",
            ]
        );
    }

    #[test]
    fn test_import_files_run_after_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let import = dir.path().join("import.sql");
        writeln!(std::fs::File::create(&import).unwrap(), "insert into customer values (1);").unwrap();
        let settings =
            Settings::new().with(settings::HBM2DDL_IMPORT_FILES, import.display().to_string());
        let environment = JdbcEnvironment::offline(Arc::new(PostgresDialect::new()));
        let commands = truncate(&environment, &settings);
        assert_eq!(commands.last().unwrap(), "insert into customer values (1)");
    }
}
