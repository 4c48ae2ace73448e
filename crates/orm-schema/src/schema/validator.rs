//! Schema validation: compare the model with what the database reports.

use tracing::info;

use super::helper::{included_namespaces, included_sequences, included_tables};
use super::options::{ContributableMatcher, ExecutionOptions};
use crate::core::model::{Column, Database, Sequence, Table};
use crate::error::{OrmError, Result};
use crate::extract::{ColumnInformation, DatabaseInformation, ExtractionContext, SequenceInformation, TableView};

/// Checks that every mapped table, column and sequence exists with a
/// compatible definition. The first mismatch fails validation.
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator<'c> {
    context: ExtractionContext<'c>,
}

impl<'c> SchemaValidator<'c> {
    pub fn new(context: ExtractionContext<'c>) -> Self {
        Self { context }
    }

    /// # Errors
    ///
    /// `SchemaValidation` naming the first mismatch, or the extraction
    /// error that prevented the comparison.
    pub fn do_validation(
        &self,
        database: &Database,
        options: &ExecutionOptions<'_>,
        matcher: &ContributableMatcher,
    ) -> Result<()> {
        let information = DatabaseInformation::for_model(self.context, database)?;
        self.perform_validation(&information, database, options, matcher)?;
        info!("Schema validation succeeded");
        Ok(())
    }

    pub fn perform_validation(
        &self,
        information: &DatabaseInformation<'_>,
        database: &Database,
        options: &ExecutionOptions<'_>,
        matcher: &ContributableMatcher,
    ) -> Result<()> {
        let namespaces = included_namespaces(database.namespaces(), options);

        for namespace in &namespaces {
            for table in included_tables(namespace, options, matcher) {
                let name = table.qualified_name();
                let existing = information.get_table_information(&name).ok_or_else(|| {
                    OrmError::SchemaValidation(format!("missing table [{}]", name))
                })?;
                validate_table(table, &existing)?;
            }
        }

        if self.context.environment.dialect().supports_sequences() {
            for namespace in &namespaces {
                for sequence in included_sequences(namespace, options, matcher) {
                    let name = sequence.qualified_name();
                    let existing = information.get_sequence_information(&name).ok_or_else(|| {
                        OrmError::SchemaValidation(format!("missing sequence [{}]", name))
                    })?;
                    validate_sequence(sequence, existing)?;
                }
            }
        }
        Ok(())
    }
}

fn validate_table(table: &Table, existing: &TableView<'_>) -> Result<()> {
    for column in &table.columns {
        let found = existing.column(&column.name)?.ok_or_else(|| {
            OrmError::SchemaValidation(format!(
                "missing column [{}] in table [{}]",
                column.name,
                table.qualified_name()
            ))
        })?;
        if !column_types_match(column, found) {
            return Err(OrmError::SchemaValidation(format!(
                "wrong column type encountered in column [{}] in table [{}]; found [{} (Types#{})], but expecting [{} (Types#{})]",
                column.name,
                table.qualified_name(),
                found.type_name,
                found.type_code,
                column.resolved_sql_type().to_lowercase(),
                column
                    .type_code
                    .map_or_else(|| "?".to_string(), |code| code.to_string()),
            )));
        }
    }
    Ok(())
}

/// Equal type codes match; otherwise the mapped SQL type must start with
/// the type name the driver reports.
fn column_types_match(column: &Column, found: &ColumnInformation) -> bool {
    if column.type_code == Some(found.type_code) {
        return true;
    }
    column
        .resolved_sql_type()
        .to_lowercase()
        .starts_with(&found.type_name.to_lowercase())
}

fn validate_sequence(sequence: &Sequence, existing: &SequenceInformation) -> Result<()> {
    match existing.increment {
        Some(increment) if increment != i64::from(sequence.increment_size) => {
            Err(OrmError::SchemaValidation(format!(
                "sequence [{}] defined inconsistent increment-size; found [{}] but expecting [{}]",
                sequence.qualified_name(),
                increment,
                sequence.increment_size
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;
    use crate::core::identifier::Identifier;
    use crate::core::model::Namespace;
    use crate::dialect::{Dialect, PostgresDialect};
    use crate::jdbc::{ColumnEntry, InMemoryConnection, JdbcEnvironment, TableEntry};
    use crate::schema::exception_handler::ExceptionHandlerHaltImpl;
    use std::sync::Arc;

    fn id(name: &str) -> Identifier {
        Identifier::unquoted(name)
    }

    fn snapshot() -> InMemoryConnection {
        InMemoryConnection::new(PostgresDialect::new().name_storage())
            .with_current_schema("public")
            .with_schema(None, "public")
            .with_table(
                TableEntry::new(Some("public"), "customer")
                    .column(ColumnEntry::new("id", -5, "int8"))
                    .column(ColumnEntry::new("name", 12, "varchar")),
            )
            .with_sequence(Some("public"), "customer_seq", 50)
    }

    fn validate(connection: &InMemoryConnection, database: &Database) -> Result<()> {
        let environment =
            JdbcEnvironment::from_connection(Arc::new(PostgresDialect::new()), connection).unwrap();
        let settings = Settings::new();
        let options = ExecutionOptions::new(&settings, &ExceptionHandlerHaltImpl);
        SchemaValidator::new(ExtractionContext::new(&environment, connection)).do_validation(
            database,
            &options,
            &ContributableMatcher::All,
        )
    }

    fn customer(name_type: &str) -> Table {
        Table::new(id("customer"))
            .with_column(Column::new(id("id"), "bigint").with_type_code(-5))
            .with_column(Column::new(id("name"), name_type))
    }

    #[test]
    fn test_matching_schema_validates() {
        let database = Database::new().with_namespace(
            Namespace::default_namespace()
                .with_table(customer("varchar(80)"))
                .with_sequence(crate::core::model::Sequence::new(id("customer_seq")).with_increment(50)),
        );
        validate(&snapshot(), &database).unwrap();
    }

    #[test]
    fn test_missing_table() {
        let database = Database::new()
            .with_namespace(Namespace::default_namespace().with_table(Table::new(id("orders"))));
        let err = validate(&snapshot(), &database).unwrap_err();
        assert_eq!(err.to_string(), "Schema-validation: missing table [orders]");
    }

    #[test]
    fn test_missing_column() {
        let table = customer("varchar(80)").with_column(Column::new(id("email"), "varchar(120)"));
        let database =
            Database::new().with_namespace(Namespace::default_namespace().with_table(table));
        let err = validate(&snapshot(), &database).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema-validation: missing column [email] in table [customer]"
        );
    }

    #[test]
    fn test_wrong_column_type() {
        let database = Database::new()
            .with_namespace(Namespace::default_namespace().with_table(customer("integer")));
        let err = validate(&snapshot(), &database).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Schema-validation: wrong column type encountered in column [name] in table [customer]; found [varchar (Types#12)]"));
    }

    #[test]
    fn test_sequence_increment_mismatch() {
        let database = Database::new().with_namespace(
            Namespace::default_namespace()
                .with_sequence(crate::core::model::Sequence::new(id("customer_seq"))),
        );
        let err = validate(&snapshot(), &database).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema-validation: sequence [customer_seq] defined inconsistent increment-size; found [50] but expecting [1]"
        );
    }
}
