//! PostgreSQL dialect.

use super::Dialect;
use crate::extract::identifier_helper::NameStorageFlags;
use crate::extract::sequence::SequenceInformationExtractorImpl;
use crate::jdbc::{JdbcErrorKind, SqlException};

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn name_storage(&self) -> NameStorageFlags {
        // Unquoted names fold to lower case; quoted names are kept verbatim.
        NameStorageFlags {
            stores_lower_case_identifiers: true,
            ..NameStorageFlags::default()
        }
    }

    fn keywords(&self) -> &[&'static str] {
        &["analyse", "analyze", "limit", "offset", "returning", "verbose"]
    }

    fn supports_if_exists_before_table_name(&self) -> bool {
        true
    }

    fn supports_if_exists_before_constraint_name(&self) -> bool {
        true
    }

    fn cascade_constraints_string(&self) -> &str {
        " cascade"
    }

    fn supports_sequences(&self) -> bool {
        true
    }

    fn supports_comment_on(&self) -> bool {
        true
    }

    fn drop_sequence_strings(&self, name: &str) -> Vec<String> {
        vec![format!("drop sequence if exists {}", name)]
    }

    fn drop_schema_command(&self, schema: &str) -> Vec<String> {
        vec![format!("drop schema if exists {} cascade", schema)]
    }

    fn sequence_information_extractor(&self) -> SequenceInformationExtractorImpl {
        SequenceInformationExtractorImpl::Legacy
    }

    fn query_sequences_string(&self) -> Option<&str> {
        Some("select sequence_catalog, sequence_schema, sequence_name, increment from information_schema.sequences")
    }

    fn classify_sql_exception(&self, exception: &SqlException) -> Option<JdbcErrorKind> {
        match exception.sql_state() {
            // lock_not_available, deadlock_detected
            Some("55P03") | Some("40P01") => Some(JdbcErrorKind::LockAcquisition),
            _ => None,
        }
    }

    fn can_disable_constraints(&self) -> bool {
        true
    }

    fn truncate_table_statements(&self, tables: &[String]) -> Vec<String> {
        if tables.is_empty() {
            return Vec::new();
        }
        vec![format!(
            "truncate table {} restart identity cascade",
            tables.join(", ")
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_storage_is_lower_case() {
        let flags = PostgresDialect::new().name_storage();
        assert!(flags.stores_lower_case_identifiers);
        assert!(!flags.stores_upper_case_identifiers);
    }

    #[test]
    fn test_postgres_truncates_in_one_statement() {
        let statements = PostgresDialect::new()
            .truncate_table_statements(&["a".to_string(), "b".to_string()]);
        assert_eq!(statements, vec!["truncate table a, b restart identity cascade"]);
        assert!(PostgresDialect::new().truncate_table_statements(&[]).is_empty());
    }

    #[test]
    fn test_postgres_keywords_extend_ansi() {
        let dialect = PostgresDialect::new();
        assert!(dialect.is_keyword("LIMIT"));
        assert!(dialect.is_keyword("select"));
    }
}
