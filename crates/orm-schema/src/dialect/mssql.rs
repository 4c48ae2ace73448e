//! Microsoft SQL Server dialect.

use super::Dialect;
use crate::core::identifier::quote_brackets;
use crate::extract::identifier_helper::NameStorageFlags;
use crate::extract::sequence::SequenceInformationExtractorImpl;
use crate::jdbc::{JdbcErrorKind, SqlException};

/// Microsoft SQL Server dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Create a new MSSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn quote(&self, name: &str) -> String {
        // Handle names that contain closing brackets by doubling them
        quote_brackets(name)
    }

    fn name_storage(&self) -> NameStorageFlags {
        // Case is preserved for both quoted and unquoted names.
        NameStorageFlags {
            stores_mixed_case_quoted_identifiers: true,
            ..NameStorageFlags::default()
        }
    }

    fn keywords(&self) -> &[&'static str] {
        &["top", "identity_insert", "nocheck", "percent", "tran", "transaction"]
    }

    fn supports_if_exists_before_table_name(&self) -> bool {
        true
    }

    fn supports_if_exists_before_constraint_name(&self) -> bool {
        true
    }

    fn supports_sequences(&self) -> bool {
        true
    }

    fn add_column_string(&self) -> &str {
        "add"
    }

    fn drop_sequence_strings(&self, name: &str) -> Vec<String> {
        vec![format!("drop sequence if exists {}", name)]
    }

    fn sequence_information_extractor(&self) -> SequenceInformationExtractorImpl {
        SequenceInformationExtractorImpl::Legacy
    }

    fn query_sequences_string(&self) -> Option<&str> {
        Some("select sequence_catalog, sequence_schema, sequence_name, increment from information_schema.sequences")
    }

    fn classify_sql_exception(&self, exception: &SqlException) -> Option<JdbcErrorKind> {
        match exception.vendor_code() {
            // deadlock victim, lock request timeout
            1205 | 1222 => Some(JdbcErrorKind::LockAcquisition),
            // duplicate key
            2627 | 2601 => Some(JdbcErrorKind::ConstraintViolation),
            _ => None,
        }
    }

    fn can_disable_constraints(&self) -> bool {
        true
    }

    fn disable_constraints_statements(&self, tables: &[String]) -> Vec<String> {
        tables
            .iter()
            .map(|t| format!("alter table {} nocheck constraint all", t))
            .collect()
    }

    fn truncate_table_statements(&self, tables: &[String]) -> Vec<String> {
        // truncate is refused on tables referenced by a foreign key, even disabled
        tables.iter().map(|t| format!("delete from {}", t)).collect()
    }

    fn enable_constraints_statements(&self, tables: &[String]) -> Vec<String> {
        tables
            .iter()
            .map(|t| format!("alter table {} with check check constraint all", t))
            .collect()
    }
}
