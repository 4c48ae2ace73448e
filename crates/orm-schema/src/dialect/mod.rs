//! SQL dialects (Strategy pattern).
//!
//! A [`Dialect`] answers capability questions asked while generating DDL
//! ("does this database accept `unique` inside `create table`?", "where does
//! `if exists` go?") and supplies the handful of statements that differ per
//! database. The default methods describe a conservative ANSI database;
//! implementations override what differs.
//!
//! DDL rendering of tables and constraints lives in [`ddl`], which only ever
//! consults the dialect through this trait.
//!
//! # Available dialects
//!
//! - [`PostgresDialect`]
//! - [`H2Dialect`]
//! - [`MssqlDialect`]
//!
//! [`DialectImpl`] selects one by name and dispatches with a `match`.

pub mod ddl;
mod h2;
mod mssql;
mod postgres;

pub use h2::H2Dialect;
pub use mssql::MssqlDialect;
pub use postgres::PostgresDialect;

use crate::core::identifier::quote_ansi;
use crate::error::{OrmError, Result};
use crate::extract::identifier_helper::NameStorageFlags;
use crate::extract::sequence::SequenceInformationExtractorImpl;
use crate::jdbc::{JdbcErrorKind, SqlException};

/// SQL:2003 reserved words. Names matching one of these must be quoted.
pub const ANSI_SQL_KEYWORDS: &[&str] = &[
    "all", "allocate", "alter", "and", "any", "are", "array", "as", "asensitive", "asymmetric",
    "at", "atomic", "authorization", "begin", "between", "bigint", "binary", "blob", "boolean",
    "both", "by", "call", "called", "cascaded", "case", "cast", "char", "character", "check",
    "clob", "close", "collate", "column", "commit", "condition", "connect", "constraint",
    "continue", "corresponding", "create", "cross", "cube", "current", "current_date",
    "current_default_transform_group", "current_path", "current_role", "current_time",
    "current_timestamp", "current_transform_group_for_type", "current_user", "cursor", "cycle",
    "date", "day", "deallocate", "dec", "decimal", "declare", "default", "delete", "deref",
    "describe", "deterministic", "disconnect", "distinct", "do", "double", "drop", "dynamic",
    "each", "element", "else", "elseif", "end", "escape", "except", "exec", "execute", "exists",
    "exit", "external", "false", "fetch", "filter", "float", "for", "foreign", "free", "from",
    "full", "function", "get", "global", "grant", "group", "grouping", "handler", "having",
    "hold", "hour", "identity", "if", "immediate", "in", "indicator", "inner", "inout", "input",
    "insensitive", "insert", "int", "integer", "intersect", "interval", "into", "is", "iterate",
    "join", "language", "large", "lateral", "leading", "leave", "left", "like", "local",
    "localtime", "localtimestamp", "loop", "match", "member", "merge", "method", "minute",
    "modifies", "module", "month", "multiset", "national", "natural", "nchar", "nclob", "new",
    "no", "none", "not", "null", "numeric", "of", "old", "on", "only", "open", "or", "order",
    "out", "outer", "output", "over", "overlaps", "parameter", "partition", "precision",
    "prepare", "primary", "procedure", "range", "reads", "real", "recursive", "ref",
    "references", "referencing", "release", "repeat", "resignal", "result", "return", "returns",
    "revoke", "right", "rollback", "rollup", "row", "rows", "savepoint", "scope", "scroll",
    "search", "second", "select", "sensitive", "session_user", "set", "signal", "similar",
    "smallint", "some", "specific", "specifictype", "sql", "sqlexception", "sqlstate",
    "sqlwarning", "start", "static", "submultiset", "symmetric", "system", "system_user",
    "table", "tablesample", "then", "time", "timestamp", "timezone_hour", "timezone_minute",
    "to", "trailing", "translation", "treat", "trigger", "true", "undo", "union", "unique",
    "unknown", "unnest", "until", "update", "user", "using", "value", "values", "varchar",
    "varying", "when", "whenever", "where", "while", "window", "with", "within", "without",
    "year",
];

/// SQL syntax and capability strategy for one database engine.
pub trait Dialect: Send + Sync {
    /// Dialect identifier (e.g. "postgres", "h2", "mssql").
    fn name(&self) -> &str;

    /// Quote an identifier.
    fn quote(&self, name: &str) -> String {
        quote_ansi(name)
    }

    /// How the database stores identifiers, for offline operation when no
    /// driver metadata is available.
    fn name_storage(&self) -> NameStorageFlags;

    /// Reserved words beyond the ANSI set.
    fn keywords(&self) -> &[&'static str] {
        &[]
    }

    /// Whether `name` is a reserved word for this dialect.
    fn is_keyword(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        ANSI_SQL_KEYWORDS.contains(&lower.as_str()) || self.keywords().contains(&lower.as_str())
    }

    fn supports_unique_constraint_in_create_table(&self) -> bool {
        true
    }

    fn has_alter_table(&self) -> bool {
        true
    }

    fn supports_if_exists_before_table_name(&self) -> bool {
        false
    }

    fn supports_if_exists_after_table_name(&self) -> bool {
        false
    }

    fn supports_if_exists_before_constraint_name(&self) -> bool {
        false
    }

    /// Appended to `drop table`, e.g. ` cascade`.
    fn cascade_constraints_string(&self) -> &str {
        ""
    }

    /// Whether foreign keys must be dropped before their tables.
    fn drop_constraints(&self) -> bool {
        true
    }

    fn supports_sequences(&self) -> bool {
        false
    }

    fn can_create_schema(&self) -> bool {
        true
    }

    fn supports_comment_on(&self) -> bool {
        false
    }

    /// Keyword between `alter table X` and a column definition.
    fn add_column_string(&self) -> &str {
        "add column"
    }

    fn create_table_string(&self) -> &str {
        "create table"
    }

    /// Appended after the closing parenthesis of `create table`.
    fn table_type_string(&self) -> &str {
        ""
    }

    fn create_schema_command(&self, schema: &str) -> Vec<String> {
        vec![format!("create schema {}", schema)]
    }

    fn drop_schema_command(&self, schema: &str) -> Vec<String> {
        vec![format!("drop schema {}", schema)]
    }

    fn create_sequence_strings(&self, name: &str, initial_value: i64, increment: i32) -> Vec<String> {
        vec![format!(
            "create sequence {} start with {} increment by {}",
            name, initial_value, increment
        )]
    }

    fn drop_sequence_strings(&self, name: &str) -> Vec<String> {
        vec![format!("drop sequence {}", name)]
    }

    /// Strategy used to read existing sequences.
    fn sequence_information_extractor(&self) -> SequenceInformationExtractorImpl {
        SequenceInformationExtractorImpl::NoOp
    }

    /// Query listing sequences, for the legacy extractor.
    fn query_sequences_string(&self) -> Option<&str> {
        None
    }

    /// Vendor-specific classification, consulted before SQLSTATE classes.
    fn classify_sql_exception(&self, _exception: &SqlException) -> Option<JdbcErrorKind> {
        None
    }

    // ===== Table cleaner =====

    /// Whether referential integrity can be suspended for truncation. When it
    /// cannot, foreign keys are dropped and re-created around truncation.
    fn can_disable_constraints(&self) -> bool {
        false
    }

    fn disable_constraints_statements(&self, _tables: &[String]) -> Vec<String> {
        Vec::new()
    }

    fn truncate_table_statements(&self, tables: &[String]) -> Vec<String> {
        tables
            .iter()
            .map(|t| format!("truncate table {}", t))
            .collect()
    }

    fn enable_constraints_statements(&self, _tables: &[String]) -> Vec<String> {
        Vec::new()
    }
}

/// Dispatch over the built-in dialects.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Postgres(PostgresDialect),
    H2(H2Dialect),
    Mssql(MssqlDialect),
}

impl DialectImpl {
    /// Create a dialect from its name.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Config` if the name is not recognized.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DialectImpl::Postgres(PostgresDialect::new())),
            "h2" => Ok(DialectImpl::H2(H2Dialect::new())),
            "mssql" | "sqlserver" | "sql_server" => Ok(DialectImpl::Mssql(MssqlDialect::new())),
            other => Err(OrmError::Config(format!(
                "Unknown dialect: '{}'. Supported dialects: postgres, h2, mssql",
                other
            ))),
        }
    }

    fn inner(&self) -> &dyn Dialect {
        match self {
            DialectImpl::Postgres(d) => d,
            DialectImpl::H2(d) => d,
            DialectImpl::Mssql(d) => d,
        }
    }
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn quote(&self, name: &str) -> String {
        self.inner().quote(name)
    }

    fn name_storage(&self) -> NameStorageFlags {
        self.inner().name_storage()
    }

    fn keywords(&self) -> &[&'static str] {
        self.inner().keywords()
    }

    fn is_keyword(&self, name: &str) -> bool {
        self.inner().is_keyword(name)
    }

    fn supports_unique_constraint_in_create_table(&self) -> bool {
        self.inner().supports_unique_constraint_in_create_table()
    }

    fn has_alter_table(&self) -> bool {
        self.inner().has_alter_table()
    }

    fn supports_if_exists_before_table_name(&self) -> bool {
        self.inner().supports_if_exists_before_table_name()
    }

    fn supports_if_exists_after_table_name(&self) -> bool {
        self.inner().supports_if_exists_after_table_name()
    }

    fn supports_if_exists_before_constraint_name(&self) -> bool {
        self.inner().supports_if_exists_before_constraint_name()
    }

    fn cascade_constraints_string(&self) -> &str {
        self.inner().cascade_constraints_string()
    }

    fn drop_constraints(&self) -> bool {
        self.inner().drop_constraints()
    }

    fn supports_sequences(&self) -> bool {
        self.inner().supports_sequences()
    }

    fn can_create_schema(&self) -> bool {
        self.inner().can_create_schema()
    }

    fn supports_comment_on(&self) -> bool {
        self.inner().supports_comment_on()
    }

    fn add_column_string(&self) -> &str {
        self.inner().add_column_string()
    }

    fn create_table_string(&self) -> &str {
        self.inner().create_table_string()
    }

    fn table_type_string(&self) -> &str {
        self.inner().table_type_string()
    }

    fn create_schema_command(&self, schema: &str) -> Vec<String> {
        self.inner().create_schema_command(schema)
    }

    fn drop_schema_command(&self, schema: &str) -> Vec<String> {
        self.inner().drop_schema_command(schema)
    }

    fn create_sequence_strings(&self, name: &str, initial_value: i64, increment: i32) -> Vec<String> {
        self.inner()
            .create_sequence_strings(name, initial_value, increment)
    }

    fn drop_sequence_strings(&self, name: &str) -> Vec<String> {
        self.inner().drop_sequence_strings(name)
    }

    fn sequence_information_extractor(&self) -> SequenceInformationExtractorImpl {
        self.inner().sequence_information_extractor()
    }

    fn query_sequences_string(&self) -> Option<&str> {
        self.inner().query_sequences_string()
    }

    fn classify_sql_exception(&self, exception: &SqlException) -> Option<JdbcErrorKind> {
        self.inner().classify_sql_exception(exception)
    }

    fn can_disable_constraints(&self) -> bool {
        self.inner().can_disable_constraints()
    }

    fn disable_constraints_statements(&self, tables: &[String]) -> Vec<String> {
        self.inner().disable_constraints_statements(tables)
    }

    fn truncate_table_statements(&self, tables: &[String]) -> Vec<String> {
        self.inner().truncate_table_statements(tables)
    }

    fn enable_constraints_statements(&self, tables: &[String]) -> Vec<String> {
        self.inner().enable_constraints_statements(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_impl_from_name() {
        assert_eq!(DialectImpl::from_name("postgres").unwrap().name(), "postgres");
        assert_eq!(DialectImpl::from_name("H2").unwrap().name(), "h2");
        assert_eq!(DialectImpl::from_name("sqlserver").unwrap().name(), "mssql");

        // Alternative names
        assert!(DialectImpl::from_name("postgresql").is_ok());
        assert!(DialectImpl::from_name("pg").is_ok());

        // Unknown should error
        let err = DialectImpl::from_name("oracle").unwrap_err();
        assert!(err.to_string().contains("Unknown dialect"));
    }

    #[test]
    fn test_dialect_impl_dispatch() {
        let dialect = DialectImpl::from_name("mssql").unwrap();
        assert_eq!(dialect.quote("table"), "[table]");
        assert_eq!(dialect.add_column_string(), "add");

        let dialect = DialectImpl::from_name("postgres").unwrap();
        assert_eq!(dialect.quote("table"), "\"table\"");
        assert_eq!(dialect.cascade_constraints_string(), " cascade");
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let dialect = DialectImpl::from_name("h2").unwrap();
        assert!(dialect.is_keyword("ORDER"));
        assert!(dialect.is_keyword("user"));
        assert!(!dialect.is_keyword("customer"));
    }
}
