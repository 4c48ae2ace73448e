//! Error types for schema management, result mapping and LOB handling.

use thiserror::Error;

use crate::jdbc::{JdbcErrorKind, SqlException};

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum OrmError {
    /// Configuration error (invalid YAML, unknown setting value, missing target, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Infrastructural failure; the current schema action cannot proceed.
    #[error("Schema management failed: {0}")]
    SchemaManagement(String),

    /// A single DDL command was rejected by its target.
    #[error("{message} [{command}]")]
    CommandAcceptance {
        message: String,
        command: String,
        #[source]
        source: Option<Box<OrmError>>,
    },

    /// Driver failure translated at the JDBC boundary.
    #[error("{message} ({kind}): {source}")]
    Jdbc {
        kind: JdbcErrorKind,
        message: String,
        sql: Option<String>,
        #[source]
        source: SqlException,
    },

    /// Raw driver-level failure raised by LOB accessors.
    #[error(transparent)]
    Sql(#[from] SqlException),

    /// Inconsistent metadata reported by the driver.
    #[error("Schema extraction failed: {0}")]
    SchemaExtraction(String),

    /// The live schema does not match the logical model.
    #[error("Schema-validation: {0}")]
    SchemaValidation(String),

    /// An explicit column alias of a static result mapping is absent from the result set.
    #[error("Could not locate SQL selection for alias [{alias}] ({path})")]
    MissingSqlSelection { alias: String, path: String },

    /// A builder without an alias ran where positional resolution is disabled.
    #[error("{0}")]
    PositionalSelectionsNotAllowed(String),

    /// A static result mapping is internally inconsistent.
    #[error("Result mapping error: {0}")]
    ResultMapping(String),

    /// Programming error: the object is not in a state allowing the call.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Programming error: an argument that may never be absent or malformed.
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// The operation is deliberately not supported by this object.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// IO error (script files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OrmError {
    /// Create a SchemaManagement error
    pub fn schema_management(message: impl Into<String>) -> Self {
        OrmError::SchemaManagement(message.into())
    }

    /// Create a CommandAcceptance error for the given command
    pub fn command_acceptance(
        message: impl Into<String>,
        command: impl Into<String>,
        source: Option<OrmError>,
    ) -> Self {
        OrmError::CommandAcceptance {
            message: message.into(),
            command: command.into(),
            source: source.map(Box::new),
        }
    }

    /// Whether this error concerns a single rejected command (recoverable per handler policy).
    pub fn is_command_acceptance(&self) -> bool {
        matches!(self, OrmError::CommandAcceptance { .. })
    }

    /// Process exit code used by the command-line tool.
    pub fn exit_code(&self) -> u8 {
        match self {
            OrmError::Config(_) | OrmError::Yaml(_) => 2,
            OrmError::SchemaValidation(_) => 3,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, OrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_acceptance_carries_command() {
        let err = OrmError::command_acceptance(
            "Error executing DDL",
            "create table t (id integer)",
            Some(OrmError::Sql(SqlException::new("table exists"))),
        );
        assert!(err.is_command_acceptance());
        assert!(err.to_string().contains("create table t"));
    }

    #[test]
    fn test_format_detailed_walks_chain() {
        let err = OrmError::command_acceptance(
            "Error executing DDL",
            "drop table t",
            Some(OrmError::Sql(SqlException::new("no such table"))),
        );
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: Error executing DDL"));
        assert!(detailed.contains("Caused by:"));
        assert!(detailed.contains("no such table"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(OrmError::Config("x".into()).exit_code(), 2);
        assert_eq!(OrmError::SchemaValidation("x".into()).exit_code(), 3);
        assert_eq!(OrmError::schema_management("x").exit_code(), 1);
    }
}
