//! Driver-level failures and their translation.
//!
//! Every call on the driver-facing traits returns [`SqlResult`]. Above the
//! JDBC-facing layer these are converted by [`SqlExceptionHelper`] into
//! [`OrmError::Jdbc`], classified by SQLSTATE after the dialect had a chance
//! to classify vendor-specific codes.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::dialect::Dialect;
use crate::error::OrmError;

/// Result of a driver-facing call.
pub type SqlResult<T> = std::result::Result<T, SqlException>;

/// A failure reported by the driver.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct SqlException {
    message: String,
    sql_state: Option<String>,
    vendor_code: i32,
    #[source]
    cause: Option<Box<dyn StdError + Send + Sync>>,
    warnings: Vec<String>,
}

impl SqlException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            vendor_code: 0,
            cause: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    pub fn with_vendor_code(mut self, vendor_code: i32) -> Self {
        self.vendor_code = vendor_code;
        self
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Attach a chained driver warning.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    pub fn vendor_code(&self) -> i32 {
        self.vendor_code
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Two-character SQLSTATE class, if a state is present.
    pub fn sql_state_class(&self) -> Option<&str> {
        self.sql_state
            .as_deref()
            .filter(|s| s.len() >= 2)
            .map(|s| &s[..2])
    }
}

/// Classification of a translated driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JdbcErrorKind {
    Connection,
    Data,
    ConstraintViolation,
    LockAcquisition,
    Grammar,
    Generic,
}

impl JdbcErrorKind {
    /// Classify by SQLSTATE class alone.
    pub fn from_sql_state_class(class: Option<&str>) -> Self {
        match class {
            Some("08") => JdbcErrorKind::Connection,
            Some("22") => JdbcErrorKind::Data,
            Some("23") => JdbcErrorKind::ConstraintViolation,
            Some("40") => JdbcErrorKind::LockAcquisition,
            Some("42") | Some("37") => JdbcErrorKind::Grammar,
            _ => JdbcErrorKind::Generic,
        }
    }
}

impl fmt::Display for JdbcErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JdbcErrorKind::Connection => "connection",
            JdbcErrorKind::Data => "data",
            JdbcErrorKind::ConstraintViolation => "constraint violation",
            JdbcErrorKind::LockAcquisition => "lock acquisition",
            JdbcErrorKind::Grammar => "SQL grammar",
            JdbcErrorKind::Generic => "generic JDBC",
        };
        write!(f, "{}", label)
    }
}

/// Converts [`SqlException`]s into [`OrmError::Jdbc`].
#[derive(Clone, Copy)]
pub struct SqlExceptionHelper<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlExceptionHelper<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Translate a driver failure, attaching a context message and the
    /// statement that was running, if any.
    pub fn convert(
        &self,
        exception: SqlException,
        message: impl Into<String>,
        sql: Option<&str>,
    ) -> OrmError {
        let message = message.into();
        for warning in exception.warnings() {
            warn!("SQL Warning: {}", warning);
        }
        warn!(
            "SQL Error: {}, SQLState: {}",
            exception.vendor_code(),
            exception.sql_state().unwrap_or("<none>")
        );
        let kind = self.dialect.classify_sql_exception(&exception).unwrap_or_else(|| {
            JdbcErrorKind::from_sql_state_class(exception.sql_state_class())
        });
        OrmError::Jdbc {
            kind,
            message,
            sql: sql.map(str::to_string),
            source: exception,
        }
    }
}

impl fmt::Debug for SqlExceptionHelper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlExceptionHelper")
            .field("dialect", &self.dialect.name())
            .finish()
    }
}
