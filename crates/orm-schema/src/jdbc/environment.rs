//! The JDBC environment: dialect plus what was learned from the connection.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::exception::SqlExceptionHelper;
use super::metadata::JdbcConnection;
use crate::dialect::ddl::DdlExporter;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::extract::identifier_helper::{IdentifierHelper, NameStorageFlags};

/// Dialect, identifier rules and current namespace of a connection.
#[derive(Clone)]
pub struct JdbcEnvironment {
    dialect: Arc<dyn Dialect>,
    identifier_helper: IdentifierHelper,
}

impl JdbcEnvironment {
    /// Build from driver metadata.
    ///
    /// # Errors
    ///
    /// `Jdbc` when the driver refuses a metadata call.
    pub fn from_connection(dialect: Arc<dyn Dialect>, connection: &dyn JdbcConnection) -> Result<Self> {
        let helper = SqlExceptionHelper::new(dialect.as_ref());
        let convert = |e| helper.convert(e, "Unable to access JDBC metadata", None);
        let metadata = connection.metadata();

        let flags = NameStorageFlags {
            stores_mixed_case_quoted_identifiers: metadata
                .stores_mixed_case_quoted_identifiers()
                .map_err(convert)?,
            stores_lower_case_quoted_identifiers: metadata
                .stores_lower_case_quoted_identifiers()
                .map_err(convert)?,
            stores_upper_case_quoted_identifiers: metadata
                .stores_upper_case_quoted_identifiers()
                .map_err(convert)?,
            stores_upper_case_identifiers: metadata
                .stores_upper_case_identifiers()
                .map_err(convert)?,
            stores_lower_case_identifiers: metadata
                .stores_lower_case_identifiers()
                .map_err(convert)?,
        };

        let mut reserved: Vec<String> = dialect.keywords().iter().map(|k| k.to_string()).collect();
        reserved.extend(crate::dialect::ANSI_SQL_KEYWORDS.iter().map(|k| k.to_string()));
        reserved.extend(metadata.sql_keywords().map_err(convert)?);

        let identifier_helper = IdentifierHelper::new(&flags, reserved);
        let current_catalog = identifier_helper
            .to_identifier(connection.current_catalog().map_err(convert)?.as_deref());
        let current_schema = identifier_helper
            .to_identifier(connection.current_schema().map_err(convert)?.as_deref());
        debug!(
            "JDBC environment: dialect={}, storage={:?}, catalog={:?}, schema={:?}",
            dialect.name(),
            identifier_helper.policy(),
            current_catalog,
            current_schema
        );

        Ok(Self {
            dialect,
            identifier_helper: identifier_helper.with_current(current_catalog, current_schema),
        })
    }

    /// Build without a connection, from the dialect's defaults.
    pub fn offline(dialect: Arc<dyn Dialect>) -> Self {
        let reserved: Vec<String> = dialect
            .keywords()
            .iter()
            .chain(crate::dialect::ANSI_SQL_KEYWORDS.iter())
            .map(|k| k.to_string())
            .collect();
        let identifier_helper = IdentifierHelper::new(&dialect.name_storage(), reserved);
        Self {
            dialect,
            identifier_helper,
        }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn shared_dialect(&self) -> Arc<dyn Dialect> {
        Arc::clone(&self.dialect)
    }

    pub fn identifier_helper(&self) -> &IdentifierHelper {
        &self.identifier_helper
    }

    pub fn sql_exception_helper(&self) -> SqlExceptionHelper<'_> {
        SqlExceptionHelper::new(self.dialect.as_ref())
    }

    pub fn ddl(&self) -> DdlExporter<'_> {
        DdlExporter::new(self.dialect.as_ref())
    }
}

impl fmt::Debug for JdbcEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JdbcEnvironment")
            .field("dialect", &self.dialect.name())
            .field("identifier_helper", &self.identifier_helper)
            .finish()
    }
}
