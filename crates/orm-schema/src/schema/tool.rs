//! Entry point handing out the schema actions and building their targets.

use std::sync::Arc;

use super::creator::SchemaCreator;
use super::dropper::SchemaDropper;
use super::migrator::SchemaMigrator;
use super::populator::SchemaPopulator;
use super::target::{
    GenerationTarget, GenerationTargetToDatabase, GenerationTargetToScript, GenerationTargetToStdout,
    TargetDescriptor, TargetType,
};
use super::truncator::SchemaTruncator;
use super::validator::SchemaValidator;
use crate::config::settings::{self, Settings};
use crate::dialect::Dialect;
use crate::error::{OrmError, Result};
use crate::extract::ExtractionContext;
use crate::jdbc::{JdbcConnection, JdbcEnvironment};

/// Bundles the environment with an optional connection. Actions that
/// read the database (migrate, validate) or execute against it need the
/// connection; script and stdout generation do not.
pub struct SchemaManagementTool<'c> {
    environment: JdbcEnvironment,
    connection: Option<&'c dyn JdbcConnection>,
}

impl<'c> SchemaManagementTool<'c> {
    pub fn new(environment: JdbcEnvironment, connection: Option<&'c dyn JdbcConnection>) -> Self {
        Self {
            environment,
            connection,
        }
    }

    /// A tool that can only generate scripts.
    pub fn offline(dialect: Arc<dyn Dialect>) -> Self {
        Self::new(JdbcEnvironment::offline(dialect), None)
    }

    /// A tool bound to a live connection.
    ///
    /// # Errors
    ///
    /// `Jdbc` when the connection's metadata cannot be read.
    pub fn connected(dialect: Arc<dyn Dialect>, connection: &'c dyn JdbcConnection) -> Result<Self> {
        let environment = JdbcEnvironment::from_connection(dialect, connection)?;
        Ok(Self::new(environment, Some(connection)))
    }

    pub fn environment(&self) -> &JdbcEnvironment {
        &self.environment
    }

    /// # Errors
    ///
    /// `SchemaManagement` when the tool has no connection.
    pub fn connection(&self) -> Result<&'c dyn JdbcConnection> {
        self.connection.ok_or_else(|| {
            OrmError::schema_management("Schema management requires a database connection")
        })
    }

    pub fn extraction_context(&self) -> Result<ExtractionContext<'_>> {
        Ok(ExtractionContext::new(&self.environment, self.connection()?))
    }

    pub fn schema_creator(&self) -> SchemaCreator<'_> {
        SchemaCreator::new(&self.environment)
    }

    pub fn schema_dropper(&self) -> SchemaDropper<'_> {
        SchemaDropper::new(&self.environment)
    }

    pub fn schema_migrator(&self) -> Result<SchemaMigrator<'_>> {
        Ok(SchemaMigrator::new(self.extraction_context()?))
    }

    pub fn schema_validator(&self) -> Result<SchemaValidator<'_>> {
        Ok(SchemaValidator::new(self.extraction_context()?))
    }

    pub fn schema_truncator(&self) -> SchemaTruncator<'_> {
        SchemaTruncator::new(&self.environment)
    }

    pub fn schema_populator(&self) -> SchemaPopulator {
        SchemaPopulator::new()
    }

    /// One target per requested type. Script and stdout targets end each
    /// command with `hibernate.hbm2ddl.delimiter` when set.
    ///
    /// # Errors
    ///
    /// `Config` when a script target is requested without an output, and
    /// `SchemaManagement` when a database target is requested without a
    /// connection.
    pub fn build_generation_targets(
        &self,
        descriptor: TargetDescriptor,
        settings: &Settings,
    ) -> Result<Vec<Box<dyn GenerationTarget + 'c>>> {
        let delimiter = settings.get_str(settings::HBM2DDL_DELIMITER);
        let TargetDescriptor {
            target_types,
            mut script_output,
        } = descriptor;

        let mut targets: Vec<Box<dyn GenerationTarget + 'c>> = Vec::with_capacity(target_types.len());
        for target_type in target_types {
            match target_type {
                TargetType::Database => {
                    targets.push(Box::new(GenerationTargetToDatabase::new(
                        self.connection()?,
                        self.environment.shared_dialect(),
                    )));
                }
                TargetType::Script => {
                    let output = script_output.take().ok_or_else(|| {
                        OrmError::Config(
                            "Writing to script was requested, but no script file was specified"
                                .into(),
                        )
                    })?;
                    targets.push(Box::new(GenerationTargetToScript::new(output, delimiter.clone())));
                }
                TargetType::Stdout => {
                    targets.push(Box::new(GenerationTargetToStdout::new(delimiter.clone())));
                }
            }
        }
        Ok(targets)
    }
}

impl std::fmt::Debug for SchemaManagementTool<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaManagementTool")
            .field("environment", &self.environment)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::H2Dialect;
    use crate::extract::NameStorageFlags;
    use crate::jdbc::InMemoryConnection;
    use crate::schema::target::target_refs;
    use std::collections::BTreeSet;

    #[test]
    fn test_offline_tool_cannot_target_database() {
        let tool = SchemaManagementTool::offline(Arc::new(H2Dialect::new()));
        assert!(tool.schema_validator().is_err());
        let err = tool
            .build_generation_targets(TargetDescriptor::database(), &Settings::new())
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Schema management failed: Schema management requires a database connection"
        );
    }

    #[test]
    fn test_script_target_requires_output() {
        let tool = SchemaManagementTool::offline(Arc::new(H2Dialect::new()));
        let descriptor = TargetDescriptor {
            target_types: BTreeSet::from([TargetType::Script]),
            script_output: None,
        };
        let err = tool
            .build_generation_targets(descriptor, &Settings::new())
            .err()
            .unwrap();
        assert!(matches!(err, OrmError::Config(_)));
    }

    #[test]
    fn test_database_target_executes() {
        let connection = InMemoryConnection::new(NameStorageFlags::default());
        let tool = SchemaManagementTool::connected(Arc::new(H2Dialect::new()), &connection).unwrap();
        let mut boxed = tool
            .build_generation_targets(TargetDescriptor::database(), &Settings::new())
            .unwrap();
        let mut targets = target_refs(&mut boxed);
        targets[0].accept("create table t (id int)").unwrap();
        assert_eq!(connection.executed(), vec!["create table t (id int)"]);
    }
}
