//! Extraction of live database metadata.
//!
//! - [`identifier_helper`]: literal names to and from [`Identifier`](crate::core::Identifier)s
//! - [`information`]: snapshot types (tables, columns, keys, sequences)
//! - [`database_information`]: the snapshot itself, loading lazily per table
//! - [`sequence`]: per-dialect sequence extraction

pub mod database_information;
pub mod identifier_helper;
pub mod information;
pub mod sequence;

pub use database_information::{DatabaseInformation, DatabaseInformationBuilder, TableView};
pub use identifier_helper::{
    IdentifierCaseStrategy, IdentifierHelper, NameStorageFlags, NameStoragePolicy,
};
pub use information::{
    ColumnInformation, ColumnReferenceMapping, ForeignKeyInformation, IndexInformation,
    PhysicalTableName, PrimaryKeyInformation, SequenceInformation, TableInformation, TruthValue,
};
pub use sequence::{SequenceInformationExtractor, SequenceInformationExtractorImpl};

use crate::jdbc::{JdbcConnection, JdbcEnvironment};

/// Environment and connection an extraction runs against.
#[derive(Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub environment: &'a JdbcEnvironment,
    pub connection: &'a dyn JdbcConnection,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(environment: &'a JdbcEnvironment, connection: &'a dyn JdbcConnection) -> Self {
        Self {
            environment,
            connection,
        }
    }
}

impl std::fmt::Debug for ExtractionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionContext")
            .field("environment", self.environment)
            .finish_non_exhaustive()
    }
}
