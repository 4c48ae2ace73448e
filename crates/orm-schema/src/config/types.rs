//! Configuration type definitions.

use serde::Deserialize;

use super::settings::Settings;
use crate::core::model::Database;
use crate::jdbc::InMemoryConnection;

/// Root configuration structure.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Dialect name ("postgres", "h2" or "mssql").
    pub dialect: String,

    /// The logical schema.
    pub model: Database,

    /// Snapshot of an existing database. Required by update, validate and
    /// by database targets.
    #[serde(default)]
    pub existing: Option<InMemoryConnection>,

    /// Schema tooling settings (`jakarta.persistence.*`, `hibernate.*`).
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    /// Whether an existing-database snapshot was configured.
    pub fn has_snapshot(&self) -> bool {
        self.existing.is_some()
    }
}
