//! # orm-schema
//!
//! Schema management and result-set mapping for relational persistence.
//!
//! This library provides:
//!
//! - **Metadata extraction** of an existing database into a normalized snapshot
//! - **Schema actions**: create, drop, migrate, validate, truncate and populate
//!   a database from a logical model, to live connections or script files
//! - **Settings coordination** of `jakarta.persistence.*`, `javax.persistence.*`
//!   and `hibernate.hbm2ddl.*` actions per contributor
//! - **Result mapping** of static result-set mappings onto typed object graphs
//! - **LOB proxies** for BLOB/CLOB/NCLOB values created without a connection
//!
//! ## Example
//!
//! ```rust,no_run
//! use orm_schema::{Config, SchemaManagementTool, TargetDescriptor};
//! use orm_schema::dialect::DialectImpl;
//! use orm_schema::schema::{
//!     target_refs, ContributableMatcher, ExceptionHandlerHaltImpl, ExecutionOptions,
//!     SourceDescriptor,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> orm_schema::Result<()> {
//!     let config = Config::load("schema.yaml")?;
//!     let tool = SchemaManagementTool::offline(Arc::new(DialectImpl::from_name(&config.dialect)?));
//!     let options = ExecutionOptions::new(&config.settings, &ExceptionHandlerHaltImpl);
//!     let mut targets = tool.build_generation_targets(TargetDescriptor::stdout(), &config.settings)?;
//!     tool.schema_creator().do_creation(
//!         &config.model,
//!         &options,
//!         &ContributableMatcher::All,
//!         &SourceDescriptor::metadata(),
//!         &mut target_refs(&mut targets),
//!     )
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod error;
pub mod extract;
pub mod jdbc;
pub mod results;
pub mod schema;

// Re-exports for convenient access
pub use config::{Config, Settings};
pub use crate::core::{Database, Identifier, Namespace, ObjectName, SqlValue, Table};
pub use dialect::{Dialect, DialectImpl};
pub use error::{OrmError, Result};
pub use extract::{DatabaseInformation, ExtractionContext};
pub use jdbc::{InMemoryConnection, JdbcConnection, JdbcEnvironment};
pub use results::{MappingMetamodel, ResultSetMapping, ResultSetMappingDescriptor};
pub use schema::{Action, SchemaManagementTool, TargetDescriptor};
