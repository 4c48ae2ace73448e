//! The driver boundary.
//!
//! Everything that talks to a database goes through [`JdbcConnection`] and
//! [`DatabaseMetaData`]; driver failures are [`SqlException`]s until
//! [`SqlExceptionHelper`] translates them into [`OrmError`](crate::error::OrmError)s.
//!
//! - [`column_name_cache`]: label to position cache shared by result sets
//! - [`environment`]: dialect plus identifier rules of a connection
//! - [`lob`]: BLOB/CLOB/NCLOB proxies and LOB creation
//! - [`memory`]: a connection answering from an in-memory catalog

pub mod column_name_cache;
pub mod environment;
pub mod exception;
pub mod lob;
pub mod memory;
pub mod metadata;
pub mod result_set;

pub use column_name_cache::ColumnNameCache;
pub use environment::JdbcEnvironment;
pub use exception::{JdbcErrorKind, SqlException, SqlExceptionHelper, SqlResult};
pub use memory::{
    ColumnEntry, ForeignKeyEntry, InMemoryConnection, IndexEntry, PrimaryKeyEntry, SchemaEntry,
    SequenceEntry, TableEntry, TableRef,
};
pub use metadata::{labels, DatabaseMetaData, JdbcConnection};
pub use result_set::{ResultSet, RowSet};
