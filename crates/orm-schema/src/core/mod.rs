//! Core value types shared by every component.
//!
//! - [`identifier`]: identifiers with a quoting flag, qualified names
//! - [`model`]: the logical schema (desired state) consumed by schema actions
//! - [`size`]: column sizing
//! - [`value`]: SQL values read from driver rows
//!
//! # Architecture
//!
//! The core module holds no behaviour that depends on a particular database.
//! Dialect-specific rendering lives in [`crate::dialect`], driver access in
//! [`crate::jdbc`].

pub mod identifier;
pub mod model;
pub mod size;
pub mod value;

pub use identifier::{Identifier, NamespaceName, ObjectName};
pub use model::{
    AuxiliaryDatabaseObject, Column, Contributable, Database, Exportable, ForeignKey, Index,
    InitCommand, Namespace, PrimaryKey, Sequence, Table, UniqueKey, DEFAULT_CONTRIBUTOR,
};
pub use size::{LobMultiplier, Size};
pub use value::SqlValue;
