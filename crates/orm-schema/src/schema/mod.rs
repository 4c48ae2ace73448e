//! Schema management: create, drop, migrate, validate, truncate and
//! populate a database from the logical model.
//!
//! Every action broadcasts its commands to a set of [`GenerationTarget`]s
//! and hands rejected commands to an [`ExceptionHandler`].
//! [`coordinator::process`] maps settings to actions.

pub mod action;
pub mod coordinator;
pub mod creator;
pub mod dropper;
pub mod exception_handler;
pub mod formatter;
mod helper;
pub mod migrator;
pub mod options;
pub mod populator;
pub mod script;
pub mod target;
pub mod tool;
pub mod truncator;
pub mod validator;

pub use action::{Action, SourceType};
pub use coordinator::{process, ActionGrouping};
pub use creator::SchemaCreator;
pub use dropper::{DelayedDropAction, DelayedDropActions, DelayedDropRegistry, SchemaDropper};
pub use exception_handler::{
    ExceptionHandler, ExceptionHandlerCollectingImpl, ExceptionHandlerHaltImpl,
    ExceptionHandlerLoggedImpl,
};
pub use formatter::Formatter;
pub use helper::{exception_handler_for, resolve_jpa_setting, should_manage_namespaces};
pub use migrator::SchemaMigrator;
pub use options::{
    ContributableMatcher, DefaultSchemaFilter, ExecutionOptions, SchemaFilter, SourceDescriptor,
    UniqueConstraintSchemaUpdateStrategy,
};
pub use populator::SchemaPopulator;
pub use script::{
    Charset, MultiLineSqlScriptExtractor, ScriptSourceInput, ScriptTargetOutput,
    SingleLineSqlScriptExtractor, SqlScriptCommandExtractor, SqlScriptCommandExtractorImpl,
};
pub use target::{
    target_refs, GenerationTarget, GenerationTargetCollector, GenerationTargetToDatabase,
    GenerationTargetToScript, GenerationTargetToStdout, TargetDescriptor, TargetType,
};
pub use tool::SchemaManagementTool;
pub use truncator::SchemaTruncator;
pub use validator::SchemaValidator;
