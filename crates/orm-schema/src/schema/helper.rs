//! Plumbing shared by the schema actions: broadcasting commands, export
//! identifier tracking, import scripts and setting resolution.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::exception_handler::{ExceptionHandler, ExceptionHandlerHaltImpl, ExceptionHandlerLoggedImpl};
use super::formatter::Formatter;
use super::options::{ContributableMatcher, ExecutionOptions};
use super::script::{Charset, ScriptSourceInput, SqlScriptCommandExtractorImpl};
use super::target::GenerationTarget;
use crate::config::settings::{self, Settings};
use crate::core::identifier::NamespaceName;
use crate::core::model::{Namespace, Sequence, Table};
use crate::error::{OrmError, Result};

/// Send one command to every target.
///
/// A rejected command goes to the exception handler, unless `quiet`, in
/// which case it is only logged. Other failures propagate.
pub(crate) fn apply_sql_string(
    quiet: bool,
    sql: &str,
    formatter: Formatter,
    options: &ExecutionOptions<'_>,
    targets: &mut [&mut dyn GenerationTarget],
) -> Result<()> {
    if sql.trim().is_empty() {
        return Ok(());
    }
    let formatted = formatter.format(sql);
    for target in targets.iter_mut() {
        if let Err(e) = target.accept(&formatted) {
            if !e.is_command_acceptance() {
                return Err(e);
            }
            if quiet {
                debug!("Ignoring failure of quietly applied command: {}", e);
            } else {
                options.exception_handler().handle_exception(e)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn apply_sql_strings<S: AsRef<str>>(
    quiet: bool,
    statements: impl IntoIterator<Item = S>,
    formatter: Formatter,
    options: &ExecutionOptions<'_>,
    targets: &mut [&mut dyn GenerationTarget],
) -> Result<()> {
    for sql in statements {
        apply_sql_string(quiet, sql.as_ref(), formatter, options, targets)?;
    }
    Ok(())
}

/// Record an export identifier; a second registration is an error.
pub(crate) fn check_export_identifier(
    export_identifier: String,
    export_identifiers: &mut HashSet<String>,
) -> Result<()> {
    if !export_identifiers.insert(export_identifier.clone()) {
        return Err(OrmError::schema_management(format!(
            "SQL strings added more than once for: {}",
            export_identifier
        )));
    }
    Ok(())
}

pub(crate) fn namespace_export_identifier(name: &NamespaceName) -> String {
    name.catalog
        .iter()
        .chain(name.schema.iter())
        .map(|part| part.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Physical tables of `namespace` selected by the matcher and schema filter.
pub(crate) fn included_tables<'m>(
    namespace: &'m Namespace,
    options: &ExecutionOptions<'_>,
    matcher: &ContributableMatcher,
) -> Vec<&'m Table> {
    namespace
        .tables
        .iter()
        .filter(|t| t.physical && matcher.matches(*t) && options.schema_filter().include_table(t))
        .collect()
}

pub(crate) fn included_sequences<'m>(
    namespace: &'m Namespace,
    options: &ExecutionOptions<'_>,
    matcher: &ContributableMatcher,
) -> Vec<&'m Sequence> {
    namespace
        .sequences
        .iter()
        .filter(|s| matcher.matches(*s) && options.schema_filter().include_sequence(s))
        .collect()
}

/// Namespaces passing the schema filter.
pub(crate) fn included_namespaces<'m>(
    namespaces: &'m [Namespace],
    options: &ExecutionOptions<'_>,
) -> Vec<&'m Namespace> {
    namespaces
        .iter()
        .filter(|n| options.schema_filter().include_namespace(n))
        .collect()
}

/// Apply every command of a script.
pub(crate) fn apply_script(
    script: &ScriptSourceInput,
    extractor: &SqlScriptCommandExtractorImpl,
    formatter: Formatter,
    options: &ExecutionOptions<'_>,
    targets: &mut [&mut dyn GenerationTarget],
) -> Result<()> {
    let commands = script.read(extractor)?;
    debug!("Applying {} commands from script {}", commands.len(), script);
    apply_sql_strings(false, &commands, formatter, options, targets)
}

/// Apply the JPA load script, then `hibernate.hbm2ddl.import_files`.
/// Import files that do not exist are skipped.
pub(crate) fn apply_import_sources(
    options: &ExecutionOptions<'_>,
    formatter: Formatter,
    targets: &mut [&mut dyn GenerationTarget],
) -> Result<()> {
    let settings = options.settings();
    let charset = Charset::from_settings(settings)?;
    let extractor = SqlScriptCommandExtractorImpl::from_settings(settings)?;

    if let Some(load_script) = resolve_jpa_setting(
        settings,
        settings::JAKARTA_HBM2DDL_LOAD_SCRIPT_SOURCE,
        settings::HBM2DDL_LOAD_SCRIPT_SOURCE,
    ) {
        let source = ScriptSourceInput::from_file(load_script, charset);
        apply_script(&source, &extractor, formatter, options, targets)?;
    }

    for file in settings.get_list(settings::HBM2DDL_IMPORT_FILES) {
        let source = ScriptSourceInput::from_file(&file, charset);
        if !source.exists() {
            debug!("Skipping import file {} as it does not exist", file);
            continue;
        }
        apply_script(&source, &extractor, formatter, options, targets)?;
    }
    Ok(())
}

/// Resolve a setting that exists under both `jakarta.*` and the deprecated
/// `javax.*` name.
pub fn resolve_jpa_setting(settings: &Settings, jakarta: &str, javax: &str) -> Option<String> {
    if let Some(value) = settings.get_str(jakarta) {
        return Some(value);
    }
    let value = settings.get_str(javax)?;
    warn!(
        "{} is deprecated and will be removed; use {} instead",
        javax, jakarta
    );
    Some(value)
}

/// Whether actions should create and drop schemas.
pub fn should_manage_namespaces(settings: &Settings) -> bool {
    settings
        .get_bool(settings::HBM2DDL_CREATE_NAMESPACES)
        .or_else(|| settings.get_bool(settings::JAKARTA_HBM2DDL_CREATE_SCHEMAS))
        .or_else(|| settings.get_bool(settings::HBM2DDL_CREATE_SCHEMAS))
        .unwrap_or(false)
}

/// Halt on error when `hibernate.hbm2ddl.halt_on_error` is true, otherwise
/// log and continue.
pub fn exception_handler_for(settings: &Settings) -> &'static dyn ExceptionHandler {
    if settings.get_bool_or(settings::HBM2DDL_HALT_ON_ERROR, false) {
        &ExceptionHandlerHaltImpl
    } else {
        &ExceptionHandlerLoggedImpl
    }
}
