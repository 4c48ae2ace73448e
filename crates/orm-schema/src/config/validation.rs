//! Configuration validation.

use super::settings;
use super::Config;
use crate::dialect::DialectImpl;
use crate::error::{OrmError, Result};
use crate::schema::action::Action;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    DialectImpl::from_name(&config.dialect)?;

    if config.model.tables().next().is_none() && config.model.auxiliary_objects().is_empty() {
        return Err(OrmError::Config(
            "model must define at least one table or auxiliary object".into(),
        ));
    }

    for table in config.model.tables() {
        for foreign_key in &table.foreign_keys {
            let referenced = foreign_key.referenced_table_name(table);
            if config.model.locate_table(&referenced).is_none() {
                return Err(OrmError::Config(format!(
                    "foreign key {} on table {} references unknown table {}",
                    foreign_key.name,
                    table.qualified_name(),
                    referenced
                )));
            }
            if !foreign_key.referenced_columns.is_empty()
                && foreign_key.referenced_columns.len() != foreign_key.columns.len()
            {
                return Err(OrmError::Config(format!(
                    "foreign key {} on table {} maps {} columns to {} referenced columns",
                    foreign_key.name,
                    table.qualified_name(),
                    foreign_key.columns.len(),
                    foreign_key.referenced_columns.len()
                )));
            }
        }
    }

    // Action settings, including contributor-scoped variants
    for key in config.settings.keys() {
        let value = config.settings.get_str(key);
        if is_setting_or_scoped(key, settings::HBM2DDL_AUTO) {
            Action::interpret_hbm2ddl_setting(value.as_deref())?;
        } else if [
            settings::JAKARTA_HBM2DDL_DATABASE_ACTION,
            settings::JAKARTA_HBM2DDL_SCRIPTS_ACTION,
            settings::HBM2DDL_DATABASE_ACTION,
            settings::HBM2DDL_SCRIPTS_ACTION,
        ]
        .iter()
        .any(|base| is_setting_or_scoped(key, base))
        {
            Action::interpret_jpa_setting(value.as_deref())?;
        }
    }

    Ok(())
}

fn is_setting_or_scoped(key: &str, base: &str) -> bool {
    key == base
        || key
            .strip_prefix(base)
            .map_or(false, |rest| rest.starts_with('.') && rest.len() > 1)
}
