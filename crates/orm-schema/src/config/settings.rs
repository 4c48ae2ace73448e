//! Setting names and the settings map consumed by schema tooling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// JPA (jakarta) settings
pub const JAKARTA_HBM2DDL_DATABASE_ACTION: &str =
    "jakarta.persistence.schema-generation.database.action";
pub const JAKARTA_HBM2DDL_SCRIPTS_ACTION: &str =
    "jakarta.persistence.schema-generation.scripts.action";
pub const JAKARTA_HBM2DDL_CREATE_SOURCE: &str =
    "jakarta.persistence.schema-generation.create-source";
pub const JAKARTA_HBM2DDL_DROP_SOURCE: &str = "jakarta.persistence.schema-generation.drop-source";
pub const JAKARTA_HBM2DDL_CREATE_SCRIPT_SOURCE: &str =
    "jakarta.persistence.schema-generation.create-script-source";
pub const JAKARTA_HBM2DDL_DROP_SCRIPT_SOURCE: &str =
    "jakarta.persistence.schema-generation.drop-script-source";
pub const JAKARTA_HBM2DDL_SCRIPTS_CREATE_TARGET: &str =
    "jakarta.persistence.schema-generation.scripts.create-target";
pub const JAKARTA_HBM2DDL_SCRIPTS_DROP_TARGET: &str =
    "jakarta.persistence.schema-generation.scripts.drop-target";
pub const JAKARTA_HBM2DDL_LOAD_SCRIPT_SOURCE: &str = "jakarta.persistence.sql-load-script-source";
pub const JAKARTA_HBM2DDL_CREATE_SCHEMAS: &str = "jakarta.persistence.create-database-schemas";

// Legacy JPA (javax) settings
pub const HBM2DDL_DATABASE_ACTION: &str = "javax.persistence.schema-generation.database.action";
pub const HBM2DDL_SCRIPTS_ACTION: &str = "javax.persistence.schema-generation.scripts.action";
pub const HBM2DDL_CREATE_SOURCE: &str = "javax.persistence.schema-generation.create-source";
pub const HBM2DDL_DROP_SOURCE: &str = "javax.persistence.schema-generation.drop-source";
pub const HBM2DDL_CREATE_SCRIPT_SOURCE: &str =
    "javax.persistence.schema-generation.create-script-source";
pub const HBM2DDL_DROP_SCRIPT_SOURCE: &str =
    "javax.persistence.schema-generation.drop-script-source";
pub const HBM2DDL_SCRIPTS_CREATE_TARGET: &str =
    "javax.persistence.schema-generation.scripts.create-target";
pub const HBM2DDL_SCRIPTS_DROP_TARGET: &str =
    "javax.persistence.schema-generation.scripts.drop-target";
pub const HBM2DDL_LOAD_SCRIPT_SOURCE: &str = "javax.persistence.sql-load-script-source";
pub const HBM2DDL_CREATE_SCHEMAS: &str = "javax.persistence.create-database-schemas";

// Native settings
pub const HBM2DDL_AUTO: &str = "hibernate.hbm2ddl.auto";
pub const HBM2DDL_HALT_ON_ERROR: &str = "hibernate.hbm2ddl.halt_on_error";
pub const HBM2DDL_CREATE_NAMESPACES: &str = "hibernate.hbm2ddl.create_namespaces";
pub const HBM2DDL_DELIMITER: &str = "hibernate.hbm2ddl.delimiter";
pub const HBM2DDL_CHARSET_NAME: &str = "hibernate.hbm2ddl.charset_name";
pub const HBM2DDL_IMPORT_FILES: &str = "hibernate.hbm2ddl.import_files";
pub const HBM2DDL_IMPORT_FILES_SQL_EXTRACTOR: &str =
    "hibernate.hbm2ddl.import_files_sql_extractor";
pub const HBM2DDL_SCRIPTS_CREATE_APPEND: &str = "hibernate.hbm2ddl.schema-generation.script.append";
pub const FORMAT_SQL: &str = "hibernate.format_sql";
pub const UNIQUE_CONSTRAINT_SCHEMA_UPDATE_STRATEGY: &str =
    "hibernate.schema_update.unique_constraint_strategy";
pub const NON_CONTEXTUAL_LOB_CREATION: &str = "hibernate.jdbc.lob.non_contextual_creation";

/// String-keyed settings with scalar values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<String, serde_yaml::Value>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// A scalar setting as text. Blank values count as absent.
    pub fn get_str(&self, key: &str) -> Option<String> {
        let text = match self.values.get(key)? {
            serde_yaml::Value::String(s) => s.clone(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// A boolean setting; `true`/`false` in any case, as bool or string.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            serde_yaml::Value::Bool(b) => Some(*b),
            _ => match self.get_str(key)?.to_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Comma-separated list setting.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get_str(key)
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The first of `keys` that is set, with the key that matched.
    pub fn first_of<'k>(&self, keys: &[&'k str]) -> Option<(&'k str, String)> {
        keys.iter()
            .find_map(|key| self.get_str(key).map(|value| (*key, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let settings: Settings = serde_yaml::from_str(
            r#"
hibernate.format_sql: true
hibernate.hbm2ddl.halt_on_error: "FALSE"
hibernate.hbm2ddl.delimiter: ";"
hibernate.hbm2ddl.import_files: "a.sql, b.sql,"
hibernate.hbm2ddl.auto: "  "
"#,
        )
        .unwrap();
        assert_eq!(settings.get_bool(FORMAT_SQL), Some(true));
        assert!(!settings.get_bool_or(HBM2DDL_HALT_ON_ERROR, true));
        assert_eq!(settings.get_str(HBM2DDL_DELIMITER).as_deref(), Some(";"));
        assert_eq!(settings.get_list(HBM2DDL_IMPORT_FILES), vec!["a.sql", "b.sql"]);
        assert_eq!(settings.get_str(HBM2DDL_AUTO), None);
        assert!(settings.contains_key(HBM2DDL_AUTO));
    }

    #[test]
    fn test_first_of_reports_matching_key() {
        let settings = Settings::new().with(HBM2DDL_DATABASE_ACTION, "create");
        let found = settings.first_of(&[JAKARTA_HBM2DDL_DATABASE_ACTION, HBM2DDL_DATABASE_ACTION]);
        assert_eq!(found, Some((HBM2DDL_DATABASE_ACTION, "create".to_string())));
        assert_eq!(settings.first_of(&[HBM2DDL_AUTO]), None);
    }
}
