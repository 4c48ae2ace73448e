//! Schema-management actions and generation sources, as named in settings.

use std::fmt;

use crate::error::{OrmError, Result};

/// What to do to the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    None,
    /// Create only, without dropping first.
    CreateOnly,
    /// Drop, then create.
    Create,
    /// Drop, create, and drop again when the session factory closes.
    CreateDrop,
    Drop,
    Validate,
    Update,
    Truncate,
    Populate,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::None,
        Action::CreateOnly,
        Action::Create,
        Action::CreateDrop,
        Action::Drop,
        Action::Validate,
        Action::Update,
        Action::Truncate,
        Action::Populate,
    ];

    /// Name used by the `jakarta.persistence.schema-generation.*` settings.
    pub fn external_jpa_name(self) -> Option<&'static str> {
        match self {
            Action::None => Some("none"),
            Action::CreateOnly => Some("create"),
            Action::Create => Some("drop-and-create"),
            Action::Drop => Some("drop"),
            Action::Populate => Some("populate"),
            _ => None,
        }
    }

    /// Name used by `hibernate.hbm2ddl.auto`.
    pub fn external_hbm2ddl_name(self) -> &'static str {
        match self {
            Action::None => "none",
            Action::CreateOnly => "create-only",
            Action::Create => "create",
            Action::CreateDrop => "create-drop",
            Action::Drop => "drop",
            Action::Validate => "validate",
            Action::Update => "update",
            Action::Truncate => "truncate",
            Action::Populate => "populate",
        }
    }

    /// Interpret a JPA action setting. JPA names win, hbm2ddl names are
    /// accepted as a fallback. Blank means `None`.
    pub fn interpret_jpa_setting(value: Option<&str>) -> Result<Action> {
        let Some(name) = normalized(value) else {
            return Ok(Action::None);
        };
        Self::from_jpa_name(&name)
            .or_else(|| Self::from_hbm2ddl_name(&name))
            .ok_or_else(|| {
                OrmError::Config(format!(
                    "Unrecognized jakarta.persistence.schema-generation action: [{}]",
                    name
                ))
            })
    }

    /// Interpret `hibernate.hbm2ddl.auto`. hbm2ddl names win, JPA names are
    /// accepted as a fallback. Blank means `None`.
    pub fn interpret_hbm2ddl_setting(value: Option<&str>) -> Result<Action> {
        let Some(name) = normalized(value) else {
            return Ok(Action::None);
        };
        Self::from_hbm2ddl_name(&name)
            .or_else(|| Self::from_jpa_name(&name))
            .ok_or_else(|| {
                OrmError::Config(format!(
                    "Unrecognized hbm2ddl_auto value: [{}].  Supported values include 'create', \
                     'create-drop', 'create-only', 'drop', 'update', 'none' and 'validate'.",
                    name
                ))
            })
    }

    fn from_jpa_name(name: &str) -> Option<Action> {
        Self::ALL
            .into_iter()
            .find(|a| a.external_jpa_name() == Some(name))
    }

    fn from_hbm2ddl_name(name: &str) -> Option<Action> {
        Self::ALL
            .into_iter()
            .find(|a| a.external_hbm2ddl_name() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.external_hbm2ddl_name())
    }
}

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Where create/drop commands come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Metadata,
    Script,
    MetadataThenScript,
    ScriptThenMetadata,
}

impl SourceType {
    /// Interpret a `create-source`/`drop-source` setting. An absent value
    /// means `Script` when a script is configured and `Metadata` otherwise.
    pub fn interpret(value: Option<&str>, has_script: bool) -> Result<SourceType> {
        let Some(name) = normalized(value) else {
            return Ok(if has_script {
                SourceType::Script
            } else {
                SourceType::Metadata
            });
        };
        match name.as_str() {
            "metadata" => Ok(SourceType::Metadata),
            "script" => Ok(SourceType::Script),
            "metadata-then-script" => Ok(SourceType::MetadataThenScript),
            "script-then-metadata" => Ok(SourceType::ScriptThenMetadata),
            other => Err(OrmError::Config(format!(
                "Unrecognized schema generation source-type value : {}",
                other
            ))),
        }
    }

    pub fn includes_metadata(self) -> bool {
        self != SourceType::Script
    }

    pub fn includes_script(self) -> bool {
        self != SourceType::Metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jpa_names() {
        assert_eq!(Action::interpret_jpa_setting(Some("create")).unwrap(), Action::CreateOnly);
        assert_eq!(
            Action::interpret_jpa_setting(Some("drop-and-create")).unwrap(),
            Action::Create
        );
        assert_eq!(Action::interpret_jpa_setting(Some(" DROP ")).unwrap(), Action::Drop);
        assert_eq!(Action::interpret_jpa_setting(None).unwrap(), Action::None);
        assert_eq!(Action::interpret_jpa_setting(Some("")).unwrap(), Action::None);
        // hbm2ddl names as fallback
        assert_eq!(
            Action::interpret_jpa_setting(Some("create-drop")).unwrap(),
            Action::CreateDrop
        );
    }

    #[test]
    fn test_hbm2ddl_names_win() {
        assert_eq!(Action::interpret_hbm2ddl_setting(Some("create")).unwrap(), Action::Create);
        assert_eq!(Action::interpret_hbm2ddl_setting(Some("update")).unwrap(), Action::Update);
        assert_eq!(
            Action::interpret_hbm2ddl_setting(Some("drop-and-create")).unwrap(),
            Action::Create
        );
    }

    #[test]
    fn test_unknown_action_is_config_error() {
        let err = Action::interpret_hbm2ddl_setting(Some("recreate")).unwrap_err();
        assert!(matches!(err, OrmError::Config(_)));
        assert!(Action::interpret_jpa_setting(Some("sometimes")).is_err());
    }

    #[test]
    fn test_source_type_defaults() {
        assert_eq!(SourceType::interpret(None, false).unwrap(), SourceType::Metadata);
        assert_eq!(SourceType::interpret(None, true).unwrap(), SourceType::Script);
        let st = SourceType::interpret(Some("script-then-metadata"), true).unwrap();
        assert!(st.includes_metadata() && st.includes_script());
        assert!(SourceType::interpret(Some("database"), false).is_err());
    }
}
