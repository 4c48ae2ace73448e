//! Identifiers and qualified object names.
//!
//! An [`Identifier`] is a piece of name text plus a flag recording whether it
//! was quoted. Two identifiers are equal when their *canonical* names are
//! equal: quoted identifiers compare exactly, unquoted identifiers compare
//! case-insensitively. This mirrors how databases fold unquoted names.
//!
//! # Security
//!
//! Identifiers cannot be bound as statement parameters, so every name that
//! ends up in generated DDL is validated (no NUL bytes, bounded length) and
//! rendered through the dialect's quoting rules.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{OrmError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - H2: 256 characters
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding maximum length
///
/// # Errors
///
/// Returns `OrmError::Config` for invalid identifiers with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(OrmError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(OrmError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(OrmError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote with ANSI double quotes, doubling embedded quotes.
pub fn quote_ansi(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote with SQL Server brackets, doubling embedded closing brackets.
pub fn quote_brackets(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// A name with a quoting flag.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    text: String,
    quoted: bool,
}

impl Identifier {
    /// Create an identifier from raw text and an explicit quoting flag.
    pub fn new(text: impl Into<String>, quoted: bool) -> Self {
        Self {
            text: text.into(),
            quoted,
        }
    }

    /// Unquoted identifier.
    pub fn unquoted(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }

    /// Quoted identifier.
    pub fn quoted(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }

    /// Interpret name text, recognising `"x"`, `` `x` `` and `[x]` as quoted.
    ///
    /// Blank text yields `None`.
    pub fn to_identifier(text: &str) -> Option<Identifier> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.len() >= 2 {
            let first = trimmed.as_bytes()[0];
            let last = trimmed.as_bytes()[trimmed.len() - 1];
            if matches!((first, last), (b'"', b'"') | (b'`', b'`') | (b'[', b']')) {
                return Some(Identifier::quoted(&trimmed[1..trimmed.len() - 1]));
            }
        }
        Some(Identifier::unquoted(trimmed))
    }

    /// The raw text, without quotes.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the identifier was quoted.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Exact text when quoted, lower-cased text otherwise.
    pub fn canonical_name(&self) -> String {
        if self.quoted {
            self.text.clone()
        } else {
            self.text.to_lowercase()
        }
    }

    /// Render for SQL with the given dialect's quoting.
    pub fn render(&self, dialect: &dyn Dialect) -> String {
        if self.quoted {
            dialect.quote(&self.text)
        } else {
            self.text.clone()
        }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_name() == other.canonical_name()
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_name().hash(state);
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.canonical_name().cmp(&other.canonical_name())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "`{}`", self.text)
        } else {
            write!(f, "{}", self.text)
        }
    }
}

impl TryFrom<String> for Identifier {
    type Error = OrmError;

    fn try_from(value: String) -> Result<Self> {
        let identifier = Identifier::to_identifier(&value)
            .ok_or_else(|| OrmError::Config("Identifier cannot be empty".to_string()))?;
        validate_identifier(identifier.text())?;
        Ok(identifier)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.to_string()
    }
}

/// Catalog/schema pair naming a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NamespaceName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Identifier>,
}

impl NamespaceName {
    pub fn new(catalog: Option<Identifier>, schema: Option<Identifier>) -> Self {
        Self { catalog, schema }
    }

    /// Whether neither catalog nor schema is given (the connection default).
    pub fn is_default(&self) -> bool {
        self.catalog.is_none() && self.schema.is_none()
    }
}

/// Qualified catalog/schema/name triple of a table, sequence or other object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Identifier>,
    pub name: Identifier,
}

impl ObjectName {
    pub fn new(catalog: Option<Identifier>, schema: Option<Identifier>, name: Identifier) -> Self {
        Self {
            catalog,
            schema,
            name,
        }
    }

    /// Unqualified name.
    pub fn simple(name: Identifier) -> Self {
        Self::new(None, None, name)
    }

    /// Parse `catalog.schema.name`, `schema.name` or `name`.
    pub fn parse(text: &str) -> Result<Self> {
        fn ident(s: &str) -> Result<Identifier> {
            Identifier::try_from(s.to_string())
        }
        let parts: Vec<&str> = text.split('.').collect();
        match parts.as_slice() {
            [name] => Ok(Self::simple(ident(name)?)),
            [schema, name] => Ok(Self::new(None, Some(ident(schema)?), ident(name)?)),
            [catalog, schema, name] => Ok(Self::new(
                Some(ident(catalog)?),
                Some(ident(schema)?),
                ident(name)?,
            )),
            _ => Err(OrmError::Config(format!("Invalid qualified name: {:?}", text))),
        }
    }

    /// The namespace part of this name.
    pub fn namespace(&self) -> NamespaceName {
        NamespaceName::new(self.catalog.clone(), self.schema.clone())
    }

    /// Render as SQL, quoting components per the dialect.
    pub fn render(&self, dialect: &dyn Dialect) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(catalog) = &self.catalog {
            parts.push(catalog.render(dialect));
        }
        if let Some(schema) = &self.schema {
            parts.push(schema.render(dialect));
        }
        parts.push(self.name.render(dialect));
        parts.join(".")
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(catalog) = &self.catalog {
            write!(f, "{}.", catalog)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MssqlDialect, PostgresDialect};

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("my_table").is_ok());
        assert!(validate_identifier("column with spaces").is_ok());
        assert!(validate_identifier("日本語").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let result = validate_identifier("table\0name");
        assert!(result.unwrap_err().to_string().contains("null byte"));
    }

    #[test]
    fn test_validate_identifier_rejects_too_long() {
        let long_name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        let result = validate_identifier(&long_name);
        assert!(result.unwrap_err().to_string().contains("maximum length"));
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
    }

    // =========================================================================
    // Quoting tests
    // =========================================================================

    #[test]
    fn test_quote_ansi_escapes_double_quote() {
        assert_eq!(quote_ansi("users"), "\"users\"");
        assert_eq!(quote_ansi("table\"name"), "\"table\"\"name\"");
    }

    #[test]
    fn test_quote_brackets_escapes_bracket() {
        assert_eq!(quote_brackets("users"), "[users]");
        assert_eq!(quote_brackets("a]b"), "[a]]b]");
    }

    #[test]
    fn test_render_only_quotes_quoted_identifiers() {
        let pg = PostgresDialect::new();
        let mssql = MssqlDialect::new();
        assert_eq!(Identifier::unquoted("Users").render(&pg), "Users");
        assert_eq!(Identifier::quoted("Users").render(&pg), "\"Users\"");
        assert_eq!(Identifier::quoted("Users").render(&mssql), "[Users]");
    }

    // =========================================================================
    // Identifier semantics
    // =========================================================================

    #[test]
    fn test_to_identifier_recognises_quote_styles() {
        for text in ["\"Name\"", "`Name`", "[Name]"] {
            let id = Identifier::to_identifier(text).unwrap();
            assert!(id.is_quoted(), "{} should be quoted", text);
            assert_eq!(id.text(), "Name");
        }
        let plain = Identifier::to_identifier("Name").unwrap();
        assert!(!plain.is_quoted());
        assert!(Identifier::to_identifier("   ").is_none());
    }

    #[test]
    fn test_unquoted_equality_is_case_insensitive() {
        assert_eq!(Identifier::unquoted("ORDERS"), Identifier::unquoted("orders"));
        assert_ne!(Identifier::quoted("ORDERS"), Identifier::quoted("orders"));
        assert_eq!(Identifier::quoted("orders"), Identifier::unquoted("ORDERS"));
    }

    #[test]
    fn test_object_name_parse_and_render() {
        let name = ObjectName::parse("app.\"Order\"").unwrap();
        assert_eq!(name.schema, Some(Identifier::unquoted("app")));
        assert!(name.name.is_quoted());
        assert_eq!(name.render(&PostgresDialect::new()), "app.\"Order\"");
        assert!(ObjectName::parse("a.b.c.d").is_err());
    }

    #[test]
    fn test_identifier_serde_round_trip_keeps_quoting() {
        let id: Identifier = serde_yaml::from_str("'`Mixed`'").unwrap();
        assert!(id.is_quoted());
        let back = serde_yaml::to_string(&id).unwrap();
        assert!(back.contains("`Mixed`"));
    }
}
