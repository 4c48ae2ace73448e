//! SQL value representation for metadata rows and result rows.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single column value as read from a driver row.
///
/// Untagged so snapshot files can write plain YAML scalars:
/// `~`, `true`, `12`, `1.5`, `"text"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL NULL.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Any integral value (smallint, int, bigint).
    Int(i64),

    /// Floating point value.
    Double(f64),

    /// Character data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// String view, converting numbers the way `ResultSet#getString` does.
    pub fn as_string(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(v) => Some(v.to_string()),
            SqlValue::Int(v) => Some(v.to_string()),
            SqlValue::Double(v) => Some(v.to_string()),
            SqlValue::Text(v) => Some(v.clone()),
            SqlValue::Bytes(v) => Some(String::from_utf8_lossy(v).into_owned()),
        }
    }

    /// Integral view; NULL reads as `None`, text is parsed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Bool(v) => Some(i64::from(*v)),
            SqlValue::Double(v) => Some(*v as i64),
            SqlValue::Text(v) => v.trim().parse().ok(),
            SqlValue::Null | SqlValue::Bytes(_) => None,
        }
    }

    /// Boolean view; numbers are true when non-zero.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(v) => Some(*v),
            SqlValue::Int(v) => Some(*v != 0),
            SqlValue::Text(v) => match v.trim().to_lowercase().as_str() {
                "true" | "t" | "y" | "yes" | "1" => Some(true),
                "false" | "f" | "n" | "no" | "0" => Some(false),
                _ => None,
            },
            SqlValue::Double(_) | SqlValue::Null | SqlValue::Bytes(_) => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            other => write!(f, "{}", other.as_string().unwrap_or_default()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_conversions() {
        assert_eq!(SqlValue::Int(42).as_string().as_deref(), Some("42"));
        assert_eq!(SqlValue::Null.as_string(), None);
        assert_eq!(SqlValue::from("abc").as_string().as_deref(), Some("abc"));
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(SqlValue::from(" 7 ").as_i64(), Some(7));
        assert_eq!(SqlValue::from("x").as_i64(), None);
        assert_eq!(SqlValue::Null.as_i64(), None);
    }

    #[test]
    fn test_yaml_scalars_deserialize_untagged() {
        let values: Vec<SqlValue> = serde_yaml::from_str("[~, true, 12, 1.5, text]").unwrap();
        assert_eq!(
            values,
            vec![
                SqlValue::Null,
                SqlValue::Bool(true),
                SqlValue::Int(12),
                SqlValue::Double(1.5),
                SqlValue::Text("text".into()),
            ]
        );
    }

    #[test]
    fn test_option_into_value() {
        let none: Option<&str> = None;
        assert_eq!(SqlValue::from(none), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(3i64)), SqlValue::Int(3));
    }
}
