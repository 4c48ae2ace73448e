//! Conversion between [`Identifier`]s and the literal names a driver
//! expects and reports.
//!
//! Drivers describe how they store names with five independent flags. Those
//! are collapsed once into a [`NameStoragePolicy`] (one case strategy for
//! quoted names, one for unquoted names); [`NameStoragePolicy::to_text`] and
//! [`NameStoragePolicy::to_identifier`] are pure functions of that policy.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::identifier::Identifier;
use crate::error::{OrmError, Result};

/// The five storage flags reported by `DatabaseMetaData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NameStorageFlags {
    pub stores_mixed_case_quoted_identifiers: bool,
    pub stores_lower_case_quoted_identifiers: bool,
    pub stores_upper_case_quoted_identifiers: bool,
    pub stores_upper_case_identifiers: bool,
    pub stores_lower_case_identifiers: bool,
}

/// How a class of names is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierCaseStrategy {
    Upper,
    Lower,
    Mixed,
}

impl IdentifierCaseStrategy {
    fn apply(self, text: &str) -> String {
        match self {
            IdentifierCaseStrategy::Upper => text.to_uppercase(),
            IdentifierCaseStrategy::Lower => text.to_lowercase(),
            IdentifierCaseStrategy::Mixed => text.to_string(),
        }
    }
}

/// Storage case for quoted and unquoted names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameStoragePolicy {
    pub quoted: IdentifierCaseStrategy,
    pub unquoted: IdentifierCaseStrategy,
}

impl NameStoragePolicy {
    pub fn new(quoted: IdentifierCaseStrategy, unquoted: IdentifierCaseStrategy) -> Self {
        Self { quoted, unquoted }
    }

    /// Collapse driver flags. Contradictory combinations are logged; the
    /// first matching flag wins (mixed, then upper, then lower).
    pub fn from_flags(flags: &NameStorageFlags) -> Self {
        let quoted_flags = [
            flags.stores_mixed_case_quoted_identifiers,
            flags.stores_upper_case_quoted_identifiers,
            flags.stores_lower_case_quoted_identifiers,
        ];
        if quoted_flags.iter().filter(|f| **f).count() > 1 {
            info!(
                "JDBC driver metadata reported database stores quoted identifiers in more than one case \
                 (mixed={}, upper={}, lower={})",
                flags.stores_mixed_case_quoted_identifiers,
                flags.stores_upper_case_quoted_identifiers,
                flags.stores_lower_case_quoted_identifiers
            );
        }
        if flags.stores_upper_case_identifiers && flags.stores_lower_case_identifiers {
            info!("JDBC driver metadata reported database stores unquoted identifiers in both upper and lower case");
        }

        let quoted = if flags.stores_mixed_case_quoted_identifiers {
            IdentifierCaseStrategy::Mixed
        } else if flags.stores_upper_case_quoted_identifiers {
            IdentifierCaseStrategy::Upper
        } else if flags.stores_lower_case_quoted_identifiers {
            IdentifierCaseStrategy::Lower
        } else {
            IdentifierCaseStrategy::Mixed
        };
        let unquoted = if flags.stores_upper_case_identifiers {
            IdentifierCaseStrategy::Upper
        } else if flags.stores_lower_case_identifiers {
            IdentifierCaseStrategy::Lower
        } else {
            IdentifierCaseStrategy::Mixed
        };
        Self { quoted, unquoted }
    }

    /// The literal a driver expects for `identifier`.
    pub fn to_text(&self, identifier: &Identifier) -> String {
        let strategy = if identifier.is_quoted() {
            self.quoted
        } else {
            self.unquoted
        };
        strategy.apply(identifier.text())
    }

    /// Infer the identifier a driver-reported literal was created from.
    ///
    /// A literal whose casing could not have been produced by folding an
    /// unquoted name must have been quoted; reserved words always are.
    pub fn to_identifier(&self, text: &str, is_reserved: impl Fn(&str) -> bool) -> Identifier {
        if is_reserved(text) {
            return Identifier::quoted(text);
        }
        let all_upper = text == text.to_uppercase();
        let all_lower = text == text.to_lowercase();
        let quoted = match self.unquoted {
            IdentifierCaseStrategy::Mixed => false,
            IdentifierCaseStrategy::Upper => !all_upper,
            IdentifierCaseStrategy::Lower => !all_lower,
        };
        Identifier::new(text, quoted)
    }
}

/// Identifier conversions bound to a connection's storage policy, reserved
/// words and current catalog/schema.
#[derive(Debug, Clone)]
pub struct IdentifierHelper {
    policy: NameStoragePolicy,
    reserved_words: BTreeSet<String>,
    current_catalog: Option<Identifier>,
    current_schema: Option<Identifier>,
}

impl IdentifierHelper {
    pub fn new(flags: &NameStorageFlags, reserved_words: impl IntoIterator<Item = String>) -> Self {
        Self {
            policy: NameStoragePolicy::from_flags(flags),
            reserved_words: reserved_words
                .into_iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            current_catalog: None,
            current_schema: None,
        }
    }

    /// Record the connection's current catalog and schema.
    pub fn with_current(
        mut self,
        catalog: Option<Identifier>,
        schema: Option<Identifier>,
    ) -> Self {
        self.current_catalog = catalog;
        self.current_schema = schema;
        self
    }

    pub fn policy(&self) -> NameStoragePolicy {
        self.policy
    }

    pub fn current_catalog(&self) -> Option<&Identifier> {
        self.current_catalog.as_ref()
    }

    pub fn current_schema(&self) -> Option<&Identifier> {
        self.current_schema.as_ref()
    }

    pub fn is_reserved_word(&self, text: &str) -> bool {
        self.reserved_words.contains(&text.to_lowercase())
    }

    pub fn to_text(&self, identifier: &Identifier) -> String {
        self.policy.to_text(identifier)
    }

    /// Identifier for a literal reported by the driver.
    pub fn to_identifier(&self, text: Option<&str>) -> Option<Identifier> {
        let text = text?.trim();
        if text.is_empty() {
            return None;
        }
        Some(self.policy.to_identifier(text, |t| self.is_reserved_word(t)))
    }

    /// Catalog argument for a metadata call; `None` means the current catalog.
    pub fn to_meta_data_catalog_name(&self, identifier: Option<&Identifier>) -> Option<String> {
        identifier
            .or(self.current_catalog.as_ref())
            .map(|i| self.to_text(i))
    }

    /// Schema argument for a metadata call; `None` means the current schema.
    pub fn to_meta_data_schema_name(&self, identifier: Option<&Identifier>) -> Option<String> {
        identifier
            .or(self.current_schema.as_ref())
            .map(|i| self.to_text(i))
    }

    /// Object name argument for a metadata call. A name is always required.
    pub fn to_meta_data_object_name(&self, identifier: Option<&Identifier>) -> Result<String> {
        identifier
            .map(|i| self.to_text(i))
            .ok_or_else(|| {
                OrmError::IllegalArgument(
                    "null was passed as an object name when querying metadata".to_string(),
                )
            })
    }

    /// Catalog reported by the driver.
    ///
    /// Returns `None` both when the driver reported no catalog and when it
    /// reported the current catalog. Callers cannot tell the two apart.
    pub fn from_meta_data_catalog_name(&self, name: Option<&str>) -> Option<Identifier> {
        Self::unless_current(name, self.current_catalog.as_ref(), self)
    }

    /// Schema reported by the driver; `None` for absent or current, as with
    /// [`from_meta_data_catalog_name`](Self::from_meta_data_catalog_name).
    pub fn from_meta_data_schema_name(&self, name: Option<&str>) -> Option<Identifier> {
        Self::unless_current(name, self.current_schema.as_ref(), self)
    }

    pub fn from_meta_data_object_name(&self, name: Option<&str>) -> Option<Identifier> {
        self.to_identifier(name)
    }

    fn unless_current(
        name: Option<&str>,
        current: Option<&Identifier>,
        helper: &IdentifierHelper,
    ) -> Option<Identifier> {
        let name = name?;
        if let Some(current) = current {
            if helper.to_text(current) == name {
                return None;
            }
        }
        helper.to_identifier(Some(name))
    }
}
