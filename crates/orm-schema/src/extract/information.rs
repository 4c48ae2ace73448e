//! Snapshot types describing objects found in an existing database.

use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::core::identifier::{Identifier, ObjectName};
use crate::error::{OrmError, Result};

/// Tri-state answer for driver-reported flags such as nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TruthValue {
    True,
    False,
    Unknown,
}

impl TruthValue {
    /// Interpret a JDBC `IS_NULLABLE` value (`YES`, `NO`, or empty).
    pub fn from_is_nullable(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_uppercase()).as_deref() {
            Some("YES") => TruthValue::True,
            Some("NO") => TruthValue::False,
            _ => TruthValue::Unknown,
        }
    }

    pub fn to_bool(self, default: bool) -> bool {
        match self {
            TruthValue::True => true,
            TruthValue::False => false,
            TruthValue::Unknown => default,
        }
    }
}

/// One column of an existing table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInformation {
    pub table_name: ObjectName,
    pub column_name: Identifier,
    /// JDBC type code.
    pub type_code: i32,
    /// Lower-cased first token of the driver's type name (`varchar` for
    /// `VARCHAR(255)`).
    pub type_name: String,
    pub column_size: i32,
    pub decimal_digits: i32,
    pub nullable: TruthValue,
}

impl ColumnInformation {
    /// Reduce a driver type name to its normalized form.
    pub fn normalize_type_name(raw: &str) -> String {
        raw.split(|c: char| c == '(' || c == ')' || c == ' ')
            .find(|t| !t.is_empty())
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// A referencing/referenced column pair of a foreign key.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReferenceMapping {
    pub referencing_column: ColumnInformation,
    pub referenced_column: ColumnInformation,
}

/// An existing foreign key.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyInformation {
    identifier: Identifier,
    column_reference_mappings: Vec<ColumnReferenceMapping>,
}

impl ForeignKeyInformation {
    pub fn builder(identifier: Identifier) -> ForeignKeyBuilder {
        ForeignKeyBuilder {
            identifier,
            column_mappings: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn column_reference_mappings(&self) -> &[ColumnReferenceMapping] {
        &self.column_reference_mappings
    }

    /// The table this key points at.
    pub fn referenced_table(&self) -> Option<&ObjectName> {
        self.column_reference_mappings
            .first()
            .map(|m| &m.referenced_column.table_name)
    }
}

/// Accumulates column mappings for one foreign key.
#[derive(Debug)]
pub struct ForeignKeyBuilder {
    identifier: Identifier,
    column_mappings: Vec<ColumnReferenceMapping>,
}

impl ForeignKeyBuilder {
    pub fn add_column_mapping(
        &mut self,
        referencing: ColumnInformation,
        referenced: ColumnInformation,
    ) -> &mut Self {
        self.column_mappings.push(ColumnReferenceMapping {
            referencing_column: referencing,
            referenced_column: referenced,
        });
        self
    }

    /// # Errors
    ///
    /// `SchemaManagement` when no column mapping was discovered.
    pub fn build(self) -> Result<ForeignKeyInformation> {
        if self.column_mappings.is_empty() {
            return Err(OrmError::schema_management(format!(
                "Attempt to resolve foreign key metadata from JDBC metadata failed to find \
                 column mappings for foreign key named [{}]",
                self.identifier.text()
            )));
        }
        Ok(ForeignKeyInformation {
            identifier: self.identifier,
            column_reference_mappings: self.column_mappings,
        })
    }
}

/// An existing index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexInformation {
    pub identifier: Identifier,
    pub unique: bool,
    pub columns: Vec<ColumnInformation>,
}

/// An existing primary key, columns ordered by `KEY_SEQ`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKeyInformation {
    pub identifier: Option<Identifier>,
    pub columns: Vec<ColumnInformation>,
}

/// An existing sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceInformation {
    pub name: ObjectName,
    pub increment: Option<i64>,
}

/// Literal location of a table as reported by the driver, used for
/// follow-up metadata calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalTableName {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
}

/// An existing table. Columns, keys and indexes load lazily, once.
pub struct TableInformation {
    pub(crate) name: ObjectName,
    pub(crate) physical_name: PhysicalTableName,
    pub(crate) table_type: String,
    pub(crate) comment: Option<String>,
    pub(crate) columns: OnceCell<IndexMap<Identifier, ColumnInformation>>,
    pub(crate) foreign_keys: OnceCell<IndexMap<Identifier, ForeignKeyInformation>>,
    pub(crate) indexes: OnceCell<IndexMap<Identifier, IndexInformation>>,
    pub(crate) primary_key: OnceCell<Option<PrimaryKeyInformation>>,
}

impl TableInformation {
    pub fn new(
        name: ObjectName,
        physical_name: PhysicalTableName,
        table_type: impl Into<String>,
        comment: Option<String>,
    ) -> Self {
        Self {
            name,
            physical_name,
            table_type: table_type.into(),
            comment,
            columns: OnceCell::new(),
            foreign_keys: OnceCell::new(),
            indexes: OnceCell::new(),
            primary_key: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &ObjectName {
        &self.name
    }

    pub fn physical_name(&self) -> &PhysicalTableName {
        &self.physical_name
    }

    pub fn table_type(&self) -> &str {
        &self.table_type
    }

    pub fn is_view(&self) -> bool {
        self.table_type.eq_ignore_ascii_case("VIEW")
    }

    pub fn is_physical_table(&self) -> bool {
        self.table_type.eq_ignore_ascii_case("TABLE")
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

impl fmt::Debug for TableInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableInformation")
            .field("name", &self.name)
            .field("table_type", &self.table_type)
            .field("columns_loaded", &self.columns.get().is_some())
            .field("foreign_keys_loaded", &self.foreign_keys.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(table: &str, name: &str) -> ColumnInformation {
        ColumnInformation {
            table_name: ObjectName::simple(Identifier::unquoted(table)),
            column_name: Identifier::unquoted(name),
            type_code: 4,
            type_name: "integer".into(),
            column_size: 10,
            decimal_digits: 0,
            nullable: TruthValue::Unknown,
        }
    }

    #[test]
    fn test_truth_value_from_is_nullable() {
        assert_eq!(TruthValue::from_is_nullable(Some("YES")), TruthValue::True);
        assert_eq!(TruthValue::from_is_nullable(Some("no")), TruthValue::False);
        assert_eq!(TruthValue::from_is_nullable(Some("")), TruthValue::Unknown);
        assert_eq!(TruthValue::from_is_nullable(None), TruthValue::Unknown);
        assert!(TruthValue::Unknown.to_bool(true));
    }

    #[test]
    fn test_normalize_type_name() {
        assert_eq!(ColumnInformation::normalize_type_name("VARCHAR(255)"), "varchar");
        assert_eq!(ColumnInformation::normalize_type_name("int4"), "int4");
        assert_eq!(
            ColumnInformation::normalize_type_name("timestamp with time zone"),
            "timestamp"
        );
        assert_eq!(ColumnInformation::normalize_type_name(""), "");
    }

    #[test]
    fn test_foreign_key_builder_without_mappings_fails() {
        let err = ForeignKeyInformation::builder(Identifier::unquoted("FK_X"))
            .build()
            .unwrap_err();
        assert!(matches!(err, OrmError::SchemaManagement(_)));
        assert!(err.to_string().contains("foreign key named [FK_X]"));
    }

    #[test]
    fn test_foreign_key_builder_keeps_mapping_order() {
        let mut builder = ForeignKeyInformation::builder(Identifier::unquoted("FK_X"));
        builder
            .add_column_mapping(column("child", "a"), column("parent", "x"))
            .add_column_mapping(column("child", "b"), column("parent", "y"));
        let fk = builder.build().unwrap();
        let referencing: Vec<_> = fk
            .column_reference_mappings()
            .iter()
            .map(|m| m.referencing_column.column_name.text().to_string())
            .collect();
        assert_eq!(referencing, vec!["a", "b"]);
        assert_eq!(fk.referenced_table().unwrap().name.text(), "parent");
    }
}
