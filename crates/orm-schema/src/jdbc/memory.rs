//! In-memory connection backed by a catalog snapshot.
//!
//! [`InMemoryConnection`] answers metadata calls from a deserialised
//! description of an existing database and records every statement it is
//! asked to execute. It backs offline operation of the command-line tool
//! and the tests of everything that talks to a [`JdbcConnection`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::exception::{SqlException, SqlResult};
use super::metadata::{labels, matches_pattern, DatabaseMetaData, JdbcConnection};
use super::result_set::{ResultSet, RowSet};
use crate::core::value::SqlValue;
use crate::error::Result;
use crate::extract::identifier_helper::NameStorageFlags;

fn default_table_type() -> String {
    "TABLE".to_string()
}

fn default_one() -> i64 {
    1
}

/// A table of the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableEntry {
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    #[serde(rename = "type", default = "default_table_type")]
    pub table_type: String,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnEntry>,
    #[serde(default)]
    pub primary_key: Option<PrimaryKeyEntry>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyEntry>,
    #[serde(default)]
    pub indexes: Vec<IndexEntry>,
}

impl TableEntry {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(str::to_string),
            name: name.to_string(),
            table_type: default_table_type(),
            ..Self::default()
        }
    }

    pub fn column(mut self, column: ColumnEntry) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, name: Option<&str>, columns: &[&str]) -> Self {
        self.primary_key = Some(PrimaryKeyEntry {
            name: name.map(str::to_string),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKeyEntry) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn index(mut self, name: &str, unique: bool, columns: &[&str]) -> Self {
        self.indexes.push(IndexEntry {
            name: name.to_string(),
            unique,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }
}

/// A column of a snapshot table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub name: String,
    /// JDBC type code (`java.sql.Types`).
    #[serde(default)]
    pub data_type: i32,
    pub type_name: String,
    #[serde(default)]
    pub column_size: i32,
    #[serde(default)]
    pub decimal_digits: i32,
    /// `None` reports an unknown nullability.
    #[serde(default)]
    pub nullable: Option<bool>,
}

impl ColumnEntry {
    pub fn new(name: &str, data_type: i32, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            type_name: type_name.to_string(),
            column_size: 0,
            decimal_digits: 0,
            nullable: Some(true),
        }
    }

    pub fn size(mut self, column_size: i32) -> Self {
        self.column_size = column_size;
        self
    }

    pub fn nullable(mut self, nullable: Option<bool>) -> Self {
        self.nullable = nullable;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKeyEntry {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Referenced table of a snapshot foreign key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableRef {
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyEntry {
    pub name: String,
    pub columns: Vec<String>,
    pub references: TableRef,
    /// Empty means the referenced table's primary key.
    #[serde(default)]
    pub referenced_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    #[serde(default)]
    pub unique: bool,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaEntry {
    #[serde(default)]
    pub catalog: Option<String>,
    pub schema: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceEntry {
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    #[serde(default = "default_one")]
    pub increment: i64,
}

/// Connection answering from an in-memory catalog snapshot.
#[derive(Debug, Default, Deserialize)]
pub struct InMemoryConnection {
    #[serde(default)]
    current_catalog: Option<String>,
    #[serde(default)]
    current_schema: Option<String>,
    #[serde(default)]
    storage: NameStorageFlags,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    schemas: Vec<SchemaEntry>,
    #[serde(default)]
    tables: Vec<TableEntry>,
    #[serde(default)]
    sequences: Vec<SequenceEntry>,
    /// Canned results for exact query texts.
    #[serde(default)]
    queries: BTreeMap<String, RowSet>,
    /// Statements containing any of these fragments (case-insensitive) fail.
    #[serde(default)]
    reject: Vec<String>,
    #[serde(skip)]
    executed: Mutex<Vec<String>>,
}

impl InMemoryConnection {
    pub fn new(storage: NameStorageFlags) -> Self {
        Self {
            storage,
            ..Self::default()
        }
    }

    /// Parse a snapshot from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn with_current_catalog(mut self, catalog: &str) -> Self {
        self.current_catalog = Some(catalog.to_string());
        self
    }

    pub fn with_current_schema(mut self, schema: &str) -> Self {
        self.current_schema = Some(schema.to_string());
        self
    }

    pub fn with_schema(mut self, catalog: Option<&str>, schema: &str) -> Self {
        self.schemas.push(SchemaEntry {
            catalog: catalog.map(str::to_string),
            schema: schema.to_string(),
        });
        self
    }

    pub fn with_table(mut self, table: TableEntry) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_sequence(mut self, schema: Option<&str>, name: &str, increment: i64) -> Self {
        self.sequences.push(SequenceEntry {
            catalog: None,
            schema: schema.map(str::to_string),
            name: name.to_string(),
            increment,
        });
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_query(mut self, sql: &str, rows: RowSet) -> Self {
        self.queries.insert(sql.trim().to_string(), rows);
        self
    }

    /// Fail statements containing `fragment`.
    pub fn rejecting(mut self, fragment: &str) -> Self {
        self.reject.push(fragment.to_lowercase());
        self
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn storage(&self) -> NameStorageFlags {
        self.storage
    }

    fn table_matches(
        table: &TableEntry,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: &str,
    ) -> bool {
        let catalog_ok = match catalog {
            None => true,
            Some("") => table.catalog.is_none(),
            Some(c) => table.catalog.as_deref() == Some(c),
        };
        let schema_ok = match schema_pattern {
            None => true,
            Some("") => table.schema.is_none(),
            Some(p) => table
                .schema
                .as_deref()
                .map_or(false, |s| matches_pattern(p, s)),
        };
        catalog_ok && schema_ok && matches_pattern(table_pattern, &table.name)
    }

    fn find_tables<'a>(
        &'a self,
        catalog: Option<&'a str>,
        schema: Option<&'a str>,
        table: &'a str,
    ) -> impl Iterator<Item = &'a TableEntry> + 'a {
        self.tables
            .iter()
            .filter(move |t| Self::table_matches(t, catalog, schema, table))
    }

    fn sequences_row_set(&self) -> ResultSet {
        let rows = self
            .sequences
            .iter()
            .map(|s| {
                vec![
                    SqlValue::from(s.catalog.clone()),
                    SqlValue::from(s.schema.clone()),
                    SqlValue::from(s.name.clone()),
                    SqlValue::Int(s.increment),
                ]
            })
            .collect();
        ResultSet::new(
            vec![
                "SEQUENCE_CATALOG".into(),
                "SEQUENCE_SCHEMA".into(),
                "SEQUENCE_NAME".into(),
                "INCREMENT".into(),
            ],
            rows,
        )
    }

    fn lock_executed(&self) -> SqlResult<std::sync::MutexGuard<'_, Vec<String>>> {
        self.executed
            .lock()
            .map_err(|_| SqlException::new("Connection state is poisoned"))
    }
}

fn labels_of(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl DatabaseMetaData for InMemoryConnection {
    fn stores_mixed_case_quoted_identifiers(&self) -> SqlResult<bool> {
        Ok(self.storage.stores_mixed_case_quoted_identifiers)
    }

    fn stores_lower_case_quoted_identifiers(&self) -> SqlResult<bool> {
        Ok(self.storage.stores_lower_case_quoted_identifiers)
    }

    fn stores_upper_case_quoted_identifiers(&self) -> SqlResult<bool> {
        Ok(self.storage.stores_upper_case_quoted_identifiers)
    }

    fn stores_upper_case_identifiers(&self) -> SqlResult<bool> {
        Ok(self.storage.stores_upper_case_identifiers)
    }

    fn stores_lower_case_identifiers(&self) -> SqlResult<bool> {
        Ok(self.storage.stores_lower_case_identifiers)
    }

    fn sql_keywords(&self) -> SqlResult<Vec<String>> {
        Ok(self.keywords.clone())
    }

    fn get_schemas(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
    ) -> SqlResult<ResultSet> {
        let rows = self
            .schemas
            .iter()
            .filter(|s| match catalog {
                None => true,
                Some("") => s.catalog.is_none(),
                Some(c) => s.catalog.as_deref() == Some(c),
            })
            .filter(|s| schema_pattern.map_or(true, |p| matches_pattern(p, &s.schema)))
            .map(|s| vec![SqlValue::from(s.schema.clone()), SqlValue::from(s.catalog.clone())])
            .collect();
        Ok(ResultSet::new(
            labels_of(&[labels::TABLE_SCHEM, labels::TABLE_CATALOG]),
            rows,
        ))
    }

    fn get_tables(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: &str,
        types: &[&str],
    ) -> SqlResult<ResultSet> {
        let rows = self
            .find_tables(catalog, schema_pattern, table_pattern)
            .filter(|t| types.is_empty() || types.iter().any(|ty| t.table_type.eq_ignore_ascii_case(ty)))
            .map(|t| {
                vec![
                    SqlValue::from(t.catalog.clone()),
                    SqlValue::from(t.schema.clone()),
                    SqlValue::from(t.name.clone()),
                    SqlValue::from(t.table_type.clone()),
                    SqlValue::from(t.remarks.clone()),
                ]
            })
            .collect();
        Ok(ResultSet::new(
            labels_of(&[
                labels::TABLE_CAT,
                labels::TABLE_SCHEM,
                labels::TABLE_NAME,
                labels::TABLE_TYPE,
                labels::REMARKS,
            ]),
            rows,
        ))
    }

    fn get_columns(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: &str,
        column_pattern: &str,
    ) -> SqlResult<ResultSet> {
        let mut rows = Vec::new();
        for table in self.find_tables(catalog, schema_pattern, table_pattern) {
            for column in &table.columns {
                if !matches_pattern(column_pattern, &column.name) {
                    continue;
                }
                let nullable = match column.nullable {
                    Some(true) => "YES",
                    Some(false) => "NO",
                    None => "",
                };
                rows.push(vec![
                    SqlValue::from(table.catalog.clone()),
                    SqlValue::from(table.schema.clone()),
                    SqlValue::from(table.name.clone()),
                    SqlValue::from(column.name.clone()),
                    SqlValue::from(column.data_type),
                    SqlValue::from(column.type_name.clone()),
                    SqlValue::from(column.column_size),
                    SqlValue::from(column.decimal_digits),
                    SqlValue::from(nullable),
                ]);
            }
        }
        Ok(ResultSet::new(
            labels_of(&[
                labels::TABLE_CAT,
                labels::TABLE_SCHEM,
                labels::TABLE_NAME,
                labels::COLUMN_NAME,
                labels::DATA_TYPE,
                labels::TYPE_NAME,
                labels::COLUMN_SIZE,
                labels::DECIMAL_DIGITS,
                labels::IS_NULLABLE,
            ]),
            rows,
        ))
    }

    fn get_imported_keys(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> SqlResult<ResultSet> {
        let mut rows = Vec::new();
        for entry in self.find_tables(catalog, schema, table) {
            for fk in &entry.foreign_keys {
                let referenced_columns: Vec<String> = if fk.referenced_columns.is_empty() {
                    self.tables
                        .iter()
                        .find(|t| {
                            t.name == fk.references.name
                                && t.schema == fk.references.schema
                                && t.catalog == fk.references.catalog
                        })
                        .and_then(|t| t.primary_key.as_ref())
                        .map(|pk| pk.columns.clone())
                        .unwrap_or_default()
                } else {
                    fk.referenced_columns.clone()
                };
                for (i, column) in fk.columns.iter().enumerate() {
                    rows.push(vec![
                        SqlValue::from(fk.references.catalog.clone()),
                        SqlValue::from(fk.references.schema.clone()),
                        SqlValue::from(fk.references.name.clone()),
                        SqlValue::from(referenced_columns.get(i).cloned()),
                        SqlValue::from(column.clone()),
                        SqlValue::Int(i as i64 + 1),
                        SqlValue::from(fk.name.clone()),
                    ]);
                }
            }
        }
        Ok(ResultSet::new(
            labels_of(&[
                labels::PKTABLE_CAT,
                labels::PKTABLE_SCHEM,
                labels::PKTABLE_NAME,
                labels::PKCOLUMN_NAME,
                labels::FKCOLUMN_NAME,
                labels::KEY_SEQ,
                labels::FK_NAME,
            ]),
            rows,
        ))
    }

    fn get_index_info(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
        unique: bool,
        _approximate: bool,
    ) -> SqlResult<ResultSet> {
        let mut rows = Vec::new();
        for entry in self.find_tables(catalog, schema, table) {
            // statistic row, as reported by drivers ahead of the index rows
            rows.push(vec![
                SqlValue::Null,
                SqlValue::Bool(false),
                SqlValue::Int(super::metadata::TABLE_INDEX_STATISTIC),
                SqlValue::Null,
                SqlValue::Null,
            ]);
            for index in entry.indexes.iter().filter(|i| !unique || i.unique) {
                for (i, column) in index.columns.iter().enumerate() {
                    rows.push(vec![
                        SqlValue::from(index.name.clone()),
                        SqlValue::Bool(!index.unique),
                        SqlValue::Int(3),
                        SqlValue::Int(i as i64 + 1),
                        SqlValue::from(column.clone()),
                    ]);
                }
            }
        }
        Ok(ResultSet::new(
            labels_of(&[
                labels::INDEX_NAME,
                labels::NON_UNIQUE,
                labels::TYPE,
                labels::ORDINAL_POSITION,
                labels::COLUMN_NAME,
            ]),
            rows,
        ))
    }

    fn get_primary_keys(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> SqlResult<ResultSet> {
        let mut rows = Vec::new();
        for entry in self.find_tables(catalog, schema, table) {
            if let Some(pk) = &entry.primary_key {
                for (i, column) in pk.columns.iter().enumerate() {
                    rows.push(vec![
                        SqlValue::from(column.clone()),
                        SqlValue::Int(i as i64 + 1),
                        SqlValue::from(pk.name.clone()),
                    ]);
                }
            }
        }
        Ok(ResultSet::new(
            labels_of(&[labels::COLUMN_NAME, labels::KEY_SEQ, labels::PK_NAME]),
            rows,
        ))
    }
}

impl JdbcConnection for InMemoryConnection {
    fn metadata(&self) -> &dyn DatabaseMetaData {
        self
    }

    fn current_catalog(&self) -> SqlResult<Option<String>> {
        Ok(self.current_catalog.clone())
    }

    fn current_schema(&self) -> SqlResult<Option<String>> {
        Ok(self.current_schema.clone())
    }

    fn execute(&self, sql: &str) -> SqlResult<()> {
        let lower = sql.to_lowercase();
        if let Some(fragment) = self.reject.iter().find(|f| lower.contains(&f.to_lowercase())) {
            debug!("Rejecting statement matching '{}': {}", fragment, sql);
            return Err(SqlException::new(format!("Statement rejected: {}", sql))
                .with_sql_state("42000"));
        }
        self.lock_executed()?.push(sql.to_string());
        Ok(())
    }

    fn query(&self, sql: &str) -> SqlResult<ResultSet> {
        if let Some(rows) = self.queries.get(sql.trim()) {
            return Ok(rows.clone().into());
        }
        if sql.to_lowercase().contains("information_schema.sequences") {
            return Ok(self.sequences_row_set());
        }
        Err(SqlException::new(format!("Unsupported query: {}", sql)).with_sql_state("42000"))
    }
}
