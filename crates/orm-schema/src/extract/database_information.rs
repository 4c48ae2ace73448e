//! Snapshot of an existing database.
//!
//! Tables (and views) in the requested scope are loaded eagerly when the
//! snapshot is built. Columns, foreign keys, indexes and primary keys are
//! read per table on first access and cached for the lifetime of the
//! snapshot. Sequences are read once, at build time.
//!
//! Tables are keyed by [`to_map_key`]: every name part is folded to the
//! literal the driver stores for it, so quoted and unquoted spellings only
//! collide when the database itself cannot tell them apart.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;

use indexmap::IndexMap;
use tracing::debug;

use super::identifier_helper::NameStoragePolicy;
use super::information::{
    ColumnInformation, ForeignKeyBuilder, ForeignKeyInformation, IndexInformation,
    PhysicalTableName, PrimaryKeyInformation, SequenceInformation, TableInformation, TruthValue,
};
use super::sequence::SequenceInformationExtractor;
use super::ExtractionContext;
use crate::core::identifier::{Identifier, NamespaceName, ObjectName};
use crate::core::model::Database;
use crate::error::{OrmError, Result};
use crate::jdbc::metadata::{labels, TABLE_INDEX_STATISTIC, TABLE_TYPES};
use crate::jdbc::{ResultSet, SqlException, SqlResult};

/// Storage-folded literals of a qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapKey {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in [&self.catalog, &self.schema].into_iter().flatten() {
            write!(f, "{}.", part)?;
        }
        f.write_str(&self.name)
    }
}

/// Key a name by the literals `policy` stores for each part.
pub fn to_map_key(name: &ObjectName, policy: NameStoragePolicy) -> MapKey {
    MapKey {
        catalog: name.catalog.as_ref().map(|c| policy.to_text(c)),
        schema: name.schema.as_ref().map(|s| policy.to_text(s)),
        name: policy.to_text(&name.name),
    }
}

/// Accumulates the table scope of a [`DatabaseInformation`].
pub struct DatabaseInformationBuilder<'a> {
    context: ExtractionContext<'a>,
    tables: IndexMap<MapKey, TableInformation>,
}

impl<'a> DatabaseInformationBuilder<'a> {
    /// Load every table and view visible to the connection.
    pub fn prepare_all(self) -> Result<Self> {
        self.load_tables(None, None)
    }

    /// Load the tables of one catalog.
    pub fn prepare_catalog(self, catalog: &Identifier) -> Result<Self> {
        let catalog = self.helper_text(catalog);
        self.load_tables(Some(catalog), None)
    }

    /// Load the tables of one schema.
    pub fn prepare_schema(self, schema: &Identifier) -> Result<Self> {
        let schema = self.helper_text(schema);
        self.load_tables(None, Some(schema))
    }

    /// Load the tables of one schema within one catalog.
    pub fn prepare_catalog_and_schema(self, catalog: &Identifier, schema: &Identifier) -> Result<Self> {
        let catalog = self.helper_text(catalog);
        let schema = self.helper_text(schema);
        self.load_tables(Some(catalog), Some(schema))
    }

    /// Read sequences and finish the snapshot.
    ///
    /// # Errors
    ///
    /// `Jdbc` when the sequence query fails.
    pub fn build(self) -> Result<DatabaseInformation<'a>> {
        let extractor = self.context.environment.dialect().sequence_information_extractor();
        let policy = self.context.environment.identifier_helper().policy();
        let mut sequences = IndexMap::new();
        for sequence in extractor.extract_metadata(&self.context)? {
            sequences.insert(to_map_key(&sequence.name, policy), sequence);
        }
        debug!(
            "Extracted {} tables and {} sequences",
            self.tables.len(),
            sequences.len()
        );
        Ok(DatabaseInformation {
            context: self.context,
            tables: self.tables,
            sequences,
        })
    }

    fn helper_text(&self, identifier: &Identifier) -> String {
        self.context.environment.identifier_helper().to_text(identifier)
    }

    fn load_tables(mut self, catalog: Option<String>, schema: Option<String>) -> Result<Self> {
        let context = self.context;
        let mut result_set = context
            .connection
            .metadata()
            .get_tables(catalog.as_deref(), schema.as_deref(), "%", TABLE_TYPES)
            .map_err(|e| convert(&context, e, "Error accessing table metadata"))?;
        let rows = read_table_rows(&mut result_set)
            .map_err(|e| convert(&context, e, "Error accessing table metadata"))?;

        let helper = context.environment.identifier_helper();
        for (physical_name, table_type, comment) in rows {
            let Some(name) = helper.from_meta_data_object_name(Some(&physical_name.name)) else {
                continue;
            };
            let name = ObjectName::new(
                helper.from_meta_data_catalog_name(physical_name.catalog.as_deref()),
                helper.from_meta_data_schema_name(physical_name.schema.as_deref()),
                name,
            );
            let key = to_map_key(&name, helper.policy());
            if self.tables.contains_key(&key) {
                return Err(OrmError::IllegalState(format!(
                    "Table [{}] was already loaded into the database snapshot",
                    name
                )));
            }
            self.tables.insert(
                key,
                TableInformation::new(name, physical_name, table_type, comment),
            );
        }
        Ok(self)
    }
}

fn read_table_rows(
    result_set: &mut ResultSet,
) -> SqlResult<Vec<(PhysicalTableName, String, Option<String>)>> {
    let mut rows = Vec::new();
    while result_set.next_row() {
        let Some(name) = result_set.get_string(labels::TABLE_NAME)? else {
            continue;
        };
        rows.push((
            PhysicalTableName {
                catalog: result_set.get_optional(labels::TABLE_CAT)?.as_string(),
                schema: result_set.get_optional(labels::TABLE_SCHEM)?.as_string(),
                name,
            },
            result_set
                .get_optional(labels::TABLE_TYPE)?
                .as_string()
                .unwrap_or_else(|| "TABLE".to_string()),
            result_set
                .get_optional(labels::REMARKS)?
                .as_string()
                .filter(|r| !r.is_empty()),
        ));
    }
    Ok(rows)
}

fn convert(context: &ExtractionContext<'_>, e: SqlException, message: &str) -> OrmError {
    context
        .environment
        .sql_exception_helper()
        .convert(e, message, None)
}

/// The extracted state of an existing database.
pub struct DatabaseInformation<'a> {
    context: ExtractionContext<'a>,
    tables: IndexMap<MapKey, TableInformation>,
    sequences: IndexMap<MapKey, SequenceInformation>,
}

impl<'a> DatabaseInformation<'a> {
    pub fn builder(context: ExtractionContext<'a>) -> DatabaseInformationBuilder<'a> {
        DatabaseInformationBuilder {
            context,
            tables: IndexMap::new(),
        }
    }

    /// Snapshot covering every namespace of `database`.
    ///
    /// The default namespace is read with the connection's current
    /// catalog/schema; when that is unknown the whole database is read.
    pub fn for_model(context: ExtractionContext<'a>, database: &Database) -> Result<Self> {
        let helper = context.environment.identifier_helper();
        let mut scopes: BTreeSet<(Option<Identifier>, Option<Identifier>)> = BTreeSet::new();
        for namespace in database.namespaces() {
            let catalog = namespace
                .name
                .catalog
                .clone()
                .or_else(|| helper.current_catalog().cloned());
            let schema = namespace
                .name
                .schema
                .clone()
                .or_else(|| helper.current_schema().cloned());
            scopes.insert((catalog, schema));
        }

        let mut builder = Self::builder(context);
        if scopes.is_empty() || scopes.iter().any(|(_, s)| s.is_none()) {
            return builder.prepare_all()?.build();
        }
        for scope in scopes {
            builder = match scope {
                (Some(catalog), Some(schema)) => {
                    builder.prepare_catalog_and_schema(&catalog, &schema)?
                }
                (None, Some(schema)) => builder.prepare_schema(&schema)?,
                _ => builder,
            };
        }
        builder.build()
    }

    pub fn context(&self) -> &ExtractionContext<'a> {
        &self.context
    }

    /// Whether `schema` exists. An unnamed schema always exists.
    ///
    /// # Errors
    ///
    /// `Jdbc` when the driver refuses the call.
    pub fn schema_exists(&self, catalog: Option<&Identifier>, schema: Option<&Identifier>) -> Result<bool> {
        let Some(schema) = schema else {
            return Ok(true);
        };
        let helper = self.context.environment.identifier_helper();
        let catalog = catalog.map(|c| helper.to_text(c));
        let schema = helper.to_text(schema);
        let mut result_set = self
            .context
            .connection
            .metadata()
            .get_schemas(catalog.as_deref(), Some(&schema))
            .map_err(|e| convert(&self.context, e, "Unable to query DatabaseMetaData for existing schemas"))?;
        Ok(result_set.next_row())
    }

    /// Whether the namespace exists.
    pub fn namespace_exists(&self, namespace: &NamespaceName) -> Result<bool> {
        self.schema_exists(namespace.catalog.as_ref(), namespace.schema.as_ref())
    }

    /// Look up a table. A name qualified with the current catalog or schema
    /// also matches the unqualified snapshot entry.
    pub fn get_table_information(&self, name: &ObjectName) -> Option<TableView<'_>> {
        self.locate(&self.tables, name).map(|info| TableView {
            info,
            database: self,
        })
    }

    /// Look up a sequence, with the same qualification rules as tables.
    pub fn get_sequence_information(&self, name: &ObjectName) -> Option<&SequenceInformation> {
        self.locate(&self.sequences, name)
    }

    pub fn tables(&self) -> impl Iterator<Item = TableView<'_>> {
        self.tables.values().map(move |info| TableView {
            info,
            database: self,
        })
    }

    pub fn sequences(&self) -> impl Iterator<Item = &SequenceInformation> {
        self.sequences.values()
    }

    fn locate<'m, T>(&self, map: &'m IndexMap<MapKey, T>, name: &ObjectName) -> Option<&'m T> {
        let helper = self.context.environment.identifier_helper();
        if let Some(found) = map.get(&to_map_key(name, helper.policy())) {
            return Some(found);
        }
        let mut stripped = name.clone();
        if stripped.catalog.is_some() && stripped.catalog.as_ref() == helper.current_catalog() {
            stripped.catalog = None;
        }
        if stripped.schema.is_some() && stripped.schema.as_ref() == helper.current_schema() {
            stripped.schema = None;
        }
        if &stripped == name {
            return None;
        }
        map.get(&to_map_key(&stripped, helper.policy()))
    }

    fn physical_arguments(physical: &PhysicalTableName) -> (Option<&str>, Option<&str>) {
        (
            Some(physical.catalog.as_deref().unwrap_or("")),
            Some(physical.schema.as_deref().unwrap_or("")),
        )
    }

    fn load_columns(&self, table: &TableInformation) -> Result<IndexMap<Identifier, ColumnInformation>> {
        let (catalog, schema) = Self::physical_arguments(&table.physical_name);
        let message = format!("Error accessing column metadata: {}", table.name);
        let mut result_set = self
            .context
            .connection
            .metadata()
            .get_columns(catalog, schema, &table.physical_name.name, "%")
            .map_err(|e| convert(&self.context, e, &message))?;

        let helper = self.context.environment.identifier_helper();
        let mut columns = IndexMap::new();
        let read = |result_set: &mut ResultSet, columns: &mut IndexMap<Identifier, ColumnInformation>| -> SqlResult<()> {
            while result_set.next_row() {
                let Some(column_name) =
                    helper.from_meta_data_object_name(result_set.get_string(labels::COLUMN_NAME)?.as_deref())
                else {
                    continue;
                };
                if columns.contains_key(&column_name) {
                    continue;
                }
                let type_name = result_set.get_string(labels::TYPE_NAME)?.unwrap_or_default();
                columns.insert(
                    column_name.clone(),
                    ColumnInformation {
                        table_name: table.name.clone(),
                        column_name,
                        type_code: result_set.get_i32(labels::DATA_TYPE)?.unwrap_or_default(),
                        type_name: ColumnInformation::normalize_type_name(&type_name),
                        column_size: result_set.get_i32(labels::COLUMN_SIZE)?.unwrap_or_default(),
                        decimal_digits: result_set
                            .get_optional_i32(labels::DECIMAL_DIGITS)?
                            .unwrap_or_default(),
                        nullable: TruthValue::from_is_nullable(
                            result_set.get_string(labels::IS_NULLABLE)?.as_deref(),
                        ),
                    },
                );
            }
            Ok(())
        };
        read(&mut result_set, &mut columns).map_err(|e| convert(&self.context, e, &message))?;
        Ok(columns)
    }

    fn load_foreign_keys(&self, table: &TableView<'_>) -> Result<IndexMap<Identifier, ForeignKeyInformation>> {
        let (catalog, schema) = Self::physical_arguments(&table.physical_name);
        let message = format!("Error accessing foreign key metadata: {}", table.name);
        let mut result_set = self
            .context
            .connection
            .metadata()
            .get_imported_keys(catalog, schema, &table.physical_name.name)
            .map_err(|e| convert(&self.context, e, &message))?;

        let rows = read_imported_keys(&mut result_set).map_err(|e| convert(&self.context, e, &message))?;
        let helper = self.context.environment.identifier_helper();
        let mut builders: IndexMap<Identifier, ForeignKeyBuilder> = IndexMap::new();
        for row in rows {
            let Some(fk_name) = helper.from_meta_data_object_name(row.fk_name.as_deref()) else {
                debug!("Skipping unnamed foreign key column on table {}", table.name);
                continue;
            };
            let builder = builders
                .entry(fk_name.clone())
                .or_insert_with(|| ForeignKeyInformation::builder(fk_name.clone()));

            let Some(pk_table_name) = helper.from_meta_data_object_name(row.pk_table.as_deref()) else {
                continue;
            };
            let pk_table_name = ObjectName::new(
                helper.from_meta_data_catalog_name(row.pk_catalog.as_deref()),
                helper.from_meta_data_schema_name(row.pk_schema.as_deref()),
                pk_table_name,
            );
            // a later row may name the referenced table in a resolvable way
            let Some(pk_table) = self.get_table_information(&pk_table_name) else {
                debug!(
                    "Referenced table {} of foreign key {} not found in snapshot; skipping row",
                    pk_table_name, fk_name
                );
                continue;
            };

            let referencing = helper
                .from_meta_data_object_name(row.fk_column.as_deref())
                .map(|c| table.column(&c))
                .transpose()?
                .flatten()
                .cloned();
            let referenced = helper
                .from_meta_data_object_name(row.pk_column.as_deref())
                .map(|c| pk_table.column(&c))
                .transpose()?
                .flatten()
                .cloned();
            match (referencing, referenced) {
                (Some(referencing), Some(referenced)) => {
                    builder.add_column_mapping(referencing, referenced);
                }
                _ => debug!(
                    "Could not resolve columns of foreign key {} ({:?} -> {:?})",
                    fk_name, row.fk_column, row.pk_column
                ),
            }
        }

        let mut foreign_keys = IndexMap::new();
        for (name, builder) in builders {
            foreign_keys.insert(name, builder.build()?);
        }
        Ok(foreign_keys)
    }

    fn load_indexes(&self, table: &TableView<'_>) -> Result<IndexMap<Identifier, IndexInformation>> {
        let (catalog, schema) = Self::physical_arguments(&table.physical_name);
        let message = format!("Error accessing index information: {}", table.name);
        let mut result_set = self
            .context
            .connection
            .metadata()
            .get_index_info(catalog, schema, &table.physical_name.name, false, true)
            .map_err(|e| convert(&self.context, e, &message))?;

        let mut rows: Vec<(String, bool, String)> = Vec::new();
        let read = |result_set: &mut ResultSet, rows: &mut Vec<(String, bool, String)>| -> SqlResult<()> {
            while result_set.next_row() {
                if result_set.get_i64(labels::TYPE)? == Some(TABLE_INDEX_STATISTIC) {
                    continue;
                }
                let (Some(index), Some(column)) = (
                    result_set.get_string(labels::INDEX_NAME)?,
                    result_set.get_string(labels::COLUMN_NAME)?,
                ) else {
                    continue;
                };
                let non_unique = result_set
                    .get_optional(labels::NON_UNIQUE)?
                    .as_bool()
                    .unwrap_or(true);
                rows.push((index, !non_unique, column));
            }
            Ok(())
        };
        read(&mut result_set, &mut rows).map_err(|e| convert(&self.context, e, &message))?;

        let helper = self.context.environment.identifier_helper();
        let mut indexes: IndexMap<Identifier, IndexInformation> = IndexMap::new();
        for (index_name, unique, column_name) in rows {
            let Some(index_name) = helper.from_meta_data_object_name(Some(&index_name)) else {
                continue;
            };
            let entry = indexes
                .entry(index_name.clone())
                .or_insert_with(|| IndexInformation {
                    identifier: index_name.clone(),
                    unique,
                    columns: Vec::new(),
                });
            let column = helper
                .from_meta_data_object_name(Some(&column_name))
                .map(|c| table.column(&c))
                .transpose()?
                .flatten()
                .cloned();
            match column {
                Some(column) => entry.columns.push(column),
                None => debug!(
                    "Could not locate column {} of index {} on table {}; skipping",
                    column_name, index_name, table.name
                ),
            }
        }
        Ok(indexes)
    }

    fn load_primary_key(&self, table: &TableView<'_>) -> Result<Option<PrimaryKeyInformation>> {
        let (catalog, schema) = Self::physical_arguments(&table.physical_name);
        let message = format!("Error while reading primary key meta data for {}", table.name);
        let mut result_set = self
            .context
            .connection
            .metadata()
            .get_primary_keys(catalog, schema, &table.physical_name.name)
            .map_err(|e| convert(&self.context, e, &message))?;

        let mut rows: Vec<(i64, String, Option<String>)> = Vec::new();
        let read = |result_set: &mut ResultSet, rows: &mut Vec<(i64, String, Option<String>)>| -> SqlResult<()> {
            while result_set.next_row() {
                let Some(column) = result_set.get_string(labels::COLUMN_NAME)? else {
                    continue;
                };
                rows.push((
                    result_set.get_i64(labels::KEY_SEQ)?.unwrap_or_default(),
                    column,
                    result_set.get_string(labels::PK_NAME)?,
                ));
            }
            Ok(())
        };
        read(&mut result_set, &mut rows).map_err(|e| convert(&self.context, e, &message))?;
        if rows.is_empty() {
            return Ok(None);
        }

        let helper = self.context.environment.identifier_helper();
        let pk_name = rows[0].2.clone();
        if rows.iter().any(|(_, _, name)| name != &pk_name) {
            return Err(OrmError::SchemaExtraction(format!(
                "Encountered primary keys differing name on table {}",
                table.name
            )));
        }
        rows.sort_by_key(|(seq, _, _)| *seq);

        let mut columns = Vec::with_capacity(rows.len());
        for (expected, (seq, column_name, _)) in (1i64..).zip(rows.iter()) {
            if *seq != expected {
                return Err(OrmError::SchemaExtraction(format!(
                    "Primary Key information was missing for KEY_SEQ = {}",
                    expected
                )));
            }
            let column = helper
                .from_meta_data_object_name(Some(column_name))
                .map(|c| table.column(&c))
                .transpose()?
                .flatten()
                .cloned()
                .ok_or_else(|| {
                    OrmError::SchemaExtraction(format!(
                        "Could not locate primary key column [{}] on table {}",
                        column_name, table.name
                    ))
                })?;
            columns.push(column);
        }
        Ok(Some(PrimaryKeyInformation {
            identifier: helper.from_meta_data_object_name(pk_name.as_deref()),
            columns,
        }))
    }
}

struct ImportedKeyRow {
    fk_name: Option<String>,
    fk_column: Option<String>,
    pk_catalog: Option<String>,
    pk_schema: Option<String>,
    pk_table: Option<String>,
    pk_column: Option<String>,
}

fn read_imported_keys(result_set: &mut ResultSet) -> SqlResult<Vec<ImportedKeyRow>> {
    let mut rows = Vec::new();
    while result_set.next_row() {
        rows.push(ImportedKeyRow {
            fk_name: result_set.get_optional(labels::FK_NAME)?.as_string(),
            fk_column: result_set.get_string(labels::FKCOLUMN_NAME)?,
            pk_catalog: result_set.get_optional(labels::PKTABLE_CAT)?.as_string(),
            pk_schema: result_set.get_optional(labels::PKTABLE_SCHEM)?.as_string(),
            pk_table: result_set.get_string(labels::PKTABLE_NAME)?,
            pk_column: result_set.get_string(labels::PKCOLUMN_NAME)?,
        });
    }
    Ok(rows)
}

impl std::fmt::Debug for DatabaseInformationBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseInformationBuilder")
            .field("tables", &self.tables.len())
            .finish()
    }
}

impl std::fmt::Debug for DatabaseInformation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseInformation")
            .field("tables", &self.tables.len())
            .field("sequences", &self.sequences.len())
            .finish()
    }
}

/// A table of a [`DatabaseInformation`] with its lazily loaded parts.
#[derive(Clone, Copy)]
pub struct TableView<'i> {
    info: &'i TableInformation,
    database: &'i DatabaseInformation<'i>,
}

impl<'i> TableView<'i> {
    pub fn columns(&self) -> Result<&'i IndexMap<Identifier, ColumnInformation>> {
        let database = self.database;
        let info = self.info;
        info.columns.get_or_try_init(|| database.load_columns(info))
    }

    pub fn column(&self, name: &Identifier) -> Result<Option<&'i ColumnInformation>> {
        Ok(self.columns()?.get(name))
    }

    pub fn foreign_keys(&self) -> Result<&'i IndexMap<Identifier, ForeignKeyInformation>> {
        let view = *self;
        self.info
            .foreign_keys
            .get_or_try_init(|| view.database.load_foreign_keys(&view))
    }

    pub fn foreign_key(&self, name: &Identifier) -> Result<Option<&'i ForeignKeyInformation>> {
        Ok(self.foreign_keys()?.get(name))
    }

    pub fn indexes(&self) -> Result<&'i IndexMap<Identifier, IndexInformation>> {
        let view = *self;
        self.info
            .indexes
            .get_or_try_init(|| view.database.load_indexes(&view))
    }

    pub fn index(&self, name: &Identifier) -> Result<Option<&'i IndexInformation>> {
        Ok(self.indexes()?.get(name))
    }

    pub fn primary_key(&self) -> Result<Option<&'i PrimaryKeyInformation>> {
        let view = *self;
        let primary_key = self
            .info
            .primary_key
            .get_or_try_init(|| view.database.load_primary_key(&view))?;
        Ok(primary_key.as_ref())
    }

    pub fn information(&self) -> &'i TableInformation {
        self.info
    }
}

impl Deref for TableView<'_> {
    type Target = TableInformation;

    fn deref(&self) -> &TableInformation {
        self.info
    }
}

impl std::fmt::Debug for TableView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.info, f)
    }
}
