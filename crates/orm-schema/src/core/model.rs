//! Logical schema model: the desired state that schema actions export,
//! diff and validate.
//!
//! The model is a tree `Database -> Namespace -> Table | Sequence` plus
//! auxiliary objects and init commands. Everything is deserialisable from
//! YAML; after deserialisation each table knows its owning namespace so
//! qualified names can be rendered without walking back up the tree.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::identifier::{Identifier, NamespaceName, ObjectName};
use super::size::Size;

/// Contributor assigned to objects that do not name one.
pub const DEFAULT_CONTRIBUTOR: &str = "orm";

fn default_contributor() -> String {
    DEFAULT_CONTRIBUTOR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_one_i64() -> i64 {
    1
}

fn default_one_i32() -> i32 {
    1
}

/// An object that can produce DDL and is tracked by a unique export identifier.
pub trait Exportable {
    fn export_identifier(&self) -> String;
}

/// An object owned by a named contributor.
pub trait Contributable {
    fn contributor(&self) -> &str;
}

/// The whole logical schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "DatabaseDef")]
pub struct Database {
    namespaces: Vec<Namespace>,
    auxiliary_objects: Vec<AuxiliaryDatabaseObject>,
    init_commands: Vec<InitCommand>,
}

#[derive(Deserialize)]
struct DatabaseDef {
    #[serde(default)]
    namespaces: Vec<Namespace>,
    #[serde(default)]
    auxiliary_objects: Vec<AuxiliaryDatabaseObject>,
    #[serde(default)]
    init_commands: Vec<InitCommand>,
}

impl From<DatabaseDef> for Database {
    fn from(def: DatabaseDef) -> Self {
        let mut database = Database::new();
        for namespace in def.namespaces {
            database.add_namespace(namespace);
        }
        database.auxiliary_objects = def.auxiliary_objects;
        database.init_commands = def.init_commands;
        database
    }
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace, binding its tables to it. Tables of a namespace with
    /// the same name are merged into the existing one.
    pub fn add_namespace(&mut self, mut namespace: Namespace) {
        namespace.bind();
        match self
            .namespaces
            .iter_mut()
            .find(|n| n.name == namespace.name)
        {
            Some(existing) => {
                existing.tables.extend(namespace.tables);
                existing.sequences.extend(namespace.sequences);
            }
            None => self.namespaces.push(namespace),
        }
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.add_namespace(namespace);
        self
    }

    pub fn add_auxiliary_object(&mut self, object: AuxiliaryDatabaseObject) {
        self.auxiliary_objects.push(object);
    }

    pub fn add_init_command(&mut self, command: InitCommand) {
        self.init_commands.push(command);
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub fn auxiliary_objects(&self) -> &[AuxiliaryDatabaseObject] {
        &self.auxiliary_objects
    }

    pub fn init_commands(&self) -> &[InitCommand] {
        &self.init_commands
    }

    /// All tables across namespaces, in declaration order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.namespaces.iter().flat_map(|n| n.tables.iter())
    }

    /// Find a table by qualified name.
    pub fn locate_table(&self, name: &ObjectName) -> Option<&Table> {
        self.tables().find(|t| &t.qualified_name() == name)
    }

    /// Every contributor named by a table or sequence.
    pub fn contributors(&self) -> BTreeSet<String> {
        let mut contributors = BTreeSet::new();
        for namespace in &self.namespaces {
            for table in &namespace.tables {
                contributors.insert(table.contributor.clone());
            }
            for sequence in &namespace.sequences {
                contributors.insert(sequence.contributor.clone());
            }
        }
        contributors
    }
}

/// A catalog/schema pair with its tables and sequences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(flatten)]
    pub name: NamespaceName,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub sequences: Vec<Sequence>,
}

impl Namespace {
    pub fn new(name: NamespaceName) -> Self {
        Self {
            name,
            tables: Vec::new(),
            sequences: Vec::new(),
        }
    }

    pub fn default_namespace() -> Self {
        Self::new(NamespaceName::default())
    }

    pub fn with_table(mut self, mut table: Table) -> Self {
        table.namespace = self.name.clone();
        self.tables.push(table);
        self
    }

    pub fn with_sequence(mut self, mut sequence: Sequence) -> Self {
        sequence.namespace = self.name.clone();
        self.sequences.push(sequence);
        self
    }

    fn bind(&mut self) {
        for table in &mut self.tables {
            table.namespace = self.name.clone();
        }
        for sequence in &mut self.sequences {
            sequence.namespace = self.name.clone();
        }
    }
}

/// A mapped table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: Identifier,
    #[serde(skip)]
    namespace: NamespaceName,
    #[serde(default = "default_contributor")]
    pub contributor: String,
    /// False for view or subselect mappings that produce no DDL.
    #[serde(default = "default_true")]
    pub physical: bool,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub primary_key: Option<PrimaryKey>,
    #[serde(default)]
    pub unique_keys: Vec<UniqueKey>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Table {
    pub fn new(name: Identifier) -> Self {
        Self {
            name,
            namespace: NamespaceName::default(),
            contributor: default_contributor(),
            physical: true,
            columns: Vec::new(),
            primary_key: None,
            unique_keys: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            comment: None,
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key(mut self, primary_key: PrimaryKey) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    pub fn with_unique_key(mut self, unique_key: UniqueKey) -> Self {
        self.unique_keys.push(unique_key);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn with_contributor(mut self, contributor: impl Into<String>) -> Self {
        self.contributor = contributor.into();
        self
    }

    pub fn namespace(&self) -> &NamespaceName {
        &self.namespace
    }

    pub fn qualified_name(&self) -> ObjectName {
        ObjectName::new(
            self.namespace.catalog.clone(),
            self.namespace.schema.clone(),
            self.name.clone(),
        )
    }

    pub fn column(&self, name: &Identifier) -> Option<&Column> {
        self.columns.iter().find(|c| &c.name == name)
    }
}

impl Exportable for Table {
    fn export_identifier(&self) -> String {
        self.qualified_name().to_string()
    }
}

impl Contributable for Table {
    fn contributor(&self) -> &str {
        &self.contributor
    }
}

/// A column definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: Identifier,
    /// Type pattern, e.g. `varchar($l)` or `numeric($p,$s)`.
    pub sql_type: String,
    #[serde(default)]
    pub size: Size,
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// JDBC type code, when known.
    #[serde(default)]
    pub type_code: Option<i32>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub check: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: Identifier, sql_type: impl Into<String>) -> Self {
        Self {
            name,
            sql_type: sql_type.into(),
            size: Size::default(),
            nullable: true,
            type_code: None,
            default_value: None,
            check: None,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn with_type_code(mut self, type_code: i32) -> Self {
        self.type_code = Some(type_code);
        self
    }

    /// The SQL type with size placeholders substituted.
    pub fn resolved_sql_type(&self) -> String {
        self.size.apply_to_pattern(&self.sql_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKey {
    #[serde(default)]
    pub name: Option<Identifier>,
    pub columns: Vec<Identifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueKey {
    pub name: Identifier,
    pub columns: Vec<Identifier>,
}

impl UniqueKey {
    pub fn export_identifier(&self, table: &Table) -> String {
        format!("{}.UK.{}", table.export_identifier(), self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub name: Identifier,
    pub columns: Vec<Identifier>,
    #[serde(default)]
    pub unique: bool,
}

impl Index {
    pub fn export_identifier(&self, table: &Table) -> String {
        format!("{}.IDX.{}", table.export_identifier(), self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: Identifier,
    pub columns: Vec<Identifier>,
    /// Referenced table; an unqualified name resolves in the owning
    /// table's namespace.
    pub references: ObjectName,
    /// Referenced columns; empty means the referenced primary key.
    #[serde(default)]
    pub referenced_columns: Vec<Identifier>,
    #[serde(default)]
    pub cascade_delete: bool,
}

impl ForeignKey {
    pub fn export_identifier(&self, table: &Table) -> String {
        format!("{}.FK.{}", table.export_identifier(), self.name)
    }

    /// The referenced table name resolved against the owning table.
    pub fn referenced_table_name(&self, owner: &Table) -> ObjectName {
        if self.references.catalog.is_none() && self.references.schema.is_none() {
            ObjectName::new(
                owner.namespace.catalog.clone(),
                owner.namespace.schema.clone(),
                self.references.name.clone(),
            )
        } else {
            self.references.clone()
        }
    }
}

/// A sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    pub name: Identifier,
    #[serde(skip)]
    namespace: NamespaceName,
    #[serde(default = "default_contributor")]
    pub contributor: String,
    #[serde(default = "default_one_i64")]
    pub initial_value: i64,
    #[serde(default = "default_one_i32")]
    pub increment_size: i32,
}

impl Sequence {
    pub fn new(name: Identifier) -> Self {
        Self {
            name,
            namespace: NamespaceName::default(),
            contributor: default_contributor(),
            initial_value: 1,
            increment_size: 1,
        }
    }

    pub fn with_increment(mut self, increment_size: i32) -> Self {
        self.increment_size = increment_size;
        self
    }

    pub fn qualified_name(&self) -> ObjectName {
        ObjectName::new(
            self.namespace.catalog.clone(),
            self.namespace.schema.clone(),
            self.name.clone(),
        )
    }
}

impl Exportable for Sequence {
    fn export_identifier(&self) -> String {
        self.qualified_name().to_string()
    }
}

impl Contributable for Sequence {
    fn contributor(&self) -> &str {
        &self.contributor
    }
}

/// Free-form DDL attached to the model, optionally limited to dialects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxiliaryDatabaseObject {
    pub name: String,
    #[serde(default)]
    pub create: Vec<String>,
    #[serde(default)]
    pub drop: Vec<String>,
    /// Dialect names this object applies to; empty means all.
    #[serde(default)]
    pub dialects: BTreeSet<String>,
    /// Export before tables are created (and drop after they are dropped).
    #[serde(default)]
    pub before_tables: bool,
}

impl AuxiliaryDatabaseObject {
    pub fn applies_to(&self, dialect_name: &str) -> bool {
        self.dialects.is_empty()
            || self
                .dialects
                .iter()
                .any(|d| d.eq_ignore_ascii_case(dialect_name))
    }
}

impl Exportable for AuxiliaryDatabaseObject {
    fn export_identifier(&self) -> String {
        format!("AUX.{}", self.name)
    }
}

/// Statements run after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitCommand {
    pub statements: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
namespaces:
  - schema: app
    tables:
      - name: customer
        columns:
          - { name: id, sql_type: bigint, nullable: false }
          - { name: name, sql_type: "varchar($l)", size: { length: 80 } }
        primary_key: { columns: [id] }
      - name: orders
        contributor: billing
        columns:
          - { name: id, sql_type: bigint, nullable: false }
          - { name: customer_id, sql_type: bigint }
        foreign_keys:
          - { name: fk_orders_customer, columns: [customer_id], references: { name: customer } }
    sequences:
      - { name: order_seq, increment_size: 50 }
auxiliary_objects:
  - { name: audit_fn, create: ["create function audit()"], drop: ["drop function audit()"], dialects: [postgres] }
"#;

    #[test]
    fn test_deserialize_binds_namespaces() {
        let db: Database = serde_yaml::from_str(MODEL).unwrap();
        let orders = db
            .locate_table(&ObjectName::parse("app.orders").unwrap())
            .unwrap();
        assert_eq!(orders.contributor, "billing");
        assert_eq!(orders.export_identifier(), "app.orders");

        let fk = &orders.foreign_keys[0];
        assert_eq!(
            fk.referenced_table_name(orders),
            ObjectName::parse("app.customer").unwrap()
        );

        let seq = &db.namespaces()[0].sequences[0];
        assert_eq!(seq.increment_size, 50);
        assert_eq!(seq.initial_value, 1);
        assert_eq!(seq.qualified_name().to_string(), "app.order_seq");
    }

    #[test]
    fn test_column_sql_type_resolution() {
        let db: Database = serde_yaml::from_str(MODEL).unwrap();
        let customer = db.tables().next().unwrap();
        let name = customer.column(&Identifier::unquoted("NAME")).unwrap();
        assert_eq!(name.resolved_sql_type(), "varchar(80)");
        assert!(name.nullable);
    }

    #[test]
    fn test_contributors_collected() {
        let db: Database = serde_yaml::from_str(MODEL).unwrap();
        let contributors: Vec<_> = db.contributors().into_iter().collect();
        assert_eq!(contributors, vec!["billing".to_string(), "orm".to_string()]);
    }

    #[test]
    fn test_auxiliary_dialect_scope() {
        let db: Database = serde_yaml::from_str(MODEL).unwrap();
        let aux = &db.auxiliary_objects()[0];
        assert!(aux.applies_to("postgres"));
        assert!(!aux.applies_to("h2"));
    }

    #[test]
    fn test_add_namespace_merges_same_name() {
        let mut db = Database::new();
        db.add_namespace(
            Namespace::default_namespace().with_table(Table::new(Identifier::unquoted("a"))),
        );
        db.add_namespace(
            Namespace::default_namespace().with_table(Table::new(Identifier::unquoted("b"))),
        );
        assert_eq!(db.namespaces().len(), 1);
        assert_eq!(db.tables().count(), 2);
    }
}
