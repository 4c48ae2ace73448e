//! DDL rendering for the logical model.
//!
//! [`DdlExporter`] is the template: it produces `create`/`drop` statements
//! for every kind of exportable and asks the [`Dialect`] for the parts that
//! vary. Statements are returned unformatted and without delimiter.

use crate::core::identifier::{Identifier, NamespaceName};
use crate::core::model::{Column, ForeignKey, Index, Sequence, Table, UniqueKey};

use super::Dialect;

/// Renders DDL statements using a dialect's capabilities.
#[derive(Clone, Copy)]
pub struct DdlExporter<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> DdlExporter<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    /// Qualified, dialect-quoted table name.
    pub fn table_name(&self, table: &Table) -> String {
        table.qualified_name().render(self.dialect)
    }

    fn column_list(&self, columns: &[Identifier]) -> String {
        columns
            .iter()
            .map(|c| c.render(self.dialect))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Column definition as it appears in `create table` and `add column`.
    pub fn column_definition(&self, column: &Column) -> String {
        let mut definition = format!(
            "{} {}",
            column.name.render(self.dialect),
            column.resolved_sql_type()
        );
        if let Some(default) = &column.default_value {
            definition.push_str(" default ");
            definition.push_str(default);
        }
        if !column.nullable {
            definition.push_str(" not null");
        }
        if let Some(check) = &column.check {
            definition.push_str(&format!(" check ({})", check));
        }
        definition
    }

    // ===== Tables =====

    pub fn table_create(&self, table: &Table) -> Vec<String> {
        let mut body: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();

        if let Some(pk) = &table.primary_key {
            if !pk.columns.is_empty() {
                let constraint = match &pk.name {
                    Some(name) => format!("constraint {} ", name.render(self.dialect)),
                    None => String::new(),
                };
                body.push(format!(
                    "{}primary key ({})",
                    constraint,
                    self.column_list(&pk.columns)
                ));
            }
        }

        if self.dialect.supports_unique_constraint_in_create_table() {
            for uk in &table.unique_keys {
                body.push(format!(
                    "constraint {} unique ({})",
                    uk.name.render(self.dialect),
                    self.column_list(&uk.columns)
                ));
            }
        }

        let mut statements = vec![format!(
            "{} {} ({}){}",
            self.dialect.create_table_string(),
            self.table_name(table),
            body.join(", "),
            self.dialect.table_type_string()
        )];

        if self.dialect.supports_comment_on() {
            statements.extend(self.table_comments(table));
        }
        statements
    }

    fn table_comments(&self, table: &Table) -> Vec<String> {
        let mut statements = Vec::new();
        let table_name = self.table_name(table);
        if let Some(comment) = &table.comment {
            statements.push(format!(
                "comment on table {} is '{}'",
                table_name,
                escape_literal(comment)
            ));
        }
        for column in &table.columns {
            if let Some(comment) = &column.comment {
                statements.push(format!(
                    "comment on column {}.{} is '{}'",
                    table_name,
                    column.name.render(self.dialect),
                    escape_literal(comment)
                ));
            }
        }
        statements
    }

    pub fn table_drop(&self, table: &Table) -> Vec<String> {
        let mut sql = String::from("drop table ");
        if self.dialect.supports_if_exists_before_table_name() {
            sql.push_str("if exists ");
        }
        sql.push_str(&self.table_name(table));
        if self.dialect.supports_if_exists_after_table_name() {
            sql.push_str(" if exists");
        }
        sql.push_str(self.dialect.cascade_constraints_string());
        vec![sql]
    }

    pub fn add_column(&self, table: &Table, column: &Column) -> Vec<String> {
        vec![format!(
            "alter table {} {} {}",
            self.table_name(table),
            self.dialect.add_column_string(),
            self.column_definition(column)
        )]
    }

    // ===== Constraints =====

    pub fn unique_key_create(&self, table: &Table, uk: &UniqueKey) -> Vec<String> {
        if self.dialect.has_alter_table() {
            vec![format!(
                "alter table {} add constraint {} unique ({})",
                self.table_name(table),
                uk.name.render(self.dialect),
                self.column_list(&uk.columns)
            )]
        } else {
            vec![format!(
                "create unique index {} on {} ({})",
                uk.name.render(self.dialect),
                self.table_name(table),
                self.column_list(&uk.columns)
            )]
        }
    }

    pub fn unique_key_drop(&self, table: &Table, uk: &UniqueKey) -> Vec<String> {
        if !self.dialect.has_alter_table() {
            return vec![format!("drop index {}", uk.name.render(self.dialect))];
        }
        vec![self.drop_constraint(table, &uk.name)]
    }

    fn drop_constraint(&self, table: &Table, name: &Identifier) -> String {
        let if_exists = if self.dialect.supports_if_exists_before_constraint_name() {
            "if exists "
        } else {
            ""
        };
        format!(
            "alter table {} drop constraint {}{}",
            self.table_name(table),
            if_exists,
            name.render(self.dialect)
        )
    }

    pub fn index_create(&self, table: &Table, index: &Index) -> Vec<String> {
        vec![format!(
            "create {}index {} on {} ({})",
            if index.unique { "unique " } else { "" },
            index.name.render(self.dialect),
            self.table_name(table),
            self.column_list(&index.columns)
        )]
    }

    /// `alter table .. add constraint .. foreign key`. When the key names no
    /// referenced columns, the referenced table's primary key is used if known.
    pub fn foreign_key_create(
        &self,
        table: &Table,
        fk: &ForeignKey,
        referenced: Option<&Table>,
    ) -> Vec<String> {
        let referenced_columns = if fk.referenced_columns.is_empty() {
            referenced
                .and_then(|t| t.primary_key.as_ref())
                .map(|pk| pk.columns.clone())
                .unwrap_or_default()
        } else {
            fk.referenced_columns.clone()
        };

        let mut sql = format!(
            "alter table {} add constraint {} foreign key ({}) references {}",
            self.table_name(table),
            fk.name.render(self.dialect),
            self.column_list(&fk.columns),
            fk.referenced_table_name(table).render(self.dialect)
        );
        if !referenced_columns.is_empty() {
            sql.push_str(&format!(" ({})", self.column_list(&referenced_columns)));
        }
        if fk.cascade_delete {
            sql.push_str(" on delete cascade");
        }
        vec![sql]
    }

    pub fn foreign_key_drop(&self, table: &Table, fk: &ForeignKey) -> Vec<String> {
        vec![self.drop_constraint(table, &fk.name)]
    }

    // ===== Sequences and namespaces =====

    pub fn sequence_create(&self, sequence: &Sequence) -> Vec<String> {
        self.dialect.create_sequence_strings(
            &sequence.qualified_name().render(self.dialect),
            sequence.initial_value,
            sequence.increment_size,
        )
    }

    pub fn sequence_drop(&self, sequence: &Sequence) -> Vec<String> {
        self.dialect
            .drop_sequence_strings(&sequence.qualified_name().render(self.dialect))
    }

    /// `create schema` for a namespace that names a schema.
    pub fn namespace_create(&self, namespace: &NamespaceName) -> Vec<String> {
        match &namespace.schema {
            Some(schema) if self.dialect.can_create_schema() => {
                self.dialect.create_schema_command(&schema.render(self.dialect))
            }
            _ => Vec::new(),
        }
    }

    pub fn namespace_drop(&self, namespace: &NamespaceName) -> Vec<String> {
        match &namespace.schema {
            Some(schema) if self.dialect.can_create_schema() => {
                self.dialect.drop_schema_command(&schema.render(self.dialect))
            }
            _ => Vec::new(),
        }
    }
}

fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identifier::ObjectName;
    use crate::core::model::{Namespace, PrimaryKey};
    use crate::core::size::Size;
    use crate::dialect::{H2Dialect, MssqlDialect, PostgresDialect};

    fn id(name: &str) -> Identifier {
        Identifier::unquoted(name)
    }

    fn customer() -> Table {
        Table::new(id("customer"))
            .with_column(Column::new(id("id"), "bigint").not_null())
            .with_column(Column::new(id("name"), "varchar($l)").with_size(Size::length(80)))
            .with_primary_key(PrimaryKey {
                name: None,
                columns: vec![id("id")],
            })
    }

    fn in_schema(table: Table, schema: &str) -> Table {
        let ns = Namespace::new(NamespaceName::new(None, Some(id(schema)))).with_table(table);
        ns.tables.into_iter().next().unwrap()
    }

    #[test]
    fn test_create_table() {
        let pg = PostgresDialect::new();
        let ddl = DdlExporter::new(&pg);
        let statements = ddl.table_create(&customer());
        assert_eq!(
            statements,
            vec!["create table customer (id bigint not null, name varchar(80), primary key (id))"]
        );
    }

    #[test]
    fn test_create_table_inlines_unique_keys() {
        let h2 = H2Dialect::new();
        let table = customer().with_unique_key(UniqueKey {
            name: id("uk_name"),
            columns: vec![id("name")],
        });
        let statements = DdlExporter::new(&h2).table_create(&table);
        assert!(statements[0].ends_with(", constraint uk_name unique (name))"));
    }

    #[test]
    fn test_comments_follow_create_table() {
        let pg = PostgresDialect::new();
        let mut table = customer();
        table.comment = Some("the customer's row".into());
        let statements = DdlExporter::new(&pg).table_create(&table);
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[1],
            "comment on table customer is 'the customer''s row'"
        );

        let mssql = MssqlDialect::new();
        assert_eq!(DdlExporter::new(&mssql).table_create(&table).len(), 1);
    }

    #[test]
    fn test_drop_table_if_exists_and_cascade() {
        let pg = PostgresDialect::new();
        let table = in_schema(customer(), "app");
        assert_eq!(
            DdlExporter::new(&pg).table_drop(&table),
            vec!["drop table if exists app.customer cascade"]
        );
    }

    #[test]
    fn test_foreign_key_uses_referenced_primary_key() {
        let pg = PostgresDialect::new();
        let orders = Table::new(id("orders"))
            .with_column(Column::new(id("customer_id"), "bigint"))
            .with_foreign_key(ForeignKey {
                name: id("fk_orders_customer"),
                columns: vec![id("customer_id")],
                references: ObjectName::simple(id("customer")),
                referenced_columns: Vec::new(),
                cascade_delete: true,
            });
        let customer = customer();
        let statements =
            DdlExporter::new(&pg).foreign_key_create(&orders, &orders.foreign_keys[0], Some(&customer));
        assert_eq!(
            statements[0],
            "alter table orders add constraint fk_orders_customer foreign key (customer_id) references customer (id) on delete cascade"
        );
        assert_eq!(
            DdlExporter::new(&pg).foreign_key_drop(&orders, &orders.foreign_keys[0])[0],
            "alter table orders drop constraint if exists fk_orders_customer"
        );
    }

    #[test]
    fn test_add_column_keyword() {
        let mssql = MssqlDialect::new();
        let column = Column::new(Identifier::quoted("Email"), "nvarchar($l)");
        assert_eq!(
            DdlExporter::new(&mssql).add_column(&customer(), &column),
            vec!["alter table customer add [Email] nvarchar(255)"]
        );
    }

    #[test]
    fn test_sequences_and_namespaces() {
        let h2 = H2Dialect::new();
        let ddl = DdlExporter::new(&h2);
        let seq = Sequence::new(id("order_seq")).with_increment(50);
        assert_eq!(
            ddl.sequence_create(&seq),
            vec!["create sequence order_seq start with 1 increment by 50"]
        );
        assert_eq!(ddl.sequence_drop(&seq), vec!["drop sequence if exists order_seq"]);
        assert!(ddl.namespace_create(&NamespaceName::default()).is_empty());
        assert_eq!(
            ddl.namespace_create(&NamespaceName::new(None, Some(id("app")))),
            vec!["create schema app"]
        );
    }
}
