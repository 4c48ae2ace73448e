//! Resolved result graph and the values it assembles from rows.
//!
//! Builders resolve into [`DomainResult`]s (top-level results) holding
//! [`Fetch`]es (attributes of their parent). Every leaf points at a
//! [`SqlSelection`]; assembly reads the row through those selections.

use indexmap::IndexMap;

use super::navigable_path::NavigablePath;
use crate::core::value::SqlValue;

/// A column read by the result graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqlSelection {
    /// 1-based position in the JDBC row.
    pub jdbc_position: usize,
    /// 0-based position in the deduplicated values buffer.
    pub values_array_position: usize,
}

impl SqlSelection {
    fn read(&self, values: &[SqlValue]) -> SqlValue {
        values
            .get(self.values_array_position)
            .cloned()
            .unwrap_or(SqlValue::Null)
    }
}

/// A top-level result of a query row.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainResult {
    Basic {
        path: NavigablePath,
        selection: SqlSelection,
    },
    Entity {
        path: NavigablePath,
        entity_name: String,
        identifier: Box<Fetch>,
        discriminator: Option<SqlSelection>,
        fetches: Vec<Fetch>,
    },
    Instantiation {
        path: NavigablePath,
        target: String,
        arguments: Vec<DomainResult>,
    },
}

/// An attribute of a result, resolved against the row.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    Basic {
        path: NavigablePath,
        attribute: String,
        selection: SqlSelection,
    },
    Embeddable {
        path: NavigablePath,
        attribute: String,
        fetches: Vec<Fetch>,
    },
    /// A to-one association read as its foreign-key value.
    EntityKey {
        path: NavigablePath,
        attribute: String,
        target_entity: String,
        key: Vec<SqlSelection>,
    },
    /// Loaded later, outside this row.
    Delayed {
        path: NavigablePath,
        attribute: String,
        target: String,
    },
}

impl Fetch {
    pub fn path(&self) -> &NavigablePath {
        match self {
            Fetch::Basic { path, .. }
            | Fetch::Embeddable { path, .. }
            | Fetch::EntityKey { path, .. }
            | Fetch::Delayed { path, .. } => path,
        }
    }

    pub fn attribute(&self) -> &str {
        match self {
            Fetch::Basic { attribute, .. }
            | Fetch::Embeddable { attribute, .. }
            | Fetch::EntityKey { attribute, .. }
            | Fetch::Delayed { attribute, .. } => attribute,
        }
    }

    pub fn assemble(&self, values: &[SqlValue]) -> DomainValue {
        match self {
            Fetch::Basic { selection, .. } => DomainValue::Scalar(selection.read(values)),
            Fetch::Embeddable { fetches, .. } => {
                let attributes = assemble_fetches(fetches, values);
                // an embeddable whose columns are all null is itself null
                if attributes.values().all(DomainValue::is_null) {
                    DomainValue::Null
                } else {
                    DomainValue::Composite(attributes)
                }
            }
            Fetch::EntityKey {
                target_entity, key, ..
            } => {
                let key: Vec<SqlValue> = key.iter().map(|s| s.read(values)).collect();
                if key.iter().all(SqlValue::is_null) {
                    DomainValue::Null
                } else {
                    DomainValue::Reference {
                        entity_name: target_entity.clone(),
                        key,
                    }
                }
            }
            Fetch::Delayed { target, .. } => DomainValue::Delayed {
                target: target.clone(),
            },
        }
    }
}

fn assemble_fetches(fetches: &[Fetch], values: &[SqlValue]) -> IndexMap<String, DomainValue> {
    fetches
        .iter()
        .map(|f| (f.attribute().to_string(), f.assemble(values)))
        .collect()
}

impl DomainResult {
    pub fn path(&self) -> &NavigablePath {
        match self {
            DomainResult::Basic { path, .. }
            | DomainResult::Entity { path, .. }
            | DomainResult::Instantiation { path, .. } => path,
        }
    }

    pub fn assemble(&self, values: &[SqlValue]) -> DomainValue {
        match self {
            DomainResult::Basic { selection, .. } => DomainValue::Scalar(selection.read(values)),
            DomainResult::Entity {
                entity_name,
                identifier,
                discriminator,
                fetches,
                ..
            } => {
                let id = identifier.assemble(values);
                if id.is_null() {
                    return DomainValue::Null;
                }
                DomainValue::Entity {
                    entity_name: entity_name.clone(),
                    discriminator: discriminator.map(|s| s.read(values)),
                    id: Box::new(id),
                    attributes: assemble_fetches(fetches, values),
                }
            }
            DomainResult::Instantiation {
                target, arguments, ..
            } => DomainValue::Instantiation {
                target: target.clone(),
                arguments: arguments.iter().map(|a| a.assemble(values)).collect(),
            },
        }
    }
}

/// A value assembled from one row.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainValue {
    Null,
    Scalar(SqlValue),
    Composite(IndexMap<String, DomainValue>),
    Entity {
        entity_name: String,
        discriminator: Option<SqlValue>,
        id: Box<DomainValue>,
        attributes: IndexMap<String, DomainValue>,
    },
    Reference {
        entity_name: String,
        key: Vec<SqlValue>,
    },
    Delayed {
        target: String,
    },
    Instantiation {
        target: String,
        arguments: Vec<DomainValue>,
    },
}

impl DomainValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DomainValue::Null | DomainValue::Scalar(SqlValue::Null))
    }

    /// Attribute of an entity or composite value.
    pub fn attribute(&self, name: &str) -> Option<&DomainValue> {
        match self {
            DomainValue::Entity { attributes, .. } | DomainValue::Composite(attributes) => {
                attributes.get(name)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(position: usize) -> SqlSelection {
        SqlSelection {
            jdbc_position: position + 1,
            values_array_position: position,
        }
    }

    fn customer_result() -> DomainResult {
        let root = NavigablePath::new("Customer");
        let address = root.append("address");
        DomainResult::Entity {
            path: root.clone(),
            entity_name: "Customer".into(),
            identifier: Box::new(Fetch::Basic {
                path: root.append("id"),
                attribute: "id".into(),
                selection: selection(0),
            }),
            discriminator: None,
            fetches: vec![
                Fetch::Embeddable {
                    path: address.clone(),
                    attribute: "address".into(),
                    fetches: vec![Fetch::Basic {
                        path: address.append("city"),
                        attribute: "city".into(),
                        selection: selection(1),
                    }],
                },
                Fetch::EntityKey {
                    path: root.append("region"),
                    attribute: "region".into(),
                    target_entity: "Region".into(),
                    key: vec![selection(2)],
                },
                Fetch::Delayed {
                    path: root.append("orders"),
                    attribute: "orders".into(),
                    target: "Customer.orders".into(),
                },
            ],
        }
    }

    #[test]
    fn test_assemble_entity() {
        let values = vec![SqlValue::Int(7), SqlValue::Text("Oslo".into()), SqlValue::Text("EU".into())];
        let value = customer_result().assemble(&values);
        let DomainValue::Entity { id, .. } = &value else {
            panic!("expected an entity, got {:?}", value);
        };
        assert_eq!(**id, DomainValue::Scalar(SqlValue::Int(7)));
        assert_eq!(
            value.attribute("address").unwrap().attribute("city"),
            Some(&DomainValue::Scalar(SqlValue::Text("Oslo".into())))
        );
        assert_eq!(
            value.attribute("region"),
            Some(&DomainValue::Reference {
                entity_name: "Region".into(),
                key: vec![SqlValue::Text("EU".into())],
            })
        );
        assert_eq!(
            value.attribute("orders"),
            Some(&DomainValue::Delayed {
                target: "Customer.orders".into()
            })
        );
    }

    #[test]
    fn test_null_identifier_and_null_components() {
        let values = vec![SqlValue::Null, SqlValue::Null, SqlValue::Null];
        assert_eq!(customer_result().assemble(&values), DomainValue::Null);

        let values = vec![SqlValue::Int(1), SqlValue::Null, SqlValue::Null];
        let value = customer_result().assemble(&values);
        assert_eq!(value.attribute("address"), Some(&DomainValue::Null));
        assert_eq!(value.attribute("region"), Some(&DomainValue::Null));
    }
}
