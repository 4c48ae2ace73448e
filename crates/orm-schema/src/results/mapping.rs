//! Mapping-layer descriptors of what a result populates.
//!
//! An [`EntityMapping`] owns its identifier and attributes; attributes are
//! basic columns, embeddables (nested groups of attributes), to-one
//! associations (join columns referencing another entity) or plural
//! attributes (collections loaded separately). Every node is immutable and
//! shared through `Arc` so result builders can hold them as part of their
//! cache key.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{OrmError, Result};

/// One column of a model part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectableMapping {
    pub selection_expression: String,
    pub type_code: Option<i32>,
}

/// A single-column attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicAttributeMapping {
    pub name: String,
    pub column: String,
    pub type_code: Option<i32>,
}

impl BasicAttributeMapping {
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            type_code: None,
        }
    }

    pub fn with_type_code(mut self, type_code: i32) -> Self {
        self.type_code = Some(type_code);
        self
    }

    pub fn selectable(&self) -> SelectableMapping {
        SelectableMapping {
            selection_expression: self.column.clone(),
            type_code: self.type_code,
        }
    }
}

/// A group of attributes stored in the owner's table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmbeddableMapping {
    pub name: String,
    pub attributes: Vec<AttributeMapping>,
}

impl EmbeddableMapping {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<AttributeMapping>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    pub fn find_attribute(&self, name: &str) -> Option<&AttributeMapping> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// Columns in declaration order, nested embeddables flattened.
    pub fn selectables(&self) -> Vec<SelectableMapping> {
        self.attributes.iter().flat_map(AttributeMapping::selectables).collect()
    }
}

/// A many-to-one or one-to-one association owning its join columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToOneAttributeMapping {
    pub name: String,
    pub target_entity: String,
    pub join_columns: Vec<String>,
}

impl ToOneAttributeMapping {
    pub fn new(name: impl Into<String>, target_entity: impl Into<String>, join_columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            target_entity: target_entity.into(),
            join_columns: join_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn selectables(&self) -> Vec<SelectableMapping> {
        self.join_columns
            .iter()
            .map(|column| SelectableMapping {
                selection_expression: column.clone(),
                type_code: None,
            })
            .collect()
    }
}

/// A collection attribute. Never read from the owner's row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluralAttributeMapping {
    pub name: String,
    /// `Owner.attribute`.
    pub role: String,
    pub element_entity: Option<String>,
}

impl PluralAttributeMapping {
    pub fn new(owner: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            role: format!("{}.{}", owner, name),
            name,
            element_entity: None,
        }
    }

    pub fn of_entity(mut self, element_entity: impl Into<String>) -> Self {
        self.element_entity = Some(element_entity.into());
        self
    }
}

/// An attribute of an entity or embeddable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeMapping {
    Basic(Arc<BasicAttributeMapping>),
    Embedded(Arc<EmbeddableMapping>),
    ToOne(Arc<ToOneAttributeMapping>),
    Plural(Arc<PluralAttributeMapping>),
}

impl AttributeMapping {
    pub fn name(&self) -> &str {
        match self {
            AttributeMapping::Basic(m) => &m.name,
            AttributeMapping::Embedded(m) => &m.name,
            AttributeMapping::ToOne(m) => &m.name,
            AttributeMapping::Plural(m) => &m.name,
        }
    }

    pub fn selectables(&self) -> Vec<SelectableMapping> {
        match self {
            AttributeMapping::Basic(m) => vec![m.selectable()],
            AttributeMapping::Embedded(m) => m.selectables(),
            AttributeMapping::ToOne(m) => m.selectables(),
            AttributeMapping::Plural(_) => Vec::new(),
        }
    }
}

impl From<BasicAttributeMapping> for AttributeMapping {
    fn from(mapping: BasicAttributeMapping) -> Self {
        AttributeMapping::Basic(Arc::new(mapping))
    }
}

impl From<EmbeddableMapping> for AttributeMapping {
    fn from(mapping: EmbeddableMapping) -> Self {
        AttributeMapping::Embedded(Arc::new(mapping))
    }
}

impl From<ToOneAttributeMapping> for AttributeMapping {
    fn from(mapping: ToOneAttributeMapping) -> Self {
        AttributeMapping::ToOne(Arc::new(mapping))
    }
}

impl From<PluralAttributeMapping> for AttributeMapping {
    fn from(mapping: PluralAttributeMapping) -> Self {
        AttributeMapping::Plural(Arc::new(mapping))
    }
}

/// A mapped entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityMapping {
    pub entity_name: String,
    pub table: String,
    /// Basic or embedded (composite) identifier.
    pub identifier: AttributeMapping,
    pub discriminator: Option<Arc<BasicAttributeMapping>>,
    pub attributes: Vec<AttributeMapping>,
}

impl EntityMapping {
    pub fn new(
        entity_name: impl Into<String>,
        table: impl Into<String>,
        identifier: impl Into<AttributeMapping>,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            table: table.into(),
            identifier: identifier.into(),
            discriminator: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_discriminator(mut self, discriminator: BasicAttributeMapping) -> Self {
        self.discriminator = Some(Arc::new(discriminator));
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<AttributeMapping>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    pub fn identifier_name(&self) -> &str {
        self.identifier.name()
    }

    /// The identifier or a non-identifier attribute named `name`.
    pub fn find_sub_part(&self, name: &str) -> Option<&AttributeMapping> {
        if self.identifier.name() == name {
            return Some(&self.identifier);
        }
        self.attributes.iter().find(|a| a.name() == name)
    }
}

/// Any node of the mapping model a result can populate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelPart {
    Entity(Arc<EntityMapping>),
    Attribute(AttributeMapping),
}

impl ModelPart {
    pub fn part_name(&self) -> &str {
        match self {
            ModelPart::Entity(e) => &e.entity_name,
            ModelPart::Attribute(a) => a.name(),
        }
    }

    /// Columns the part reads from a row, in a fixed order.
    pub fn selectables(&self) -> Vec<SelectableMapping> {
        match self {
            ModelPart::Entity(entity) => {
                let mut selectables = entity.identifier.selectables();
                if let Some(discriminator) = &entity.discriminator {
                    selectables.push(discriminator.selectable());
                }
                selectables.extend(entity.attributes.iter().flat_map(AttributeMapping::selectables));
                selectables
            }
            ModelPart::Attribute(attribute) => attribute.selectables(),
        }
    }

    pub fn selectable_count(&self) -> usize {
        self.selectables().len()
    }
}

/// Registry of entity mappings by name.
#[derive(Debug, Clone, Default)]
pub struct MappingMetamodel {
    entities: IndexMap<String, Arc<EntityMapping>>,
}

impl MappingMetamodel {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// `IllegalArgument` when an entity of that name is already registered.
    pub fn register(&mut self, entity: EntityMapping) -> Result<Arc<EntityMapping>> {
        if self.entities.contains_key(&entity.entity_name) {
            return Err(OrmError::IllegalArgument(format!(
                "Entity [{}] is already registered",
                entity.entity_name
            )));
        }
        let entity = Arc::new(entity);
        self.entities
            .insert(entity.entity_name.clone(), Arc::clone(&entity));
        Ok(entity)
    }

    pub fn with_entity(mut self, entity: EntityMapping) -> Result<Self> {
        self.register(entity)?;
        Ok(self)
    }

    pub fn find_entity(&self, name: &str) -> Option<&Arc<EntityMapping>> {
        self.entities.get(name)
    }

    /// # Errors
    ///
    /// `ResultMapping` for an unknown entity name.
    pub fn entity(&self, name: &str) -> Result<&Arc<EntityMapping>> {
        self.find_entity(name)
            .ok_or_else(|| OrmError::ResultMapping(format!("Unknown entity [{}]", name)))
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Resolve a dotted attribute path below an entity, e.g. `address.city`.
    ///
    /// # Errors
    ///
    /// `ResultMapping` when a segment does not name an attribute, or names
    /// one below a non-embeddable.
    pub fn resolve_part(&self, entity: &EntityMapping, path: &str) -> Result<ModelPart> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = entity.find_sub_part(first).cloned().ok_or_else(|| {
            OrmError::ResultMapping(format!(
                "Unknown attribute [{}] of entity [{}]",
                first, entity.entity_name
            ))
        })?;
        for segment in segments {
            let next = match &current {
                AttributeMapping::Embedded(embeddable) => embeddable.find_attribute(segment).cloned(),
                _ => None,
            };
            current = next.ok_or_else(|| {
                OrmError::ResultMapping(format!(
                    "Unknown attribute [{}] of entity [{}]",
                    path, entity.entity_name
                ))
            })?;
        }
        Ok(ModelPart::Attribute(current))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// `Customer(id, name, address(street, city), region -> Region, orders*)`.
    pub fn customer() -> EntityMapping {
        EntityMapping::new("Customer", "customer", BasicAttributeMapping::new("id", "id").with_type_code(-5))
            .with_attribute(BasicAttributeMapping::new("name", "name").with_type_code(12))
            .with_attribute(
                EmbeddableMapping::new("address")
                    .with_attribute(BasicAttributeMapping::new("street", "street"))
                    .with_attribute(BasicAttributeMapping::new("city", "city")),
            )
            .with_attribute(ToOneAttributeMapping::new("region", "Region", &["region_code", "region_country"]))
            .with_attribute(PluralAttributeMapping::new("Customer", "orders").of_entity("Order"))
    }

    pub fn metamodel() -> MappingMetamodel {
        let mut metamodel = MappingMetamodel::new();
        metamodel.register(customer()).unwrap();
        metamodel
            .register(
                EntityMapping::new(
                    "Region",
                    "region",
                    EmbeddableMapping::new("id")
                        .with_attribute(BasicAttributeMapping::new("code", "code"))
                        .with_attribute(BasicAttributeMapping::new("country", "country")),
                )
                .with_discriminator(BasicAttributeMapping::new("class", "dtype"))
                .with_attribute(BasicAttributeMapping::new("label", "label")),
            )
            .unwrap();
        metamodel
    }
}
