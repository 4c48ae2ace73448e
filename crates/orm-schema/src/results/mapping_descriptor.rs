//! Static result-set mappings and their resolution into builders.
//!
//! A [`ResultSetMappingDescriptor`] is the declarative form (entity
//! results with field results, column results, constructor results),
//! loadable from YAML. Resolving it against a [`MappingMetamodel`] yields a
//! [`ResultSetMapping`] of builders, which is resolved once per executed
//! statement into a [`RowReader`].

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::complete::{
    CompleteFetchBuilder, CompleteFetchBuilderBasicPart, CompleteFetchBuilderEmbeddableValuedModelPart,
    CompleteFetchBuilderEntityValuedModelPart, CompleteResultBuilder,
    CompleteResultBuilderBasicValuedStandard, CompleteResultBuilderEntityJpa,
    CompleteResultBuilderEntityStandard, CompleteResultBuilderInstantiation, ResultBuilder,
};
use super::creation_state::DomainResultCreationState;
use super::domain::DomainValue;
use super::jdbc_values::{JdbcValuesMetadata, SimpleJdbcValuesMetadata};
use super::mapping::{AttributeMapping, EntityMapping, MappingMetamodel, ModelPart};
use super::navigable_path::NavigablePath;
use super::row_reader::RowReader;
use crate::error::{OrmError, Result};
use crate::jdbc::ResultSet;

/// Declarative result-set mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSetMappingDescriptor {
    pub name: String,
    #[serde(default)]
    pub results: Vec<ResultDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultDescriptor {
    Entity(EntityResultDescriptor),
    Column(ColumnResultDescriptor),
    Constructor(ConstructorResultDescriptor),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityResultDescriptor {
    pub entity: String,
    /// Root of the navigable paths; defaults to the entity name.
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub discriminator_column: Option<String>,
    /// Native form: the identifier's field results are kept apart from the
    /// other fetches.
    #[serde(default)]
    pub native: bool,
    /// Repeated names map multi-column attributes in column order; dotted
    /// names reach into embeddables.
    #[serde(default)]
    pub fields: Vec<FieldResultDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResultDescriptor {
    pub name: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnResultDescriptor {
    /// Absent means the next positional column.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub type_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorResultDescriptor {
    pub target_class: String,
    #[serde(default)]
    pub columns: Vec<ColumnResultDescriptor>,
}

impl ResultSetMappingDescriptor {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// # Errors
    ///
    /// `ResultMapping` for unknown entities or attributes, plural
    /// attributes mapped to columns, and column counts that do not match
    /// the mapped attribute.
    pub fn resolve(&self, metamodel: &MappingMetamodel) -> Result<ResultSetMapping> {
        let builders = self
            .results
            .iter()
            .map(|result| match result {
                ResultDescriptor::Entity(entity) => resolve_entity(entity, metamodel),
                ResultDescriptor::Column(column) => Ok(column_builder(column)),
                ResultDescriptor::Constructor(constructor) => {
                    Ok(CompleteResultBuilder::Instantiation(CompleteResultBuilderInstantiation::new(
                        constructor.target_class.clone(),
                        constructor.columns.iter().map(column_builder).collect(),
                    )))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(mapping = %self.name, results = builders.len(), "Resolved result-set mapping");
        Ok(ResultSetMapping {
            name: self.name.clone(),
            builders,
        })
    }
}

fn column_builder(column: &ColumnResultDescriptor) -> CompleteResultBuilder {
    CompleteResultBuilder::BasicValuedStandard(CompleteResultBuilderBasicValuedStandard::new(
        column.column.clone(),
        column.type_code,
    ))
}

fn resolve_entity(
    descriptor: &EntityResultDescriptor,
    metamodel: &MappingMetamodel,
) -> Result<CompleteResultBuilder> {
    let entity = Arc::clone(metamodel.entity(&descriptor.entity)?);
    let root = NavigablePath::new(descriptor.alias.as_deref().unwrap_or(&entity.entity_name));

    let mut columns_by_field: IndexMap<&str, Vec<String>> = IndexMap::new();
    for field in &descriptor.fields {
        columns_by_field
            .entry(field.name.as_str())
            .or_default()
            .push(field.column.clone());
    }

    let mut fetch_builders = BTreeMap::new();
    for (name, columns) in columns_by_field {
        let builder = fetch_builder(metamodel, &entity, &root, name, columns)?;
        fetch_builders.insert(name.to_string(), builder);
    }

    if descriptor.native {
        let identifier = fetch_builders.remove(entity.identifier_name());
        Ok(CompleteResultBuilder::EntityStandard(CompleteResultBuilderEntityStandard::new(
            root,
            entity,
            descriptor.discriminator_column.clone(),
            identifier,
            fetch_builders,
        )))
    } else {
        Ok(CompleteResultBuilder::EntityJpa(CompleteResultBuilderEntityJpa::new(
            root,
            entity,
            descriptor.discriminator_column.clone(),
            fetch_builders,
        )))
    }
}

fn fetch_builder(
    metamodel: &MappingMetamodel,
    entity: &EntityMapping,
    root: &NavigablePath,
    name: &str,
    columns: Vec<String>,
) -> Result<CompleteFetchBuilder> {
    let path = name.split('.').fold(root.clone(), |path, segment| path.append(segment));
    let ModelPart::Attribute(attribute) = metamodel.resolve_part(entity, name)? else {
        return Err(OrmError::ResultMapping(format!("[{}] is not an attribute", path)));
    };
    match attribute {
        AttributeMapping::Basic(basic) => {
            let [column] = <[String; 1]>::try_from(columns).map_err(|columns| {
                OrmError::ResultMapping(format!(
                    "Basic attribute [{}] maps to exactly one column, got {}",
                    path,
                    columns.len()
                ))
            })?;
            Ok(CompleteFetchBuilder::BasicPart(CompleteFetchBuilderBasicPart::new(
                path,
                basic,
                Some(column),
            )))
        }
        AttributeMapping::Embedded(embeddable) => Ok(CompleteFetchBuilder::EmbeddableValuedModelPart(
            CompleteFetchBuilderEmbeddableValuedModelPart::new(path, embeddable, columns)?,
        )),
        AttributeMapping::ToOne(to_one) => Ok(CompleteFetchBuilder::EntityValuedModelPart(
            CompleteFetchBuilderEntityValuedModelPart::new(path, to_one, columns)?,
        )),
        AttributeMapping::Plural(_) => Err(OrmError::ResultMapping(format!(
            "Plural attribute [{}] cannot be read from result columns",
            path
        ))),
    }
}

/// Builders of a resolved static mapping. Structurally identical mappings
/// compare and hash equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultSetMapping {
    name: String,
    builders: Vec<CompleteResultBuilder>,
}

impl ResultSetMapping {
    pub fn new(name: impl Into<String>, builders: Vec<CompleteResultBuilder>) -> Self {
        Self {
            name: name.into(),
            builders,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn builders(&self) -> &[CompleteResultBuilder] {
        &self.builders
    }

    /// Resolve every builder against the executed statement's columns.
    pub fn resolve(
        &self,
        metadata: &dyn JdbcValuesMetadata,
        positional_selections_allowed: bool,
    ) -> Result<RowReader> {
        let mut state = DomainResultCreationState::new(metadata, positional_selections_allowed);
        let results = self
            .builders
            .iter()
            .map(|builder| builder.build_result(&mut state))
            .collect::<Result<Vec<_>>>()?;
        Ok(RowReader::new(results, state.selections()))
    }

    /// Resolve against `result_set` and read all of its rows.
    pub fn read(
        &self,
        result_set: &mut ResultSet,
        positional_selections_allowed: bool,
    ) -> Result<Vec<Vec<DomainValue>>> {
        let metadata = SimpleJdbcValuesMetadata::from_result_set(result_set);
        self.resolve(&metadata, positional_selections_allowed)?
            .read_all(result_set)
    }
}
