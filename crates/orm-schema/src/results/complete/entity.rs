//! Entity results and to-one fetches.
//!
//! [`CompleteResultBuilderEntityJpa`] and [`CompleteResultBuilderEntityStandard`]
//! share one algorithm. They differ in where the identifier builder comes
//! from: JPA keeps it among the ordinary fetch builders (an `EntityResult`
//! lists id columns as field results), the native form keeps it apart.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{build_attribute_fetch, CompleteFetchBuilder, FetchBuilder, ResultBuilder};
use crate::error::{OrmError, Result};
use crate::results::creation_state::{DomainResultCreationState, ExplicitFetchScope};
use crate::results::domain::{DomainResult, Fetch};
use crate::results::mapping::{EntityMapping, ToOneAttributeMapping};
use crate::results::navigable_path::NavigablePath;

/// Reads a to-one association's join columns through explicit aliases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompleteFetchBuilderEntityValuedModelPart {
    navigable_path: NavigablePath,
    model_part: Arc<ToOneAttributeMapping>,
    column_aliases: Vec<String>,
}

impl CompleteFetchBuilderEntityValuedModelPart {
    /// # Errors
    ///
    /// `ResultMapping` when the alias count differs from the number of
    /// join columns.
    pub fn new(
        navigable_path: NavigablePath,
        model_part: Arc<ToOneAttributeMapping>,
        column_aliases: Vec<String>,
    ) -> Result<Self> {
        if column_aliases.len() != model_part.join_columns.len() {
            return Err(OrmError::ResultMapping(format!(
                "Association [{}] has {} join columns but {} aliases were given",
                navigable_path,
                model_part.join_columns.len(),
                column_aliases.len()
            )));
        }
        Ok(Self {
            navigable_path,
            model_part,
            column_aliases,
        })
    }

    pub fn model_part(&self) -> &ToOneAttributeMapping {
        &self.model_part
    }
}

impl FetchBuilder for CompleteFetchBuilderEntityValuedModelPart {
    fn navigable_path(&self) -> &NavigablePath {
        &self.navigable_path
    }

    fn build_fetch(&self, state: &mut DomainResultCreationState<'_>) -> Result<Fetch> {
        let key = self
            .column_aliases
            .iter()
            .map(|alias| state.resolve_sql_selection(Some(alias), &self.navigable_path))
            .collect::<Result<Vec<_>>>()?;
        Ok(Fetch::EntityKey {
            path: self.navigable_path.clone(),
            attribute: self.model_part.name.clone(),
            target_entity: self.model_part.target_entity.clone(),
            key,
        })
    }
}

/// Entity result in JPA form: the identifier is one of the fetch builders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompleteResultBuilderEntityJpa {
    navigable_path: NavigablePath,
    entity: Arc<EntityMapping>,
    discriminator_alias: Option<String>,
    explicit_fetch_builders: BTreeMap<String, CompleteFetchBuilder>,
}

impl CompleteResultBuilderEntityJpa {
    pub fn new(
        navigable_path: NavigablePath,
        entity: Arc<EntityMapping>,
        discriminator_alias: Option<String>,
        explicit_fetch_builders: BTreeMap<String, CompleteFetchBuilder>,
    ) -> Self {
        Self {
            navigable_path,
            entity,
            discriminator_alias,
            explicit_fetch_builders,
        }
    }

    pub fn entity(&self) -> &EntityMapping {
        &self.entity
    }

    pub fn explicit_fetch_builders(&self) -> &BTreeMap<String, CompleteFetchBuilder> {
        &self.explicit_fetch_builders
    }
}

impl ResultBuilder for CompleteResultBuilderEntityJpa {
    fn navigable_path(&self) -> &NavigablePath {
        &self.navigable_path
    }

    fn build_result(&self, state: &mut DomainResultCreationState<'_>) -> Result<DomainResult> {
        let identifier_name = self.entity.identifier_name();
        let identifier = self.explicit_fetch_builders.get(identifier_name);
        let fetches = self
            .explicit_fetch_builders
            .iter()
            .filter(|(name, _)| name.as_str() != identifier_name);
        build_entity_result(
            &self.navigable_path,
            &self.entity,
            self.discriminator_alias.as_deref(),
            identifier,
            fetches,
            state,
        )
    }
}

/// Entity result in native form: the identifier builder is separate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompleteResultBuilderEntityStandard {
    navigable_path: NavigablePath,
    entity: Arc<EntityMapping>,
    discriminator_alias: Option<String>,
    identifier_fetch_builder: Option<CompleteFetchBuilder>,
    explicit_fetch_builders: BTreeMap<String, CompleteFetchBuilder>,
}

impl CompleteResultBuilderEntityStandard {
    pub fn new(
        navigable_path: NavigablePath,
        entity: Arc<EntityMapping>,
        discriminator_alias: Option<String>,
        identifier_fetch_builder: Option<CompleteFetchBuilder>,
        explicit_fetch_builders: BTreeMap<String, CompleteFetchBuilder>,
    ) -> Self {
        Self {
            navigable_path,
            entity,
            discriminator_alias,
            identifier_fetch_builder,
            explicit_fetch_builders,
        }
    }

    pub fn entity(&self) -> &EntityMapping {
        &self.entity
    }
}

impl ResultBuilder for CompleteResultBuilderEntityStandard {
    fn navigable_path(&self) -> &NavigablePath {
        &self.navigable_path
    }

    fn build_result(&self, state: &mut DomainResultCreationState<'_>) -> Result<DomainResult> {
        build_entity_result(
            &self.navigable_path,
            &self.entity,
            self.discriminator_alias.as_deref(),
            self.identifier_fetch_builder.as_ref(),
            self.explicit_fetch_builders.iter(),
            state,
        )
    }
}

fn build_entity_result<'b>(
    path: &NavigablePath,
    entity: &EntityMapping,
    discriminator_alias: Option<&str>,
    identifier_builder: Option<&CompleteFetchBuilder>,
    fetch_builders: impl Iterator<Item = (&'b String, &'b CompleteFetchBuilder)>,
    state: &mut DomainResultCreationState<'_>,
) -> Result<DomainResult> {
    let scope: ExplicitFetchScope = fetch_builders
        .map(|(name, builder)| (name.clone(), builder.clone()))
        .collect();
    let mut state = state.push_explicit_fetch_scope(scope);

    let identifier = match identifier_builder {
        Some(builder) => builder.build_fetch(&mut state)?,
        None => build_attribute_fetch(&entity.identifier, path, &mut state)?,
    };

    let discriminator = match &entity.discriminator {
        Some(discriminator) => {
            let alias = discriminator_alias.unwrap_or(&discriminator.column);
            Some(state.resolve_sql_selection(Some(alias), &path.append(&discriminator.name))?)
        }
        None => None,
    };

    let mut fetches = Vec::with_capacity(entity.attributes.len());
    for attribute in &entity.attributes {
        fetches.push(build_attribute_fetch(attribute, path, &mut state)?);
    }

    Ok(DomainResult::Entity {
        path: path.clone(),
        entity_name: entity.entity_name.clone(),
        identifier: Box::new(identifier),
        discriminator,
        fetches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlValue;
    use crate::results::complete::CompleteFetchBuilderBasicPart;
    use crate::results::domain::DomainValue;
    use crate::results::jdbc_values::SimpleJdbcValuesMetadata;
    use crate::results::mapping::fixtures;
    use crate::results::mapping::AttributeMapping;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn customer() -> Arc<EntityMapping> {
        Arc::new(fixtures::customer())
    }

    fn basic_fetch(entity: &EntityMapping, root: &NavigablePath, name: &str, alias: &str) -> CompleteFetchBuilder {
        let Some(AttributeMapping::Basic(part)) = entity.find_sub_part(name) else {
            panic!("{} is not basic", name);
        };
        CompleteFetchBuilder::BasicPart(CompleteFetchBuilderBasicPart::new(
            root.append(name),
            Arc::clone(part),
            Some(alias.to_string()),
        ))
    }

    fn jpa_builder() -> CompleteResultBuilderEntityJpa {
        let entity = customer();
        let root = NavigablePath::new("Customer");
        let mut fetches = BTreeMap::new();
        fetches.insert("id".to_string(), basic_fetch(&entity, &root, "id", "c_id"));
        fetches.insert("name".to_string(), basic_fetch(&entity, &root, "name", "c_name"));
        CompleteResultBuilderEntityJpa::new(root, entity, None, fetches)
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_identical_mappings_are_cache_key_equal() {
        let a = jpa_builder();
        let b = jpa_builder();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let mut fetches = a.explicit_fetch_builders().clone();
        let root = NavigablePath::new("Customer");
        fetches.insert("name".to_string(), basic_fetch(&customer(), &root, "name", "other"));
        let c = CompleteResultBuilderEntityJpa::new(root, customer(), None, fetches);
        assert_ne!(a, c);
    }

    #[test]
    fn test_jpa_entity_result_resolves_explicit_and_implicit_parts() {
        let metadata =
            SimpleJdbcValuesMetadata::new(["c_id", "c_name", "street", "city", "region_code", "region_country"]);
        let mut state = DomainResultCreationState::new(&metadata, false);
        let result = jpa_builder().build_result(&mut state).unwrap();
        assert_eq!(state.fetch_scope_depth(), 0);

        let row = vec![
            SqlValue::Int(1),
            SqlValue::Text("Ada".into()),
            SqlValue::Text("Main St".into()),
            SqlValue::Text("Oslo".into()),
            SqlValue::Text("N".into()),
            SqlValue::Text("NO".into()),
        ];
        let value = result.assemble(&row);
        assert_eq!(
            value.attribute("name"),
            Some(&DomainValue::Scalar(SqlValue::Text("Ada".into())))
        );
        assert_eq!(
            value.attribute("address").unwrap().attribute("city"),
            Some(&DomainValue::Scalar(SqlValue::Text("Oslo".into())))
        );
        // no explicit builder: to-one and plural attributes are delayed
        assert_eq!(
            value.attribute("region"),
            Some(&DomainValue::Delayed {
                target: "Region".into()
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
    fn test_dotted_entries_resolve_embeddable_columns() {
        let entity = customer();
        let root = NavigablePath::new("Customer");
        let Some(AttributeMapping::Embedded(address)) = entity.find_sub_part("address") else {
            panic!("address is not embedded");
        };
        let Some(AttributeMapping::Basic(city)) = address.find_attribute("city") else {
            panic!("city is not basic");
        };
        let mut fetches = BTreeMap::new();
        fetches.insert(
            "address.city".to_string(),
            CompleteFetchBuilder::BasicPart(CompleteFetchBuilderBasicPart::new(
                root.append("address").append("city"),
                Arc::clone(city),
                Some("home_city".into()),
            )),
        );
        let builder = CompleteResultBuilderEntityStandard::new(root, Arc::clone(&entity), None, None, fetches);
        let metadata = SimpleJdbcValuesMetadata::new(["id", "name", "street", "home_city"]);
        let mut state = DomainResultCreationState::new(&metadata, false);
        let result = builder.build_result(&mut state).unwrap();
        let DomainResult::Entity { fetches, .. } = &result else {
            panic!("expected an entity result");
        };
        let Fetch::Embeddable { fetches: address_fetches, .. } = &fetches[1] else {
            panic!("expected the address embeddable");
        };
        let Fetch::Basic { selection, .. } = &address_fetches[1] else {
            panic!("expected city");
        };
        assert_eq!(selection.jdbc_position, 4);
    }

    #[test]
    fn test_standard_form_uses_separate_identifier_builder() {
        let entity = customer();
        let root = NavigablePath::new("Customer");
        let identifier = basic_fetch(&entity, &root, "id", "customer_key");
        let builder =
            CompleteResultBuilderEntityStandard::new(root, entity, None, Some(identifier), BTreeMap::new());
        let metadata = SimpleJdbcValuesMetadata::new(["customer_key", "name", "street", "city"]);
        let mut state = DomainResultCreationState::new(&metadata, false);
        let DomainResult::Entity { identifier, .. } = builder.build_result(&mut state).unwrap() else {
            panic!("expected an entity result");
        };
        let Fetch::Basic { selection, .. } = *identifier else {
            panic!("expected a basic identifier");
        };
        assert_eq!(selection.jdbc_position, 1);
    }

    #[test]
    fn test_missing_implicit_column_fails_and_pops_scope() {
        let metadata = SimpleJdbcValuesMetadata::new(["c_id", "c_name"]);
        let mut state = DomainResultCreationState::new(&metadata, false);
        let err = jpa_builder().build_result(&mut state).unwrap_err();
        assert!(matches!(err, OrmError::MissingSqlSelection { ref alias, .. } if alias == "street"));
        assert_eq!(state.fetch_scope_depth(), 0);
    }

    #[test]
    fn test_discriminator_and_composite_identifier() {
        let metamodel = fixtures::metamodel();
        let region = Arc::clone(metamodel.entity("Region").unwrap());
        let builder = CompleteResultBuilderEntityStandard::new(
            NavigablePath::new("Region"),
            region,
            Some("kind".into()),
            None,
            BTreeMap::new(),
        );
        let metadata = SimpleJdbcValuesMetadata::new(["code", "country", "kind", "label"]);
        let mut state = DomainResultCreationState::new(&metadata, false);
        let result = builder.build_result(&mut state).unwrap();
        let row = vec![
            SqlValue::Text("N".into()),
            SqlValue::Text("NO".into()),
            SqlValue::Text("R".into()),
            SqlValue::Text("North".into()),
        ];
        let DomainValue::Entity { discriminator, id, .. } = result.assemble(&row) else {
            panic!("expected an entity");
        };
        assert_eq!(discriminator, Some(SqlValue::Text("R".into())));
        assert_eq!(
            id.attribute("country"),
            Some(&DomainValue::Scalar(SqlValue::Text("NO".into())))
        );
    }

    #[test]
    fn test_to_one_alias_count() {
        let entity = customer();
        let Some(AttributeMapping::ToOne(region)) = entity.find_sub_part("region") else {
            panic!("region is not to-one");
        };
        let path = NavigablePath::new("Customer").append("region");
        assert!(CompleteFetchBuilderEntityValuedModelPart::new(path.clone(), Arc::clone(region), vec!["r".into()]).is_err());
        let builder = CompleteFetchBuilderEntityValuedModelPart::new(
            path,
            Arc::clone(region),
            vec!["r_code".into(), "r_country".into()],
        )
        .unwrap();
        let metadata = SimpleJdbcValuesMetadata::new(["r_country", "r_code"]);
        let mut state = DomainResultCreationState::new(&metadata, false);
        let Fetch::EntityKey { key, target_entity, .. } = builder.build_fetch(&mut state).unwrap() else {
            panic!("expected an entity key");
        };
        assert_eq!(target_entity, "Region");
        assert_eq!(key.iter().map(|s| s.jdbc_position).collect::<Vec<_>>(), vec![2, 1]);
    }
}
