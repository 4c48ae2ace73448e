//! Builder for an embeddable read through an explicit alias per column.

use std::slice;
use std::sync::Arc;

use super::FetchBuilder;
use crate::error::{OrmError, Result};
use crate::results::creation_state::DomainResultCreationState;
use crate::results::domain::Fetch;
use crate::results::mapping::{AttributeMapping, EmbeddableMapping};
use crate::results::navigable_path::NavigablePath;

/// Fetches an embeddable, reading each of its columns (in declaration
/// order, nested embeddables flattened) through the alias at the same
/// index of `column_aliases`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompleteFetchBuilderEmbeddableValuedModelPart {
    navigable_path: NavigablePath,
    model_part: Arc<EmbeddableMapping>,
    column_aliases: Vec<String>,
}

impl CompleteFetchBuilderEmbeddableValuedModelPart {
    /// # Errors
    ///
    /// `ResultMapping` when the alias count differs from the number of
    /// columns of the embeddable.
    pub fn new(
        navigable_path: NavigablePath,
        model_part: Arc<EmbeddableMapping>,
        column_aliases: Vec<String>,
    ) -> Result<Self> {
        let expected = model_part.selectables().len();
        if column_aliases.len() != expected {
            return Err(OrmError::ResultMapping(format!(
                "Embeddable [{}] has {} columns but {} aliases were given",
                navigable_path,
                expected,
                column_aliases.len()
            )));
        }
        Ok(Self {
            navigable_path,
            model_part,
            column_aliases,
        })
    }

    pub fn model_part(&self) -> &EmbeddableMapping {
        &self.model_part
    }

    pub fn column_aliases(&self) -> &[String] {
        &self.column_aliases
    }
}

impl FetchBuilder for CompleteFetchBuilderEmbeddableValuedModelPart {
    fn navigable_path(&self) -> &NavigablePath {
        &self.navigable_path
    }

    fn build_fetch(&self, state: &mut DomainResultCreationState<'_>) -> Result<Fetch> {
        let mut aliases = self.column_aliases.iter();
        let fetches =
            embeddable_fetches(&self.model_part, &self.navigable_path, &mut aliases, state)?;
        Ok(Fetch::Embeddable {
            path: self.navigable_path.clone(),
            attribute: self.model_part.name.clone(),
            fetches,
        })
    }
}

fn embeddable_fetches(
    embeddable: &EmbeddableMapping,
    path: &NavigablePath,
    aliases: &mut slice::Iter<'_, String>,
    state: &mut DomainResultCreationState<'_>,
) -> Result<Vec<Fetch>> {
    let mut fetches = Vec::with_capacity(embeddable.attributes.len());
    for attribute in &embeddable.attributes {
        let attribute_path = path.append(attribute.name());
        let fetch = match attribute {
            AttributeMapping::Basic(basic) => {
                let alias = next_alias(aliases, &attribute_path)?;
                Fetch::Basic {
                    selection: state.resolve_sql_selection(Some(alias), &attribute_path)?,
                    path: attribute_path,
                    attribute: basic.name.clone(),
                }
            }
            AttributeMapping::Embedded(nested) => Fetch::Embeddable {
                fetches: embeddable_fetches(nested, &attribute_path, aliases, state)?,
                path: attribute_path,
                attribute: nested.name.clone(),
            },
            AttributeMapping::ToOne(to_one) => {
                let mut key = Vec::with_capacity(to_one.join_columns.len());
                for _ in &to_one.join_columns {
                    let alias = next_alias(aliases, &attribute_path)?;
                    key.push(state.resolve_sql_selection(Some(alias), &attribute_path)?);
                }
                Fetch::EntityKey {
                    path: attribute_path,
                    attribute: to_one.name.clone(),
                    target_entity: to_one.target_entity.clone(),
                    key,
                }
            }
            AttributeMapping::Plural(plural) => Fetch::Delayed {
                path: attribute_path,
                attribute: plural.name.clone(),
                target: plural.role.clone(),
            },
        };
        fetches.push(fetch);
    }
    Ok(fetches)
}

fn next_alias<'a>(aliases: &mut slice::Iter<'a, String>, path: &NavigablePath) -> Result<&'a str> {
    aliases
        .next()
        .map(String::as_str)
        .ok_or_else(|| OrmError::ResultMapping(format!("No column alias left for [{}]", path)))
}
