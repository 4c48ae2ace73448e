//! Result and fetch builders built ahead of time from static mappings.
//!
//! Every builder is an immutable value with `Eq + Hash` over its path,
//! model part and aliases, so structurally identical mappings can share a
//! cache entry. [`CompleteResultBuilder`] and [`CompleteFetchBuilder`]
//! dispatch to the concrete builders with a `match`.

mod basic;
mod embeddable;
mod entity;
mod instantiation;

pub use basic::{
    CompleteFetchBuilderBasicPart, CompleteResultBuilderBasicModelPart,
    CompleteResultBuilderBasicValuedStandard,
};
pub use embeddable::CompleteFetchBuilderEmbeddableValuedModelPart;
pub use entity::{
    CompleteFetchBuilderEntityValuedModelPart, CompleteResultBuilderEntityJpa,
    CompleteResultBuilderEntityStandard,
};
pub use instantiation::CompleteResultBuilderInstantiation;

use super::creation_state::DomainResultCreationState;
use super::domain::{DomainResult, Fetch};
use super::mapping::AttributeMapping;
use super::navigable_path::NavigablePath;
use crate::error::Result;

/// Resolves into a top-level [`DomainResult`].
pub trait ResultBuilder {
    fn navigable_path(&self) -> &NavigablePath;

    fn build_result(&self, state: &mut DomainResultCreationState<'_>) -> Result<DomainResult>;
}

/// Resolves into a [`Fetch`] of its parent.
pub trait FetchBuilder {
    fn navigable_path(&self) -> &NavigablePath;

    fn build_fetch(&self, state: &mut DomainResultCreationState<'_>) -> Result<Fetch>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompleteResultBuilder {
    BasicValuedStandard(CompleteResultBuilderBasicValuedStandard),
    BasicModelPart(CompleteResultBuilderBasicModelPart),
    EntityJpa(CompleteResultBuilderEntityJpa),
    EntityStandard(CompleteResultBuilderEntityStandard),
    Instantiation(CompleteResultBuilderInstantiation),
}

impl CompleteResultBuilder {
    fn inner(&self) -> &dyn ResultBuilder {
        match self {
            CompleteResultBuilder::BasicValuedStandard(b) => b,
            CompleteResultBuilder::BasicModelPart(b) => b,
            CompleteResultBuilder::EntityJpa(b) => b,
            CompleteResultBuilder::EntityStandard(b) => b,
            CompleteResultBuilder::Instantiation(b) => b,
        }
    }
}

impl ResultBuilder for CompleteResultBuilder {
    fn navigable_path(&self) -> &NavigablePath {
        self.inner().navigable_path()
    }

    fn build_result(&self, state: &mut DomainResultCreationState<'_>) -> Result<DomainResult> {
        self.inner().build_result(state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompleteFetchBuilder {
    BasicPart(CompleteFetchBuilderBasicPart),
    EmbeddableValuedModelPart(CompleteFetchBuilderEmbeddableValuedModelPart),
    EntityValuedModelPart(CompleteFetchBuilderEntityValuedModelPart),
}

impl CompleteFetchBuilder {
    fn inner(&self) -> &dyn FetchBuilder {
        match self {
            CompleteFetchBuilder::BasicPart(b) => b,
            CompleteFetchBuilder::EmbeddableValuedModelPart(b) => b,
            CompleteFetchBuilder::EntityValuedModelPart(b) => b,
        }
    }
}

impl FetchBuilder for CompleteFetchBuilder {
    fn navigable_path(&self) -> &NavigablePath {
        self.inner().navigable_path()
    }

    fn build_fetch(&self, state: &mut DomainResultCreationState<'_>) -> Result<Fetch> {
        self.inner().build_fetch(state)
    }
}

/// Fetch for an attribute of `parent`: the explicit builder registered for
/// it in the innermost fetch scope, otherwise an implicit one. Implicit
/// basics read the column by name, implicit embeddables resolve each of
/// their attributes the same way inside a scope narrowed to their name,
/// and associations are delayed.
pub(crate) fn build_attribute_fetch(
    attribute: &AttributeMapping,
    parent: &NavigablePath,
    state: &mut DomainResultCreationState<'_>,
) -> Result<Fetch> {
    if let Some(builder) = state.explicit_fetch_builder(attribute.name()).cloned() {
        return builder.build_fetch(state);
    }

    let path = parent.append(attribute.name());
    match attribute {
        AttributeMapping::Basic(basic) => Ok(Fetch::Basic {
            selection: state.resolve_sql_selection(Some(&basic.column), &path)?,
            path,
            attribute: basic.name.clone(),
        }),
        AttributeMapping::Embedded(embeddable) => {
            let scope = state
                .current_fetch_scope()
                .map(|s| s.below(&embeddable.name))
                .unwrap_or_default();
            let mut state = state.push_explicit_fetch_scope(scope);
            let mut fetches = Vec::with_capacity(embeddable.attributes.len());
            for nested in &embeddable.attributes {
                fetches.push(build_attribute_fetch(nested, &path, &mut state)?);
            }
            Ok(Fetch::Embeddable {
                path,
                attribute: embeddable.name.clone(),
                fetches,
            })
        }
        AttributeMapping::ToOne(to_one) => Ok(Fetch::Delayed {
            path,
            attribute: to_one.name.clone(),
            target: to_one.target_entity.clone(),
        }),
        AttributeMapping::Plural(plural) => Ok(Fetch::Delayed {
            path,
            attribute: plural.name.clone(),
            target: plural.role.clone(),
        }),
    }
}
