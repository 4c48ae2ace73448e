//! Result-set mapping: reconstructing typed object graphs from rows.
//!
//! - [`navigable_path`]: positions in the graph being assembled
//! - [`mapping`]: entity, embeddable and attribute descriptors
//! - [`jdbc_values`]: the column set a statement actually returned
//! - [`creation_state`]: resolution context (positions, selections, fetch scopes)
//! - [`complete`]: result and fetch builders built from static mappings
//! - [`domain`]: resolved results and assembled values
//! - [`mapping_descriptor`]: declarative mappings and their resolution
//! - [`row_reader`]: reading rows through resolved results
//!
//! # Architecture
//!
//! Builders are resolved once per executed statement against its
//! [`JdbcValuesMetadata`]. Resolution registers each referenced column once
//! and produces a [`DomainResult`] tree; a [`RowReader`] then assembles
//! every row into [`DomainValue`]s.

pub mod complete;
pub mod creation_state;
pub mod domain;
pub mod jdbc_values;
pub mod mapping;
pub mod mapping_descriptor;
pub mod navigable_path;
pub mod row_reader;

pub use complete::{
    CompleteFetchBuilder, CompleteFetchBuilderBasicPart, CompleteFetchBuilderEmbeddableValuedModelPart,
    CompleteFetchBuilderEntityValuedModelPart, CompleteResultBuilder,
    CompleteResultBuilderBasicModelPart, CompleteResultBuilderBasicValuedStandard,
    CompleteResultBuilderEntityJpa, CompleteResultBuilderEntityStandard,
    CompleteResultBuilderInstantiation, FetchBuilder, ResultBuilder,
};
pub use creation_state::{DomainResultCreationState, ExplicitFetchScope, FetchScopeGuard};
pub use domain::{DomainResult, DomainValue, Fetch, SqlSelection};
pub use jdbc_values::{JdbcValuesMetadata, SimpleJdbcValuesMetadata};
pub use mapping::{
    AttributeMapping, BasicAttributeMapping, EmbeddableMapping, EntityMapping, MappingMetamodel,
    ModelPart, PluralAttributeMapping, SelectableMapping, ToOneAttributeMapping,
};
pub use mapping_descriptor::{
    ColumnResultDescriptor, ConstructorResultDescriptor, EntityResultDescriptor,
    FieldResultDescriptor, ResultDescriptor, ResultSetMapping, ResultSetMappingDescriptor,
};
pub use navigable_path::NavigablePath;
pub use row_reader::RowReader;
