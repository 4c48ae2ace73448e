//! Extraction of existing sequences.
//!
//! The strategy is chosen by the dialect: databases without sequences use
//! [`SequenceInformationExtractorNoOp`], H2 is read through its
//! `information_schema`, and other databases run the dialect's sequence
//! query through [`SequenceInformationExtractorLegacy`].

use tracing::debug;

use super::information::SequenceInformation;
use super::ExtractionContext;
use crate::core::identifier::ObjectName;
use crate::error::Result;
use crate::jdbc::{ResultSet, SqlException, SqlResult};

/// Query used for H2.
pub const H2_SEQUENCE_QUERY: &str = "select sequence_catalog, sequence_schema, sequence_name, increment from information_schema.sequences";

/// Reads sequence metadata from a connection.
pub trait SequenceInformationExtractor {
    fn extract_metadata(&self, context: &ExtractionContext<'_>) -> Result<Vec<SequenceInformation>>;
}

/// For dialects without sequence support.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceInformationExtractorNoOp;

impl SequenceInformationExtractor for SequenceInformationExtractorNoOp {
    fn extract_metadata(&self, _context: &ExtractionContext<'_>) -> Result<Vec<SequenceInformation>> {
        Ok(Vec::new())
    }
}

/// H2 `information_schema.sequences`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceInformationExtractorH2;

impl SequenceInformationExtractor for SequenceInformationExtractorH2 {
    fn extract_metadata(&self, context: &ExtractionContext<'_>) -> Result<Vec<SequenceInformation>> {
        run_query(context, H2_SEQUENCE_QUERY)
    }
}

/// Runs the dialect's sequence query; only the name column is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceInformationExtractorLegacy;

impl SequenceInformationExtractor for SequenceInformationExtractorLegacy {
    fn extract_metadata(&self, context: &ExtractionContext<'_>) -> Result<Vec<SequenceInformation>> {
        match context.environment.dialect().query_sequences_string() {
            Some(query) => run_query(context, query),
            None => {
                debug!(
                    "Dialect {} provides no sequence query",
                    context.environment.dialect().name()
                );
                Ok(Vec::new())
            }
        }
    }
}

/// Dispatch over the built-in extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceInformationExtractorImpl {
    NoOp,
    H2,
    Legacy,
}

impl SequenceInformationExtractor for SequenceInformationExtractorImpl {
    fn extract_metadata(&self, context: &ExtractionContext<'_>) -> Result<Vec<SequenceInformation>> {
        match self {
            SequenceInformationExtractorImpl::NoOp => {
                SequenceInformationExtractorNoOp.extract_metadata(context)
            }
            SequenceInformationExtractorImpl::H2 => {
                SequenceInformationExtractorH2.extract_metadata(context)
            }
            SequenceInformationExtractorImpl::Legacy => {
                SequenceInformationExtractorLegacy.extract_metadata(context)
            }
        }
    }
}

fn run_query(context: &ExtractionContext<'_>, query: &str) -> Result<Vec<SequenceInformation>> {
    let convert = |e: SqlException| {
        context.environment.sql_exception_helper().convert(
            e,
            "Unable to access sequence information",
            Some(query),
        )
    };
    let mut result_set = context.connection.query(query).map_err(convert)?;
    read_sequences(context, &mut result_set).map_err(convert)
}

fn read_sequences(
    context: &ExtractionContext<'_>,
    result_set: &mut ResultSet,
) -> SqlResult<Vec<SequenceInformation>> {
    let helper = context.environment.identifier_helper();
    let mut sequences = Vec::new();
    while result_set.next_row() {
        let catalog = result_set.get_optional("sequence_catalog")?.as_string();
        let schema = result_set.get_optional("sequence_schema")?.as_string();
        let name = result_set.get_string("sequence_name")?;
        let Some(name) = helper.from_meta_data_object_name(name.as_deref()) else {
            continue;
        };
        sequences.push(SequenceInformation {
            name: ObjectName::new(
                helper.from_meta_data_catalog_name(catalog.as_deref()),
                helper.from_meta_data_schema_name(schema.as_deref()),
                name,
            ),
            increment: result_set.get_optional("increment")?.as_i64(),
        });
    }
    Ok(sequences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlValue;
    use crate::dialect::{Dialect, H2Dialect, MssqlDialect};
    use crate::jdbc::{InMemoryConnection, JdbcEnvironment, RowSet};
    use std::sync::Arc;

    fn h2_connection() -> InMemoryConnection {
        InMemoryConnection::new(H2Dialect::new().name_storage())
            .with_current_schema("PUBLIC")
            .with_sequence(Some("PUBLIC"), "ORDER_SEQ", 50)
            .with_sequence(Some("OTHER"), "AUDIT_SEQ", 1)
    }

    #[test]
    fn test_h2_extractor_strips_current_schema() {
        let conn = h2_connection();
        let env = JdbcEnvironment::from_connection(Arc::new(H2Dialect::new()), &conn).unwrap();
        let context = ExtractionContext::new(&env, &conn);
        let sequences = SequenceInformationExtractorImpl::H2
            .extract_metadata(&context)
            .unwrap();
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].name.to_string(), "ORDER_SEQ");
        assert_eq!(sequences[0].increment, Some(50));
        assert_eq!(sequences[1].name.to_string(), "OTHER.AUDIT_SEQ");
    }

    #[test]
    fn test_legacy_extractor_needs_only_names() {
        let conn = InMemoryConnection::default().with_query(
            "select sequence_catalog, sequence_schema, sequence_name, increment from information_schema.sequences",
            RowSet {
                columns: vec!["sequence_name".into()],
                rows: vec![vec![SqlValue::from("hibernate_sequence")]],
            },
        );
        let env = JdbcEnvironment::from_connection(Arc::new(MssqlDialect::new()), &conn).unwrap();
        let context = ExtractionContext::new(&env, &conn);
        let sequences = SequenceInformationExtractorImpl::Legacy
            .extract_metadata(&context)
            .unwrap();
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].increment, None);
    }

    #[test]
    fn test_noop_extractor_issues_no_query() {
        let conn = InMemoryConnection::default();
        let env = JdbcEnvironment::from_connection(Arc::new(MssqlDialect::new()), &conn).unwrap();
        let context = ExtractionContext::new(&env, &conn);
        assert!(SequenceInformationExtractorImpl::NoOp
            .extract_metadata(&context)
            .unwrap()
            .is_empty());
    }
}
