//! H2 dialect.

use super::Dialect;
use crate::extract::identifier_helper::NameStorageFlags;
use crate::extract::sequence::SequenceInformationExtractorImpl;

/// H2 dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct H2Dialect;

impl H2Dialect {
    /// Create a new H2 dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for H2Dialect {
    fn name(&self) -> &str {
        "h2"
    }

    fn name_storage(&self) -> NameStorageFlags {
        NameStorageFlags {
            stores_mixed_case_quoted_identifiers: true,
            stores_upper_case_identifiers: true,
            ..NameStorageFlags::default()
        }
    }

    fn keywords(&self) -> &[&'static str] {
        &["limit", "minus", "offset", "qualify", "rownum", "sysdate", "top"]
    }

    fn supports_if_exists_before_table_name(&self) -> bool {
        true
    }

    fn supports_if_exists_before_constraint_name(&self) -> bool {
        true
    }

    fn cascade_constraints_string(&self) -> &str {
        " cascade"
    }

    fn supports_sequences(&self) -> bool {
        true
    }

    fn supports_comment_on(&self) -> bool {
        true
    }

    fn drop_sequence_strings(&self, name: &str) -> Vec<String> {
        vec![format!("drop sequence if exists {}", name)]
    }

    fn sequence_information_extractor(&self) -> SequenceInformationExtractorImpl {
        SequenceInformationExtractorImpl::H2
    }

    fn can_disable_constraints(&self) -> bool {
        true
    }

    fn disable_constraints_statements(&self, _tables: &[String]) -> Vec<String> {
        vec!["set referential_integrity false".to_string()]
    }

    fn enable_constraints_statements(&self, _tables: &[String]) -> Vec<String> {
        vec!["set referential_integrity true".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h2_storage_is_upper_case() {
        let flags = H2Dialect::new().name_storage();
        assert!(flags.stores_upper_case_identifiers);
        assert!(flags.stores_mixed_case_quoted_identifiers);
    }

    #[test]
    fn test_h2_table_cleaner() {
        let dialect = H2Dialect::new();
        let tables = vec!["a".to_string()];
        assert!(dialect.can_disable_constraints());
        assert_eq!(
            dialect.disable_constraints_statements(&tables),
            vec!["set referential_integrity false"]
        );
        assert_eq!(dialect.truncate_table_statements(&tables), vec!["truncate table a"]);
    }
}
