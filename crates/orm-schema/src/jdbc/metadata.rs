//! Driver-facing traits.
//!
//! These mirror the subset of JDBC `Connection` and `DatabaseMetaData`
//! that schema management relies on. Result sets use the standard JDBC
//! metadata labels (`TABLE_CAT`, `TABLE_SCHEM`, `TABLE_NAME`, ...).
//!
//! Catalog and schema arguments follow JDBC conventions: `None` means "do
//! not filter", `Some("")` means "objects without a catalog/schema".
//! Name patterns accept `%` and `_` wildcards.

use super::exception::SqlResult;
use super::result_set::ResultSet;

/// Labels of `get_tables` results.
pub mod labels {
    pub const TABLE_CAT: &str = "TABLE_CAT";
    pub const TABLE_SCHEM: &str = "TABLE_SCHEM";
    pub const TABLE_NAME: &str = "TABLE_NAME";
    pub const TABLE_TYPE: &str = "TABLE_TYPE";
    pub const REMARKS: &str = "REMARKS";
    pub const TABLE_CATALOG: &str = "TABLE_CATALOG";

    pub const COLUMN_NAME: &str = "COLUMN_NAME";
    pub const DATA_TYPE: &str = "DATA_TYPE";
    pub const TYPE_NAME: &str = "TYPE_NAME";
    pub const COLUMN_SIZE: &str = "COLUMN_SIZE";
    pub const DECIMAL_DIGITS: &str = "DECIMAL_DIGITS";
    pub const IS_NULLABLE: &str = "IS_NULLABLE";

    pub const FK_NAME: &str = "FK_NAME";
    pub const FKCOLUMN_NAME: &str = "FKCOLUMN_NAME";
    pub const PKCOLUMN_NAME: &str = "PKCOLUMN_NAME";
    pub const PKTABLE_CAT: &str = "PKTABLE_CAT";
    pub const PKTABLE_SCHEM: &str = "PKTABLE_SCHEM";
    pub const PKTABLE_NAME: &str = "PKTABLE_NAME";
    pub const KEY_SEQ: &str = "KEY_SEQ";

    pub const INDEX_NAME: &str = "INDEX_NAME";
    pub const NON_UNIQUE: &str = "NON_UNIQUE";
    pub const TYPE: &str = "TYPE";
    pub const ORDINAL_POSITION: &str = "ORDINAL_POSITION";

    pub const PK_NAME: &str = "PK_NAME";
}

/// `DatabaseMetaData.tableIndexStatistic`.
pub const TABLE_INDEX_STATISTIC: i64 = 0;

/// Table types requested by schema extraction.
pub const TABLE_TYPES: &[&str] = &["TABLE", "VIEW"];

/// Catalog access as exposed by a driver.
pub trait DatabaseMetaData {
    fn stores_mixed_case_quoted_identifiers(&self) -> SqlResult<bool>;
    fn stores_lower_case_quoted_identifiers(&self) -> SqlResult<bool>;
    fn stores_upper_case_quoted_identifiers(&self) -> SqlResult<bool>;
    fn stores_upper_case_identifiers(&self) -> SqlResult<bool>;
    fn stores_lower_case_identifiers(&self) -> SqlResult<bool>;

    /// Comma-separated vendor keywords, split.
    fn sql_keywords(&self) -> SqlResult<Vec<String>>;

    /// `TABLE_SCHEM`, `TABLE_CATALOG`.
    fn get_schemas(&self, catalog: Option<&str>, schema_pattern: Option<&str>)
        -> SqlResult<ResultSet>;

    /// `TABLE_CAT`, `TABLE_SCHEM`, `TABLE_NAME`, `TABLE_TYPE`, `REMARKS`.
    fn get_tables(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: &str,
        types: &[&str],
    ) -> SqlResult<ResultSet>;

    /// `TABLE_CAT`, `TABLE_SCHEM`, `TABLE_NAME`, `COLUMN_NAME`, `DATA_TYPE`,
    /// `TYPE_NAME`, `COLUMN_SIZE`, `DECIMAL_DIGITS`, `IS_NULLABLE`.
    fn get_columns(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: &str,
        column_pattern: &str,
    ) -> SqlResult<ResultSet>;

    /// One row per FK column: `FK_NAME`, `FKCOLUMN_NAME`, `KEY_SEQ`,
    /// `PKTABLE_CAT`, `PKTABLE_SCHEM`, `PKTABLE_NAME`, `PKCOLUMN_NAME`.
    fn get_imported_keys(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> SqlResult<ResultSet>;

    /// `INDEX_NAME`, `NON_UNIQUE`, `TYPE`, `ORDINAL_POSITION`, `COLUMN_NAME`.
    fn get_index_info(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
        unique: bool,
        approximate: bool,
    ) -> SqlResult<ResultSet>;

    /// `COLUMN_NAME`, `KEY_SEQ`, `PK_NAME`.
    fn get_primary_keys(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> SqlResult<ResultSet>;
}

/// A live connection.
pub trait JdbcConnection {
    fn metadata(&self) -> &dyn DatabaseMetaData;

    fn current_catalog(&self) -> SqlResult<Option<String>>;

    fn current_schema(&self) -> SqlResult<Option<String>>;

    /// Execute a statement that returns no rows.
    fn execute(&self, sql: &str) -> SqlResult<()>;

    /// Execute a query.
    fn query(&self, sql: &str) -> SqlResult<ResultSet>;
}

/// Match `value` against a JDBC search pattern (`%` any run, `_` one char).
pub fn matches_pattern(pattern: &str, value: &str) -> bool {
    fn matches(pattern: &[char], value: &[char]) -> bool {
        match pattern.split_first() {
            None => value.is_empty(),
            Some(('%', rest)) => (0..=value.len()).any(|i| matches(rest, &value[i..])),
            Some(('_', rest)) => !value.is_empty() && matches(rest, &value[1..]),
            Some((c, rest)) => value.first() == Some(c) && matches(rest, &value[1..]),
        }
    }
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();
    matches(&pattern, &value)
}
