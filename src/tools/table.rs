//! Table schema helpers
//!
//! Invalid namespace/table names are logged and reported as `false`
//! (or `None`); gateway failures propagate as errors.

use tracing::error;

use crate::client::{ColumnFamilyDescriptor, Connection, TableDescriptor, TableName};
use crate::error::Result;
use crate::tools::common::is_blank;

/// Both names must be non-blank. Each failure is logged.
pub fn check_table_name(namespace: &str, table: &str) -> bool {
    if is_blank(namespace) {
        error!("Invalid namespace name: '{}'", namespace);
        return false;
    }
    if is_blank(table) {
        error!("Invalid table name: '{}'", table);
        return false;
    }
    true
}

/// Tables of `namespace`, rendered as `table` for the default namespace and
/// `namespace:table` otherwise. `None` for a blank namespace.
pub async fn list_tables(conn: &Connection, namespace: &str) -> Result<Option<Vec<String>>> {
    if is_blank(namespace) {
        error!("Invalid namespace name: '{}'", namespace);
        return Ok(None);
    }

    let admin = conn.admin();
    let result = admin.list_table_names_by_namespace(namespace).await;
    admin.close();

    Ok(Some(result?.iter().map(TableName::to_string).collect()))
}

pub async fn table_exists(conn: &Connection, namespace: &str, table: &str) -> Result<bool> {
    if !check_table_name(namespace, table) {
        return Ok(false);
    }

    let admin = conn.admin();
    let result = admin.table_exists(&TableName::new(namespace, table)).await;
    admin.close();

    result
}

/// Create a table with the given column families. Every family keeps at
/// least `cf_min_versions` and at most `cf_max_versions` versions (3 and 10
/// unless configured otherwise).
///
/// An existing table is left untouched and reported as `Error::TableExists`.
pub async fn create_table(conn: &Connection, namespace: &str, table: &str, families: &[&str]) -> Result<bool> {
    if !check_table_name(namespace, table) {
        return Ok(false);
    }
    if families.is_empty() {
        error!("At least one column family is required");
        return Ok(false);
    }
    if let Some(blank) = families.iter().find(|f| is_blank(f)) {
        error!("Invalid column family name: '{}'", blank);
        return Ok(false);
    }

    let config = conn.config();
    let descriptor = families.iter().fold(
        TableDescriptor::new(TableName::new(namespace, table)),
        |desc, family| {
            desc.with_family(
                ColumnFamilyDescriptor::new(*family)
                    .with_min_versions(config.cf_min_versions)
                    .with_max_versions(config.cf_max_versions),
            )
        },
    );

    let admin = conn.admin();
    let result = admin.create_table(&descriptor).await;
    admin.close();

    result.map(|()| true)
}

/// Disable and drop a table
pub async fn delete_table(conn: &Connection, namespace: &str, table: &str) -> Result<bool> {
    if !check_table_name(namespace, table) {
        return Ok(false);
    }

    let admin = conn.admin();
    let result = admin.delete_table(&TableName::new(namespace, table)).await;
    admin.close();

    result.map(|()| true)
}
