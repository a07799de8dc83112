//! Row data helpers: put, get, scan, delete
//!
//! Everything the gateway stores is bytes; these helpers take strings and
//! use their UTF-8 bytes. Every helper closes its table handle (and
//! scanner) before returning.

use crate::client::{Connection, Delete, Get, Put, RowResult, Scan, Table, TableName};
use crate::error::Result;
use crate::tools::table::check_table_name;

const SEPARATOR: &str = "================================";

/// Table handle for `namespace:table`, `None` when a name is invalid
pub fn get_table(conn: &Connection, namespace: &str, table: &str) -> Option<Table> {
    if check_table_name(namespace, table) {
        Some(conn.table(TableName::new(namespace, table)))
    } else {
        None
    }
}

/// Insert or overwrite one cell
pub async fn put(
    conn: &Connection,
    namespace: &str,
    table: &str,
    row_key: &str,
    family: &str,
    qualifier: &str,
    value: &str,
) -> Result<()> {
    let table = match get_table(conn, namespace, table) {
        Some(table) => table,
        None => return Ok(()),
    };

    let put = Put::new(row_key).add_column(family, qualifier, value);
    let result = table.put(&put).await;
    table.close();
    result
}

/// Newest version of every cell of one row
pub async fn get(conn: &Connection, namespace: &str, table: &str, row_key: &str) -> Result<Option<RowResult>> {
    let table = match get_table(conn, namespace, table) {
        Some(table) => table,
        None => return Ok(None),
    };

    let result = table.get(&Get::new(row_key)).await;
    table.close();
    result
}

/// Render every cell as family, qualifier, row and value lines followed
/// by a separator line
pub fn parse_result(result: &RowResult) -> String {
    result
        .cells
        .iter()
        .map(|cell| {
            format!(
                "family: {}\nqualifier: {}\nrow: {}\nvalue: {}\n{}\n",
                String::from_utf8_lossy(&cell.family),
                String::from_utf8_lossy(&cell.qualifier),
                String::from_utf8_lossy(&cell.row),
                String::from_utf8_lossy(&cell.value),
                SEPARATOR
            )
        })
        .collect()
}

/// Every row of the table
pub async fn scan(conn: &Connection, namespace: &str, table: &str) -> Result<Vec<RowResult>> {
    scan_with(conn, namespace, table, Scan::new()).await
}

/// Rows selected by `scan` (start row, stop row, limit, columns)
pub async fn scan_with(conn: &Connection, namespace: &str, table: &str, scan: Scan) -> Result<Vec<RowResult>> {
    let table = match get_table(conn, namespace, table) {
        Some(table) => table,
        None => return Ok(Vec::new()),
    };

    let mut scanner = match table.get_scanner(&scan).await {
        Ok(scanner) => scanner,
        Err(e) => {
            table.close();
            return Err(e);
        }
    };
    let rows = scanner.collect_all().await;
    let closed = scanner.close().await;
    table.close();

    let rows = rows?;
    closed?;
    Ok(rows)
}

/// Delete every cell of one row
pub async fn delete(conn: &Connection, namespace: &str, table: &str, row_key: &str) -> Result<()> {
    let table = match get_table(conn, namespace, table) {
        Some(table) => table,
        None => return Ok(()),
    };

    let result = table.delete(&Delete::new(row_key)).await;
    table.close();
    result
}
