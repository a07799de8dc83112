//! Row-level reads and writes against one table

use bytes::Bytes;
use hyper::{Method, StatusCode};
use tracing::debug;

use crate::client::connection::{columns_segment, encode_segment, table_path, Connection, JSON};
use crate::client::model::{CellSetModel, ScannerModel};
use crate::client::scanner::ResultScanner;
use crate::client::types::{Column, Delete, Get, Put, RowResult, Scan, TableName};
use crate::error::{Error, Result};

/// Row key used in the URL when the body carries several rows; the
/// gateway takes the real keys from the CellSet.
const BATCH_ROW: &str = "batch";

/// Data handle obtained from [`Connection::table`].
#[derive(Clone)]
pub struct Table {
    conn: Connection,
    name: TableName,
}

impl Table {
    pub(crate) fn new(conn: Connection, name: TableName) -> Self {
        Self { conn, name }
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    fn row_path(&self, row: &[u8]) -> String {
        format!("{}/{}", table_path(&self.name), encode_segment(row))
    }

    /// Write every cell of `put`
    pub async fn put(&self, put: &Put) -> Result<()> {
        if put.is_empty() {
            return Err(Error::InvalidRequest("Put has no columns".to_string()));
        }
        let body = serde_json::to_vec(&CellSetModel::from_cells(&put.cells))?;
        self.conn
            .request(Method::PUT, &self.row_path(&put.row), Some((Bytes::from(body), JSON)), None)
            .await?;
        debug!("Put {} cells into {}", put.cells.len(), self.name);
        Ok(())
    }

    /// Write several rows in one request
    pub async fn put_batch(&self, puts: &[Put]) -> Result<()> {
        if puts.iter().any(Put::is_empty) {
            return Err(Error::InvalidRequest("Put has no columns".to_string()));
        }
        if puts.is_empty() {
            return Ok(());
        }
        let body = serde_json::to_vec(&CellSetModel::from_cells(puts.iter().flat_map(|p| p.cells.iter())))?;
        let path = format!("{}/{}", table_path(&self.name), BATCH_ROW);
        self.conn
            .request(Method::PUT, &path, Some((Bytes::from(body), JSON)), None)
            .await?;
        debug!("Put {} rows into {}", puts.len(), self.name);
        Ok(())
    }

    /// Read one row. `None` when the row (or every requested column) is absent.
    pub async fn get(&self, get: &Get) -> Result<Option<RowResult>> {
        let mut path = self.row_path(&get.row);
        if !get.columns.is_empty() {
            path.push('/');
            path.push_str(&columns_segment(&get.columns));
        }
        if let Some(versions) = get.max_versions {
            path.push_str(&format!("?v={}", versions));
        }

        let model: CellSetModel = match self.conn.request_json(Method::GET, &path).await {
            Ok(model) => model,
            Err(Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut rows = model.into_results()?.into_iter();
        let first = match rows.next() {
            Some(first) => first,
            None => return Ok(None),
        };
        let merged = rows.fold(first, |mut acc, row| {
            acc.merge(row);
            acc
        });
        Ok(if merged.is_empty() { None } else { Some(merged) })
    }

    pub async fn exists(&self, get: &Get) -> Result<bool> {
        Ok(self.get(get).await?.is_some())
    }

    /// Open a server-side scanner; the caller owns closing it
    pub async fn get_scanner(&self, scan: &Scan) -> Result<ResultScanner> {
        let model = ScannerModel {
            start_row: scan.start_row.clone(),
            end_row: scan.stop_row.clone(),
            columns: scan.columns.iter().map(Column::to_spec).collect(),
            batch: scan.batch.unwrap_or(self.conn.config().scanner_batch),
            start_time: scan.time_range.map(|(start, _)| start),
            end_time: scan.time_range.map(|(_, end)| end),
            max_versions: scan.max_versions,
        };
        let body = serde_json::to_vec(&model)?;
        let path = format!("{}/scanner", table_path(&self.name));

        let response = self
            .conn
            .request(Method::POST, &path, Some((Bytes::from(body), JSON)), None)
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(Error::Http(format!(
                "Scanner creation returned {} instead of 201",
                response.status()
            )));
        }
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Http("Scanner creation returned no Location header".to_string()))?;
        let location = self.conn.resolve(location)?;

        debug!("Opened scanner {} on {}", location, self.name);
        Ok(ResultScanner::new(self.conn.clone(), location, scan.limit))
    }

    /// Delete a row, or only the listed families/columns of it
    pub async fn delete(&self, delete: &Delete) -> Result<()> {
        let row_path = self.row_path(&delete.row);
        if delete.columns.is_empty() {
            self.conn.request(Method::DELETE, &row_path, None, None).await?;
        } else {
            for column in &delete.columns {
                let path = format!("{}/{}", row_path, columns_segment(std::slice::from_ref(column)));
                self.conn.request(Method::DELETE, &path, None, None).await?;
            }
        }
        debug!("Deleted row in {}", self.name);
        Ok(())
    }

    pub fn close(self) {
        debug!("Table handle {} closed", self.name);
    }
}
