//! Server-side scanner cursor

use std::collections::VecDeque;

use hyper::{Method, StatusCode};
use tracing::debug;

use crate::client::connection::{Connection, JSON};
use crate::client::model::CellSetModel;
use crate::client::types::RowResult;
use crate::error::{Error, Result};

/// Cursor over the rows of a scan, returned by [`crate::Table::get_scanner`].
///
/// The gateway hands out rows in chunks of `batch` cells, so one row may
/// arrive split over two chunks; such halves are merged before a row is
/// yielded. Call [`ResultScanner::close`] when done, otherwise the
/// scanner lingers on the gateway until its lease expires.
pub struct ResultScanner {
    conn: Connection,
    location: String,
    buffer: VecDeque<RowResult>,
    exhausted: bool,
    remaining: Option<usize>,
}

impl ResultScanner {
    pub(crate) fn new(conn: Connection, location: String, limit: Option<usize>) -> Self {
        Self {
            conn,
            location,
            buffer: VecDeque::new(),
            exhausted: false,
            remaining: limit,
        }
    }

    /// Gateway URL of this scanner
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Next complete row, `None` once the scan is finished
    pub async fn next(&mut self) -> Result<Option<RowResult>> {
        if self.remaining == Some(0) {
            return Ok(None);
        }
        loop {
            // The last buffered row may continue in the next chunk
            if self.buffer.len() > 1 || (self.exhausted && !self.buffer.is_empty()) {
                let row = self.buffer.pop_front();
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Ok(row);
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch().await?;
        }
    }

    /// Drain every remaining row
    pub async fn collect_all(&mut self) -> Result<Vec<RowResult>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn fetch(&mut self) -> Result<()> {
        let response = self
            .conn
            .request(Method::GET, &self.location, None, Some(JSON))
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            self.exhausted = true;
            return Ok(());
        }

        let body = self.conn.read_body(response.into_body()).await?;
        if body.is_empty() {
            self.exhausted = true;
            return Ok(());
        }
        let model: CellSetModel = serde_json::from_slice(&body)?;

        let rows = model.into_results()?;
        if rows.is_empty() {
            self.exhausted = true;
        }
        for row in rows {
            match self.buffer.back_mut() {
                Some(last) if last.row == row.row => last.merge(row),
                _ => self.buffer.push_back(row),
            }
        }
        Ok(())
    }

    /// Release the scanner on the gateway
    pub async fn close(self) -> Result<()> {
        match self.conn.request(Method::DELETE, &self.location, None, None).await {
            // Already expired or removed
            Ok(_) | Err(Error::NotFound(_)) => {
                debug!("Scanner {} closed", self.location);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
