//! Helper utilities for HBase over its REST gateway
//!
//! Two layers:
//! - [`client`]: a small async client for the gateway (connection, admin
//!   handle, table handle, scanner) built on hyper and rustls.
//! - [`tools`]: thin helpers for namespace, table and row operations that
//!   validate names, make one client call and close the handle.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hbase_tools::tools::{connection, data, namespace, table};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hbase_tools::Error> {
//!     let conn = connection::get_conn()?;
//!
//!     namespace::create_namespace(&conn, "test1").await;
//!     table::create_table(&conn, "test1", "table1", &["info"]).await?;
//!
//!     data::put(&conn, "test1", "table1", "key1", "info", "name", "november").await?;
//!     if let Some(row) = data::get(&conn, "test1", "table1", "key1").await? {
//!         print!("{}", data::parse_result(&row));
//!     }
//!
//!     connection::close(Some(conn));
//!     Ok(())
//! }
//! ```

#![warn(rust_2018_idioms)]

pub mod client;
pub mod config;
pub mod error;
pub mod tools;

pub use client::{Admin, Connection, ResultScanner, Table};
pub use config::Config;
pub use error::{Error, Result};
