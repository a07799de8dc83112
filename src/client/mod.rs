//! Async client for the HBase REST gateway

pub mod admin;
pub mod connection;
pub mod model;
pub mod scanner;
pub mod table;
pub mod tls;
pub mod types;

pub use admin::Admin;
pub use connection::Connection;
pub use scanner::ResultScanner;
pub use table::Table;
pub use types::*;
