//! Convenience helpers over the client: validate the names, open a
//! handle, make one call, close the handle.

pub mod common;
pub mod connection;
pub mod data;
pub mod namespace;
pub mod table;

pub use common::is_blank;
