use tracing::info;

use crate::client::Connection;
use crate::config::Config;
use crate::error::Result;

/// Open a connection configured from the `HBASE_*` environment variables.
///
/// One connection is meant to be shared by the whole application; admin and
/// table handles are derived from it per operation.
pub fn get_conn() -> Result<Connection> {
    let config = Config::from_env()?;
    get_conn_with(config)
}

pub fn get_conn_with(config: Config) -> Result<Connection> {
    let conn = Connection::with_config(config)?;
    info!("Connected to HBase REST gateway at {}", conn.endpoint());
    Ok(conn)
}

/// Close the connection if there is one
pub fn close(conn: Option<Connection>) {
    if let Some(conn) = conn {
        conn.close();
    }
}
