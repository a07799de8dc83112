//! Namespace (database) helpers
//!
//! Each helper opens an admin handle, performs one call and closes the
//! handle again. The `bool` helpers swallow gateway failures and report
//! them as `false`, logging the reason.

use tracing::{error, warn};

use crate::client::{Connection, NamespaceDescriptor};
use crate::error::{Error, Result};
use crate::tools::common::is_blank;
use crate::tools::table::list_tables;

/// Names of every namespace on the cluster
pub async fn list_namespaces(conn: &Connection) -> Result<Vec<String>> {
    let admin = conn.admin();
    let result = admin.list_namespace_descriptors().await;
    admin.close();

    Ok(result?.into_iter().map(|d| d.name).collect())
}

pub async fn namespace_exists(conn: &Connection, namespace: &str) -> bool {
    if is_blank(namespace) {
        error!("Invalid namespace name: '{}'", namespace);
        return false;
    }

    let admin = conn.admin();
    let result = admin.get_namespace_descriptor(namespace).await;
    admin.close();

    match result {
        Ok(_) => true,
        Err(Error::NotFound(_)) => false,
        Err(e) => {
            warn!("Namespace lookup for '{}' failed: {}", namespace, e);
            false
        }
    }
}

pub async fn create_namespace(conn: &Connection, namespace: &str) -> bool {
    if is_blank(namespace) {
        error!("Invalid namespace name: '{}'", namespace);
        return false;
    }

    let admin = conn.admin();
    let result = admin.create_namespace(&NamespaceDescriptor::new(namespace)).await;
    admin.close();

    match result {
        Ok(()) => true,
        Err(Error::Forbidden(_)) => {
            error!("Namespace '{}' already exists", namespace);
            false
        }
        Err(e) => {
            error!("Failed to create namespace '{}': {}", namespace, e);
            false
        }
    }
}

/// Delete a namespace. Only empty namespaces are deleted.
pub async fn delete_namespace(conn: &Connection, namespace: &str) -> bool {
    if is_blank(namespace) {
        error!("Invalid namespace name: '{}'", namespace);
        return false;
    }

    match list_tables(conn, namespace).await {
        Ok(Some(tables)) if tables.is_empty() => {}
        Ok(Some(tables)) => {
            error!("Namespace '{}' is not empty ({} tables)", namespace, tables.len());
            return false;
        }
        Ok(None) => return false,
        Err(e) => {
            warn!("Could not list tables of '{}': {}", namespace, e);
            return false;
        }
    }

    let admin = conn.admin();
    let result = admin.delete_namespace(namespace).await;
    admin.close();

    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to delete namespace '{}': {}", namespace, e);
            false
        }
    }
}
