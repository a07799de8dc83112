//! Namespace and table schema administration

use bytes::Bytes;
use hyper::Method;
use tracing::debug;

use crate::client::connection::{encode_segment, table_path, Connection, JSON};
use crate::client::model::{NamespaceInstanceModel, NamespacesModel, TableListModel, TableSchemaModel};
use crate::client::types::{NamespaceDescriptor, TableDescriptor, TableName};
use crate::error::{Error, Result};

/// Administrative handle obtained from [`Connection::admin`].
///
/// Lightweight; create one per unit of work and `close` it afterwards.
#[derive(Clone)]
pub struct Admin {
    conn: Connection,
}

impl Admin {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub async fn list_namespace_descriptors(&self) -> Result<Vec<NamespaceDescriptor>> {
        let model: NamespacesModel = self.conn.request_json(Method::GET, "/namespaces").await?;
        Ok(model.namespaces.into_iter().map(NamespaceDescriptor::new).collect())
    }

    /// # Errors
    /// `Error::NotFound` when the namespace does not exist
    pub async fn get_namespace_descriptor(&self, namespace: &str) -> Result<NamespaceDescriptor> {
        let path = format!("/namespaces/{}", encode_segment(namespace.as_bytes()));
        let model: NamespaceInstanceModel = self.conn.request_json(Method::GET, &path).await?;
        Ok(NamespaceDescriptor {
            name: namespace.to_string(),
            properties: model.properties,
        })
    }

    /// # Errors
    /// `Error::Forbidden` when the namespace already exists
    pub async fn create_namespace(&self, descriptor: &NamespaceDescriptor) -> Result<()> {
        let path = format!("/namespaces/{}", encode_segment(descriptor.name.as_bytes()));
        let body = serde_json::to_vec(&NamespaceInstanceModel {
            properties: descriptor.properties.clone(),
        })?;
        self.conn
            .request(Method::POST, &path, Some((Bytes::from(body), JSON)), None)
            .await?;
        debug!("Namespace {} created", descriptor.name);
        Ok(())
    }

    pub async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let path = format!("/namespaces/{}", encode_segment(namespace.as_bytes()));
        self.conn.request(Method::DELETE, &path, None, None).await?;
        debug!("Namespace {} deleted", namespace);
        Ok(())
    }

    /// Tables of one namespace. The gateway may report bare qualifiers or
    /// full `ns:table` names; both resolve into `namespace`.
    pub async fn list_table_names_by_namespace(&self, namespace: &str) -> Result<Vec<TableName>> {
        let path = format!("/namespaces/{}/tables", encode_segment(namespace.as_bytes()));
        let model: TableListModel = self.conn.request_json(Method::GET, &path).await?;
        model
            .tables
            .into_iter()
            .map(|table| match table.name.split_once(':') {
                Some(_) => TableName::parse(&table.name),
                None => Ok(TableName::new(namespace, table.name)),
            })
            .collect()
    }

    pub async fn table_exists(&self, name: &TableName) -> Result<bool> {
        let path = format!("{}/exists", table_path(name));
        match self.conn.request(Method::GET, &path, None, Some("text/plain")).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn get_table_descriptor(&self, name: &TableName) -> Result<TableDescriptor> {
        let path = format!("{}/schema", table_path(name));
        let model: TableSchemaModel = self.conn.request_json(Method::GET, &path).await?;
        model.into_descriptor()
    }

    /// Create a new table.
    ///
    /// The schema resource replaces the schema of an existing table, so the
    /// table must not exist yet.
    ///
    /// # Errors
    /// `Error::TableExists` when the table is already there
    pub async fn create_table(&self, descriptor: &TableDescriptor) -> Result<()> {
        if descriptor.families.is_empty() {
            return Err(Error::InvalidRequest(format!(
                "Table {} needs at least one column family",
                descriptor.name
            )));
        }
        if self.table_exists(&descriptor.name).await? {
            return Err(Error::TableExists(descriptor.name.full_name()));
        }
        let path = format!("{}/schema", table_path(&descriptor.name));
        let body = serde_json::to_vec(&TableSchemaModel::from(descriptor))?;
        self.conn
            .request(Method::PUT, &path, Some((Bytes::from(body), JSON)), None)
            .await?;
        debug!("Table {} created", descriptor.name);
        Ok(())
    }

    /// Drop a table. The gateway disables it first, so no separate
    /// disable call is needed.
    pub async fn delete_table(&self, name: &TableName) -> Result<()> {
        let path = format!("{}/schema", table_path(name));
        self.conn.request(Method::DELETE, &path, None, None).await?;
        debug!("Table {} deleted", name);
        Ok(())
    }

    pub fn close(self) {
        debug!("Admin handle closed");
    }
}
