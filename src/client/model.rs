//! JSON bodies exchanged with the REST gateway
//!
//! Row keys, column specs and values travel base64-encoded; schema
//! attributes travel as strings.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::client::types::{Cell, ColumnFamilyDescriptor, RowResult, TableDescriptor, TableName};
use crate::error::{Error, Result};

const VERSIONS: &str = "VERSIONS";
const MIN_VERSIONS: &str = "MIN_VERSIONS";
const TTL: &str = "TTL";

mod b64 {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

mod b64_opt {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|e| STANDARD.decode(e).map_err(serde::de::Error::custom))
            .transpose()
    }
}

mod b64_vec {
    use super::*;
    use serde::{Deserializer, Serializer};
    use serde::ser::SerializeSeq;

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&STANDARD.encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<Vec<u8>>, D::Error> {
        let encoded: Vec<String> = Vec::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|e| STANDARD.decode(e).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// One cell on the wire: `{"column": b64, "timestamp": n, "$": b64}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellModel {
    #[serde(with = "b64")]
    pub column: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<u64>,
    #[serde(rename = "$", with = "b64")]
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowModel {
    #[serde(with = "b64")]
    pub key: Vec<u8>,
    #[serde(rename = "Cell", default)]
    pub cells: Vec<CellModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSetModel {
    #[serde(rename = "Row", default)]
    pub rows: Vec<RowModel>,
}

impl CellSetModel {
    pub fn from_cells<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut rows: Vec<RowModel> = Vec::new();
        for cell in cells {
            let mut column = cell.family.clone();
            column.push(b':');
            column.extend_from_slice(&cell.qualifier);
            let model = CellModel {
                column,
                timestamp: cell.timestamp,
                value: cell.value.clone(),
            };
            match rows.last_mut() {
                Some(row) if row.key == cell.row => row.cells.push(model),
                _ => rows.push(RowModel {
                    key: cell.row.clone(),
                    cells: vec![model],
                }),
            }
        }
        Self { rows }
    }

    pub fn into_results(self) -> Result<Vec<RowResult>> {
        self.rows
            .into_iter()
            .map(|row| {
                let cells = row
                    .cells
                    .into_iter()
                    .map(|cell| {
                        let (family, qualifier) = split_column(&cell.column)?;
                        Ok(Cell {
                            row: row.key.clone(),
                            family,
                            qualifier,
                            timestamp: cell.timestamp,
                            value: cell.value,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(RowResult::new(row.key, cells))
            })
            .collect()
    }
}

/// Split `family:qualifier` at the first colon; the qualifier may be empty.
pub fn split_column(column: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let pos = column
        .iter()
        .position(|b| *b == b':')
        .ok_or_else(|| {
            Error::InvalidRequest(format!(
                "Column '{}' is missing the family separator",
                String::from_utf8_lossy(column)
            ))
        })?;
    Ok((column[..pos].to_vec(), column[pos + 1..].to_vec()))
}

/// `GET /namespaces`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespacesModel {
    #[serde(rename = "Namespace", default)]
    pub namespaces: Vec<String>,
}

/// `GET|POST /namespaces/{ns}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceInstanceModel {
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableModel {
    pub name: String,
}

/// `GET /namespaces/{ns}/tables`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableListModel {
    #[serde(rename = "table", default)]
    pub tables: Vec<TableModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchemaModel {
    pub name: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// `GET|PUT /{table}/schema`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchemaModel {
    pub name: String,
    #[serde(rename = "ColumnSchema", default)]
    pub columns: Vec<ColumnSchemaModel>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl From<&TableDescriptor> for TableSchemaModel {
    fn from(desc: &TableDescriptor) -> Self {
        let columns = desc
            .families
            .iter()
            .map(|family| {
                let mut attributes: BTreeMap<String, serde_json::Value> = family
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect();
                if let Some(v) = family.max_versions {
                    attributes.insert(VERSIONS.to_string(), v.to_string().into());
                }
                if let Some(v) = family.min_versions {
                    attributes.insert(MIN_VERSIONS.to_string(), v.to_string().into());
                }
                if let Some(v) = family.time_to_live {
                    attributes.insert(TTL.to_string(), v.to_string().into());
                }
                ColumnSchemaModel {
                    name: family.name.clone(),
                    attributes,
                }
            })
            .collect();

        Self {
            name: desc.name.full_name(),
            columns,
            attributes: BTreeMap::new(),
        }
    }
}

impl TableSchemaModel {
    pub fn into_descriptor(self) -> Result<TableDescriptor> {
        let name = TableName::parse(&self.name)?;
        let families = self
            .columns
            .into_iter()
            .map(|column| {
                let mut family = ColumnFamilyDescriptor::new(column.name);
                for (key, value) in column.attributes {
                    let text = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    match key.as_str() {
                        VERSIONS => family.max_versions = text.parse().ok(),
                        MIN_VERSIONS => family.min_versions = text.parse().ok(),
                        // The gateway reports "FOREVER" when no TTL is set
                        TTL => family.time_to_live = text.parse().ok(),
                        _ => {
                            family.attributes.insert(key, text);
                        }
                    }
                }
                family
            })
            .collect();
        Ok(TableDescriptor { name, families })
    }
}

/// `POST /{table}/scanner`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerModel {
    #[serde(rename = "startRow", with = "b64_opt", skip_serializing_if = "Option::is_none", default)]
    pub start_row: Option<Vec<u8>>,
    #[serde(rename = "endRow", with = "b64_opt", skip_serializing_if = "Option::is_none", default)]
    pub end_row: Option<Vec<u8>>,
    #[serde(rename = "column", with = "b64_vec", skip_serializing_if = "Vec::is_empty", default)]
    pub columns: Vec<Vec<u8>>,
    pub batch: u32,
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none", default)]
    pub start_time: Option<u64>,
    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none", default)]
    pub end_time: Option<u64>,
    #[serde(rename = "maxVersions", skip_serializing_if = "Option::is_none", default)]
    pub max_versions: Option<u32>,
}
