//! Request and result types shared by the admin and table handles

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Namespace used when a table name carries no explicit namespace.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Fully qualified table name (`namespace:qualifier`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableName {
    namespace: String,
    qualifier: String,
}

impl TableName {
    /// Table `qualifier` inside `namespace`. An empty namespace means `default`.
    pub fn new(namespace: impl Into<String>, qualifier: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: if namespace.is_empty() {
                DEFAULT_NAMESPACE.to_string()
            } else {
                namespace
            },
            qualifier: qualifier.into(),
        }
    }

    /// Parse `ns:table` or a bare `table` (default namespace)
    pub fn parse(name: &str) -> Result<Self> {
        let (namespace, qualifier) = match name.split_once(':') {
            Some((ns, q)) => (ns, q),
            None => (DEFAULT_NAMESPACE, name),
        };
        if qualifier.is_empty() || qualifier.contains(':') {
            return Err(Error::InvalidRequest(format!("Invalid table name '{}'", name)));
        }
        Ok(Self::new(namespace, qualifier))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    /// Always `namespace:qualifier`, the form the REST gateway addresses tables by
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.namespace, self.qualifier)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace == DEFAULT_NAMESPACE {
            f.write_str(&self.qualifier)
        } else {
            write!(f, "{}:{}", self.namespace, self.qualifier)
        }
    }
}

/// Namespace name plus its free-form configuration properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceDescriptor {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl NamespaceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Column family settings sent with a table schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFamilyDescriptor {
    pub name: String,
    pub min_versions: Option<u32>,
    pub max_versions: Option<u32>,
    /// Seconds, `None` keeps the gateway default (forever)
    pub time_to_live: Option<u64>,
    /// Any other schema attribute, e.g. `BLOOMFILTER` or `COMPRESSION`
    pub attributes: BTreeMap<String, String>,
}

impl ColumnFamilyDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_min_versions(mut self, versions: u32) -> Self {
        self.min_versions = Some(versions);
        self
    }

    pub fn with_max_versions(mut self, versions: u32) -> Self {
        self.max_versions = Some(versions);
        self
    }

    pub fn with_time_to_live(mut self, seconds: u64) -> Self {
        self.time_to_live = Some(seconds);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: TableName,
    pub families: Vec<ColumnFamilyDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: TableName) -> Self {
        Self {
            name,
            families: Vec::new(),
        }
    }

    pub fn with_family(mut self, family: ColumnFamilyDescriptor) -> Self {
        self.families.push(family);
        self
    }

    pub fn family(&self, name: &str) -> Option<&ColumnFamilyDescriptor> {
        self.families.iter().find(|f| f.name == name)
    }
}

/// A single versioned cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub row: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub timestamp: Option<u64>,
    pub value: Vec<u8>,
}

/// All cells returned for one row by a get or scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowResult {
    pub row: Vec<u8>,
    pub cells: Vec<Cell>,
}

impl RowResult {
    /// Build a result, ordering cells by family, qualifier, newest first.
    pub fn new(row: Vec<u8>, mut cells: Vec<Cell>) -> Self {
        cells.sort_by(|a, b| {
            a.family
                .cmp(&b.family)
                .then_with(|| a.qualifier.cmp(&b.qualifier))
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        Self { row, cells }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Newest value stored under `family:qualifier`
    pub fn value(&self, family: &[u8], qualifier: &[u8]) -> Option<&[u8]> {
        self.cells
            .iter()
            .find(|c| c.family == family && c.qualifier == qualifier)
            .map(|c| c.value.as_slice())
    }

    pub(crate) fn merge(&mut self, other: RowResult) {
        let mut cells = std::mem::take(&mut self.cells);
        cells.extend(other.cells);
        *self = RowResult::new(std::mem::take(&mut self.row), cells);
    }
}

/// Column selector: a whole family or one `family:qualifier`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Family(Vec<u8>),
    Qualified(Vec<u8>, Vec<u8>),
}

impl Column {
    /// Render as `family` or `family:qualifier` bytes
    pub fn to_spec(&self) -> Vec<u8> {
        match self {
            Column::Family(family) => family.clone(),
            Column::Qualified(family, qualifier) => {
                let mut spec = Vec::with_capacity(family.len() + qualifier.len() + 1);
                spec.extend_from_slice(family);
                spec.push(b':');
                spec.extend_from_slice(qualifier);
                spec
            }
        }
    }
}

/// Write of one row: one or more cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Put {
    pub(crate) row: Vec<u8>,
    pub(crate) cells: Vec<Cell>,
}

impl Put {
    pub fn new(row: impl AsRef<[u8]>) -> Self {
        Self {
            row: row.as_ref().to_vec(),
            cells: Vec::new(),
        }
    }

    pub fn add_column(
        mut self,
        family: impl AsRef<[u8]>,
        qualifier: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Self {
        self.push(family.as_ref(), qualifier.as_ref(), None, value.as_ref());
        self
    }

    /// Same as `add_column` with an explicit cell timestamp (ms)
    pub fn add_column_at(
        mut self,
        family: impl AsRef<[u8]>,
        qualifier: impl AsRef<[u8]>,
        timestamp: u64,
        value: impl AsRef<[u8]>,
    ) -> Self {
        self.push(family.as_ref(), qualifier.as_ref(), Some(timestamp), value.as_ref());
        self
    }

    fn push(&mut self, family: &[u8], qualifier: &[u8], timestamp: Option<u64>, value: &[u8]) {
        self.cells.push(Cell {
            row: self.row.clone(),
            family: family.to_vec(),
            qualifier: qualifier.to_vec(),
            timestamp,
            value: value.to_vec(),
        });
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Single-row read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Get {
    pub(crate) row: Vec<u8>,
    pub(crate) columns: Vec<Column>,
    pub(crate) max_versions: Option<u32>,
}

impl Get {
    pub fn new(row: impl AsRef<[u8]>) -> Self {
        Self {
            row: row.as_ref().to_vec(),
            columns: Vec::new(),
            max_versions: None,
        }
    }

    pub fn add_family(mut self, family: impl AsRef<[u8]>) -> Self {
        self.columns.push(Column::Family(family.as_ref().to_vec()));
        self
    }

    pub fn add_column(mut self, family: impl AsRef<[u8]>, qualifier: impl AsRef<[u8]>) -> Self {
        self.columns.push(Column::Qualified(
            family.as_ref().to_vec(),
            qualifier.as_ref().to_vec(),
        ));
        self
    }

    pub fn read_versions(mut self, versions: u32) -> Self {
        self.max_versions = Some(versions.max(1));
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }
}

/// Range read over `[start_row, stop_row)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    pub(crate) start_row: Option<Vec<u8>>,
    pub(crate) stop_row: Option<Vec<u8>>,
    pub(crate) columns: Vec<Column>,
    pub(crate) batch: Option<u32>,
    pub(crate) limit: Option<usize>,
    pub(crate) time_range: Option<(u64, u64)>,
    pub(crate) max_versions: Option<u32>,
}

impl Scan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_row(mut self, row: impl AsRef<[u8]>) -> Self {
        self.start_row = Some(row.as_ref().to_vec());
        self
    }

    pub fn with_stop_row(mut self, row: impl AsRef<[u8]>) -> Self {
        self.stop_row = Some(row.as_ref().to_vec());
        self
    }

    pub fn add_family(mut self, family: impl AsRef<[u8]>) -> Self {
        self.columns.push(Column::Family(family.as_ref().to_vec()));
        self
    }

    pub fn add_column(mut self, family: impl AsRef<[u8]>, qualifier: impl AsRef<[u8]>) -> Self {
        self.columns.push(Column::Qualified(
            family.as_ref().to_vec(),
            qualifier.as_ref().to_vec(),
        ));
        self
    }

    /// Cells per round trip; overrides the connection's scanner batch
    pub fn with_batch(mut self, batch: u32) -> Self {
        self.batch = Some(batch.max(1));
        self
    }

    /// Stop after this many rows; `0` means no limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    /// Only cells with `start <= timestamp < end`
    pub fn with_time_range(mut self, start: u64, end: u64) -> Self {
        self.time_range = Some((start, end));
        self
    }

    pub fn read_versions(mut self, versions: u32) -> Self {
        self.max_versions = Some(versions.max(1));
        self
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

/// Row deletion, optionally narrowed to families or columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub(crate) row: Vec<u8>,
    pub(crate) columns: Vec<Column>,
}

impl Delete {
    pub fn new(row: impl AsRef<[u8]>) -> Self {
        Self {
            row: row.as_ref().to_vec(),
            columns: Vec::new(),
        }
    }

    /// Delete every cell of `family`
    pub fn add_family(mut self, family: impl AsRef<[u8]>) -> Self {
        self.columns.push(Column::Family(family.as_ref().to_vec()));
        self
    }

    /// Delete all versions of `family:qualifier`
    pub fn add_columns(mut self, family: impl AsRef<[u8]>, qualifier: impl AsRef<[u8]>) -> Self {
        self.columns.push(Column::Qualified(
            family.as_ref().to_vec(),
            qualifier.as_ref().to_vec(),
        ));
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }
}
