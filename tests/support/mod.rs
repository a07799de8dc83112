//! In-process stand-in for the HBase REST gateway.
//!
//! Implements the subset of resources the client uses, backed by in-memory
//! maps, so the integration tests run without a cluster.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;

use hbase_tools::client::TableName;
use hbase_tools::config::Secret;
use hbase_tools::{Config, Connection};

pub const CLUSTER_VERSION: &str = "2.5.8";

/// column (`family:qualifier`) -> versions, newest first
type Columns = BTreeMap<Vec<u8>, Vec<(u64, Vec<u8>)>>;

struct MockTable {
    schema: Value,
    /// family -> max versions kept
    families: BTreeMap<Vec<u8>, usize>,
    rows: BTreeMap<Vec<u8>, Columns>,
}

struct ScanCell {
    row: Vec<u8>,
    column: Vec<u8>,
    timestamp: u64,
    value: Vec<u8>,
}

struct MockScanner {
    cells: VecDeque<ScanCell>,
    batch: usize,
}

#[derive(Default)]
struct State {
    namespaces: BTreeMap<String, BTreeMap<String, String>>,
    tables: BTreeMap<String, MockTable>,
    scanners: HashMap<String, MockScanner>,
    next_scanner: u64,
    clock: u64,
    requests: Vec<String>,
    /// answer for the next request, whatever it is
    injected: Option<(StatusCode, String)>,
}

#[derive(Clone)]
struct Handler {
    state: Arc<Mutex<State>>,
    base_url: String,
    authorization: Option<String>,
}

pub struct Gateway {
    base_url: String,
    state: Arc<Mutex<State>>,
    credentials: Option<(String, String)>,
    shutdown: watch::Sender<bool>,
}

async fn serve<IO>(io: IO, handler: Handler)
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |req| {
        let handler = handler.clone();
        async move { Ok::<_, Infallible>(handler.handle(req).await) }
    });
    let _ = http1::Builder::new().serve_connection(TokioIo::new(io), service).await;
}

/// Self-signed certificate for `localhost`; the PEM lands in `dir/ca.pem`
fn self_signed_acceptor(dir: &Path) -> (TlsAcceptor, PathBuf) {
    let mut params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, rcgen::DnValue::Utf8String("localhost".into()));
    let key_pair = rcgen::KeyPair::generate().unwrap();
    let cert = params.self_signed(&key_pair).unwrap();

    let ca_path = dir.join("ca.pem");
    std::fs::write(&ca_path, cert.pem()).expect("Failed to write cert");

    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    let config = rustls::ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert.der().clone()], key)
        .unwrap();

    (TlsAcceptor::from(Arc::new(config)), ca_path)
}

impl Gateway {
    pub async fn start() -> Self {
        Self::start_inner(None, None).await
    }

    /// Gateway that requires HTTP Basic credentials
    pub async fn start_with_auth(user: &str, password: &str) -> Self {
        Self::start_inner(Some((user.to_string(), password.to_string())), None).await
    }

    /// HTTPS gateway on `localhost`. Returns the path of the PEM file
    /// holding its self-signed certificate.
    pub async fn start_tls(dir: &Path) -> (Self, PathBuf) {
        let (acceptor, ca_path) = self_signed_acceptor(dir);
        (Self::start_inner(None, Some(acceptor)).await, ca_path)
    }

    async fn start_inner(credentials: Option<(String, String)>, tls: Option<TlsAcceptor>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let base_url = match tls {
            Some(_) => format!("https://localhost:{}", addr.port()),
            None => format!("http://{}", addr),
        };

        let mut state = State::default();
        state.namespaces.insert("default".to_string(), BTreeMap::new());
        state.namespaces.insert("hbase".to_string(), BTreeMap::new());
        let state = Arc::new(Mutex::new(state));

        let handler = Handler {
            state: state.clone(),
            base_url: base_url.clone(),
            authorization: credentials
                .as_ref()
                .map(|(u, p)| format!("Basic {}", STANDARD.encode(format!("{}:{}", u, p)))),
        };

        let (shutdown, mut shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { continue };
                        let handler = handler.clone();
                        let tls = tls.clone();
                        tokio::spawn(async move {
                            match tls {
                                Some(acceptor) => {
                                    // Handshake failures are expected in the rejection tests
                                    if let Ok(stream) = acceptor.accept(stream).await {
                                        serve(stream, handler).await;
                                    }
                                }
                                None => serve(stream, handler).await,
                            }
                        });
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        Self {
            base_url,
            state,
            credentials,
            shutdown,
        }
    }

    pub fn endpoint(&self) -> String {
        self.base_url.clone()
    }

    pub fn config(&self) -> Config {
        let mut config = Config::with_url(self.endpoint());
        config.timeout_ms = 5_000;
        if let Some((user, password)) = &self.credentials {
            config.username = Some(user.clone());
            config.password = Some(Secret::new(password.clone()));
        }
        config
    }

    pub fn connection(&self) -> Connection {
        Connection::with_config(self.config()).unwrap()
    }

    pub fn open_scanners(&self) -> usize {
        self.state.lock().unwrap().scanners.len()
    }

    /// `METHOD /path` of every request received so far
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Make the next request fail with `status` and `message`
    pub fn fail_next(&self, status: u16, message: &str) {
        let status = StatusCode::from_u16(status).unwrap();
        self.state.lock().unwrap().injected = Some((status, message.to_string()));
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.state.lock().unwrap().namespaces.contains_key(namespace)
    }

    pub fn has_table(&self, name: &str) -> bool {
        let full = TableName::parse(name).unwrap().full_name();
        self.state.lock().unwrap().tables.contains_key(&full)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

fn response(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .body(Full::new(body.into()))
        .unwrap()
}

fn json_response(status: StatusCode, value: &Value) -> Response<Full<Bytes>> {
    response(status, "application/json", value.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    response(status, "text/plain", format!("{}\r\n", message))
}

fn empty(status: StatusCode) -> Response<Full<Bytes>> {
    response(status, "text/plain", Bytes::new())
}

fn b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn unb64(value: &Value) -> Vec<u8> {
    STANDARD.decode(value.as_str().unwrap_or_default()).unwrap_or_default()
}

fn family_of(column: &[u8]) -> &[u8] {
    match column.iter().position(|b| *b == b':') {
        Some(pos) => &column[..pos],
        None => column,
    }
}

/// `cf` selects the whole family, `cf:q` one column
fn column_matches(selectors: &[Vec<u8>], column: &[u8]) -> bool {
    selectors.is_empty()
        || selectors.iter().any(|sel| {
            if sel.contains(&b':') {
                sel.as_slice() == column
            } else {
                sel.as_slice() == family_of(column)
            }
        })
}

fn cell_set(cells: &[ScanCell]) -> Value {
    let mut rows: Vec<Value> = Vec::new();
    let mut current: Option<(Vec<u8>, Vec<Value>)> = None;
    for cell in cells {
        let entry = json!({
            "column": b64(&cell.column),
            "timestamp": cell.timestamp,
            "$": b64(&cell.value),
        });
        match current.as_mut() {
            Some((row, list)) if *row == cell.row => list.push(entry),
            _ => {
                if let Some((row, list)) = current.take() {
                    rows.push(json!({"key": b64(&row), "Cell": list}));
                }
                current = Some((cell.row.clone(), vec![entry]));
            }
        }
    }
    if let Some((row, list)) = current {
        rows.push(json!({"key": b64(&row), "Cell": list}));
    }
    json!({ "Row": rows })
}

fn row_cells(row: &[u8], columns: &Columns, selectors: &[Vec<u8>], versions: usize, range: (u64, u64)) -> Vec<ScanCell> {
    let mut out = Vec::new();
    for (column, cell_versions) in columns {
        if !column_matches(selectors, column) {
            continue;
        }
        for (timestamp, value) in cell_versions
            .iter()
            .filter(|(ts, _)| *ts >= range.0 && *ts < range.1)
            .take(versions)
        {
            out.push(ScanCell {
                row: row.to_vec(),
                column: column.clone(),
                timestamp: *timestamp,
                value: value.clone(),
            });
        }
    }
    out
}

impl Handler {
    async fn handle(&self, req: Request<Incoming>) -> Response<Full<Bytes>> {
        if let Some(expected) = &self.authorization {
            let given = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok());
            if given != Some(expected.as_str()) {
                return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
            }
        }

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().unwrap_or_default().to_string();
        let injected = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(format!("{} {}", method, path));
            state.injected.take()
        };
        if let Some((status, message)) = injected {
            return error_response(status, &message);
        }

        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(_) => return error_response(StatusCode::BAD_REQUEST, "Bad body"),
        };

        let raw: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let text = |i: usize| -> String {
            percent_decode_str(raw[i]).decode_utf8_lossy().to_string()
        };
        let bytes = |i: usize| -> Vec<u8> { percent_decode_str(raw[i]).collect() };

        match (method.clone(), raw.as_slice()) {
            (Method::GET, ["version", "cluster"]) => {
                response(StatusCode::OK, "text/plain", format!("\"{}\"", CLUSTER_VERSION))
            }
            (Method::GET, ["namespaces"]) => self.list_namespaces(),
            (_, ["namespaces", _]) => self.namespace(&method, &text(1)),
            (Method::GET, ["namespaces", _, "tables"]) => self.namespace_tables(&text(1)),
            (_, [_, "exists"]) if method == Method::GET => self.table_exists(&text(0)),
            (_, [_, "schema"]) => self.schema(&method, &text(0), &body),
            (Method::POST, [_, "scanner"]) | (Method::PUT, [_, "scanner"]) => {
                self.create_scanner(&text(0), raw[0], &body)
            }
            (_, [_, "scanner", _]) => self.scanner(&method, &text(2)),
            (_, [_, _]) | (_, [_, _, _]) => {
                let column = if raw.len() == 3 { Some(bytes(2)) } else { None };
                self.row(&method, &text(0), &bytes(1), column, &query, &body)
            }
            _ => error_response(StatusCode::NOT_FOUND, "Not found"),
        }
    }

    fn list_namespaces(&self) -> Response<Full<Bytes>> {
        let state = self.state.lock().unwrap();
        let names: Vec<&String> = state.namespaces.keys().collect();
        json_response(StatusCode::OK, &json!({ "Namespace": names }))
    }

    fn namespace(&self, method: &Method, namespace: &str) -> Response<Full<Bytes>> {
        let mut state = self.state.lock().unwrap();
        match *method {
            Method::GET => match state.namespaces.get(namespace) {
                Some(props) => json_response(StatusCode::OK, &json!({ "properties": props })),
                None => error_response(StatusCode::NOT_FOUND, "Not found"),
            },
            Method::POST => {
                if state.namespaces.contains_key(namespace) {
                    return error_response(StatusCode::FORBIDDEN, "Namespace already exists");
                }
                state.namespaces.insert(namespace.to_string(), BTreeMap::new());
                empty(StatusCode::CREATED)
            }
            Method::DELETE => {
                if !state.namespaces.contains_key(namespace) {
                    return error_response(StatusCode::NOT_FOUND, "Not found");
                }
                let prefix = format!("{}:", namespace);
                if state.tables.keys().any(|t| t.starts_with(&prefix)) {
                    return error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "ConstraintException: Only empty namespaces can be removed",
                    );
                }
                state.namespaces.remove(namespace);
                empty(StatusCode::OK)
            }
            _ => error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
        }
    }

    fn namespace_tables(&self, namespace: &str) -> Response<Full<Bytes>> {
        let state = self.state.lock().unwrap();
        if !state.namespaces.contains_key(namespace) {
            return error_response(StatusCode::NOT_FOUND, "Not found");
        }
        let prefix = format!("{}:", namespace);
        let tables: Vec<Value> = state
            .tables
            .keys()
            .filter_map(|t| t.strip_prefix(&prefix))
            .map(|q| json!({ "name": q }))
            .collect();
        json_response(StatusCode::OK, &json!({ "table": tables }))
    }

    fn table_key(name: &str) -> Option<String> {
        TableName::parse(name).ok().map(|t| t.full_name())
    }

    fn table_exists(&self, name: &str) -> Response<Full<Bytes>> {
        let state = self.state.lock().unwrap();
        match Self::table_key(name) {
            Some(key) if state.tables.contains_key(&key) => {
                response(StatusCode::OK, "text/plain", "true")
            }
            _ => error_response(StatusCode::NOT_FOUND, "Not found"),
        }
    }

    fn schema(&self, method: &Method, name: &str, body: &Bytes) -> Response<Full<Bytes>> {
        let Some(key) = Self::table_key(name) else {
            return error_response(StatusCode::BAD_REQUEST, "Bad table name");
        };
        let mut state = self.state.lock().unwrap();
        match *method {
            Method::GET => match state.tables.get(&key) {
                Some(table) => json_response(StatusCode::OK, &table.schema),
                None => error_response(StatusCode::NOT_FOUND, "Not found"),
            },
            Method::PUT | Method::POST => {
                let Ok(mut schema) = serde_json::from_slice::<Value>(body) else {
                    return error_response(StatusCode::BAD_REQUEST, "Bad schema");
                };
                let namespace = key.split(':').next().unwrap_or_default().to_string();
                if !state.namespaces.contains_key(&namespace) {
                    return error_response(StatusCode::NOT_FOUND, "NamespaceNotFoundException");
                }
                let families: BTreeMap<Vec<u8>, usize> = schema["ColumnSchema"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .iter()
                    .map(|c| {
                        let versions = c["VERSIONS"]
                            .as_str()
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(1);
                        (c["name"].as_str().unwrap_or_default().as_bytes().to_vec(), versions)
                    })
                    .collect();
                if families.is_empty() {
                    return error_response(StatusCode::BAD_REQUEST, "No column families");
                }
                schema["IS_META"] = json!("false");
                let created = !state.tables.contains_key(&key);
                let table = state.tables.entry(key).or_insert_with(|| MockTable {
                    schema: Value::Null,
                    families: BTreeMap::new(),
                    rows: BTreeMap::new(),
                });
                table.schema = schema;
                table.families = families;
                empty(if created { StatusCode::CREATED } else { StatusCode::OK })
            }
            Method::DELETE => match state.tables.remove(&key) {
                Some(_) => empty(StatusCode::OK),
                None => error_response(StatusCode::NOT_FOUND, "Not found"),
            },
            _ => error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
        }
    }

    fn row(
        &self,
        method: &Method,
        name: &str,
        row: &[u8],
        column: Option<Vec<u8>>,
        query: &str,
        body: &Bytes,
    ) -> Response<Full<Bytes>> {
        let Some(key) = Self::table_key(name) else {
            return error_response(StatusCode::BAD_REQUEST, "Bad table name");
        };
        let mut state = self.state.lock().unwrap();
        if !state.tables.contains_key(&key) {
            return error_response(StatusCode::NOT_FOUND, "Not found");
        }

        match *method {
            Method::PUT | Method::POST => {
                let Ok(cell_set) = serde_json::from_slice::<Value>(body) else {
                    return error_response(StatusCode::BAD_REQUEST, "Bad cell set");
                };
                let rows = cell_set["Row"].as_array().cloned().unwrap_or_default();
                let mut writes = Vec::new();
                for row in &rows {
                    let row_key = unb64(&row["key"]);
                    for cell in row["Cell"].as_array().cloned().unwrap_or_default() {
                        writes.push((row_key.clone(), unb64(&cell["column"]), cell["timestamp"].as_u64(), unb64(&cell["$"])));
                    }
                }

                let table = &state.tables[&key];
                if let Some((_, column, _, _)) = writes
                    .iter()
                    .find(|(_, column, _, _)| !table.families.contains_key(family_of(column)))
                {
                    let message = format!(
                        "NoSuchColumnFamilyException: {}",
                        String::from_utf8_lossy(family_of(column))
                    );
                    return error_response(StatusCode::NOT_FOUND, &message);
                }

                for (row_key, column, timestamp, value) in writes {
                    let timestamp = timestamp.unwrap_or_else(|| {
                        state.clock += 1;
                        state.clock
                    });
                    let table = state.tables.get_mut(&key).unwrap();
                    let keep = table.families[family_of(&column)].max(1);
                    let versions = table
                        .rows
                        .entry(row_key)
                        .or_default()
                        .entry(column)
                        .or_default();
                    versions.retain(|(ts, _)| *ts != timestamp);
                    versions.push((timestamp, value));
                    versions.sort_by(|a, b| b.0.cmp(&a.0));
                    versions.truncate(keep);
                }
                empty(StatusCode::OK)
            }
            Method::GET => {
                let versions = url::form_urlencoded::parse(query.as_bytes())
                    .find(|(k, _)| k == "v")
                    .and_then(|(_, v)| v.parse().ok())
                    .unwrap_or(1usize);
                let selectors: Vec<Vec<u8>> = column
                    .map(|c| c.split(|b| *b == b',').map(<[u8]>::to_vec).collect())
                    .unwrap_or_default();
                let table = &state.tables[&key];
                let cells = match table.rows.get(row) {
                    Some(columns) => row_cells(row, columns, &selectors, versions, (0, u64::MAX)),
                    None => Vec::new(),
                };
                if cells.is_empty() {
                    return error_response(StatusCode::NOT_FOUND, "Not found");
                }
                json_response(StatusCode::OK, &cell_set(&cells))
            }
            Method::DELETE => {
                let table = state.tables.get_mut(&key).unwrap();
                match column {
                    None => {
                        table.rows.remove(row);
                    }
                    Some(selector) => {
                        if let Some(columns) = table.rows.get_mut(row) {
                            columns.retain(|c, _| !column_matches(std::slice::from_ref(&selector), c));
                            if columns.is_empty() {
                                table.rows.remove(row);
                            }
                        }
                    }
                }
                empty(StatusCode::OK)
            }
            _ => error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
        }
    }

    fn create_scanner(&self, name: &str, raw_table: &str, body: &Bytes) -> Response<Full<Bytes>> {
        let Some(key) = Self::table_key(name) else {
            return error_response(StatusCode::BAD_REQUEST, "Bad table name");
        };
        let Ok(model) = serde_json::from_slice::<Value>(body) else {
            return error_response(StatusCode::BAD_REQUEST, "Bad scanner model");
        };
        let mut state = self.state.lock().unwrap();
        let Some(table) = state.tables.get(&key) else {
            return error_response(StatusCode::NOT_FOUND, "Not found");
        };

        let start = model.get("startRow").map(unb64);
        let end = model.get("endRow").map(unb64);
        let selectors: Vec<Vec<u8>> = model["column"]
            .as_array()
            .map(|cols| cols.iter().map(unb64).collect())
            .unwrap_or_default();
        let batch = model["batch"].as_u64().unwrap_or(100).max(1) as usize;
        let versions = model["maxVersions"].as_u64().unwrap_or(1).max(1) as usize;
        let range = (
            model["startTime"].as_u64().unwrap_or(0),
            model["endTime"].as_u64().unwrap_or(u64::MAX),
        );

        let mut cells = VecDeque::new();
        for (row, columns) in &table.rows {
            if start.as_ref().is_some_and(|s| row < s) || end.as_ref().is_some_and(|e| row >= e) {
                continue;
            }
            cells.extend(row_cells(row, columns, &selectors, versions, range));
        }

        state.next_scanner += 1;
        let id = format!("{:016x}", state.next_scanner);
        state.scanners.insert(id.clone(), MockScanner { cells, batch });

        Response::builder()
            .status(StatusCode::CREATED)
            .header("Location", format!("{}/{}/scanner/{}", self.base_url, raw_table, id))
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn scanner(&self, method: &Method, id: &str) -> Response<Full<Bytes>> {
        let mut state = self.state.lock().unwrap();
        match *method {
            Method::GET => {
                let Some(scanner) = state.scanners.get_mut(id) else {
                    return error_response(StatusCode::NOT_FOUND, "Not found");
                };
                if scanner.cells.is_empty() {
                    return empty(StatusCode::NO_CONTENT);
                }
                let take = scanner.batch.min(scanner.cells.len());
                let chunk: Vec<ScanCell> = scanner.cells.drain(..take).collect();
                json_response(StatusCode::OK, &cell_set(&chunk))
            }
            Method::DELETE => match state.scanners.remove(id) {
                Some(_) => empty(StatusCode::OK),
                None => error_response(StatusCode::NOT_FOUND, "Not found"),
            },
            _ => error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
        }
    }
}
