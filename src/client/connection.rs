//! HTTP transport to the HBase REST gateway

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::rt::TokioExecutor;
use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::client::admin::Admin;
use crate::client::table::Table;
use crate::client::tls::build_tls_config;
use crate::client::types::{Column, TableName};
use crate::config::{Config, Secret};
use crate::error::{Error, Result};

pub(crate) const JSON: &str = "application/json";

/// Unreserved characters per RFC 3986; everything else in a row key,
/// family or qualifier is percent-encoded.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Table names keep their `namespace:qualifier` separator readable.
const TABLE_SEGMENT: &AsciiSet = &COMPONENT.remove(b':');

/// Percent-encode raw bytes for use as a single URI path segment.
pub(crate) fn encode_segment(bytes: &[u8]) -> String {
    percent_encode(bytes, COMPONENT).to_string()
}

/// `/{namespace}:{qualifier}`
pub(crate) fn table_path(name: &TableName) -> String {
    format!("/{}", percent_encode(name.full_name().as_bytes(), TABLE_SEGMENT))
}

/// Comma separated `family[:qualifier]` list for row resources.
pub(crate) fn columns_segment(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|column| match column {
            Column::Family(family) => encode_segment(family),
            Column::Qualified(family, qualifier) => {
                format!("{}:{}", encode_segment(family), encode_segment(qualifier))
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;

/// Connection to an HBase REST gateway
///
/// Plain HTTP/1.1 for `http://` endpoints, rustls for `https://`.
/// Cloning is cheap and shares the pooled HTTP client, so one connection
/// per application is enough. Admin and table handles are created per use.
///
/// # Example
/// ```rust,no_run
/// use hbase_tools::Connection;
///
/// #[tokio::main]
/// async fn main() -> Result<(), hbase_tools::Error> {
///     let conn = Connection::new("http://localhost:8080")?;
///     println!("cluster version: {}", conn.cluster_version().await?);
///     conn.close();
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Connection {
    config: Arc<Config>,
    authorization: Option<Arc<Secret>>,
    http_client: HttpClient<HttpsConnector, Full<Bytes>>,
}

impl Connection {
    /// Connect to `endpoint` with default settings
    ///
    /// # Errors
    /// Returns an error if the endpoint URL is invalid
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_config(Config::with_url(endpoint))
    }

    /// Create a new connection with custom configuration
    pub fn with_config(mut config: Config) -> Result<Self> {
        config.rest_url = config.rest_url.trim_end_matches('/').to_string();

        let url = Url::parse(&config.rest_url)
            .map_err(|e| Error::InvalidUrl(format!("Invalid endpoint URL: {}", e)))?;
        match url.scheme() {
            "http" | "https" if url.has_host() => {}
            _ => {
                return Err(Error::InvalidUrl(format!(
                    "Endpoint must be an http:// or https:// URL: {}",
                    config.rest_url
                )))
            }
        }

        let authorization = match (&config.username, &config.password) {
            (Some(user), password) => {
                let password = password.as_ref().map(Secret::expose).unwrap_or("");
                let encoded = STANDARD.encode(format!("{}:{}", user, password));
                Some(Arc::new(Secret::new(format!("Basic {}", encoded))))
            }
            (None, Some(_)) => {
                return Err(Error::Config("A password was given without a user".to_string()))
            }
            (None, None) => None,
        };

        let tls_config = build_tls_config(config.ca_cert_path.as_deref(), config.accept_invalid_certs)?;

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        let http_client = HttpClient::builder(TokioExecutor::new()).build(https_connector);

        debug!("Connection created for {}", config.rest_url);

        Ok(Self {
            config: Arc::new(config),
            authorization,
            http_client,
        })
    }

    /// Get the endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.config.rest_url
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Administrative handle for namespace and table schema operations
    pub fn admin(&self) -> Admin {
        Admin::new(self.clone())
    }

    /// Data handle for one table
    pub fn table(&self, name: TableName) -> Table {
        Table::new(self.clone(), name)
    }

    /// Version string of the cluster behind the gateway
    pub async fn cluster_version(&self) -> Result<String> {
        let response = self
            .request(Method::GET, "/version/cluster", None, Some("text/plain"))
            .await?;
        let body = self.read_body(response.into_body()).await?;
        Ok(String::from_utf8_lossy(&body).trim().trim_matches('"').to_string())
    }

    /// Check if the gateway and cluster are reachable
    pub async fn health_check(&self) -> bool {
        match self.cluster_version().await {
            Ok(version) => {
                debug!("Cluster version {}", version);
                true
            }
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }

    /// Release this handle. Pooled sockets close once every clone is gone.
    pub fn close(self) {
        debug!("Connection to {} closed", self.config.rest_url);
    }

    /// Absolute URL for a `Location` the gateway handed back, which may be
    /// relative to the endpoint.
    pub(crate) fn resolve(&self, location: &str) -> Result<String> {
        let base = Url::parse(&format!("{}/", self.config.rest_url))
            .map_err(|e| Error::InvalidUrl(format!("Invalid endpoint URL: {}", e)))?;
        base.join(location)
            .map(String::from)
            .map_err(|e| Error::InvalidUrl(format!("Invalid location '{}': {}", location, e)))
    }

    /// Send one request. `target` is a gateway path or an absolute URL
    /// (scanner locations come back absolute).
    pub(crate) async fn request(
        &self,
        method: Method,
        target: &str,
        body: Option<(Bytes, &str)>,
        accept: Option<&str>,
    ) -> Result<Response<Incoming>> {
        let url = if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("{}{}", self.config.rest_url, target)
        };
        let uri: Uri = url.parse()
            .map_err(|e| Error::InvalidUrl(format!("Invalid request URL: {}", e)))?;

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header("accept", accept.unwrap_or(JSON));

        if let Some(authorization) = &self.authorization {
            builder = builder.header("authorization", authorization.expose());
        }

        let req = match body {
            Some((bytes, content_type)) => builder
                .header("content-type", content_type)
                .body(Full::new(bytes)),
            None => builder.body(Full::new(Bytes::new())),
        };
        let req = req.map_err(|e| Error::InvalidRequest(format!("Failed to build request: {}", e)))?;

        debug!("Sending request: {} {}", method, target);

        let timeout = Duration::from_millis(self.config.timeout_ms);
        let response = tokio::time::timeout(timeout, self.http_client.request(req))
            .await
            .map_err(|_| Error::Timeout(self.config.timeout_ms))?
            .map_err(|e| Error::Connection(format!("Request failed: {}", e)))?;

        let status = response.status();

        match status {
            StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
            StatusCode::NOT_FOUND => Err(Error::NotFound(target.to_string())),
            StatusCode::FORBIDDEN => {
                let message = self.read_message(response.into_body()).await?;
                Err(Error::Forbidden(message))
            }
            code if code.is_server_error() => {
                let message = self.read_message(response.into_body()).await?;
                Err(Error::ServerError {
                    status: code.as_u16(),
                    message,
                })
            }
            code if code.is_client_error() => {
                let message = self.read_message(response.into_body()).await?;
                Err(Error::InvalidRequest(message))
            }
            _ => Ok(response),
        }
    }

    /// `request` followed by JSON decoding of the body
    pub(crate) async fn request_json<T: DeserializeOwned>(&self, method: Method, target: &str) -> Result<T> {
        let response = self.request(method, target, None, Some(JSON)).await?;
        let body = self.read_body(response.into_body()).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Read a response body to bytes. The body gets its own `timeout_ms`
    /// deadline, so a gateway that stalls after the headers still fails.
    pub(crate) async fn read_body(&self, body: Incoming) -> Result<Bytes> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let collected = tokio::time::timeout(timeout, body.collect())
            .await
            .map_err(|_| Error::Timeout(self.config.timeout_ms))?
            .map_err(|e| Error::Http(format!("Failed to read body: {}", e)))?;
        Ok(collected.to_bytes())
    }

    async fn read_message(&self, body: Incoming) -> Result<String> {
        let body = self.read_body(body).await?;
        Ok(String::from_utf8_lossy(&body).trim().to_string())
    }
}
