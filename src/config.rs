use std::env;
use std::fmt;
use std::path::PathBuf;

use zeroize::Zeroize;

use crate::error::{Error, Result};

const DEFAULT_REST_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SCANNER_BATCH: u32 = 100;
const DEFAULT_CF_MIN_VERSIONS: u32 = 3;
const DEFAULT_CF_MAX_VERSIONS: u32 = 10;

/// Password wrapper that zeros memory on drop and never prints itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the REST gateway, e.g. `http://hbase-rest:8080`
    pub rest_url: String,
    /// HTTP Basic user, if the gateway sits behind authentication
    pub username: Option<String>,
    pub password: Option<Secret>,
    pub timeout_ms: u64,
    /// Extra PEM bundle trusted in addition to the webpki roots
    pub ca_cert_path: Option<PathBuf>,
    /// Accept any server certificate (self-signed gateways)
    pub accept_invalid_certs: bool,
    /// Cells fetched per scanner round trip
    pub scanner_batch: u32,
    pub cf_min_versions: u32,
    pub cf_max_versions: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rest_url: DEFAULT_REST_URL.to_string(),
            username: None,
            password: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            ca_cert_path: None,
            accept_invalid_certs: false,
            scanner_batch: DEFAULT_SCANNER_BATCH,
            cf_min_versions: DEFAULT_CF_MIN_VERSIONS,
            cf_max_versions: DEFAULT_CF_MAX_VERSIONS,
        }
    }
}

impl Config {
    /// Configuration pointing at `rest_url` with every other setting defaulted
    pub fn with_url(rest_url: impl Into<String>) -> Self {
        Self {
            rest_url: rest_url.into(),
            ..Default::default()
        }
    }

    pub fn from_env() -> Result<Self> {
        let rest_url = env::var("HBASE_REST_URL").unwrap_or_else(|_| DEFAULT_REST_URL.to_string());
        let rest_url = rest_url.trim_end_matches('/').to_string();

        let username = env::var("HBASE_REST_USER").ok().filter(|s| !s.is_empty());
        let password = env::var("HBASE_REST_PASSWORD")
            .ok()
            .filter(|s| !s.is_empty())
            .map(Secret::new);

        if password.is_some() && username.is_none() {
            return Err(Error::Config(
                "HBASE_REST_PASSWORD is set but HBASE_REST_USER is not".to_string(),
            ));
        }

        let timeout_ms = parse_env("HBASE_REST_TIMEOUT_MS").unwrap_or(DEFAULT_TIMEOUT_MS);
        let ca_cert_path = env::var("HBASE_REST_CA_CERT")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        let accept_invalid_certs = env::var("HBASE_REST_INSECURE")
            .ok()
            .and_then(|s| parse_bool(&s))
            .unwrap_or(false);

        let scanner_batch = parse_env::<u32>("HBASE_SCANNER_BATCH")
            .filter(|b| *b > 0)
            .unwrap_or(DEFAULT_SCANNER_BATCH);
        let cf_min_versions = parse_env("HBASE_CF_MIN_VERSIONS").unwrap_or(DEFAULT_CF_MIN_VERSIONS);
        let cf_max_versions = parse_env("HBASE_CF_MAX_VERSIONS").unwrap_or(DEFAULT_CF_MAX_VERSIONS);

        if cf_min_versions > cf_max_versions {
            return Err(Error::Config(format!(
                "HBASE_CF_MIN_VERSIONS ({}) exceeds HBASE_CF_MAX_VERSIONS ({})",
                cf_min_versions, cf_max_versions
            )));
        }

        Ok(Config {
            rest_url,
            username,
            password,
            timeout_ms,
            ca_cert_path,
            accept_invalid_certs,
            scanner_batch,
            cf_min_versions,
            cf_max_versions,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Parse a boolean flag (supports: 1/0, true/false, yes/no, on/off)
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
