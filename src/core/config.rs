//! Store connection settings.
//!
//! Endpoint, container and the optional SAS query string are treated as
//! already resolved; nothing here negotiates credentials.

use std::time::Duration;

use crate::core::error::{Error, Result};
use crate::core::memory::DEFAULT_CHUNK_SIZE;

/// Local Azurite development endpoint
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

pub const DEFAULT_CONTAINER: &str = "transfers";

pub const ENV_ENDPOINT: &str = "BLOBXFER_ENDPOINT";
pub const ENV_CONTAINER: &str = "BLOBXFER_CONTAINER";
pub const ENV_SAS_TOKEN: &str = "BLOBXFER_SAS_TOKEN";

/// Configuration for the HTTP blob store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Account endpoint, e.g. `https://acct.blob.core.windows.net`
    pub endpoint: String,

    /// Container holding the objects
    pub container: String,

    /// Pre-signed query string appended to every request, without `?`
    pub sas_token: Option<String>,

    pub connect_timeout: Duration,

    /// Whole-request timeout; `None` lets large transfers run as long as needed
    pub request_timeout: Option<Duration>,

    /// Upload body chunk size
    pub chunk_size: usize,

    pub user_agent: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
            sas_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            user_agent: format!("blobxfer/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `BLOBXFER_ENDPOINT`, `BLOBXFER_CONTAINER` and
    /// `BLOBXFER_SAS_TOKEN` when set and non-empty
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(endpoint) = non_empty(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        if let Some(container) = non_empty(ENV_CONTAINER) {
            config.container = container;
        }
        config.sas_token = non_empty(ENV_SAS_TOKEN);
        config
    }

    /// Check the fields a store cannot work without
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(Error::InvalidInput(format!(
                "endpoint must be an http(s) URL: '{}'",
                self.endpoint
            )));
        }
        if self.container.is_empty() || self.container.contains('/') {
            return Err(Error::InvalidInput(format!(
                "invalid container name: '{}'",
                self.container
            )));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidInput("chunk size must be non-zero".to_string()));
        }
        Ok(())
    }

    /// URL of `name` inside the configured container, SAS appended
    pub fn object_url(&self, container: &str, name: &str) -> String {
        self.object_url_with(container, name, &[])
    }

    /// Like [`object_url`](Self::object_url), with operation parameters such
    /// as `comp=block` placed ahead of the SAS
    pub fn object_url_with(&self, container: &str, name: &str, params: &[(&str, &str)]) -> String {
        let encoded: Vec<String> = name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        let mut url = format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            container,
            encoded.join("/")
        );

        let mut query: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect();
        if let Some(sas) = &self.sas_token {
            let sas = sas.trim_start_matches('?');
            if !sas.is_empty() {
                query.push(sas.to_string());
            }
        }
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }
}
