//! Blob store over HTTP, speaking the Azure Blob REST dialect.
//!
//! Works against Azurite and real accounts authorized by a SAS query string.
//! Payloads up to one chunk go up in a single Put Blob; larger ones are
//! staged with Put Block and committed with Put Block List.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use log::{debug, warn};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};

use crate::core::config::StoreConfig;
use crate::core::error::{Error, Result, StoreError};
use crate::core::store::{RemoteObject, StorageClient};
use crate::core::stream::{ObjectStream, create_http_stream, read_chunk};

const BLOB_API_VERSION: &str = "2021-08-06";
const ERROR_CODE_HEADER: &str = "x-ms-error-code";

/// [`StorageClient`] backed by a reqwest [`Client`]
pub struct HttpBlobStore {
    client: Client,
    config: StoreConfig,
}

impl HttpBlobStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = ClientBuilder::new()
            .tcp_keepalive(std::time::Duration::from_secs(60))
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Send a request and turn a non-success status into a [`StoreError`]
    async fn execute(
        &self,
        request: RequestBuilder,
        container: &str,
        name: &str,
    ) -> std::result::Result<(), StoreError> {
        let response = request.header("x-ms-version", BLOB_API_VERSION).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.headers(), container, name));
        }
        Ok(())
    }

    async fn put_blob(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
    ) -> std::result::Result<(), StoreError> {
        let request = self
            .client
            .put(self.config.object_url(container, name))
            .header("x-ms-blob-type", "BlockBlob")
            .body(data);
        self.execute(request, container, name).await
    }

    async fn put_block(
        &self,
        container: &str,
        name: &str,
        block_id: &str,
        data: Bytes,
    ) -> std::result::Result<(), StoreError> {
        let url = self
            .config
            .object_url_with(container, name, &[("comp", "block"), ("blockid", block_id)]);
        self.execute(self.client.put(url).body(data), container, name)
            .await
    }

    async fn put_block_list(
        &self,
        container: &str,
        name: &str,
        block_ids: &[String],
    ) -> std::result::Result<(), StoreError> {
        let url = self
            .config
            .object_url_with(container, name, &[("comp", "blocklist")]);
        let request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "application/xml")
            .body(block_list_xml(block_ids));
        self.execute(request, container, name).await
    }
}

#[async_trait]
impl StorageClient for HttpBlobStore {
    async fn put_object(
        &self,
        container: &str,
        name: &str,
        mut source: ObjectStream,
        size: u64,
        on_bytes_sent: &mut (dyn FnMut(u64) + Send),
    ) -> std::result::Result<(), StoreError> {
        let chunk_size = self.config.chunk_size;

        if size <= chunk_size as u64 {
            let mut data = vec![0u8; size as usize];
            let read = read_chunk(&mut source, &mut data).await?;
            data.truncate(read);
            debug!("PUT {container}/{name} ({read} bytes)");
            self.put_blob(container, name, Bytes::from(data)).await?;
            on_bytes_sent(read as u64);
            return Ok(());
        }

        let mut chunk = vec![0u8; chunk_size];
        let mut block_ids = Vec::new();
        let mut sent = 0u64;
        loop {
            let read = read_chunk(&mut source, &mut chunk).await?;
            if read == 0 {
                break;
            }
            let block_id = block_id(block_ids.len());
            self.put_block(
                container,
                name,
                &block_id,
                Bytes::copy_from_slice(&chunk[..read]),
            )
            .await?;
            block_ids.push(block_id);
            sent += read as u64;
            on_bytes_sent(sent);
        }

        debug!(
            "Committing {} blocks ({sent} bytes) for {container}/{name}",
            block_ids.len()
        );
        self.put_block_list(container, name, &block_ids).await
    }

    async fn get_object(
        &self,
        container: &str,
        name: &str,
    ) -> std::result::Result<RemoteObject, StoreError> {
        let url = self.config.object_url(container, name);
        debug!("GET {container}/{name}");

        let response = self
            .client
            .get(&url)
            .header("x-ms-version", BLOB_API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.headers(), container, name));
        }

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(|| {
                warn!("No content length for {container}/{name}; progress will stay at 0%");
                0
            });

        Ok(RemoteObject {
            content: create_http_stream(response),
            content_length,
        })
    }
}

/// Block ids within one blob must all have the same encoded length
fn block_id(index: usize) -> String {
    BASE64.encode(format!("block-{index:06}"))
}

fn block_list_xml(block_ids: &[String]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><BlockList>"#);
    for id in block_ids {
        xml.push_str("<Latest>");
        xml.push_str(id);
        xml.push_str("</Latest>");
    }
    xml.push_str("</BlockList>");
    xml
}

/// Map a non-success response to the store error taxonomy
fn status_error(
    status: StatusCode,
    headers: &HeaderMap,
    container: &str,
    name: &str,
) -> StoreError {
    let code = headers
        .get(ERROR_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let object = format!("{container}/{name}");
    let detail = if code.is_empty() {
        format!("{object} ({status})")
    } else {
        format!("{object} ({status}, {code})")
    };

    if code.contains("Quota") || status == StatusCode::PAYLOAD_TOO_LARGE {
        return StoreError::QuotaExceeded(detail);
    }

    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized(detail),
        _ => StoreError::HttpError {
            status: status.as_u16(),
            message: detail,
        },
    }
}
