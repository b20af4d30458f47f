//! # Blobxfer Library
//!
//! Progress-tracked transfer of a single file to and from a blob storage
//! container.
//!
//! ## Features
//!
//! - **Streaming**: bounded buffers in both directions, flat memory use
//! - **Progress tracking**: a [`ProgressSink`] receives a [`ProgressEvent`] per chunk
//! - **Pluggable stores**: anything implementing [`StorageClient`]; an HTTP
//!   store ([`HttpBlobStore`]) and an in-memory one ([`MemoryStore`]) ship here
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use blobxfer::StoreConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoreConfig::from_env();
//!
//!     // Upload under the file's base name ("upload.msi")
//!     blobxfer::upload("/tmp/upload.msi", &config).await?;
//!
//!     // Download it back
//!     blobxfer::download("upload.msi", "/tmp/download_upload.msi", &config).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Progress Tracking
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = blobxfer::StoreConfig::from_env();
//! blobxfer::upload_with_progress("/tmp/upload.msi", &config, |event| {
//!     println!("Progress: {:.1}%", event.percentage);
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

pub use crate::core::config::StoreConfig;
pub use crate::core::error::{Error, Result, StoreError};
pub use crate::core::format::{format_mebibytes, format_size};
pub use crate::core::memory::MemoryStore;
pub use crate::core::progress::{
    CallbackSink, LogSink, NullSink, ProgressEvent, ProgressSink, SinkGuard, percentage,
};
pub use crate::core::session::{Direction, TransferSession};
pub use crate::core::store::{RemoteObject, StorageClient};
pub use crate::core::stream::{
    DEFAULT_BUFFER_SIZE, ObjectStream, OverwriteBehavior, TransferOptions,
};
pub use crate::core::{HttpBlobStore, TransferEngine, remote_name_for};

// Internal modules
mod core;

fn http_engine(config: &StoreConfig) -> Result<TransferEngine<HttpBlobStore>> {
    let store = HttpBlobStore::new(config.clone())?;
    Ok(TransferEngine::new(store, config.container.clone()))
}

/// Upload a local file under its base name
///
/// Returns the number of bytes the store acknowledged.
pub async fn upload(local_path: impl AsRef<Path>, config: &StoreConfig) -> Result<u64> {
    http_engine(config)?.upload(local_path, &mut NullSink).await
}

/// Upload with a progress callback receiving one [`ProgressEvent`] per chunk
pub async fn upload_with_progress<F>(
    local_path: impl AsRef<Path>,
    config: &StoreConfig,
    progress: F,
) -> Result<u64>
where
    F: FnMut(&ProgressEvent) + Send,
{
    let mut sink = CallbackSink::new(progress);
    http_engine(config)?.upload(local_path, &mut sink).await
}

/// Download `remote_name` to `local_path`, overwriting any existing file
///
/// Returns the number of bytes written.
pub async fn download(
    remote_name: &str,
    local_path: impl AsRef<Path>,
    config: &StoreConfig,
) -> Result<u64> {
    http_engine(config)?
        .download(remote_name, local_path, &mut NullSink)
        .await
}

/// Download with a progress callback receiving one [`ProgressEvent`] per buffer
pub async fn download_with_progress<F>(
    remote_name: &str,
    local_path: impl AsRef<Path>,
    config: &StoreConfig,
    progress: F,
) -> Result<u64>
where
    F: FnMut(&ProgressEvent) + Send,
{
    let mut sink = CallbackSink::new(progress);
    http_engine(config)?
        .download(remote_name, local_path, &mut sink)
        .await
}

/// Local file name for a download when none is given: the object's last
/// path segment
pub fn resolve_output_filename(remote_name: &str) -> String {
    remote_name
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(remote_name)
        .to_string()
}
