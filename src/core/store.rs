//! The remote object store as seen by the transfer engine.

use async_trait::async_trait;

use crate::core::error::StoreError;
use crate::core::stream::ObjectStream;

/// An object opened for reading, with its declared length known up front
pub struct RemoteObject {
    pub content: ObjectStream,
    pub content_length: u64,
}

/// Capability interface over a blob store.
///
/// Chunking and retries inside an implementation are opaque to callers.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Write `source` as `container/name`.
    ///
    /// `on_bytes_sent` receives the cumulative byte count, strictly
    /// increasing, zero or more times; the last call at or before
    /// completion covers every byte. It runs on the caller's task.
    async fn put_object(
        &self,
        container: &str,
        name: &str,
        source: ObjectStream,
        size: u64,
        on_bytes_sent: &mut (dyn FnMut(u64) + Send),
    ) -> Result<(), StoreError>;

    /// Open `container/name` for reading.
    async fn get_object(&self, container: &str, name: &str) -> Result<RemoteObject, StoreError>;
}

