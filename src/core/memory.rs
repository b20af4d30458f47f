//! In-process blob store.
//!
//! Used by tests and by callers embedding the engine without a network.
//! Objects live in a map keyed by `(container, name)`; a put only becomes
//! visible once its source has been read to the end.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::Mutex;

use crate::core::error::StoreError;
use crate::core::store::{RemoteObject, StorageClient};
use crate::core::stream::{ObjectStream, read_chunk};

/// Chunk size used when none is given (4 MiB, matching the HTTP store)
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Blob store held entirely in memory
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Bytes>>,
    chunk_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Store that acknowledges uploads every `chunk_size` bytes
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            chunk_size: chunk_size.max(1),
        }
    }

    pub async fn insert(&self, container: &str, name: &str, data: impl Into<Bytes>) {
        self.objects
            .lock()
            .await
            .insert((container.to_string(), name.to_string()), data.into());
    }

    pub async fn get(&self, container: &str, name: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .await
            .get(&(container.to_string(), name.to_string()))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl StorageClient for MemoryStore {
    async fn put_object(
        &self,
        container: &str,
        name: &str,
        mut source: ObjectStream,
        size: u64,
        on_bytes_sent: &mut (dyn FnMut(u64) + Send),
    ) -> Result<(), StoreError> {
        let mut data = BytesMut::with_capacity(size.min(DEFAULT_CHUNK_SIZE as u64) as usize);
        let mut chunk = vec![0u8; self.chunk_size];
        let mut sent = 0u64;

        loop {
            let read = read_chunk(&mut source, &mut chunk).await?;
            if read == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..read]);
            sent += read as u64;
            on_bytes_sent(sent);
        }

        if sent == 0 {
            on_bytes_sent(0);
        }

        self.insert(container, name, data.freeze()).await;
        Ok(())
    }

    async fn get_object(&self, container: &str, name: &str) -> Result<RemoteObject, StoreError> {
        let data = self
            .get(container, name)
            .await
            .ok_or_else(|| StoreError::NotFound(format!("{container}/{name}")))?;

        Ok(RemoteObject {
            content_length: data.len() as u64,
            content: ObjectStream::from_bytes(data),
        })
    }
}
