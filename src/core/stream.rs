//! Object body streams and transfer options.

use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::TryStreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// Default read buffer for downloads (80 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 81920;

/// A unified readable body for object payloads moving in either direction
pub enum ObjectStream {
    /// Any boxed reader: local files, HTTP bodies, test doubles
    Reader(Box<dyn AsyncRead + Send + Unpin>),
    /// Payload already held in memory
    Memory(Cursor<Bytes>),
}

impl ObjectStream {
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        ObjectStream::Reader(Box::new(reader))
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        ObjectStream::Memory(Cursor::new(bytes.into()))
    }
}

impl AsyncRead for ObjectStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match &mut *self {
            ObjectStream::Reader(stream) => Pin::new(stream).poll_read(cx, buf),
            ObjectStream::Memory(cursor) => Pin::new(cursor).poll_read(cx, buf),
        }
    }
}

/// Behavior when the download destination already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteBehavior {
    /// Truncate and overwrite (default)
    #[default]
    Force,
    /// Never overwrite, fail if file exists
    NeverOverwrite,
}

/// Tunables for a [`TransferEngine`](crate::TransferEngine)
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Read buffer size for the download copy loop
    pub buffer_size: usize,

    /// Behavior when the download destination already exists
    pub overwrite: OverwriteBehavior,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            overwrite: OverwriteBehavior::default(),
        }
    }
}

/// Creates an ObjectStream from an HTTP response body
pub fn create_http_stream(response: reqwest::Response) -> ObjectStream {
    let reader = tokio_util::io::StreamReader::new(
        response.bytes_stream().map_err(std::io::Error::other),
    );
    ObjectStream::from_reader(reader)
}

/// Read until `chunk` is full or the source ends; returns bytes read
pub(crate) async fn read_chunk(
    source: &mut ObjectStream,
    chunk: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < chunk.len() {
        let n = source.read(&mut chunk[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_stream_reads_all() {
        let mut stream = ObjectStream::from_bytes(vec![7u8; 1000]);
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, vec![7u8; 1000]);
    }

    #[tokio::test]
    async fn test_reader_stream_wraps_any_reader() {
        let mut stream = ObjectStream::from_reader(&b"hello"[..]);
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_read_chunk_fills_across_short_reads() {
        let (mut tx, rx) = tokio::io::duplex(3);
        let writer = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            tx.write_all(b"abcdefgh").await.unwrap();
        });

        let mut stream = ObjectStream::from_reader(rx);
        let mut chunk = [0u8; 5];
        assert_eq!(read_chunk(&mut stream, &mut chunk).await.unwrap(), 5);
        assert_eq!(&chunk, b"abcde");
        writer.await.unwrap();
        assert_eq!(read_chunk(&mut stream, &mut chunk).await.unwrap(), 3);
        assert_eq!(&chunk[..3], b"fgh");
        assert_eq!(read_chunk(&mut stream, &mut chunk).await.unwrap(), 0);
    }

    #[test]
    fn test_default_options() {
        let options = TransferOptions::default();
        assert_eq!(options.buffer_size, 81920);
        assert_eq!(options.overwrite, OverwriteBehavior::Force);
    }
}
