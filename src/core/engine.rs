//! Upload and download orchestration for blobxfer
//!
//! Moves one file per call between the local filesystem and a
//! [`StorageClient`], feeding a [`ProgressSink`] as bytes move.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, ReadBuf};

use crate::core::error::{Error, Result, StoreError};
use crate::core::format::format_size;
use crate::core::progress::{ProgressSink, SinkGuard};
use crate::core::session::{Direction, TransferSession};
use crate::core::store::StorageClient;
use crate::core::stream::{ObjectStream, OverwriteBehavior, TransferOptions};

/// Check if destination file exists and handle overwrite behavior
async fn check_overwrite_permission(path: &Path, behavior: OverwriteBehavior) -> Result<()> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|e| Error::local_io(path, e))?;
    if !exists {
        return Ok(());
    }

    match behavior {
        OverwriteBehavior::Force => {
            debug!("Overwriting existing file: {}", path.display());
            Ok(())
        }
        OverwriteBehavior::NeverOverwrite => Err(Error::local_io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("File already exists: {} (refusing to overwrite)", path.display()),
            ),
        )),
    }
}

/// Object name for an upload: the local file's base name
pub fn remote_name_for(local_path: &Path) -> Result<String> {
    local_path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "cannot derive an object name from '{}'",
                local_path.display()
            ))
        })
}

/// Upload source that keeps its own read failure, so a bad local read can be
/// told apart from a failing store once `put_object` returns
struct LocalSource<R> {
    inner: R,
    failure: Arc<Mutex<Option<io::Error>>>,
}

impl<R: AsyncRead + Unpin> AsyncRead for LocalSource<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(Err(e)) => {
                let surfaced = io::Error::new(e.kind(), e.to_string());
                if let Ok(mut slot) = self.failure.lock() {
                    slot.get_or_insert(e);
                }
                Poll::Ready(Err(surfaced))
            }
            other => other,
        }
    }
}

/// Download copy loop: one read, one write, one progress event per buffer,
/// until the remote stream returns zero bytes
async fn copy_to_file<P>(
    content: &mut ObjectStream,
    file: &mut tokio::fs::File,
    session: &mut TransferSession,
    sink: &mut P,
    buffer_size: usize,
) -> Result<()>
where
    P: ProgressSink + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size];
    loop {
        let bytes_read = content
            .read(&mut buffer)
            .await
            .map_err(|e| Error::remote(session.remote_name(), StoreError::IoError(e)))?;

        if bytes_read == 0 {
            return Ok(());
        }

        file.write_all(&buffer[..bytes_read])
            .await
            .map_err(|e| Error::local_io(session.local_path(), e))?;
        session.advance_by(bytes_read as u64);
        sink.on_progress(&session.event());
    }
}

/// Runs transfers against one store and container.
///
/// Methods take `&mut self`, so at most one transfer is in flight per engine.
pub struct TransferEngine<S: StorageClient> {
    store: S,
    container: String,
    options: TransferOptions,
}

impl<S: StorageClient> TransferEngine<S> {
    pub fn new(store: S, container: impl Into<String>) -> Self {
        Self::with_options(store, container, TransferOptions::default())
    }

    pub fn with_options(store: S, container: impl Into<String>, options: TransferOptions) -> Self {
        Self {
            store,
            container: container.into(),
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upload `local_path` under its base name. Returns the bytes the store
    /// reported as sent.
    pub async fn upload<P>(&mut self, local_path: impl AsRef<Path>, sink: &mut P) -> Result<u64>
    where
        P: ProgressSink + ?Sized,
    {
        let local_path = local_path.as_ref();
        let name = remote_name_for(local_path)?;
        self.upload_as(local_path, &name, sink).await
    }

    /// Upload `local_path` as `remote_name`
    pub async fn upload_as<P>(
        &mut self,
        local_path: impl AsRef<Path>,
        remote_name: &str,
        sink: &mut P,
    ) -> Result<u64>
    where
        P: ProgressSink + ?Sized,
    {
        let local_path = local_path.as_ref();
        let mut sink = SinkGuard::new(sink);

        if remote_name.is_empty() {
            return Err(Error::InvalidInput("object name must not be empty".to_string()));
        }

        let metadata = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| Error::local_io(local_path, e))?;
        if !metadata.is_file() {
            return Err(Error::local_io(
                local_path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| Error::local_io(local_path, e))?;

        self.upload_reader(file, metadata.len(), local_path, remote_name, &mut *sink)
            .await
    }

    /// Hand `reader` to the store, mapping read failures back to `local_path`
    async fn upload_reader<R, P>(
        &mut self,
        reader: R,
        total_bytes: u64,
        local_path: &Path,
        remote_name: &str,
        sink: &mut P,
    ) -> Result<u64>
    where
        R: AsyncRead + Send + Unpin + 'static,
        P: ProgressSink + ?Sized,
    {
        let mut session =
            TransferSession::new(Direction::Upload, total_bytes, local_path, remote_name);
        info!(
            "Uploading {} ({}) to {}/{}",
            local_path.display(),
            format_size(session.total_bytes()),
            self.container,
            remote_name
        );

        let failure = Arc::new(Mutex::new(None));
        let source = ObjectStream::from_reader(LocalSource {
            inner: reader,
            failure: Arc::clone(&failure),
        });
        let result = {
            let mut on_bytes_sent = |sent: u64| {
                session.advance_to(sent);
                sink.on_progress(&session.event());
            };
            self.store
                .put_object(
                    &self.container,
                    remote_name,
                    source,
                    total_bytes,
                    &mut on_bytes_sent,
                )
                .await
        };
        if let Err(e) = result {
            let local = failure.lock().ok().and_then(|mut slot| slot.take());
            return Err(match local {
                Some(io_error) => Error::local_io(local_path, io_error),
                None => Error::remote(remote_name, e),
            });
        }

        info!(
            "{} {} to {}/{}",
            session.direction().past_tense(),
            format_size(session.transferred_bytes()),
            self.container,
            remote_name
        );
        Ok(session.transferred_bytes())
    }

    /// Download `remote_name` into `local_path`. Returns bytes written.
    ///
    /// Ends on the first zero-byte read; a stream shorter than its declared
    /// length finishes normally with progress below 100%. A failed transfer
    /// leaves the partial file in place.
    pub async fn download<P>(
        &mut self,
        remote_name: &str,
        local_path: impl AsRef<Path>,
        sink: &mut P,
    ) -> Result<u64>
    where
        P: ProgressSink + ?Sized,
    {
        let local_path = local_path.as_ref();
        let mut sink = SinkGuard::new(sink);

        if self.options.buffer_size == 0 {
            return Err(Error::InvalidInput("buffer size must be non-zero".to_string()));
        }

        let object = self
            .store
            .get_object(&self.container, remote_name)
            .await
            .map_err(|e| Error::remote(remote_name, e))?;
        let mut content = object.content;

        check_overwrite_permission(local_path, self.options.overwrite).await?;
        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| Error::local_io(local_path, e))?;

        let mut session = TransferSession::new(
            Direction::Download,
            object.content_length,
            local_path,
            remote_name,
        );
        info!(
            "Downloading {}/{} ({}) to {}",
            self.container,
            remote_name,
            format_size(session.total_bytes()),
            local_path.display()
        );

        let copied = copy_to_file(
            &mut content,
            &mut file,
            &mut session,
            &mut *sink,
            self.options.buffer_size,
        )
        .await;
        drop(content);

        // Flush on every path so a partial file is fully on disk when we return
        let flushed = file.flush().await;
        copied?;
        flushed.map_err(|e| Error::local_io(local_path, e))?;

        if !session.is_complete() {
            warn!(
                "Stream for {}/{} ended at {} of {} declared bytes",
                self.container,
                remote_name,
                session.transferred_bytes(),
                session.total_bytes()
            );
        }
        info!(
            "{} {} to {}",
            session.direction().past_tense(),
            format_size(session.transferred_bytes()),
            local_path.display()
        );
        Ok(session.transferred_bytes())
    }
}
