//! Error types for blobxfer
//!
//! Two layers: [`StoreError`] describes what the remote store rejected, and
//! [`Error`] is what a transfer call surfaces to its caller.

use std::fmt;
use std::path::PathBuf;

/// Failure reported by a [`StorageClient`](crate::StorageClient)
#[derive(Debug)]
pub enum StoreError {
    /// Object (or container) does not exist
    NotFound(String),

    /// Credentials missing, expired or insufficient
    Unauthorized(String),

    /// Store refused the write for capacity reasons
    QuotaExceeded(String),

    /// Connection-level failure (connect, timeout, reset)
    NetworkError(String),

    /// Any other non-success response
    HttpError { status: u16, message: String },

    /// Stream I/O failure while moving object bytes
    IoError(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(msg) => write!(f, "Not found: {msg}"),
            StoreError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            StoreError::QuotaExceeded(msg) => write!(f, "Quota exceeded: {msg}"),
            StoreError::NetworkError(msg) => write!(f, "Network error: {msg}"),
            StoreError::HttpError { status, message } => {
                write!(f, "HTTP error {status}: {message}")
            }
            StoreError::IoError(err) => write!(f, "Stream I/O error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::IoError(err)
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            StoreError::NetworkError(err.to_string())
        } else {
            StoreError::HttpError {
                status: err.status().map(|s| s.as_u16()).unwrap_or(0),
                message: err.to_string(),
            }
        }
    }
}

/// Main error type for transfer operations
#[derive(Debug)]
pub enum Error {
    /// Local source missing/unreadable, or destination unwritable
    LocalIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The store rejected a read or write; always carries the store's cause
    RemoteTransfer { object: String, source: StoreError },

    /// Invalid configuration or parameters
    InvalidInput(String),
}

impl Error {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::LocalIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn remote(object: impl Into<String>, source: StoreError) -> Self {
        Error::RemoteTransfer {
            object: object.into(),
            source,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LocalIo { path, source } => {
                write!(f, "Local I/O error on {}: {}", path.display(), source)
            }
            Error::RemoteTransfer { object, source } => {
                write!(f, "Transfer of '{object}' failed: {source}")
            }
            Error::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::LocalIo { source, .. } => Some(source),
            Error::RemoteTransfer { source, .. } => Some(source),
            Error::InvalidInput(_) => None,
        }
    }
}

/// Convenience result type for blobxfer operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_remote_error_keeps_cause() {
        let err = Error::remote(
            "report.pdf",
            StoreError::NotFound("report.pdf in transfers".to_string()),
        );

        assert_eq!(
            err.to_string(),
            "Transfer of 'report.pdf' failed: Not found: report.pdf in transfers"
        );
        let cause = err.source().expect("remote errors carry a cause");
        assert!(cause.to_string().starts_with("Not found"));
    }

    #[test]
    fn test_local_io_display_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Error::local_io("/tmp/missing.bin", io);

        assert!(err.to_string().contains("/tmp/missing.bin"));
        match err.source() {
            Some(source) => assert_eq!(source.to_string(), "no such file"),
            None => panic!("Expected io::Error source"),
        }
    }

    #[test]
    fn test_store_io_error_chains() {
        let store: StoreError =
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset").into();
        assert!(matches!(store, StoreError::IoError(_)));
        assert!(store.source().is_some());
        assert!(Error::InvalidInput("x".into()).source().is_none());
    }
}
