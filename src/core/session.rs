//! Per-call transfer state.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::progress::ProgressEvent;

/// Which way the bytes move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl Direction {
    pub fn past_tense(&self) -> &'static str {
        match self {
            Direction::Upload => "Uploaded",
            Direction::Download => "Downloaded",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => write!(f, "upload"),
            Direction::Download => write!(f, "download"),
        }
    }
}

/// State of a single upload or download.
///
/// Created at the start of one engine call, mutated only by that call's
/// copy loop and dropped when it returns. `transferred_bytes` never
/// decreases.
#[derive(Debug, Clone)]
pub struct TransferSession {
    direction: Direction,
    total_bytes: u64,
    transferred_bytes: u64,
    local_path: PathBuf,
    remote_name: String,
}

impl TransferSession {
    pub fn new(
        direction: Direction,
        total_bytes: u64,
        local_path: impl AsRef<Path>,
        remote_name: impl Into<String>,
    ) -> Self {
        Self {
            direction,
            total_bytes,
            transferred_bytes: 0,
            local_path: local_path.as_ref().to_path_buf(),
            remote_name: remote_name.into(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// Record a cumulative count reported by the store. Stale or repeated
    /// counts leave the session unchanged.
    pub fn advance_to(&mut self, cumulative: u64) {
        self.transferred_bytes = self.transferred_bytes.max(cumulative);
    }

    /// Record `bytes` more moved by the copy loop
    pub fn advance_by(&mut self, bytes: u64) {
        self.transferred_bytes = self.transferred_bytes.saturating_add(bytes);
    }

    pub fn is_complete(&self) -> bool {
        self.transferred_bytes >= self.total_bytes
    }

    pub fn event(&self) -> ProgressEvent {
        ProgressEvent::new(self.transferred_bytes, self.total_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_to_never_goes_backwards() {
        let mut session = TransferSession::new(Direction::Upload, 100, "a.bin", "a.bin");
        session.advance_to(40);
        session.advance_to(30);
        assert_eq!(session.transferred_bytes(), 40);
        session.advance_to(100);
        assert!(session.is_complete());
        assert_eq!(session.event().percentage, 100.0);
    }

    #[test]
    fn test_advance_by_accumulates() {
        let mut session = TransferSession::new(Direction::Download, 81921, "out.bin", "in.bin");
        assert_eq!(session.direction(), Direction::Download);
        session.advance_by(81920);
        assert!(!session.is_complete());
        session.advance_by(1);
        assert_eq!(session.transferred_bytes(), 81921);
        assert_eq!(session.event().total_bytes, 81921);
    }

    #[test]
    fn test_direction_labels() {
        assert_eq!(Direction::Upload.to_string(), "upload");
        assert_eq!(Direction::Download.past_tense(), "Downloaded");
    }
}
