//! CLI-specific functionality for blobxfer
//!
//! This module contains CLI-only features like progress bars.

pub mod progress;

pub use progress::ProgressBarSink;
