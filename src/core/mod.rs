//! Core library modules for blobxfer
//!
//! This module contains the internal implementation details of the blobxfer library.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod http;
pub mod memory;
pub mod progress;
pub mod session;
pub mod store;
pub mod stream;

// Re-export main types for internal use
pub use engine::{TransferEngine, remote_name_for};
pub use http::HttpBlobStore;
