//! Storage layer
//!
//! Durable on-device persistence for the document collection.
//!
//! ## Layout
//!
//! All blobs live in the configured data directory as JSON files:
//!
//! - `documents.json`: the full document collection
//! - `remote.json`: remote mirror connection settings (absent when disabled)
//! - `session.json`: the signed-in remote session (absent when signed out)
//!
//! Every write replaces the whole blob atomically.

pub mod cache;
pub mod error;

pub use cache::LocalCache;
pub use error::{StorageError, StorageResult};
