//! Doctrail Core Library
//!
//! This crate provides the core functionality for Doctrail, a local-first
//! tracker for forwarded and received office documents with an optional
//! per-user remote mirror.
//!
//! # Architecture
//!
//! - **Local cache**: JSON blobs on disk, always written, never lost on a
//!   remote failure
//! - **Remote mirror**: a PostgREST table reached through `RemoteClient`,
//!   used only while a user is signed in
//!
//! All queries are served from the in-memory collection held by the store.
//!
//! # Quick Start
//!
//! ```text
//! let store = DocumentStore::open(&Config::load()?);
//! store.load().await?;
//!
//! let mut doc = Document::new(DocumentKind::Received);
//! doc.dts_no = "DTS-0042".to_string();
//! store.add(doc)?;
//!
//! let received = store.get_filtered(|d| d.kind == DocumentKind::Received);
//! store.flush().await;
//! ```
//!
//! # Modules
//!
//! - `store`: Document store (main entry point)
//! - `models`: Documents, remote settings and identities
//! - `normalize`: Repair of cached and imported records
//! - `remote`: Remote mirror client and backends
//! - `session`: Sign-in state and auth transitions
//! - `storage`: Local cache
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod id;
pub mod models;
pub mod normalize;
pub mod remote;
pub mod session;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::{Result, StoreError};
pub use id::new_id;
pub use models::{AuthSession, Document, DocumentKind, RawDocument, RemoteConfig, UserIdentity};
pub use normalize::{normalize, Normalized};
pub use remote::{RemoteBackend, RemoteClient, RestBackend};
pub use session::{AuthSubscription, AuthTransition, SessionTracker};
pub use storage::{LocalCache, StorageError};
pub use store::{DocumentStore, LoadOutcome, SyncStatus};
