//! Remote mirror
//!
//! An optional, per-user copy of the collection kept in a remote tabular
//! service. All access goes through `RemoteClient`, which refuses to act
//! without a signed-in user.
//!
//! ## Usage
//!
//! ```ignore
//! let client = RemoteClient::connect(config, cache, Duration::from_secs(15))?;
//! client.session().sign_in("clerk@example.com", "secret").await?;
//! let documents = client.fetch_all().await?;
//! ```

mod backend;
mod client;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
mod row;

pub use backend::{BackendFactory, RemoteBackend, RestBackend, DOCUMENTS_TABLE};
pub use client::{ClientInit, ClientSlot, RemoteClient};
pub use row::DocumentRow;
