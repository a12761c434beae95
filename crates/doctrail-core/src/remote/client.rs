//! Remote mirror client
//!
//! Wraps a backend behind document-level operations. Every operation first
//! asks the session tracker who is signed in and fails with
//! `NotAuthenticated` when nobody is. Writes stamp the caller as owner.
//! Errors from the backend are returned unchanged.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::backend::{BackendFactory, RemoteBackend, RestBackend};
use super::row::DocumentRow;
use crate::error::{Result, StoreError};
use crate::models::{AuthSession, Document, RemoteConfig, UserIdentity};
use crate::session::SessionTracker;
use crate::storage::LocalCache;

/// Client for one remote configuration
///
/// Cheap to clone; clones share the backend and session tracker.
#[derive(Clone)]
pub struct RemoteClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: RemoteConfig,
    backend: Arc<dyn RemoteBackend>,
    session: SessionTracker,
}

impl RemoteClient {
    pub fn new(config: RemoteConfig, backend: Arc<dyn RemoteBackend>, cache: LocalCache) -> Self {
        let session = SessionTracker::new(backend.clone(), cache);
        Self {
            inner: Arc::new(ClientInner {
                config,
                backend,
                session,
            }),
        }
    }

    /// Build a client speaking to the REST service described by `config`
    pub fn connect(config: RemoteConfig, cache: LocalCache, timeout: Duration) -> Result<Self> {
        let backend = Arc::new(RestBackend::new(&config, timeout)?);
        Ok(Self::new(config, backend, cache))
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.inner.config
    }

    pub fn signature(&self) -> String {
        self.inner.config.signature()
    }

    pub fn backend_tag(&self) -> &'static str {
        self.inner.backend.backend_tag()
    }

    pub fn session(&self) -> &SessionTracker {
        &self.inner.session
    }

    /// Whether both handles point at the same client instance
    pub fn same_instance(&self, other: &RemoteClient) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub async fn current_user(&self) -> Option<UserIdentity> {
        self.inner.session.current_user().await
    }

    async fn authenticated(&self) -> Result<(AuthSession, UserIdentity)> {
        self.inner.session.resolve().await
    }

    /// Every document owned by the signed-in user, newest first
    pub async fn fetch_all(&self) -> Result<Vec<Document>> {
        let (session, user) = self.authenticated().await?;
        let rows = self.inner.backend.select_rows(&session, &user.id).await?;
        debug!("Fetched {} remote row(s)", rows.len());
        Ok(rows.into_iter().map(DocumentRow::into_document).collect())
    }

    pub async fn insert(&self, documents: &[Document]) -> Result<()> {
        let (session, user) = self.authenticated().await?;
        let rows: Vec<DocumentRow> = documents
            .iter()
            .map(|doc| DocumentRow::from_document(doc, &user.id))
            .collect();
        self.inner.backend.insert_rows(&session, &rows).await
    }

    pub async fn update(&self, document: &Document) -> Result<()> {
        let (session, user) = self.authenticated().await?;
        let row = DocumentRow::from_document(document, &user.id);
        self.inner.backend.update_row(&session, &row).await
    }

    pub async fn delete(&self, ids: &[String]) -> Result<()> {
        let (session, user) = self.authenticated().await?;
        self.inner.backend.delete_rows(&session, &user.id, ids).await
    }
}

/// Result of initializing the client slot
pub enum ClientInit {
    /// The configuration was unchanged; the existing instance is returned
    Reused(RemoteClient),
    /// A new instance was built, replacing any previous one
    Created(RemoteClient),
}

impl ClientInit {
    pub fn client(&self) -> &RemoteClient {
        match self {
            ClientInit::Reused(client) | ClientInit::Created(client) => client,
        }
    }

    pub fn into_client(self) -> RemoteClient {
        match self {
            ClientInit::Reused(client) | ClientInit::Created(client) => client,
        }
    }
}

/// Holds at most one live client, keyed by configuration signature
pub struct ClientSlot {
    factory: BackendFactory,
    cache: LocalCache,
    current: Option<RemoteClient>,
}

impl ClientSlot {
    pub fn new(factory: BackendFactory, cache: LocalCache) -> Self {
        Self {
            factory,
            cache,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&RemoteClient> {
        self.current.as_ref()
    }

    /// Return a client for `config`, reusing the live one when its signature matches
    pub fn init(&mut self, config: &RemoteConfig) -> Result<ClientInit> {
        if !config.is_valid() {
            return Err(StoreError::InvalidConfig(
                "endpoint and key are both required".to_string(),
            ));
        }

        if let Some(client) = &self.current {
            if client.signature() == config.signature() {
                return Ok(ClientInit::Reused(client.clone()));
            }
        }

        let backend = (self.factory)(config)?;
        let client = RemoteClient::new(config.clone(), backend, self.cache.clone());
        if let Some(previous) = self.current.replace(client.clone()) {
            previous.session().unsubscribe();
            info!("Remote client reconfigured");
        } else {
            info!("Remote client created ({})", client.backend_tag());
        }
        Ok(ClientInit::Created(client))
    }

    /// Drop the live client
    pub fn clear(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.session().unsubscribe();
        }
    }
}
