//! Document store
//!
//! The `DocumentStore` owns the authoritative in-memory collection and keeps
//! it in agreement with:
//! - the local cache (always; the durable source of truth on this device)
//! - the remote mirror (when configured and someone is signed in)
//!
//! ## Loading
//!
//! `load()` prefers the remote copy when it is configured, reachable and the
//! user is signed in. Otherwise, or when the fetch fails, the normalized
//! local cache is used. Remote errors never escape `load()`; they only show
//! up in the reported `SyncStatus`.
//!
//! ## Writing
//!
//! Every mutation first commits to the cache and the in-memory collection,
//! then relays the change to the remote in the background. A failed relay is
//! logged and forgotten: there is no retry and no rollback, so the remote can
//! fall behind the local copy until the next successful write of that record.
//!
//! ## Usage
//!
//! ```ignore
//! let store = DocumentStore::open(&config);
//! store.load().await?;
//!
//! let doc = store.add(Document::new(DocumentKind::Forward))?;
//! store.delete_many(&[doc.id])?;
//! store.flush().await;
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::id::new_id;
use crate::models::{Document, RawDocument, RemoteConfig, UserIdentity};
use crate::normalize::normalize_against;
use crate::remote::{BackendFactory, ClientInit, ClientSlot, RemoteClient, RestBackend};
use crate::session::AuthTransition;
use crate::storage::LocalCache;

/// Where the collection currently comes from, for a connection indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Last load came from the remote mirror
    RemoteOk,
    /// Remote mirroring is on but the last fetch failed
    RemoteError,
    /// Remote mirroring is off or nobody is signed in
    LocalOnly,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::RemoteOk => "remote-ok",
            SyncStatus::RemoteError => "remote-error",
            SyncStatus::LocalOnly => "local-only",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a call to `load()` ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Collection replaced with the remote copy
    Remote,
    /// Collection replaced with the local cache
    Local,
    /// A newer load or a mutation happened meanwhile; result discarded
    Superseded,
}

/// Handle to the document store
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    cache: LocalCache,
    state: Mutex<StoreState>,
    /// Bumped by every load and mutation; stale loads compare against it
    generation: AtomicU64,
    status: watch::Sender<SyncStatus>,
    /// Feeds the worker that runs remote relays in issue order
    relay_queue: Mutex<Option<mpsc::UnboundedSender<Relay>>>,
    /// Whether an auth watcher should follow client replacement
    watching_auth: AtomicBool,
}

struct StoreState {
    documents: Vec<Document>,
    slot: ClientSlot,
}

type RelayJob = Pin<Box<dyn Future<Output = ()> + Send>>;

enum Relay {
    Job(RelayJob),
    /// Answered once every job queued before it has finished
    Flush(oneshot::Sender<()>),
}

async fn run_relays(mut queue: mpsc::UnboundedReceiver<Relay>) {
    while let Some(relay) = queue.recv().await {
        match relay {
            Relay::Job(job) => job.await,
            Relay::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

impl DocumentStore {
    /// Open the store described by the application configuration
    pub fn open(config: &Config) -> Self {
        Self::with_backend_factory(
            LocalCache::from_config(config),
            RestBackend::factory(config.request_timeout()),
        )
    }

    /// Open a store over `cache`, building remote backends with `factory`
    ///
    /// If the cache holds remote settings, the remote client is created
    /// right away. The collection stays empty until `load()` is called.
    pub fn with_backend_factory(cache: LocalCache, factory: BackendFactory) -> Self {
        let mut slot = ClientSlot::new(factory, cache.clone());

        if let Some(config) = cache.read_config() {
            if let Err(e) = slot.init(&config) {
                warn!("Ignoring stored remote settings: {}", e);
            }
        }

        let (status, _) = watch::channel(SyncStatus::LocalOnly);

        Self {
            inner: Arc::new(StoreInner {
                cache,
                state: Mutex::new(StoreState {
                    documents: Vec::new(),
                    slot,
                }),
                generation: AtomicU64::new(0),
                status,
                relay_queue: Mutex::new(None),
                watching_auth: AtomicBool::new(false),
            }),
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.inner.cache
    }

    // ==================== Queries ====================

    /// Snapshot of the whole collection, newest first
    pub fn get_all(&self) -> Vec<Document> {
        self.inner.state.lock().documents.clone()
    }

    /// Documents matching `predicate`, in collection order
    pub fn get_filtered<P>(&self, predicate: P) -> Vec<Document>
    where
        P: Fn(&Document) -> bool,
    {
        self.inner
            .state
            .lock()
            .documents
            .iter()
            .filter(|doc| predicate(doc))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.inner
            .state
            .lock()
            .documents
            .iter()
            .find(|doc| doc.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ==================== Status ====================

    pub fn status(&self) -> SyncStatus {
        *self.inner.status.borrow()
    }

    /// Subscribe to status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    fn set_status(&self, status: SyncStatus) {
        let previous = self.inner.status.send_replace(status);
        if previous != status {
            debug!("Sync status: {} -> {}", previous, status);
        }
    }

    /// Whether valid remote settings are active
    pub fn is_remote_enabled(&self) -> bool {
        self.inner.state.lock().slot.current().is_some()
    }

    pub fn remote_client(&self) -> Option<RemoteClient> {
        self.inner.state.lock().slot.current().cloned()
    }

    /// The signed-in remote user, if any
    pub async fn current_user(&self) -> Option<UserIdentity> {
        let client = self.remote_client()?;
        client.current_user().await
    }

    // ==================== Loading ====================

    /// Populate the collection from the best available source
    ///
    /// Only a failure to write the local cache is returned as an error.
    pub async fn load(&self) -> Result<LoadOutcome> {
        let token = self.next_generation();

        let Some(client) = self.remote_client() else {
            return Ok(self.load_local(token, SyncStatus::LocalOnly));
        };

        match client.fetch_all().await {
            Ok(documents) => {
                let mut state = self.inner.state.lock();
                if self.is_stale(token) {
                    debug!("Discarding superseded remote load");
                    return Ok(LoadOutcome::Superseded);
                }
                self.inner.cache.write_all(&documents)?;
                info!("Loaded {} document(s) from remote", documents.len());
                state.documents = documents;
                drop(state);

                self.set_status(SyncStatus::RemoteOk);
                Ok(LoadOutcome::Remote)
            }
            Err(StoreError::NotAuthenticated) => {
                debug!("Not signed in, loading local cache");
                Ok(self.load_local(token, SyncStatus::LocalOnly))
            }
            Err(e) => {
                warn!("Remote load failed, falling back to local cache: {}", e);
                Ok(self.load_local(token, SyncStatus::RemoteError))
            }
        }
    }

    fn load_local(&self, token: u64, status: SyncStatus) -> LoadOutcome {
        let mut state = self.inner.state.lock();
        if self.is_stale(token) {
            debug!("Discarding superseded local load");
            return LoadOutcome::Superseded;
        }
        state.documents = self.inner.cache.read_normalized();
        info!("Loaded {} document(s) from local cache", state.documents.len());
        drop(state);

        self.set_status(status);
        LoadOutcome::Local
    }

    fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_stale(&self, token: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) != token
    }

    // ==================== Mutations ====================

    /// Add a document at the top of the collection
    ///
    /// A missing id, or one already in use, is replaced with a fresh one.
    /// Returns the document as stored.
    pub fn add(&self, mut document: Document) -> Result<Document> {
        let mut state = self.inner.state.lock();

        if document.needs_id() || state.documents.iter().any(|d| d.id == document.id) {
            let taken: HashSet<&str> = state.documents.iter().map(|d| d.id.as_str()).collect();
            document.id = fresh_id(&taken);
        }

        let mut next = Vec::with_capacity(state.documents.len() + 1);
        next.push(document.clone());
        next.extend(state.documents.iter().cloned());
        self.commit(&mut state, next)?;

        let client = state.slot.current().cloned();
        drop(state);

        debug!("Added document {}", document.id);
        let relayed = document.clone();
        self.relay("insert", client, move |client| async move {
            client.insert(&[relayed]).await
        });
        Ok(document)
    }

    /// Replace the document with the same id, keeping its position
    pub fn update(&self, document: Document) -> Result<Document> {
        let mut state = self.inner.state.lock();

        let Some(index) = state.documents.iter().position(|d| d.id == document.id) else {
            return Err(StoreError::NotFound(document.id));
        };

        let mut next = state.documents.clone();
        next[index] = document.clone();
        self.commit(&mut state, next)?;

        let client = state.slot.current().cloned();
        drop(state);

        debug!("Updated document {}", document.id);
        let relayed = document.clone();
        self.relay("update", client, move |client| async move {
            client.update(&relayed).await
        });
        Ok(document)
    }

    /// Remove every document whose id is in `ids`
    ///
    /// Returns how many local documents were removed. The remote delete is
    /// attempted for the full id set either way.
    pub fn delete_many(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut state = self.inner.state.lock();

        let next: Vec<Document> = state
            .documents
            .iter()
            .filter(|d| !targets.contains(d.id.as_str()))
            .cloned()
            .collect();
        let removed = state.documents.len() - next.len();
        self.commit(&mut state, next)?;

        let client = state.slot.current().cloned();
        drop(state);

        debug!("Deleted {} document(s)", removed);
        let relayed = ids.to_vec();
        self.relay("delete", client, move |client| async move {
            client.delete(&relayed).await
        });
        Ok(removed)
    }

    /// Add a batch of imported records
    ///
    /// Records are normalized; any id that is missing, already in the
    /// collection, or repeated within the batch is replaced. The batch is
    /// reversed and placed ahead of the existing documents, then sent to the
    /// remote as a single insert.
    pub fn bulk_add(&self, records: Vec<RawDocument>) -> Result<Vec<Document>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let mut state = self.inner.state.lock();

        let normalized =
            normalize_against(records, state.documents.iter().map(|d| d.id.as_str()));
        let mut batch = normalized.documents;
        for doc in &mut batch {
            doc.user_id = None;
        }
        batch.reverse();

        let mut next = Vec::with_capacity(batch.len() + state.documents.len());
        next.extend(batch.iter().cloned());
        next.extend(state.documents.iter().cloned());
        self.commit(&mut state, next)?;

        let client = state.slot.current().cloned();
        drop(state);

        info!("Imported {} document(s)", batch.len());
        let relayed = batch.clone();
        self.relay("bulk insert", client, move |client| async move {
            client.insert(&relayed).await
        });
        Ok(batch)
    }

    /// Import pre-parsed rows of `header -> value` pairs
    pub fn import(&self, rows: &[BTreeMap<String, String>]) -> Result<Vec<Document>> {
        self.bulk_add(rows.iter().map(RawDocument::from_fields).collect())
    }

    /// Write `next` to the cache, then make it the in-memory collection
    fn commit(&self, state: &mut StoreState, next: Vec<Document>) -> Result<()> {
        self.inner.cache.write_all(&next)?;
        state.documents = next;
        self.next_generation();
        Ok(())
    }

    /// Send a committed change to the remote in the background
    ///
    /// Relays run one after another in the order they were issued.
    fn relay<F, Fut>(&self, op: &'static str, client: Option<RemoteClient>, send: F)
    where
        F: FnOnce(RemoteClient) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let Some(client) = client else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, skipping remote {}", op);
            return;
        };

        let job: RelayJob = Box::pin(async move {
            match send(client).await {
                Ok(()) => debug!("Remote {} succeeded", op),
                Err(StoreError::NotAuthenticated) => {
                    debug!("Not signed in, remote {} skipped", op)
                }
                Err(e) => warn!("Remote {} failed, local copy kept: {}", op, e),
            }
        });

        let mut queue = self.inner.relay_queue.lock();
        let relay = match queue.as_ref() {
            Some(sender) => match sender.send(Relay::Job(job)) {
                Ok(()) => return,
                // The worker is gone (its runtime shut down); start another
                Err(SendError(relay)) => relay,
            },
            None => Relay::Job(job),
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        runtime.spawn(run_relays(receiver));
        let _ = sender.send(relay);
        *queue = Some(sender);
    }

    /// Wait for every remote relay issued so far to finish
    ///
    /// Relays issued while waiting are not waited for, but still run after
    /// the ones before them.
    pub async fn flush(&self) {
        let (done, finished) = oneshot::channel();
        let queued = {
            let queue = self.inner.relay_queue.lock();
            queue
                .as_ref()
                .is_some_and(|sender| sender.send(Relay::Flush(done)).is_ok())
        };
        if queued && finished.await.is_err() {
            warn!("Remote relay worker stopped before flushing");
        }
    }

    // ==================== Remote settings ====================

    /// Enable remote mirroring with `config`, then reload
    ///
    /// Unchanged settings keep the existing client; changed settings replace
    /// it and move the auth listener over to the new one.
    pub async fn set_config(&self, config: RemoteConfig) -> Result<LoadOutcome> {
        if !config.is_valid() {
            return Err(StoreError::InvalidConfig(
                "both an endpoint URL and a key are required".to_string(),
            ));
        }

        let created = {
            let mut state = self.inner.state.lock();
            let init = state.slot.init(&config)?;
            self.inner.cache.write_config(&config)?;
            matches!(init, ClientInit::Created(_))
        };

        if created && self.inner.watching_auth.load(Ordering::SeqCst) {
            self.watch_auth();
        }

        self.load().await
    }

    /// Disable remote mirroring
    ///
    /// With `purge`, the cached collection is erased as well.
    pub fn clear_config(&self, purge: bool) -> Result<()> {
        let mut state = self.inner.state.lock();
        self.inner.cache.clear_config()?;
        state.slot.clear();

        if purge {
            self.inner.cache.purge_documents()?;
            state.documents.clear();
            info!("Remote mirroring disabled and local cache purged");
        } else {
            info!("Remote mirroring disabled");
        }
        self.next_generation();
        drop(state);

        self.set_status(SyncStatus::LocalOnly);
        Ok(())
    }

    /// Fetch from the remote without touching the collection
    ///
    /// Returns the number of remote documents visible to the signed-in user.
    pub async fn test_connection(&self) -> Result<usize> {
        let client = self.remote_client().ok_or_else(|| {
            StoreError::InvalidConfig("remote mirroring is not configured".to_string())
        })?;
        let documents = client.fetch_all().await?;
        info!("Remote connection ok, {} document(s) visible", documents.len());
        Ok(documents.len())
    }

    // ==================== Auth ====================

    /// React to a sign-in state change
    pub async fn handle_auth_transition(&self, transition: AuthTransition) -> Result<()> {
        match transition {
            AuthTransition::SignedIn(user) => {
                debug!("Signed in as {}, reloading", user.id);
                self.load().await?;
            }
            AuthTransition::SignedOut => {
                let mut state = self.inner.state.lock();
                state.documents.clear();
                self.next_generation();
                drop(state);
                self.set_status(SyncStatus::LocalOnly);
            }
        }
        Ok(())
    }

    /// Follow auth transitions of the live remote client in the background
    ///
    /// Replacing the client through `set_config` moves the listener to the
    /// new client. Returns `None` when remote mirroring is disabled.
    pub fn watch_auth(&self) -> Option<JoinHandle<()>> {
        self.inner.watching_auth.store(true, Ordering::SeqCst);
        let client = self.remote_client()?;
        let mut subscription = client.session().subscribe();
        let store: Weak<StoreInner> = Arc::downgrade(&self.inner);

        Some(tokio::spawn(async move {
            while let Some(transition) = subscription.recv().await {
                let Some(inner) = store.upgrade() else {
                    break;
                };
                let store = DocumentStore { inner };
                if let Err(e) = store.handle_auth_transition(transition).await {
                    warn!("Failed to apply auth transition: {}", e);
                }
            }
            debug!("Auth listener closed");
        }))
    }

    /// Sign in to the remote mirror
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity> {
        let client = self.require_client()?;
        let user = client.session().sign_in(email, password).await?;
        if !client.session().has_listener() {
            self.handle_auth_transition(AuthTransition::SignedIn(user.clone()))
                .await?;
        }
        Ok(user)
    }

    /// Sign out of the remote mirror, keeping the local cache
    pub async fn sign_out(&self) -> Result<()> {
        let client = self.require_client()?;
        client.session().sign_out().await?;
        if !client.session().has_listener() {
            self.handle_auth_transition(AuthTransition::SignedOut).await?;
        }
        Ok(())
    }

    /// Sign out and erase the cached collection
    pub async fn sign_out_and_clear(&self) -> Result<()> {
        self.sign_out().await?;
        let mut state = self.inner.state.lock();
        self.inner.cache.purge_documents()?;
        state.documents.clear();
        self.next_generation();
        info!("Local cache purged after sign-out");
        Ok(())
    }

    fn require_client(&self) -> Result<RemoteClient> {
        self.remote_client().ok_or_else(|| {
            StoreError::InvalidConfig("remote mirroring is not configured".to_string())
        })
    }
}

fn fresh_id(taken: &HashSet<&str>) -> String {
    loop {
        let id = new_id();
        if !taken.contains(id.as_str()) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentKind;
    use crate::remote::fake::FakeBackend;
    use crate::remote::RemoteBackend;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn local_store(temp_dir: &TempDir) -> DocumentStore {
        let factory: BackendFactory =
            Arc::new(|_: &RemoteConfig| -> Result<Arc<dyn RemoteBackend>> {
                let backend: Arc<dyn RemoteBackend> = Arc::new(FakeBackend::new());
                Ok(backend)
            });
        DocumentStore::with_backend_factory(LocalCache::new(temp_dir.path()), factory)
    }

    fn doc(kind: DocumentKind, details: &str) -> Document {
        let mut doc = Document::new(kind);
        doc.details = details.to_string();
        doc
    }

    fn raw(value: serde_json::Value) -> RawDocument {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_load_empty_cache() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);

        assert_eq!(store.load().await.unwrap(), LoadOutcome::Local);
        assert!(store.is_empty());
        assert_eq!(store.status(), SyncStatus::LocalOnly);
        assert!(!store.is_remote_enabled());
    }

    #[test]
    fn test_add_assigns_id_and_prepends() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);

        let first = store.add(doc(DocumentKind::Forward, "first")).unwrap();
        let second = store.add(doc(DocumentKind::Received, "second")).unwrap();

        assert!(!first.id.is_empty());
        assert_ne!(first.id, second.id);
        let all = store.get_all();
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[test]
    fn test_add_replaces_colliding_id() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);

        let mut a = doc(DocumentKind::Forward, "a");
        a.id = "same".to_string();
        let mut b = doc(DocumentKind::Forward, "b");
        b.id = "same".to_string();

        store.add(a).unwrap();
        let b = store.add(b).unwrap();
        assert_ne!(b.id, "same");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_mutations_are_written_to_cache() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);

        store.add(doc(DocumentKind::Forward, "kept")).unwrap();
        let gone = store.add(doc(DocumentKind::Forward, "gone")).unwrap();
        store.delete_many(&[gone.id]).unwrap();

        let cached = store.cache().read_normalized();
        assert_eq!(cached, store.get_all());
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].details, "kept");
    }

    #[test]
    fn test_update_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);

        let a = store.add(doc(DocumentKind::Forward, "a")).unwrap();
        store.add(doc(DocumentKind::Forward, "b")).unwrap();

        let mut changed = a.clone();
        changed.details = "a2".to_string();
        changed.kind = DocumentKind::Received;
        store.update(changed).unwrap();

        let all = store.get_all();
        assert_eq!(all[1].id, a.id);
        assert_eq!(all[1].details, "a2");
        assert_eq!(all[1].kind, DocumentKind::Received);
    }

    #[test]
    fn test_update_unknown_id() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);

        let mut ghost = doc(DocumentKind::Forward, "ghost");
        ghost.id = "missing".to_string();
        assert!(matches!(store.update(ghost), Err(StoreError::NotFound(id)) if id == "missing"));
    }

    #[test]
    fn test_delete_many_counts_removed() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);

        let a = store.add(doc(DocumentKind::Forward, "a")).unwrap();
        let b = store.add(doc(DocumentKind::Forward, "b")).unwrap();
        store.add(doc(DocumentKind::Forward, "c")).unwrap();

        let removed = store
            .delete_many(&[a.id.clone(), b.id.clone(), "unknown".to_string()])
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&a.id).is_none());
    }

    #[test]
    fn test_bulk_add_generates_distinct_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);

        let added = store
            .bulk_add(vec![raw(json!({"dtsNo": "A1"})), raw(json!({"dtsNo": "A1"}))])
            .unwrap();

        assert_eq!(added.len(), 2);
        assert_ne!(added[0].id, added[1].id);
        assert!(added.iter().all(|d| !d.id.is_empty()));
    }

    #[test]
    fn test_bulk_add_avoids_existing_and_batch_collisions() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);
        let existing = store.add(doc(DocumentKind::Forward, "existing")).unwrap();

        store
            .bulk_add(vec![
                raw(json!({"id": existing.id.clone(), "details": "clash"})),
                raw(json!({"id": "dup", "details": "one"})),
                raw(json!({"id": "dup", "details": "two"})),
            ])
            .unwrap();

        let all = store.get_all();
        let ids: HashSet<&str> = all.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(all.len(), 4);
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_bulk_add_order_and_position() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);
        store.add(doc(DocumentKind::Forward, "old")).unwrap();

        store
            .bulk_add(vec![
                raw(json!({"details": "first"})),
                raw(json!({"details": "second"})),
            ])
            .unwrap();

        let details: Vec<String> = store.get_all().into_iter().map(|d| d.details).collect();
        assert_eq!(details, vec!["second", "first", "old"]);
    }

    #[test]
    fn test_import_rows() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);

        let mut row = BTreeMap::new();
        row.insert("Kind".to_string(), "received".to_string());
        row.insert("From Office".to_string(), "Treasury".to_string());
        row.insert("Date Received".to_string(), "2024-04-04".to_string());

        let added = store.import(&[row]).unwrap();
        assert_eq!(added[0].kind, DocumentKind::Received);
        assert_eq!(added[0].from_office, "Treasury");
        assert_eq!(added[0].to_office, "");
        assert_eq!(added[0].date, "2024-04-04");

        let mut row = BTreeMap::new();
        row.insert("date_forwarded".to_string(), "2024-01-01".to_string());

        let added = store.import(&[row]).unwrap();
        assert_eq!(added[0].kind, DocumentKind::Forward);
        assert_eq!(added[0].date, "2024-01-01");
    }

    #[test]
    fn test_get_filtered() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);
        store.add(doc(DocumentKind::Forward, "memo")).unwrap();
        store.add(doc(DocumentKind::Received, "letter")).unwrap();
        store.add(doc(DocumentKind::Received, "memo")).unwrap();

        let received = store.get_filtered(|d| d.kind == DocumentKind::Received);
        assert_eq!(received.len(), 2);

        let memos = store.get_filtered(|d| d.matches("MEMO"));
        assert_eq!(memos.len(), 2);
    }

    #[tokio::test]
    async fn test_set_config_rejects_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);

        let result = store
            .set_config(RemoteConfig::new("https://db.example", ""))
            .await;
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));
        assert!(!store.is_remote_enabled());
        assert!(store.cache().read_config().is_none());
    }

    #[tokio::test]
    async fn test_test_connection_without_remote() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);

        assert!(matches!(
            store.test_connection().await,
            Err(StoreError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_signed_out_transition_clears_memory_not_cache() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);
        store.add(doc(DocumentKind::Forward, "keep me")).unwrap();

        store
            .handle_auth_transition(AuthTransition::SignedOut)
            .await
            .unwrap();

        assert!(store.is_empty());
        assert_eq!(store.status(), SyncStatus::LocalOnly);
        assert_eq!(store.cache().read_normalized().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_config_with_purge() {
        let temp_dir = TempDir::new().unwrap();
        let store = local_store(&temp_dir);
        store
            .set_config(RemoteConfig::new("https://db.example", "key"))
            .await
            .unwrap();
        store.add(doc(DocumentKind::Forward, "x")).unwrap();
        store.flush().await;

        store.clear_config(true).unwrap();

        assert!(!store.is_remote_enabled());
        assert!(store.is_empty());
        assert!(store.cache().read_all().is_empty());
        assert!(store.cache().read_config().is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SyncStatus::RemoteOk.to_string(), "remote-ok");
        assert_eq!(SyncStatus::RemoteError.to_string(), "remote-error");
        assert_eq!(SyncStatus::LocalOnly.to_string(), "local-only");
    }

    #[test]
    fn test_mutations_without_runtime_stay_local() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LocalCache::new(temp_dir.path());
        cache
            .write_config(&RemoteConfig::new("https://db.example", "key"))
            .unwrap();
        let backend = Arc::new(FakeBackend::new());
        let shared = backend.clone();
        let factory: BackendFactory =
            Arc::new(move |_: &RemoteConfig| -> Result<Arc<dyn RemoteBackend>> {
                let backend: Arc<dyn RemoteBackend> = shared.clone();
                Ok(backend)
            });

        let store = DocumentStore::with_backend_factory(cache, factory);
        assert!(store.is_remote_enabled());

        store.add(doc(DocumentKind::Forward, "offline")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(backend.insert_calls.load(Ordering::SeqCst), 0);
    }
}
