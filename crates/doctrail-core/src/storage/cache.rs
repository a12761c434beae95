//! Local document cache
//!
//! Keeps the full collection, the remote settings and the remote session as
//! separate JSON blobs in the data directory. Uses atomic writes (write to
//! temp file, then rename) so a blob is never left partially written.
//!
//! Reads are forgiving: a missing or unreadable blob is reported as empty,
//! never as an error. Writes report failures, since a mutation is only
//! complete once its blob has been written.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use crate::config::Config;
use crate::models::{AuthSession, Document, RawDocument, RemoteConfig};
use crate::normalize::normalize;

const DOCUMENTS_FILE: &str = "documents.json";
const REMOTE_CONFIG_FILE: &str = "remote.json";
const SESSION_FILE: &str = "session.json";

/// Durable key/value cache rooted at a data directory
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    /// Create a cache rooted at `dir`
    ///
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create a cache in the configured data directory
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.data_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn documents_path(&self) -> PathBuf {
        self.dir.join(DOCUMENTS_FILE)
    }

    pub fn remote_config_path(&self) -> PathBuf {
        self.dir.join(REMOTE_CONFIG_FILE)
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    // ==================== Documents ====================

    /// Read every stored record as-is
    ///
    /// Returns an empty list if nothing is stored or the blob is unreadable.
    /// Individual entries that are not objects of the expected shape are
    /// skipped, so one bad record does not hide the rest.
    pub fn read_all(&self) -> Vec<RawDocument> {
        let path = self.documents_path();
        let Some(value) = self.read_blob::<Value>(&path) else {
            return Vec::new();
        };

        let Value::Array(entries) = value else {
            log_malformed(&path, "expected a list of documents");
            return Vec::new();
        };

        let total = entries.len();
        let records: Vec<RawDocument> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();

        if records.len() < total {
            warn!(
                "Skipped {} unreadable record(s) in {:?}",
                total - records.len(),
                path
            );
        }

        records
    }

    /// Replace the stored collection
    pub fn write_all(&self, documents: &[Document]) -> StorageResult<()> {
        let path = self.documents_path();
        self.write_blob(&path, &documents)?;
        debug!("Cached {} document(s)", documents.len());
        Ok(())
    }

    /// Read the collection and heal it into the current schema
    ///
    /// When normalization altered anything, the healed collection is written
    /// back straight away. A failed write-back is logged; the healed records
    /// are still returned.
    pub fn read_normalized(&self) -> Vec<Document> {
        let normalized = normalize(self.read_all());

        if normalized.changed {
            debug!("Cache needed normalization, writing back");
            if let Err(e) = self.write_all(&normalized.documents) {
                warn!("Failed to persist normalized cache: {}", e);
            }
        }

        normalized.documents
    }

    /// Remove the stored collection
    pub fn purge_documents(&self) -> StorageResult<()> {
        remove_if_exists(&self.documents_path())
    }

    // ==================== Remote settings ====================

    pub fn read_config(&self) -> Option<RemoteConfig> {
        self.read_blob(&self.remote_config_path())
    }

    pub fn write_config(&self, config: &RemoteConfig) -> StorageResult<()> {
        self.write_blob(&self.remote_config_path(), config)
    }

    pub fn clear_config(&self) -> StorageResult<()> {
        remove_if_exists(&self.remote_config_path())
    }

    // ==================== Session ====================

    pub fn read_session(&self) -> Option<AuthSession> {
        self.read_blob(&self.session_path())
    }

    pub fn write_session(&self, session: &AuthSession) -> StorageResult<()> {
        self.write_blob(&self.session_path(), session)
    }

    pub fn clear_session(&self) -> StorageResult<()> {
        remove_if_exists(&self.session_path())
    }

    // ==================== Blobs ====================

    fn read_blob<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("{}", StorageError::Read {
                    path: path.to_path_buf(),
                    source: e,
                });
                return None;
            }
        };

        if content.trim().is_empty() {
            return None;
        }

        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                log_malformed(path, &e.to_string());
                None
            }
        }
    }

    fn write_blob<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|source| StorageError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        atomic_write(path, &bytes)
    }
}

fn log_malformed(path: &Path, details: &str) {
    let err = StorageError::Malformed {
        path: path.to_path_buf(),
        details: details.to_string(),
    };
    warn!("{}; treating as empty", err);
}

fn remove_if_exists(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::write(path)(e)),
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path).map_err(StorageError::write(&temp_path))?;
    file.write_all(data).map_err(StorageError::write(&temp_path))?;
    file.sync_all().map_err(StorageError::write(&temp_path))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::Rename {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentKind, UserIdentity};
    use tempfile::TempDir;

    fn doc(id: &str, kind: DocumentKind) -> Document {
        let mut doc = Document::new(kind);
        doc.id = id.to_string();
        doc
    }

    #[test]
    fn test_read_all_empty_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LocalCache::new(temp_dir.path());

        assert!(cache.read_all().is_empty());
        assert!(cache.read_config().is_none());
        assert!(cache.read_session().is_none());
    }

    #[test]
    fn test_read_all_empty_when_unparsable() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LocalCache::new(temp_dir.path());
        fs::write(cache.documents_path(), "{not json").unwrap();

        assert!(cache.read_all().is_empty());
    }

    #[test]
    fn test_read_all_skips_bad_entries() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LocalCache::new(temp_dir.path());
        fs::write(cache.documents_path(), r#"[{"id":"1"}, 42, {"id":"2"}]"#).unwrap();

        let records = cache.read_all();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id.as_deref(), Some("2"));
    }

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LocalCache::new(temp_dir.path());

        let docs = vec![doc("a", DocumentKind::Forward), doc("b", DocumentKind::Received)];
        cache.write_all(&docs).unwrap();

        assert_eq!(cache.read_normalized(), docs);
    }

    #[test]
    fn test_round_trip_leaves_blob_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LocalCache::new(temp_dir.path());

        cache
            .write_all(&[doc("a", DocumentKind::Forward), doc("b", DocumentKind::Received)])
            .unwrap();
        let before = fs::read(cache.documents_path()).unwrap();

        let documents = normalize(cache.read_all()).documents;
        cache.write_all(&documents).unwrap();

        let after = fs::read(cache.documents_path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_read_normalized_heals_cache() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LocalCache::new(temp_dir.path());
        fs::write(
            cache.documents_path(),
            r#"[{"id":"1","kind":"forward","dtsNo":""},{"dateForwarded":"2024-01-01"}]"#,
        )
        .unwrap();

        let docs = cache.read_normalized();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].kind, DocumentKind::Forward);
        assert_eq!(docs[1].date, "2024-01-01");

        // healed data was written back; reading again reports nothing to fix
        let raw = cache.read_all();
        assert!(raw.iter().all(|r| r.id.is_some() && r.kind.is_some()));
        assert!(!normalize(raw).changed);
    }

    #[test]
    fn test_read_normalized_writes_back_trimmed_id_and_canonical_kind() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LocalCache::new(temp_dir.path());
        fs::write(
            cache.documents_path(),
            r#"[{"id":" 1 ","kind":"FORWARDED","dtsNo":"","fromOffice":"","details":"",
                "receivedBy":"","toOffice":"","date":""}]"#,
        )
        .unwrap();

        let docs = cache.read_normalized();
        assert_eq!(docs[0].id, "1");
        assert_eq!(docs[0].kind, DocumentKind::Forward);

        let on_disk = cache.read_all();
        assert_eq!(on_disk[0].id.as_deref(), Some("1"));
        assert_eq!(on_disk[0].kind.as_deref(), Some("forward"));
    }

    #[test]
    fn test_config_round_trip_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LocalCache::new(temp_dir.path());
        let config = RemoteConfig::new("https://db.example.com", "anon-key");

        cache.write_config(&config).unwrap();
        assert_eq!(cache.read_config(), Some(config));

        cache.clear_config().unwrap();
        assert!(cache.read_config().is_none());
        // clearing twice is fine
        cache.clear_config().unwrap();
    }

    #[test]
    fn test_session_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LocalCache::new(temp_dir.path());
        let session = AuthSession {
            access_token: "token".to_string(),
            refresh_token: None,
            user: UserIdentity {
                id: "user-1".to_string(),
                email: Some("clerk@example.com".to_string()),
            },
        };

        cache.write_session(&session).unwrap();
        assert_eq!(cache.read_session(), Some(session));

        cache.clear_session().unwrap();
        assert!(cache.read_session().is_none());
    }

    #[test]
    fn test_purge_documents() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LocalCache::new(temp_dir.path());
        cache.write_all(&[doc("a", DocumentKind::Forward)]).unwrap();

        cache.purge_documents().unwrap();
        assert!(!cache.documents_path().exists());
        assert!(cache.read_all().is_empty());
    }

    #[test]
    fn test_write_fails_when_data_dir_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("data");
        fs::write(&blocker, "not a directory").unwrap();
        let cache = LocalCache::new(&blocker);

        let err = cache.write_all(&[doc("a", DocumentKind::Forward)]).unwrap_err();
        assert!(matches!(err, StorageError::CreateDirectory { .. }));
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("a").join("b").join("file.json");

        atomic_write(&nested_path, b"[]").unwrap();

        assert_eq!(fs::read_to_string(&nested_path).unwrap(), "[]");
        assert!(!nested_path.with_extension("tmp").exists());
    }
}
