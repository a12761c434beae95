//! In-memory backend for tests
//!
//! Behaves like the REST service closely enough to exercise the store:
//! rows are scoped per user, returned newest first, and primary keys are
//! enforced on insert. Failure switches simulate an unreachable service.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::backend::RemoteBackend;
use super::row::DocumentRow;
use crate::error::{Result, StoreError};
use crate::models::{AuthSession, UserIdentity};

const TOKEN_PREFIX: &str = "fake-token:";

#[derive(Default)]
pub struct FakeBackend {
    rows: Mutex<Vec<(u64, DocumentRow)>>,
    next_seq: Mutex<u64>,
    offline: AtomicBool,
    fail_rows: AtomicBool,
    fetch_delay: Mutex<Duration>,
    write_delay: Mutex<Duration>,
    pub select_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// User id the fake assigns to an email address
    pub fn user_id_for(email: &str) -> String {
        format!("user-{}", email)
    }

    /// Fail every call, including session checks
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail row operations while auth keeps working
    pub fn set_fail_rows(&self, fail: bool) {
        self.fail_rows.store(fail, Ordering::SeqCst);
    }

    /// Delay applied to every `select_rows` call
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = delay;
    }

    /// Delay applied to every `insert_rows` call
    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock() = delay;
    }

    /// Rows owned by `user_id`, newest first
    pub fn rows_for(&self, user_id: &str) -> Vec<DocumentRow> {
        let mut rows: Vec<(u64, DocumentRow)> = self
            .rows
            .lock()
            .iter()
            .filter(|(_, row)| row.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        rows.into_iter().map(|(_, row)| row).collect()
    }

    /// Insert rows directly, oldest first
    pub fn seed(&self, rows: Vec<DocumentRow>) {
        let mut stored = self.rows.lock();
        for row in rows {
            let seq = self.bump_seq();
            stored.push((seq, row));
        }
    }

    fn bump_seq(&self) -> u64 {
        let mut next = self.next_seq.lock();
        *next += 1;
        *next
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::RemoteUnavailable(
                "connection refused".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_rows_available(&self) -> Result<()> {
        self.ensure_online()?;
        if self.fail_rows.load(Ordering::SeqCst) {
            return Err(StoreError::RemoteUnavailable(
                "relation \"documents\" does not exist (404)".to_string(),
            ));
        }
        Ok(())
    }

    fn user_from(session: &AuthSession) -> Result<UserIdentity> {
        let email = session
            .access_token
            .strip_prefix(TOKEN_PREFIX)
            .ok_or_else(|| StoreError::RemoteUnavailable("invalid JWT (401)".to_string()))?;
        Ok(UserIdentity {
            id: Self::user_id_for(email),
            email: Some(email.to_string()),
        })
    }
}

#[async_trait]
impl RemoteBackend for FakeBackend {
    fn backend_tag(&self) -> &'static str {
        "fake"
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.ensure_online()?;
        if password.is_empty() {
            return Err(StoreError::RemoteUnavailable(
                "Invalid login credentials (400)".to_string(),
            ));
        }
        Ok(AuthSession {
            access_token: format!("{}{}", TOKEN_PREFIX, email),
            refresh_token: None,
            user: UserIdentity {
                id: Self::user_id_for(email),
                email: Some(email.to_string()),
            },
        })
    }

    async fn sign_out(&self, _session: &AuthSession) -> Result<()> {
        self.ensure_online()
    }

    async fn get_user(&self, session: &AuthSession) -> Result<UserIdentity> {
        self.ensure_online()?;
        Self::user_from(session).map_err(|_| StoreError::NotAuthenticated)
    }

    async fn select_rows(&self, session: &AuthSession, user_id: &str) -> Result<Vec<DocumentRow>> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.ensure_rows_available()?;
        Self::user_from(session)?;
        Ok(self.rows_for(user_id))
    }

    async fn insert_rows(&self, session: &AuthSession, rows: &[DocumentRow]) -> Result<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.write_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.ensure_rows_available()?;
        Self::user_from(session)?;

        let mut stored = self.rows.lock();
        if let Some(dup) = rows
            .iter()
            .find(|row| stored.iter().any(|(_, existing)| existing.id == row.id))
        {
            return Err(StoreError::RemoteUnavailable(format!(
                "duplicate key value violates unique constraint ({}) (409)",
                dup.id
            )));
        }
        for row in rows {
            let seq = self.bump_seq();
            let mut row = row.clone();
            row.created_at = Some(format!("seq-{:08}", seq));
            stored.push((seq, row));
        }
        Ok(())
    }

    async fn update_row(&self, session: &AuthSession, row: &DocumentRow) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_rows_available()?;
        let user = Self::user_from(session)?;

        let mut stored = self.rows.lock();
        if let Some((_, existing)) = stored
            .iter_mut()
            .find(|(_, r)| r.id == row.id && r.user_id.as_deref() == Some(user.id.as_str()))
        {
            let created_at = existing.created_at.take();
            *existing = DocumentRow {
                created_at,
                ..row.clone()
            };
        }
        Ok(())
    }

    async fn delete_rows(
        &self,
        session: &AuthSession,
        user_id: &str,
        ids: &[String],
    ) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_rows_available()?;
        Self::user_from(session)?;

        self.rows
            .lock()
            .retain(|(_, row)| !(ids.contains(&row.id) && row.user_id.as_deref() == Some(user_id)));
        Ok(())
    }
}
