//! Remote service backends
//!
//! `RemoteBackend` is the seam between the mirror client and the wire.
//! `RestBackend` talks to a PostgREST table (`/rest/v1/documents`) and a
//! GoTrue-style auth service (`/auth/v1/*`), authenticating every request with
//! the project's API key plus the user's bearer token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::row::DocumentRow;
use crate::error::{Result, StoreError};
use crate::models::{AuthSession, RemoteConfig, UserIdentity};

/// Name of the remote table holding document rows
pub const DOCUMENTS_TABLE: &str = "documents";

/// Builds a backend for a remote configuration
pub type BackendFactory =
    Arc<dyn Fn(&RemoteConfig) -> Result<Arc<dyn RemoteBackend>> + Send + Sync>;

/// Operations the mirror client needs from a remote service
///
/// Row operations are always scoped to `user_id`.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Exchange credentials for a session
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Revoke a session
    async fn sign_out(&self, session: &AuthSession) -> Result<()>;

    /// Resolve the user a session belongs to
    ///
    /// A session the service rejects is `NotAuthenticated`.
    async fn get_user(&self, session: &AuthSession) -> Result<UserIdentity>;

    /// All rows owned by `user_id`, newest first by creation time
    async fn select_rows(&self, session: &AuthSession, user_id: &str) -> Result<Vec<DocumentRow>>;

    async fn insert_rows(&self, session: &AuthSession, rows: &[DocumentRow]) -> Result<()>;

    /// Replace the row with `row.id`
    async fn update_row(&self, session: &AuthSession, row: &DocumentRow) -> Result<()>;

    async fn delete_rows(&self, session: &AuthSession, user_id: &str, ids: &[String])
        -> Result<()>;
}

/// HTTP backend for a PostgREST + GoTrue service
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    pub fn new(config: &RemoteConfig, timeout: Duration) -> Result<Self> {
        if !config.is_valid() {
            return Err(StoreError::InvalidConfig(
                "endpoint and key are both required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("doctrail/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim().trim_end_matches('/').to_string(),
            api_key: config.key.trim().to_string(),
        })
    }

    /// Factory producing REST backends with the given request timeout
    pub fn factory(timeout: Duration) -> BackendFactory {
        Arc::new(move |config: &RemoteConfig| -> Result<Arc<dyn RemoteBackend>> {
            let backend: Arc<dyn RemoteBackend> = Arc::new(RestBackend::new(config, timeout)?);
            Ok(backend)
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, DOCUMENTS_TABLE)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.api_key)
    }

    fn authorized(&self, request: RequestBuilder, session: &AuthSession) -> RequestBuilder {
        self.with_key(request).bearer_auth(&session.access_token)
    }
}

/// Turn a non-success response into `RemoteUnavailable` with the service's message
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ServiceError>(&body)
        .ok()
        .and_then(ServiceError::message)
        .unwrap_or(body);

    Err(StoreError::RemoteUnavailable(format!(
        "{} ({})",
        message.trim(),
        status
    )))
}

fn session_rejected(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Error body shapes used by PostgREST and GoTrue
#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ServiceError {
    fn message(self) -> Option<String> {
        self.message.or(self.msg).or(self.error_description)
    }
}

/// PostgREST `in.(...)` filter; values are double-quoted with `\` and `"` escaped
fn in_list(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl RemoteBackend for RestBackend {
    fn backend_tag(&self) -> &'static str {
        "rest"
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        debug!("Signing in to {}", self.base_url);
        let request = self
            .with_key(self.client.post(self.auth_url("token")))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));

        let response = check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn sign_out(&self, session: &AuthSession) -> Result<()> {
        let request = self.authorized(self.client.post(self.auth_url("logout")), session);
        check(request.send().await?).await?;
        Ok(())
    }

    async fn get_user(&self, session: &AuthSession) -> Result<UserIdentity> {
        let request = self.authorized(self.client.get(self.auth_url("user")), session);
        let response = request.send().await?;
        if session_rejected(response.status()) {
            debug!("Session rejected ({})", response.status());
            return Err(StoreError::NotAuthenticated);
        }
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    async fn select_rows(&self, session: &AuthSession, user_id: &str) -> Result<Vec<DocumentRow>> {
        let request = self
            .authorized(self.client.get(self.table_url()), session)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
            ]);

        let response = check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn insert_rows(&self, session: &AuthSession, rows: &[DocumentRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let request = self
            .authorized(self.client.post(self.table_url()), session)
            .header("Prefer", "return=minimal")
            .json(rows);

        check(request.send().await?).await?;
        Ok(())
    }

    async fn update_row(&self, session: &AuthSession, row: &DocumentRow) -> Result<()> {
        let owner = row.user_id.clone().unwrap_or_default();
        let request = self
            .authorized(self.client.patch(self.table_url()), session)
            .query(&[
                ("id", format!("eq.{}", row.id)),
                ("user_id", format!("eq.{}", owner)),
            ])
            .header("Prefer", "return=minimal")
            .json(row);

        check(request.send().await?).await?;
        Ok(())
    }

    async fn delete_rows(
        &self,
        session: &AuthSession,
        user_id: &str,
        ids: &[String],
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let request = self
            .authorized(self.client.delete(self.table_url()), session)
            .query(&[("id", in_list(ids)), ("user_id", format!("eq.{}", user_id))]);

        check(request.send().await?).await?;
        Ok(())
    }
}
