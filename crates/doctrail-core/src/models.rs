//! Data models for Doctrail
//!
//! Defines the core data structures: `Document` (a forwarded or received
//! paper-trail entry), its loosely-typed `RawDocument` counterpart used for
//! cache reads and imports, and the remote connection settings.
//!
//! Documents serialize with camelCase field names; this is the layout of the
//! local cache blob.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::{LEGACY_DATE_FORWARDED, LEGACY_DATE_RECEIVED};

/// Which side of the paper trail a document records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Sent out to another office
    #[default]
    Forward,
    /// Taken in from another office
    Received,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Forward => "forward",
            DocumentKind::Received => "received",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "forwarded" => Ok(DocumentKind::Forward),
            "received" => Ok(DocumentKind::Received),
            other => Err(format!("unknown document kind: '{}'", other)),
        }
    }
}

/// A tracked document
///
/// `toOffice` and `dtsNo` are conventionally empty for received documents.
/// Fields this version does not know about are kept in `extra` so that a
/// read-modify-write cycle never drops data written by older or newer builds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier, primary key locally and remotely
    pub id: String,
    pub kind: DocumentKind,
    pub dts_no: String,
    pub from_office: String,
    pub details: String,
    pub received_by: String,
    pub to_office: String,
    pub date: String,
    /// Owning remote identity; only set once the row lives on the remote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Document {
    /// Create an empty document of the given kind, without an id
    ///
    /// The store assigns an id when the document is added.
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Whether the document still needs an id
    pub fn needs_id(&self) -> bool {
        self.id.trim().is_empty()
    }

    /// Case-insensitive match against every text field
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        [
            &self.dts_no,
            &self.from_office,
            &self.details,
            &self.received_by,
            &self.to_office,
            &self.date,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
    }
}

/// A document as found in the cache or an import, before normalization
///
/// Every field is optional; `kind` is kept as a plain string so unknown
/// values survive deserialization and can be healed later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dts_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_office: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_office: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RawDocument {
    /// Build a raw document from an imported row of `header -> value` pairs
    ///
    /// Header names are matched ignoring case, spaces, underscores and
    /// dashes, so "DTS No", "dts_no" and "dtsNo" all land in `dts_no`.
    /// Legacy date columns ("Date Received", "date_forwarded") are stored under
    /// their canonical legacy keys so normalization can fill `date` from them.
    /// Unrecognised headers are kept in `extra`. Empty cells count as absent.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Self {
        let mut raw = RawDocument::default();

        for (header, value) in fields {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let key: String = header
                .chars()
                .filter(|c| !matches!(c, ' ' | '_' | '-' | '.'))
                .flat_map(char::to_lowercase)
                .collect();

            let slot = match key.as_str() {
                "id" => &mut raw.id,
                "kind" | "type" => &mut raw.kind,
                "dtsno" | "dts" | "dtsnumber" => &mut raw.dts_no,
                "fromoffice" | "from" => &mut raw.from_office,
                "details" | "subject" => &mut raw.details,
                "receivedby" => &mut raw.received_by,
                "tooffice" | "to" => &mut raw.to_office,
                "date" => &mut raw.date,
                "datereceived" | "dateforwarded" => {
                    let legacy = if key == "datereceived" {
                        LEGACY_DATE_RECEIVED
                    } else {
                        LEGACY_DATE_FORWARDED
                    };
                    raw.extra
                        .insert(legacy.to_string(), Value::String(value.to_string()));
                    continue;
                }
                _ => {
                    raw.extra
                        .insert(header.clone(), Value::String(value.to_string()));
                    continue;
                }
            };
            *slot = Some(value.to_string());
        }

        raw
    }
}

impl From<Document> for RawDocument {
    fn from(doc: Document) -> Self {
        Self {
            id: Some(doc.id),
            kind: Some(doc.kind.to_string()),
            dts_no: Some(doc.dts_no),
            from_office: Some(doc.from_office),
            details: Some(doc.details),
            received_by: Some(doc.received_by),
            to_office: Some(doc.to_office),
            date: Some(doc.date),
            user_id: doc.user_id,
            extra: doc.extra,
        }
    }
}

/// Connection settings for the remote mirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote service
    pub endpoint: String,
    /// Public API key sent with every request
    pub key: String,
}

impl RemoteConfig {
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: key.into(),
        }
    }

    /// Both halves present
    pub fn is_valid(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.key.trim().is_empty()
    }

    /// Identity of a client built from this configuration
    pub fn signature(&self) -> String {
        format!("{}|{}", self.endpoint.trim(), self.key.trim())
    }
}

/// A signed-in remote user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Credentials of a signed-in session, as issued by the remote auth service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserIdentity,
}
