//! Remote row shape
//!
//! The remote table uses snake_case column names and calls the kind column
//! `type`. Conversion in both directions is a field rename only.

use serde::{Deserialize, Serialize};

use crate::models::{Document, DocumentKind};

/// A row of the remote `documents` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRow {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub dts_no: Option<String>,
    #[serde(default)]
    pub from_office: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub received_by: Option<String>,
    #[serde(default)]
    pub to_office: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Set by the server on insert; never sent
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
}

impl DocumentRow {
    /// Map a document to a row owned by `user_id`
    pub fn from_document(doc: &Document, user_id: &str) -> Self {
        Self {
            id: doc.id.clone(),
            kind: Some(doc.kind.to_string()),
            dts_no: Some(doc.dts_no.clone()),
            from_office: Some(doc.from_office.clone()),
            details: Some(doc.details.clone()),
            received_by: Some(doc.received_by.clone()),
            to_office: Some(doc.to_office.clone()),
            date: Some(doc.date.clone()),
            user_id: Some(user_id.to_string()),
            created_at: None,
        }
    }

    /// Map a row back to a document
    ///
    /// Null columns become empty strings; an unknown type reads as forward.
    pub fn into_document(self) -> Document {
        Document {
            id: self.id,
            kind: self
                .kind
                .as_deref()
                .and_then(|kind| kind.parse().ok())
                .unwrap_or(DocumentKind::Forward),
            dts_no: self.dts_no.unwrap_or_default(),
            from_office: self.from_office.unwrap_or_default(),
            details: self.details.unwrap_or_default(),
            received_by: self.received_by.unwrap_or_default(),
            to_office: self.to_office.unwrap_or_default(),
            date: self.date.unwrap_or_default(),
            user_id: self.user_id,
            extra: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_uses_remote_column_names() {
        let mut doc = Document::new(DocumentKind::Received);
        doc.id = "r1".to_string();
        doc.from_office = "Budget".to_string();
        doc.received_by = "Lea".to_string();

        let row = serde_json::to_value(DocumentRow::from_document(&doc, "user-9")).unwrap();
        assert_eq!(row["type"], "received");
        assert_eq!(row["from_office"], "Budget");
        assert_eq!(row["received_by"], "Lea");
        assert_eq!(row["user_id"], "user-9");
        assert!(row.get("created_at").is_none());
        assert!(row.get("kind").is_none());
    }

    #[test]
    fn test_row_with_nulls_maps_to_empty_fields() {
        let row: DocumentRow = serde_json::from_value(json!({
            "id": "r2", "type": "received", "dts_no": null, "to_office": null,
            "from_office": "HR", "user_id": "u", "created_at": "2024-03-01T10:00:00+00:00"
        }))
        .unwrap();

        let doc = row.into_document();
        assert_eq!(doc.kind, DocumentKind::Received);
        assert_eq!(doc.dts_no, "");
        assert_eq!(doc.to_office, "");
        assert_eq!(doc.from_office, "HR");
        assert_eq!(doc.user_id.as_deref(), Some("u"));
    }

    #[test]
    fn test_document_survives_row_mapping() {
        let mut doc = Document::new(DocumentKind::Forward);
        doc.id = "r3".to_string();
        doc.dts_no = "DTS-77".to_string();
        doc.to_office = "Legal".to_string();
        doc.date = "2024-06-01".to_string();

        let back = DocumentRow::from_document(&doc, "owner").into_document();
        assert_eq!(back.user_id.as_deref(), Some("owner"));
        assert_eq!(Document { user_id: None, ..back }, doc);
    }
}
