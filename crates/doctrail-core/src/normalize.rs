//! Record normalization
//!
//! Migrates legacy or partial records into the current `Document` schema.
//! This is the only place schema drift is healed. Rules, per record:
//!
//! 1. Ids are trimmed. A missing id, or one already used earlier in the
//!    sequence, gets a fresh id.
//! 2. A missing or unknown kind becomes `forward`; a kind spelled any other
//!    way than its canonical name is rewritten.
//! 3. An empty `date` takes the legacy `dateForwarded` (forward records) or
//!    `dateReceived` (received records).
//! 4. Absent text fields (`dtsNo` and `toOffice` for received records, among
//!    others) default to the empty string.
//!
//! Running the normalizer over its own output changes nothing.

use std::collections::HashSet;

use serde_json::Value;

use crate::id::new_id;
use crate::models::{Document, DocumentKind, RawDocument};

/// Legacy field holding the date a forwarded document left
pub const LEGACY_DATE_FORWARDED: &str = "dateForwarded";
/// Legacy field holding the date a received document arrived
pub const LEGACY_DATE_RECEIVED: &str = "dateReceived";

/// Output of a normalization pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub documents: Vec<Document>,
    /// Whether any input record had to be altered
    pub changed: bool,
}

/// Normalize a sequence of raw records
pub fn normalize(raw: Vec<RawDocument>) -> Normalized {
    normalize_against(raw, std::iter::empty::<&str>())
}

/// Normalize raw records whose ids must also avoid an existing id set
///
/// Used by imports: an incoming id that collides with `taken` is replaced.
pub fn normalize_against<'a>(
    raw: Vec<RawDocument>,
    taken: impl IntoIterator<Item = &'a str>,
) -> Normalized {
    let mut seen: HashSet<String> = taken.into_iter().map(str::to_string).collect();
    let mut changed = false;

    let documents = raw
        .into_iter()
        .map(|record| {
            let (doc, altered) = normalize_record(record, &mut seen);
            changed |= altered;
            doc
        })
        .collect();

    Normalized { documents, changed }
}

fn normalize_record(raw: RawDocument, seen: &mut HashSet<String>) -> (Document, bool) {
    let mut altered = false;

    let mut field = |value: Option<String>| {
        value.unwrap_or_else(|| {
            altered = true;
            String::new()
        })
    };

    let mut doc = Document {
        id: String::new(),
        kind: DocumentKind::Forward,
        dts_no: field(raw.dts_no),
        from_office: field(raw.from_office),
        details: field(raw.details),
        received_by: field(raw.received_by),
        to_office: field(raw.to_office),
        date: field(raw.date),
        user_id: raw.user_id,
        extra: raw.extra,
    };

    // Rule 1
    let raw_id = raw.id.unwrap_or_default();
    let trimmed = raw_id.trim();
    doc.id = if !trimmed.is_empty() && !seen.contains(trimmed) {
        altered |= trimmed.len() != raw_id.len();
        trimmed.to_string()
    } else {
        altered = true;
        fresh_id(seen)
    };
    seen.insert(doc.id.clone());

    // Rule 2
    match raw.kind.as_deref().map(|s| (s, s.parse::<DocumentKind>())) {
        Some((text, Ok(kind))) => {
            altered |= text != kind.as_str();
            doc.kind = kind;
        }
        _ => {
            altered = true;
            doc.kind = DocumentKind::Forward;
        }
    }

    // Rule 3
    if doc.date.is_empty() {
        let legacy = match doc.kind {
            DocumentKind::Forward => LEGACY_DATE_FORWARDED,
            DocumentKind::Received => LEGACY_DATE_RECEIVED,
        };
        if let Some(date) = legacy_date(&doc, legacy) {
            doc.date = date;
            altered = true;
        }
    }

    // Rule 4 is covered by the empty-string backfill above.

    (doc, altered)
}

fn legacy_date(doc: &Document, key: &str) -> Option<String> {
    match doc.extra.get(key) {
        Some(Value::String(date)) if !date.trim().is_empty() => Some(date.clone()),
        _ => None,
    }
}

fn fresh_id(seen: &HashSet<String>) -> String {
    loop {
        let id = new_id();
        if !seen.contains(&id) {
            return id;
        }
    }
}
