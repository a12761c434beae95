//! Document command handlers

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;

use doctrail_core::{Document, DocumentKind, DocumentStore};

use crate::output::{short_id, Output};
use crate::prompt::{confirm, prompt_with_default};

/// Document fields settable from the command line
#[derive(Args, Debug, Default, Clone)]
pub struct DocumentFields {
    /// Document kind (forward or received)
    #[arg(short, long)]
    pub kind: Option<DocumentKind>,
    /// Tracking number
    #[arg(long)]
    pub dts_no: Option<String>,
    /// Originating office
    #[arg(long = "from")]
    pub from_office: Option<String>,
    /// Destination office
    #[arg(long = "to")]
    pub to_office: Option<String>,
    /// Person who received the document
    #[arg(long)]
    pub received_by: Option<String>,
    /// Subject or description
    #[arg(short, long)]
    pub details: Option<String>,
    /// Date forwarded or received
    #[arg(long)]
    pub date: Option<String>,
}

impl DocumentFields {
    fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.dts_no.is_none()
            && self.from_office.is_none()
            && self.to_office.is_none()
            && self.received_by.is_none()
            && self.details.is_none()
            && self.date.is_none()
    }

    fn apply(self, doc: &mut Document) {
        if let Some(kind) = self.kind {
            doc.kind = kind;
        }
        let text_fields = [
            (self.dts_no, &mut doc.dts_no),
            (self.from_office, &mut doc.from_office),
            (self.to_office, &mut doc.to_office),
            (self.received_by, &mut doc.received_by),
            (self.details, &mut doc.details),
            (self.date, &mut doc.date),
        ];
        for (value, field) in text_fields {
            if let Some(value) = value {
                *field = value.trim().to_string();
            }
        }
    }
}

/// List documents, optionally filtered by kind and a search term
pub fn list(
    store: &DocumentStore,
    kind: Option<DocumentKind>,
    search: Option<String>,
    output: &Output,
) -> Result<()> {
    let docs = store.get_filtered(|doc| {
        kind.map_or(true, |k| doc.kind == k)
            && search.as_deref().map_or(true, |q| doc.matches(q))
    });

    output.print_documents(&docs);
    Ok(())
}

/// Show a single document
pub fn show(store: &DocumentStore, id: String, output: &Output) -> Result<()> {
    let id = resolve_id(store, &id)?;
    let doc = store
        .get(&id)
        .ok_or_else(|| anyhow::anyhow!("Document not found: {}", id))?;

    output.print_document(&doc);
    Ok(())
}

/// Add a new document
pub fn add(store: &DocumentStore, fields: DocumentFields, output: &Output) -> Result<()> {
    let mut doc = Document::new(fields.kind.unwrap_or_default());
    let interactive = fields.is_empty() && output.should_prompt();
    fields.apply(&mut doc);

    if interactive {
        println!("New document. Press Enter to leave a field empty.\n");
        prompt_fields(&mut doc)?;
    }

    let doc = store.add(doc).context("Failed to add document")?;

    output.success(&format!("Added document: {}", doc.id));
    output.print_document(&doc);
    Ok(())
}

/// Edit a document in place
pub fn edit(
    store: &DocumentStore,
    id: String,
    fields: DocumentFields,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(store, &id)?;
    let mut doc = store
        .get(&id)
        .ok_or_else(|| anyhow::anyhow!("Document not found: {}", id))?;

    if fields.is_empty() {
        if !output.should_prompt() {
            bail!("Nothing to change. Pass field flags such as --details or --date.");
        }
        println!("Editing document: {}", doc.id);
        println!("Press Enter to keep current value, or type new value.\n");
        prompt_fields(&mut doc)?;
    } else {
        fields.apply(&mut doc);
    }

    let doc = store.update(doc).context("Failed to update document")?;

    output.success("Document updated");
    output.print_document(&doc);
    Ok(())
}

/// Delete one or more documents
pub fn delete(store: &DocumentStore, ids: Vec<String>, yes: bool, output: &Output) -> Result<()> {
    let ids = ids
        .iter()
        .map(|id| resolve_id(store, id))
        .collect::<Result<Vec<_>>>()?;

    if output.should_prompt() && !yes {
        for id in &ids {
            if let Some(doc) = store.get(id) {
                println!("Delete {} | {} | {}", short_id(&doc.id), doc.kind, doc.details);
            }
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let removed = store
        .delete_many(&ids)
        .context("Failed to delete documents")?;

    output.success(&format!("Deleted {} document(s)", removed));
    Ok(())
}

/// Import documents from a JSON file holding an array of field maps
pub fn import(store: &DocumentStore, path: &Path, output: &Output) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let rows = parse_rows(&content).with_context(|| format!("Failed to parse {:?}", path))?;

    if rows.is_empty() {
        output.message("Nothing to import.");
        return Ok(());
    }

    let added = store.import(&rows).context("Failed to import documents")?;

    output.success(&format!("Imported {} document(s)", added.len()));
    if !output.is_quiet() && !output.is_json() {
        output.print_documents(&added);
    }
    Ok(())
}

/// Parse an array of objects into `header -> value` rows
///
/// Non-string scalars are kept as their JSON text; nulls are dropped.
fn parse_rows(content: &str) -> Result<Vec<BTreeMap<String, String>>> {
    let records: Vec<BTreeMap<String, Value>> =
        serde_json::from_str(content).context("Expected a JSON array of objects")?;

    Ok(records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .filter_map(|(header, value)| {
                    let text = match value {
                        Value::Null => return None,
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    Some((header, text))
                })
                .collect()
        })
        .collect())
}

/// Resolve a full id or unique id prefix
fn resolve_id(store: &DocumentStore, id: &str) -> Result<String> {
    if store.get(id).is_some() {
        return Ok(id.to_string());
    }

    let matches = store.get_filtered(|doc| doc.id.starts_with(id));

    match matches.len() {
        0 => bail!("No document found matching: {}", id),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple documents match '{}':", id);
            for doc in &matches {
                eprintln!("  {} - {}", doc.id, doc.details);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

fn prompt_fields(doc: &mut Document) -> Result<()> {
    if let Some(kind) = prompt_with_default("Kind (forward/received)", doc.kind.as_str())? {
        doc.kind = kind.parse().map_err(anyhow::Error::msg)?;
    }

    let forward = doc.kind == DocumentKind::Forward;
    let prompts: [(&str, &mut String, bool); 6] = [
        ("Date", &mut doc.date, true),
        ("DTS No", &mut doc.dts_no, forward),
        ("From office", &mut doc.from_office, true),
        ("To office", &mut doc.to_office, forward),
        ("Received by", &mut doc.received_by, true),
        ("Details", &mut doc.details, true),
    ];
    for (label, field, wanted) in prompts {
        if !wanted {
            continue;
        }
        if let Some(value) = prompt_with_default(label, field)? {
            *field = value;
        }
    }
    Ok(())
}
