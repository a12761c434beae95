//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use doctrail_core::{Document, DocumentKind};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single document
    pub fn print_document(&self, doc: &Document) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", doc.id);
                println!("Kind:        {}", doc.kind);
                println!("Date:        {}", or_dash(&doc.date));
                if doc.kind == DocumentKind::Forward {
                    println!("DTS No:      {}", or_dash(&doc.dts_no));
                }
                println!("From:        {}", or_dash(&doc.from_office));
                if doc.kind == DocumentKind::Forward {
                    println!("To:          {}", or_dash(&doc.to_office));
                }
                println!("Received by: {}", or_dash(&doc.received_by));
                println!("Details:     {}", or_dash(&doc.details));
                if let Some(ref owner) = doc.user_id {
                    println!("Owner:       {}", owner);
                }
            }
            OutputFormat::Json => print_json(doc),
            OutputFormat::Quiet => {
                println!("{}", doc.id);
            }
        }
    }

    /// Print a list of documents
    pub fn print_documents(&self, docs: &[Document]) {
        match self.format {
            OutputFormat::Human => {
                if docs.is_empty() {
                    println!("No documents found.");
                    return;
                }
                for doc in docs {
                    println!(
                        "{} | {:<8} | {:<10} | {:<12} | {} | {}",
                        short_id(&doc.id),
                        doc.kind,
                        truncate(&doc.date, 10),
                        truncate(&doc.dts_no, 12),
                        route(doc),
                        truncate_line(&doc.details, 40)
                    );
                }
                println!("\n{} document(s)", docs.len());
            }
            OutputFormat::Json => print_json(&docs),
            OutputFormat::Quiet => {
                for doc in docs {
                    println!("{}", doc.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON output: {}", e),
    }
}

/// First eight characters of an id
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

fn route(doc: &Document) -> String {
    match doc.kind {
        DocumentKind::Forward => format!(
            "{} -> {}",
            truncate(&doc.from_office, 14),
            truncate(&doc.to_office, 14)
        ),
        DocumentKind::Received => format!("from {}", truncate(&doc.from_office, 14)),
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ñandú ñandú", 8), "ñandú...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_route() {
        let mut doc = Document::new(DocumentKind::Forward);
        doc.from_office = "Records".to_string();
        doc.to_office = "Budget".to_string();
        assert_eq!(route(&doc), "Records -> Budget");

        doc.kind = DocumentKind::Received;
        assert_eq!(route(&doc), "from Records");
    }
}
