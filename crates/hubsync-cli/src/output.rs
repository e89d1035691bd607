//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use hubsync_core::{codec, DocumentHandle, Reconciliation};
use serde_json::Value;

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

    /// Print a stored document
    ///
    /// Quiet mode prints only the editable text so it can be piped.
    pub fn print_document(&self, handle: &DocumentHandle) {
        let text = codec::serialize(&handle.content);
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", handle.id);
                println!("Revision: {}", handle.revision);
                let attachments = codec::attachment_fields(&handle.content);
                if !attachments.is_empty() {
                    let names: Vec<&str> = attachments.keys().map(String::as_str).collect();
                    println!("Binary:   {}", names.join(", "));
                }
                println!();
                println!("{}", text);
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "id": handle.id,
                        "revision": handle.revision,
                        "content": Value::Object(codec::strip_attachments(&handle.content)),
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", text);
            }
        }
    }

    /// Print a list of document ids
    pub fn print_ids(&self, ids: &[String]) {
        match self.format {
            OutputFormat::Human => {
                if ids.is_empty() {
                    println!("No documents found.");
                    return;
                }
                for id in ids {
                    println!("{}", id);
                }
                println!("\n{} document(s)", ids.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!(ids));
            }
            OutputFormat::Quiet => {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
    }

    /// Report a document reconciled with the hub
    pub fn print_reconciliation(&self, verb: &str, reconciliation: &Reconciliation) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "✓ {} '{}' (revision {})",
                    verb, reconciliation.document_id, reconciliation.revision
                );
                if reconciliation.revisions_removed > 0 {
                    println!(
                        "  compacted {} old revision(s)",
                        reconciliation.revisions_removed
                    );
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "success",
                        "document_id": reconciliation.document_id,
                        "revision": reconciliation.revision,
                        "revisions_removed": reconciliation.revisions_removed,
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", reconciliation.revision);
            }
        }
    }

    /// Report a document created on the hub
    pub fn print_created(&self, document_id: &str, refresh: bool) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ Created '{}' on the hub", document_id);
                if refresh {
                    println!("  Pull it into the local store with:");
                    println!("    hubsync pull {}", document_id);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "created",
                        "document_id": document_id,
                        "refresh": refresh,
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", document_id);
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
    fn test_only_human_output_prompts() {
        assert!(Output::new(OutputFormat::Human).should_prompt());
        assert!(!Output::new(OutputFormat::Json).should_prompt());
        assert!(!Output::new(OutputFormat::Quiet).should_prompt());
    }
}
