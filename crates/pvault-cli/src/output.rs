//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Local};
use serde::Serialize;

use pvault_core::catalog::ImportReport;
use pvault_core::media::describe_media;
use pvault_core::PromptRecord;

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

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single prompt with all of its fields
    pub fn print_record(&self, record: &PromptRecord) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", record.id);
                println!("Title:     {}", display_title(record));
                println!("Category:  {}", record.category.label());
                if let Some(ref model) = record.model_used {
                    println!("Model:     {}", model);
                }
                if !record.tags.is_empty() {
                    println!("Tags:      {}", record.tags.join(", "));
                }
                if let Some(created) = created_at(&record.id) {
                    println!("Created:   {}", created.format("%Y-%m-%d %H:%M"));
                }
                if let Some(ref url) = record.output_media_url {
                    let kind = if record.output_is_video() { " (video)" } else { "" };
                    println!("Output:    {}{}", describe_media(url), kind);
                }
                if let Some(ref url) = record.input_media_url {
                    println!("Input:     {}", describe_media(url));
                }

                println!();
                println!("── Prompt ──");
                println!("{}", record.prompt);
                if let Some(ref negative) = record.negative_prompt {
                    println!();
                    println!("── Negative prompt ──");
                    println!("{}", negative);
                }
            }
            OutputFormat::Json => print_json(record),
            OutputFormat::Quiet => {
                println!("{}", record.id);
            }
        }
    }

    /// Print a list of prompts
    pub fn print_records(&self, records: &[PromptRecord]) {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No prompts found.");
                    return;
                }
                for record in records {
                    let media = if record.output_is_video() { " ▶" } else { "" };
                    println!(
                        "{} | {:<14} | {}{} | {}",
                        record.id,
                        record.category.as_str(),
                        truncate(display_title(record), 35),
                        media,
                        truncate(&record.tags.join(", "), 30)
                    );
                }
                println!("\n{} prompt(s)", records.len());
            }
            OutputFormat::Json => print_json(&records),
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.id);
                }
            }
        }
    }

    /// Print the outcome of a backup import
    pub fn print_import_report(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "✓ Imported {} prompt(s), skipped {}",
                    report.accepted, report.rejected
                );
                for rejection in &report.rejections {
                    println!(
                        "  entry {}{}: {}",
                        rejection.index,
                        rejection
                            .id
                            .as_deref()
                            .map(|id| format!(" ({})", id))
                            .unwrap_or_default(),
                        rejection.reason
                    );
                }
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                println!("{} {}", report.accepted, report.rejected);
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

    /// Print a non-fatal problem to stderr
    pub fn warning(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("⚠ {}", message),
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({"status": "warning", "message": message})
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

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn display_title(record: &PromptRecord) -> &str {
    if record.title.trim().is_empty() {
        "(untitled)"
    } else {
        &record.title
    }
}

/// Creation time recovered from a timestamp id
fn created_at(id: &str) -> Option<DateTime<Local>> {
    let millis: i64 = id.parse().ok()?;
    DateTime::from_timestamp_millis(millis).map(|t| t.with_timezone(&Local))
}

/// Truncate a string to max length in characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
pub fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvault_core::Category;

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
        // Multi-byte characters are never split
        assert_eq!(truncate("ネオンの路地と雨の夜", 6), "ネオン...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
        assert_eq!(
            truncate_line("very long single line here", 10),
            "very lo..."
        );
    }

    #[test]
    fn test_display_title() {
        let mut record = PromptRecord::with_id("1", Category::General);
        assert_eq!(display_title(&record), "(untitled)");
        record.set_title("Named");
        assert_eq!(display_title(&record), "Named");
    }

    #[test]
    fn test_created_at_from_timestamp_id() {
        assert!(created_at("1700000000000").is_some());
        assert!(created_at("legacy-id").is_none());
    }
}
