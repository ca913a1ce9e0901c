//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Utc};
use rl_core::timestamp;
use rl_core::{DisplayZone, ImportReport, Link};

const MAX_URL_LEN: usize = 60;
const MAX_TITLE_LEN: usize = 40;
const MAX_TAGS_LEN: usize = 30;

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
    /// Zone for human-readable timestamps
    pub zone: DisplayZone,
}

impl Output {
    pub fn new(format: OutputFormat, zone: DisplayZone) -> Self {
        Self { format, zone }
    }

    /// Print a single link
    pub fn print_link(&self, link: &Link) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", link.id);
                println!("URL:     {}", link.url);
                if !link.title.is_empty() {
                    println!("Title:   {}", link.title);
                }
                if !link.note.is_empty() {
                    println!("Note:    {}", link.note);
                }
                if !link.tags.is_empty() {
                    println!("Tags:    {}", link.tags.iter().collect::<Vec<_>>().join(", "));
                }
                println!("Created: {}", self.time(link.created_at.as_ref()));
                if let Some(read_at) = &link.read_at {
                    println!("Read:    {}", self.time(Some(read_at)));
                }
            }
            OutputFormat::Json => print_json(link),
            OutputFormat::Quiet => {
                println!("{}", link.id);
            }
        }
    }

    /// Print a list of links as a table
    pub fn print_links(&self, links: &[Link]) {
        match self.format {
            OutputFormat::Human => {
                if links.is_empty() {
                    println!("No links found.");
                    return;
                }
                let rows: Vec<[String; 5]> = links
                    .iter()
                    .map(|link| {
                        [
                            link.id.clone(),
                            truncate(&link.url, MAX_URL_LEN),
                            truncate(&link.title, MAX_TITLE_LEN),
                            self.time(link.created_at.as_ref()),
                            truncate(&link.tags.to_string(), MAX_TAGS_LEN),
                        ]
                    })
                    .collect();
                for line in render_table(&["ID", "URL", "TITLE", "CREATED", "TAGS"], &rows) {
                    println!("{}", line);
                }
                println!("\n{} link(s)", links.len());
            }
            OutputFormat::Json => print_json(links),
            OutputFormat::Quiet => {
                for link in links {
                    println!("{}", link.id);
                }
            }
        }
    }

    /// Print the outcome of an import
    pub fn print_import_report(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "Imported {} link(s): {} new, {} merged.",
                    report.imported(),
                    report.created,
                    report.merged
                );
                if !report.skipped.is_empty() {
                    println!("Skipped {} record(s):", report.skipped.len());
                    for skipped in &report.skipped {
                        println!("  {} ({})", skipped.url, skipped.reason);
                    }
                }
            }
            OutputFormat::Json => {
                let skipped: Vec<_> = report
                    .skipped
                    .iter()
                    .map(|s| serde_json::json!({"url": s.url, "reason": s.reason}))
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "imported": report.imported(),
                        "created": report.created,
                        "merged": report.merged,
                        "skipped": skipped
                    })
                );
            }
            OutputFormat::Quiet => {}
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

    fn time(&self, dt: Option<&DateTime<Utc>>) -> String {
        dt.map(|dt| timestamp::display(dt, &self.zone))
            .unwrap_or_else(|| "-".to_string())
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON: {}", e),
    }
}

/// Box-drawn table with columns sized to their widest cell
fn render_table<const N: usize>(headers: &[&str; N], rows: &[[String; N]]) -> Vec<String> {
    let mut widths: [usize; N] = headers.map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let border = |left: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}", left, segments.join(mid), right)
    };
    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!(" {}{} ", cell, " ".repeat(w - cell.chars().count())))
            .collect();
        format!("│{}│", padded.join("│"))
    };

    let mut lines = vec![
        border("┌", "┬", "┐"),
        line(headers.to_vec()),
        border("├", "┼", "┤"),
    ];
    for row in rows {
        lines.push(line(row.iter().map(String::as_str).collect()));
    }
    lines.push(border("└", "┴", "┘"));
    lines
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
