//! Output formatting for sse-cli (table, json, csv, wire)

use clap::ValueEnum;
use colored::Colorize;
use sse_client::Event;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines; tables for batch output (default)
    #[default]
    Table,
    /// One JSON object per event
    Json,
    /// CSV rows
    Csv,
    /// SSE wire format, as received
    Wire,
}

impl OutputFormat {
    /// Parse a format name from the config file
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print one event as soon as it arrives
    pub fn print_event(&self, event: &Event) {
        print!("{}", self.render_event(event));
    }

    /// Print a batch of events; tables are only used here
    pub fn print_events(&self, events: &[Event]) {
        match self.format {
            OutputFormat::Table => {
                if events.is_empty() {
                    if !self.quiet {
                        println!("No events");
                    }
                } else {
                    let rows: Vec<EventRow> = events.iter().map(EventRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
            OutputFormat::Csv => {
                println!("{}", CSV_HEADER);
                for event in events {
                    print!("{}", self.render_event(event));
                }
            }
            _ => {
                for event in events {
                    print!("{}", self.render_event(event));
                }
            }
        }
    }

    /// Render a single event in the configured format, newline included
    pub fn render_event(&self, event: &Event) -> String {
        match self.format {
            OutputFormat::Table => {
                let mut line = format!("[{}]", event.event().cyan());
                if let Some(id) = event.id() {
                    line.push_str(&format!(" #{}", id.bold()));
                }
                if let Some(retry) = event.retry() {
                    line.push_str(&format!(" (retry {}ms)", retry));
                }
                line.push(' ');
                line.push_str(&event.data().replace('\n', "\n    "));
                line.push('\n');
                line
            }
            OutputFormat::Json => {
                let mut json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
                json.push('\n');
                json
            }
            OutputFormat::Csv => {
                let row = EventRow::from(event);
                format!(
                    "{},{},{},{}\n",
                    escape_csv(&row.id),
                    escape_csv(&row.event),
                    escape_csv(&row.retry),
                    escape_csv(&row.data)
                )
            }
            OutputFormat::Wire => event.dump(),
        }
    }
}

/// Header line for CSV output
pub const CSV_HEADER: &str = "id,event,retry,data";

/// Escape a value for CSV output
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Event display for table and csv output
#[derive(Debug, Tabled)]
pub struct EventRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Event")]
    pub event: String,
    #[tabled(rename = "Retry")]
    pub retry: String,
    #[tabled(rename = "Data")]
    pub data: String,
}

impl From<&Event> for EventRow {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id().unwrap_or("-").to_string(),
            event: event.event().to_string(),
            retry: event
                .retry()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            data: event.data().to_string(),
        }
    }
}
