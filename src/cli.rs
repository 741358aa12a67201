//! Command-line interface

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{LabelInfo, MessageSummary, MessageView, Profile, ThreadEntry};
use crate::reader::DetailLevel;

/// Snippets longer than this are cut in listings
pub const SNIPPET_MAX_LENGTH: usize = 100;

#[derive(Parser, Debug)]
#[command(name = "gmail-reader")]
#[command(version)]
#[command(about = "Read-only Gmail reader", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = ".gmail-reader/token.json")]
    pub token_cache: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with Gmail API
    Auth {
        /// Force re-authentication even if token exists
        #[arg(long)]
        force: bool,
    },

    /// Verify credentials and connectivity
    Test,

    /// List recent messages
    List {
        /// Maximum number of messages
        #[arg(short, long, default_value_t = 50)]
        max: usize,
    },

    /// Search messages with a Gmail query
    Search {
        /// Gmail search query, e.g. "from:boss@example.com is:unread"
        query: String,

        /// Maximum number of messages
        #[arg(short, long, default_value_t = 50)]
        max: usize,
    },

    /// Show a single message
    Read {
        /// Message ID
        id: String,

        /// How much of the message to show
        #[arg(short, long, value_enum, default_value_t = ReadFormat::Full)]
        format: ReadFormat,
    },

    /// Export messages in a date range to a JSON file
    Export {
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,

        /// Day after the last one to include (YYYY-MM-DD)
        #[arg(long)]
        end_date: String,

        /// Output file
        #[arg(short, long, default_value = "gmail_export.json")]
        file: PathBuf,

        /// Maximum number of messages to export
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List all labels
    Labels,

    /// Show every message in a thread
    Threads {
        /// Thread ID
        id: String,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReadFormat {
    Snippet,
    Full,
}

impl From<ReadFormat> for DetailLevel {
    fn from(format: ReadFormat) -> Self {
        match format {
            ReadFormat::Snippet => DetailLevel::Snippet,
            ReadFormat::Full => DetailLevel::Full,
        }
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len.saturating_sub(3)).collect::<String>())
    }
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
    bar_style: ProgressStyle,
}

impl ProgressReporter {
    /// Share the MultiProgress the log writer prints through
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        let bar_style = ProgressStyle::default_bar()
            .template("[{elapsed:>6}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        Self {
            multi,
            spinner_style,
            bar_style,
        }
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn add_progress_bar(&self, len: u64, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(self.bar_style.clone());
        pb.set_message(msg.to_string());
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        let _ = self.multi.println(format!("  ✓ {}", msg));
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::with_multi_progress(MultiProgress::new())
    }
}

/// Render rows as a grid with a header line
fn render_grid(headers: &[&str], rows: &[Vec<String>]) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| single_line(cell)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", separator);
    let _ = writeln!(out, "{}", grid_row(headers.iter().copied(), &widths));
    let _ = writeln!(out, "{}", separator.replace('-', "="));
    for row in &rows {
        let _ = writeln!(out, "{}", grid_row(row.iter().map(String::as_str), &widths));
        let _ = writeln!(out, "{}", separator);
    }
    out
}

fn single_line(cell: &str) -> String {
    cell.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

fn grid_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.zip(widths) {
        let pad = width.saturating_sub(cell.chars().count());
        let _ = write!(line, " {}{} |", cell, " ".repeat(pad));
    }
    line
}

/// Table of message summaries, snippets cut to [`SNIPPET_MAX_LENGTH`]
pub fn render_message_table(messages: &[MessageSummary]) -> String {
    if messages.is_empty() {
        return "No messages found.\n".to_string();
    }

    let rows: Vec<Vec<String>> = messages
        .iter()
        .map(|m| {
            vec![
                m.id.clone(),
                m.date.clone(),
                m.from.clone(),
                m.subject.clone(),
                truncate_string(&m.snippet, SNIPPET_MAX_LENGTH),
            ]
        })
        .collect();
    render_grid(&["ID", "Date", "From", "Subject", "Snippet"], &rows)
}

pub fn render_message_view(view: &MessageView) -> String {
    let rule = "=".repeat(80);
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Message ID: {}", view.id);
    let _ = writeln!(out, "Date: {}", view.date);
    let _ = writeln!(out, "From: {}", view.from);
    let _ = writeln!(out, "To: {}", view.to);
    let _ = writeln!(out, "Subject: {}", view.subject);
    let _ = writeln!(out, "Labels: {}", view.labels.join(", "));
    let _ = writeln!(out, "{}", rule);

    let text = view.text_body.as_deref().filter(|b| !b.is_empty());
    let html = view.html_body.as_deref().filter(|b| !b.is_empty());
    match (view.text_body.is_some() || view.html_body.is_some(), text, html) {
        (false, _, _) => {
            let _ = writeln!(out, "\n{}\n", view.snippet);
        }
        (true, Some(text), _) => {
            let _ = writeln!(out, "\n--- Plain Text Body ---\n{}", text);
        }
        (true, None, Some(html)) => {
            let _ = writeln!(out, "\n--- HTML Body ---\n{}", html);
        }
        (true, None, None) => {
            let _ = writeln!(out, "\n(No body content)");
        }
    }

    let _ = writeln!(out, "{}", rule);
    out
}

pub fn render_thread(thread_id: &str, entries: &[ThreadEntry]) -> String {
    if entries.is_empty() {
        return "No messages found in thread.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Thread ID: {}", thread_id);
    let _ = writeln!(out, "Messages: {}\n", entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(out, "--- Message {}/{} ---", i + 1, entries.len());
        let _ = writeln!(out, "ID: {}", entry.id);
        let _ = writeln!(out, "Date: {}", entry.date);
        let _ = writeln!(out, "From: {}", entry.from);
        let _ = writeln!(out, "Subject: {}", entry.subject);
        let _ = writeln!(out, "Snippet: {}\n", truncate_string(&entry.snippet, SNIPPET_MAX_LENGTH));
    }
    out
}

pub fn render_labels(labels: &[LabelInfo]) -> String {
    if labels.is_empty() {
        return "No labels found.\n".to_string();
    }
    let rows: Vec<Vec<String>> = labels
        .iter()
        .map(|l| vec![l.id.clone(), l.name.clone(), l.label_type.clone()])
        .collect();
    render_grid(&["ID", "Name", "Type"], &rows)
}

pub fn render_profile(profile: &Profile) -> String {
    let count = |n: Option<i64>| n.map_or_else(|| "(unknown)".to_string(), |n| n.to_string());
    format!(
        "Connected to account: {}\nMessages: {}\nThreads: {}\n",
        profile.email_address,
        count(profile.messages_total),
        count(profile.threads_total)
    )
}
