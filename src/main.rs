use anyhow::Result;
use clap::Parser;
use gmail_reader::cli::{self, Cli, Commands, OutputFormat, ProgressReporter};
use gmail_reader::client::ProductionGmailClient;
use gmail_reader::config::Config;
use gmail_reader::error::GmailError;
use gmail_reader::export::{self, ProgressCallback};
use gmail_reader::reader::GmailReader;
use gmail_reader::{auth, queries};
use indicatif::MultiProgress;
use serde::Serialize;
use std::io::Write;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// A writer that prints through MultiProgress to avoid progress bar conflicts
#[derive(Clone)]
struct MultiProgressWriter {
    multi: Arc<MultiProgress>,
    buffer: Arc<std::sync::Mutex<Vec<u8>>>,
}

impl MultiProgressWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self {
            multi,
            buffer: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }
}

impl Write for MultiProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log buffer poisoned"))?;
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log buffer poisoned"))?;
        if !buffer.is_empty() {
            let msg = String::from_utf8_lossy(&buffer);
            let msg = msg.trim_end_matches('\n');
            if !msg.is_empty() {
                // A hidden MultiProgress (no terminal) swallows println
                if self.multi.is_hidden() {
                    eprintln!("{}", msg);
                } else {
                    let _ = self.multi.println(msg);
                }
            }
            buffer.clear();
        }
        Ok(())
    }
}

impl Drop for MultiProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// MakeWriter implementation for tracing
#[derive(Clone)]
struct MultiProgressMakeWriter {
    multi: Arc<MultiProgress>,
}

impl MultiProgressMakeWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self { multi }
    }
}

impl<'a> MakeWriter<'a> for MultiProgressMakeWriter {
    type Writer = MultiProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MultiProgressWriter::new(Arc::clone(&self.multi))
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        eprintln!("\nFor help, run: gmail-reader --help");
        process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect(cli: &Cli, config: &Config) -> Result<GmailReader> {
    let hub = auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache).await?;
    let client = ProductionGmailClient::new(
        hub,
        Duration::from_secs(config.api.request_timeout_secs),
    );
    Ok(GmailReader::new(Box::new(client), config))
}

async fn run() -> Result<()> {
    // aws-lc-rs everywhere except Windows, where ring avoids the NASM/CMake toolchain
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_reader=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_reader=info,warn"))
    };

    // Shared MultiProgress so log lines print above progress bars
    let multi_progress = Arc::new(MultiProgress::new());
    let make_writer = MultiProgressMakeWriter::new(Arc::clone(&multi_progress));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match &cli.command {
        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                return Err(GmailError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(output).await?;

            println!("Created example configuration file at: {:?}", output);
            println!("\nKey settings to review:");
            println!("  - rate_limit.requests_per_second: Sustained Gmail API request rate");
            println!("  - retry.max_retries: Retries for 429/5xx responses");
            println!("  - pagination.max_messages_in_memory: Cap on messages held at once");
            return Ok(());
        }

        Commands::Auth { force } => {
            if *force && auth::clear_token_cache(&cli.token_cache).await? {
                println!("Removed existing token cache");
            }

            let config = Config::load(&cli.config).await?;
            let reader = connect(&cli, &config).await?;
            let profile = reader.profile().await?;

            println!("Successfully authenticated with Gmail API (read-only)");
            println!("Token cached at: {:?}", cli.token_cache);
            println!("Connected to account: {}", profile.email_address);
            return Ok(());
        }

        _ => {}
    }

    // Reject bad arguments before opening a browser for consent
    match &cli.command {
        Commands::Search { query, .. } => queries::validate_query_length(query)?,
        Commands::Read { id, .. } => queries::validate_gmail_id(id, "message ID")?,
        Commands::Threads { id } => queries::validate_gmail_id(id, "thread ID")?,
        Commands::Export { start_date, end_date, .. } => {
            queries::validate_date_range(start_date, end_date)?
        }
        _ => {}
    }

    let config = Config::load(&cli.config).await?;
    let reporter = ProgressReporter::with_multi_progress((*multi_progress).clone());

    let auth_spinner = reporter.add_spinner("Authenticating with Gmail API...");
    let reader = connect(&cli, &config).await?;
    reporter.finish_spinner(&auth_spinner, "Gmail API authenticated");

    match &cli.command {
        Commands::Test => {
            let profile = reader.profile().await?;
            match cli.output {
                OutputFormat::Json => print_json(&profile)?,
                OutputFormat::Table => print!("{}", cli::render_profile(&profile)),
            }
        }

        Commands::List { max } => {
            let messages = reader.list_messages(None, Some(*max)).await?;
            match cli.output {
                OutputFormat::Json => print_json(&messages)?,
                OutputFormat::Table => print!("{}", cli::render_message_table(&messages)),
            }
        }

        Commands::Search { query, max } => {
            let spinner = reporter.add_spinner(&format!("Searching for {:?}...", query));
            let messages = reader.list_messages(Some(query.as_str()), Some(*max)).await?;
            reporter.finish_spinner(&spinner, &format!("Found {} messages", messages.len()));
            match cli.output {
                OutputFormat::Json => print_json(&messages)?,
                OutputFormat::Table => print!("{}", cli::render_message_table(&messages)),
            }
        }

        Commands::Read { id, format } => match cli.output {
            OutputFormat::Json => print_json(&reader.get_message(id).await?)?,
            OutputFormat::Table => {
                let view = reader.read_message(id, (*format).into()).await?;
                print!("{}", cli::render_message_view(&view));
            }
        },

        Commands::Threads { id } => {
            let entries = reader.thread(id).await?;
            match cli.output {
                OutputFormat::Json => print_json(&entries)?,
                OutputFormat::Table => print!("{}", cli::render_thread(id, &entries)),
            }
        }

        Commands::Labels => {
            let labels = reader.labels().await?;
            match cli.output {
                OutputFormat::Json => print_json(&labels)?,
                OutputFormat::Table => print!("{}", cli::render_labels(&labels)),
            }
        }

        Commands::Export {
            start_date,
            end_date,
            file,
            limit,
        } => {
            let limit = (*limit).or(config.export.max_messages);
            let bar = reporter.add_progress_bar(0, "Exporting messages");
            let progress_bar = bar.clone();
            let progress: ProgressCallback = Arc::new(move |done, total| {
                progress_bar.set_length(total as u64);
                progress_bar.set_position(done as u64);
            });

            let summary =
                export::export_to_file(&reader, start_date, end_date, file, limit, Some(progress))
                    .await?;
            bar.finish_and_clear();

            let mut line = format!(
                "Export complete: {} messages saved to {:?}",
                summary.exported, summary.path
            );
            if summary.skipped > 0 {
                line.push_str(&format!(" ({} messages skipped due to errors)", summary.skipped));
            }
            println!("{}", line);
            if summary.truncated {
                println!(
                    "Note: the listing stopped at a limit; {} messages were found in range.",
                    summary.total_found
                );
            }
        }

        Commands::InitConfig { .. } | Commands::Auth { .. } => {}
    }

    Ok(())
}
