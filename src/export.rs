//! Streaming JSON export of a date range
//!
//! Messages are fetched one at a time and appended to a JSON array on disk,
//! so memory use stays flat regardless of how many messages the range holds.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::paginator::StopReason;
use crate::reader::GmailReader;

/// Called after each listed message with `(processed, total)`
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Log an info line every this many messages
const PROGRESS_LOG_INTERVAL: usize = 100;

/// Outcome of a file export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileExportSummary {
    pub path: PathBuf,
    pub exported: usize,
    pub skipped: usize,
    pub total_found: usize,
    /// The listing stopped at a safety limit or at the caller's limit
    pub truncated: bool,
}

/// Export full message resources in `[start_date, end_date)` to `path`
///
/// A message whose fetch fails is skipped and counted. A write failure aborts
/// the export; the file on disk is then an unterminated array.
pub async fn export_to_file(
    reader: &GmailReader,
    start_date: &str,
    end_date: &str,
    path: &Path,
    limit: Option<usize>,
    progress: Option<ProgressCallback>,
) -> Result<FileExportSummary> {
    let listing = reader.range_ids(start_date, end_date, limit).await?;
    let total = listing.stubs.len();
    info!("Exporting {} messages to {:?}", total, path);

    let mut exported = 0usize;
    let mut skipped = 0usize;

    let result: Result<()> = async {
        let file = tokio::fs::File::create(path).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(b"[\n").await?;

        for (index, stub) in listing.stubs.iter().enumerate() {
            let processed = index + 1;
            if processed % PROGRESS_LOG_INTERVAL == 0 {
                info!("Export progress: {}/{} messages", processed, total);
            }

            match reader.get_message(&stub.id).await {
                Ok(message) => {
                    if exported > 0 {
                        writer.write_all(b",\n").await?;
                    }
                    let json = serde_json::to_string_pretty(&message)?;
                    writer.write_all(json.as_bytes()).await?;
                    exported += 1;
                }
                Err(e) => {
                    warn!("Skipping message {} during export: {}", stub.id, e);
                    skipped += 1;
                }
            }

            if let Some(callback) = &progress {
                callback(processed, total);
            }
        }

        writer.write_all(b"\n]\n").await?;
        writer.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = result {
        error!(
            "Export failed after writing {}/{} messages. Output file {:?} may be incomplete. Reason: {}",
            exported, total, path, e
        );
        return Err(e);
    }

    info!(
        "Export complete: {} messages saved to {:?} ({} skipped)",
        exported, path, skipped
    );

    Ok(FileExportSummary {
        path: path.to_path_buf(),
        exported,
        skipped,
        total_found: total,
        truncated: listing.is_partial() || listing.stop_reason == StopReason::MaxResults,
    })
}
