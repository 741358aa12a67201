//! High-level read-only operations composed from the request core
//!
//! Every operation validates its inputs before issuing a request and sends
//! each API call through the shared [`RequestExecutor`], so rate limiting and
//! retry apply uniformly.

use tracing::{debug, info, warn};

use crate::body::BodyDecoder;
use crate::client::{GetMessageRequest, GmailApi};
use crate::config::Config;
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::models::{
    format_internal_date, ExportedMessage, LabelInfo, Message, MessageSummary, MessageView,
    Profile, ThreadEntry,
};
use crate::paginator::{Pagination, PaginationLimits, Paginator, StopReason};
use crate::queries::{
    build_date_query, validate_date_range, validate_gmail_id, validate_query_length,
};

/// How much of a message `read_message` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailLevel {
    /// Headers and snippet only
    Snippet,
    /// Headers plus decoded text and HTML bodies
    #[default]
    Full,
}

/// Outcome of an in-memory date-range export
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub messages: Vec<ExportedMessage>,
    /// Messages listed but not fetched because their request failed
    pub skipped: usize,
    /// References returned by the listing
    pub total_found: usize,
    /// The listing stopped at a safety limit or at `limit`
    pub truncated: bool,
}

/// Read-only Gmail facade
pub struct GmailReader {
    api: Box<dyn GmailApi>,
    executor: RequestExecutor,
    limits: PaginationLimits,
    decoder: BodyDecoder,
}

impl GmailReader {
    /// Build a reader whose limiter, retry policy and limits come from `config`
    pub fn new(api: Box<dyn GmailApi>, config: &Config) -> Self {
        Self::with_parts(
            api,
            RequestExecutor::from_config(config),
            PaginationLimits::from_config(&config.pagination),
            BodyDecoder::new(config.mime.max_depth),
        )
    }

    pub fn with_parts(
        api: Box<dyn GmailApi>,
        executor: RequestExecutor,
        limits: PaginationLimits,
        decoder: BodyDecoder,
    ) -> Self {
        Self {
            api,
            executor,
            limits,
            decoder,
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn paginator(&self) -> Paginator<'_> {
        Paginator::new(self.api.as_ref(), &self.executor, self.limits)
    }

    async fn fetch(&self, request: GetMessageRequest) -> Result<Message> {
        let label = request.label();
        self.executor
            .execute(&label, || self.api.get_message(&request))
            .await
    }

    /// List message references matching `query` under the safety limits
    pub async fn message_ids(&self, query: Option<&str>, max_results: Option<usize>) -> Result<Pagination> {
        if let Some(q) = query {
            validate_query_length(q)?;
        }
        self.paginator().list_all(query, max_results).await
    }

    /// List messages with their summary headers
    ///
    /// Messages whose metadata request fails are skipped with a warning.
    pub async fn list_messages(
        &self,
        query: Option<&str>,
        max_results: Option<usize>,
    ) -> Result<Vec<MessageSummary>> {
        let listing = self.message_ids(query, max_results).await?;

        let mut summaries = Vec::with_capacity(listing.stubs.len());
        for stub in &listing.stubs {
            match self.fetch(GetMessageRequest::metadata(&stub.id)).await {
                Ok(message) => summaries.push(summarize(&message)),
                Err(e) => warn!("Skipping message {}: {}", stub.id, e),
            }
        }

        debug!(
            "Fetched {} of {} message summaries",
            summaries.len(),
            listing.stubs.len()
        );
        Ok(summaries)
    }

    /// Full message resource, as returned by the API
    pub async fn get_message(&self, id: &str) -> Result<Message> {
        validate_gmail_id(id, "message ID")?;
        self.fetch(GetMessageRequest::full(id)).await
    }

    /// A single message for display
    pub async fn read_message(&self, id: &str, detail: DetailLevel) -> Result<MessageView> {
        let message = self.get_message(id).await?;
        let headers = message.headers();

        let (text_body, html_body) = match detail {
            DetailLevel::Snippet => (None, None),
            DetailLevel::Full => {
                let body = message
                    .payload
                    .as_ref()
                    .map(|p| self.decoder.decode(p))
                    .unwrap_or_default();
                (Some(body.text), Some(body.html))
            }
        };

        Ok(MessageView {
            id: message.id.clone(),
            date: format_internal_date(message.internal_date),
            from: headers.from,
            to: headers.to,
            subject: headers.subject,
            labels: message.label_ids.clone(),
            snippet: message.snippet.clone(),
            text_body,
            html_body,
        })
    }

    /// Messages of a thread in API order
    pub async fn thread(&self, thread_id: &str) -> Result<Vec<ThreadEntry>> {
        validate_gmail_id(thread_id, "thread ID")?;
        let label = format!("get thread {}", thread_id);
        let thread = self
            .executor
            .execute(&label, || self.api.get_thread(thread_id))
            .await?;

        Ok(thread
            .messages
            .iter()
            .map(|message| {
                let headers = message.headers();
                ThreadEntry {
                    id: message.id.clone(),
                    date: format_internal_date(message.internal_date),
                    from: headers.from,
                    subject: headers.subject,
                    snippet: message.snippet.clone(),
                }
            })
            .collect())
    }

    pub async fn labels(&self) -> Result<Vec<LabelInfo>> {
        self.executor
            .execute("list labels", || self.api.list_labels())
            .await
    }

    /// Fetch the account profile; doubles as a connectivity check
    pub async fn profile(&self) -> Result<Profile> {
        self.executor
            .execute("get profile", || self.api.get_profile())
            .await
    }

    /// References for every message in a date range, capped at `limit`
    pub async fn range_ids(&self, start_date: &str, end_date: &str, limit: Option<usize>) -> Result<Pagination> {
        validate_date_range(start_date, end_date)?;
        let query = build_date_query(start_date, end_date);
        self.paginator().list_all(Some(&query), limit).await
    }

    /// Fetch and decode every message in a date range
    ///
    /// Per-message failures are counted in [`ExportReport::skipped`] rather
    /// than aborting the export.
    pub async fn export_range(
        &self,
        start_date: &str,
        end_date: &str,
        limit: Option<usize>,
    ) -> Result<ExportReport> {
        let listing = self.range_ids(start_date, end_date, limit).await?;
        let total_found = listing.stubs.len();
        let truncated = listing.is_partial() || listing.stop_reason == StopReason::MaxResults;

        let mut messages = Vec::with_capacity(total_found);
        let mut skipped = 0usize;
        for stub in &listing.stubs {
            match self.fetch(GetMessageRequest::full(&stub.id)).await {
                Ok(message) => messages.push(self.export_record(&message)),
                Err(e) => {
                    warn!("Skipping message {} during export: {}", stub.id, e);
                    skipped += 1;
                }
            }
        }

        info!(
            "Exported {} of {} messages ({} skipped)",
            messages.len(),
            total_found,
            skipped
        );
        Ok(ExportReport {
            messages,
            skipped,
            total_found,
            truncated,
        })
    }

    fn export_record(&self, message: &Message) -> ExportedMessage {
        let headers = message.headers();
        let body = message
            .payload
            .as_ref()
            .map(|p| self.decoder.decode(p))
            .unwrap_or_default();

        ExportedMessage {
            id: message.id.clone(),
            thread_id: message.thread_id.clone(),
            date: format_internal_date(message.internal_date),
            from: headers.from,
            to: headers.to,
            subject: headers.subject,
            snippet: message.snippet.clone(),
            labels: message.label_ids.clone(),
            text_body: body.text,
            html_body: body.html,
        }
    }
}

fn summarize(message: &Message) -> MessageSummary {
    let headers = message.headers();
    MessageSummary {
        id: message.id.clone(),
        thread_id: Some(message.thread_id.clone()).filter(|t| !t.is_empty()),
        date: format_internal_date(message.internal_date),
        from: headers.from,
        to: headers.to,
        subject: headers.subject,
        snippet: message.snippet.clone(),
    }
}
