//! Read-only Gmail API transport
//!
//! [`GmailApi`] is the seam between request orchestration (pagination, retry,
//! rate limiting) and the wire. Each method performs exactly one HTTP call and
//! reports failures as [`GmailError`] with the HTTP status preserved, so the
//! executor can classify them. Tests substitute a mock; production uses
//! [`ProductionGmailClient`] over the `google-gmail1` hub.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use google_gmail1::api;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::{GmailHub, READONLY_SCOPE};
use crate::error::{GmailError, Result};
use crate::models::{
    Header, LabelInfo, Message, MessagePage, MessagePart, MessagePartBody, MessageStub, Profile,
    Thread,
};
use crate::queries::{MessageFormat, LABEL_FIELDS, LIST_PAGE_FIELDS, SUMMARY_HEADERS, THREAD_FIELDS};

/// One messages.list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMessagesRequest {
    /// Gmail search query; `None` lists the whole mailbox
    pub query: Option<String>,
    pub page_size: u32,
    pub page_token: Option<String>,
}

impl ListMessagesRequest {
    pub fn label(&self) -> String {
        match &self.query {
            Some(q) => format!("list messages (q={:?})", q),
            None => "list messages".to_string(),
        }
    }
}

/// One messages.get call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMessageRequest {
    pub id: String,
    pub format: MessageFormat,
    /// Headers returned with [`MessageFormat::Metadata`]
    pub metadata_headers: Vec<String>,
}

impl GetMessageRequest {
    /// Metadata fetch with the headers shown in message listings
    pub fn metadata(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            format: MessageFormat::Metadata,
            metadata_headers: SUMMARY_HEADERS.iter().map(|h| h.to_string()).collect(),
        }
    }

    pub fn full(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            format: MessageFormat::Full,
            metadata_headers: Vec::new(),
        }
    }

    pub fn label(&self) -> String {
        format!("get message {} ({})", self.id, self.format.as_str())
    }
}

/// Trait defining the read-only Gmail operations
#[async_trait]
pub trait GmailApi: Send + Sync {
    /// Fetch one page of message references
    async fn list_messages(&self, request: &ListMessagesRequest) -> Result<MessagePage>;

    /// Fetch a single message
    async fn get_message(&self, request: &GetMessageRequest) -> Result<Message>;

    /// Fetch a thread with metadata for each of its messages
    async fn get_thread(&self, thread_id: &str) -> Result<Thread>;

    async fn list_labels(&self) -> Result<Vec<LabelInfo>>;

    /// Fetch the authenticated user's profile
    async fn get_profile(&self) -> Result<Profile>;
}

/// Production Gmail client backed by the `google-gmail1` hub
///
/// Every call requests only the `gmail.readonly` scope and a partial-response
/// field selector, and is bounded by a per-request timeout.
pub struct ProductionGmailClient {
    hub: GmailHub,
    timeout: Duration,
}

impl ProductionGmailClient {
    pub fn new(hub: GmailHub, timeout: Duration) -> Self {
        Self { hub, timeout }
    }

    /// Bound an API call by the request timeout
    async fn timed<T, Fut>(&self, label: &str, call: Fut) -> Result<T>
    where
        Fut: std::future::Future<Output = std::result::Result<T, google_gmail1::Error>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(GmailError::from),
            Err(_) => {
                warn!("Gmail API {} call timed out after {:?}", label, self.timeout);
                Err(GmailError::NetworkError(format!(
                    "API call timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl GmailApi for ProductionGmailClient {
    async fn list_messages(&self, request: &ListMessagesRequest) -> Result<MessagePage> {
        let mut call = self
            .hub
            .users()
            .messages_list("me")
            .max_results(request.page_size)
            .param("fields", LIST_PAGE_FIELDS)
            .add_scope(READONLY_SCOPE);

        if let Some(query) = request.query.as_deref() {
            call = call.q(query);
        }
        if let Some(token) = request.page_token.as_deref() {
            call = call.page_token(token);
        }

        let (_, response) = self.timed("messages.list", call.doit()).await?;

        let messages: Vec<MessageStub> = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| {
                m.id.map(|id| MessageStub {
                    id,
                    thread_id: m.thread_id.unwrap_or_default(),
                })
            })
            .collect();

        debug!("messages.list returned {} references", messages.len());
        Ok(MessagePage {
            messages,
            next_page_token: response.next_page_token,
            result_size_estimate: response.result_size_estimate,
        })
    }

    async fn get_message(&self, request: &GetMessageRequest) -> Result<Message> {
        let mut call = self
            .hub
            .users()
            .messages_get("me", &request.id)
            .format(request.format.as_str())
            .param("fields", request.format.fields())
            .add_scope(READONLY_SCOPE);

        for header in &request.metadata_headers {
            call = call.add_metadata_headers(header);
        }

        let (_, message) = self.timed("messages.get", call.doit()).await?;
        convert_message(message)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Thread> {
        let mut call = self
            .hub
            .users()
            .threads_get("me", thread_id)
            .format(MessageFormat::Metadata.as_str())
            .param("fields", THREAD_FIELDS)
            .add_scope(READONLY_SCOPE);

        for header in SUMMARY_HEADERS {
            call = call.add_metadata_headers(header);
        }

        let (_, thread) = self.timed("threads.get", call.doit()).await?;

        let messages = thread
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(convert_message)
            .collect::<Result<Vec<_>>>()?;

        Ok(Thread {
            id: thread.id.unwrap_or_else(|| thread_id.to_string()),
            messages,
        })
    }

    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        let call = self
            .hub
            .users()
            .labels_list("me")
            .param("fields", LABEL_FIELDS)
            .add_scope(READONLY_SCOPE);

        let (_, response) = self.timed("labels.list", call.doit()).await?;

        let labels: Vec<LabelInfo> = response
            .labels
            .unwrap_or_default()
            .into_iter()
            .filter_map(|label| match (label.id, label.name) {
                (Some(id), Some(name)) => Some(LabelInfo {
                    id,
                    name,
                    label_type: label.type_.unwrap_or_default(),
                }),
                _ => None,
            })
            .collect();

        debug!("Successfully parsed {} labels", labels.len());
        Ok(labels)
    }

    async fn get_profile(&self) -> Result<Profile> {
        let call = self
            .hub
            .users()
            .get_profile("me")
            .add_scope(READONLY_SCOPE);

        let (_, profile) = self.timed("getProfile", call.doit()).await?;

        Ok(Profile {
            email_address: profile.email_address.unwrap_or_default(),
            messages_total: profile.messages_total.map(i64::from),
            threads_total: profile.threads_total.map(i64::from),
        })
    }
}

/// Convert a hub message into our model
fn convert_message(message: api::Message) -> Result<Message> {
    let id = message
        .id
        .ok_or_else(|| GmailError::InvalidMessageFormat("Missing message ID".to_string()))?;

    Ok(Message {
        id,
        thread_id: message.thread_id.unwrap_or_default(),
        label_ids: message.label_ids.unwrap_or_default(),
        snippet: message.snippet.unwrap_or_default(),
        payload: message.payload.map(convert_part),
        internal_date: message.internal_date,
        size_estimate: message.size_estimate.map(i64::from),
    })
}

/// The hub hands back decoded body bytes; re-encode them as base64url so the
/// model matches the wire format the body decoder expects.
fn convert_part(part: api::MessagePart) -> MessagePart {
    MessagePart {
        part_id: part.part_id,
        mime_type: part.mime_type,
        filename: part.filename,
        headers: part
            .headers
            .unwrap_or_default()
            .into_iter()
            .filter_map(|h| match (h.name, h.value) {
                (Some(name), Some(value)) => Some(Header { name, value }),
                _ => None,
            })
            .collect(),
        body: part.body.map(|body| MessagePartBody {
            size: body.size.map(i64::from),
            data: body.data.map(|bytes| URL_SAFE.encode(bytes)),
            attachment_id: body.attachment_id,
        }),
        parts: part
            .parts
            .unwrap_or_default()
            .into_iter()
            .map(convert_part)
            .collect(),
    }
}
