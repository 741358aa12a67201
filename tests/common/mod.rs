//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use gmail_reader::body::BodyDecoder;
use gmail_reader::client::{GetMessageRequest, GmailApi, ListMessagesRequest};
use gmail_reader::error::{GmailError, Result};
use gmail_reader::executor::{RequestExecutor, RetryPolicy};
use gmail_reader::models::{
    Header, LabelInfo, Message, MessagePage, MessagePart, MessagePartBody, MessageStub, Profile,
    Thread,
};
use gmail_reader::paginator::PaginationLimits;
use gmail_reader::rate_limiter::RateLimiter;
use gmail_reader::reader::GmailReader;
use mockall::mock;

mock! {
    pub GmailApi {}

    #[async_trait]
    impl GmailApi for GmailApi {
        async fn list_messages(&self, request: &ListMessagesRequest) -> Result<MessagePage>;
        async fn get_message(&self, request: &GetMessageRequest) -> Result<Message>;
        async fn get_thread(&self, thread_id: &str) -> Result<Thread>;
        async fn list_labels(&self) -> Result<Vec<LabelInfo>>;
        async fn get_profile(&self) -> Result<Profile>;
    }
}

/// Executor with a generous limiter and the default 2s/4s/8s backoff
pub fn test_executor() -> RequestExecutor {
    RequestExecutor::new(RateLimiter::new(1000.0), RetryPolicy::default())
}

pub fn reader_with(api: MockGmailApi, limits: PaginationLimits) -> GmailReader {
    GmailReader::with_parts(Box::new(api), test_executor(), limits, BodyDecoder::default())
}

pub fn default_reader(api: MockGmailApi) -> GmailReader {
    reader_with(api, PaginationLimits::default())
}

pub fn stub(id: &str) -> MessageStub {
    MessageStub {
        id: id.to_string(),
        thread_id: format!("thread_{}", id),
    }
}

/// One messages.list page holding `ids`
pub fn page(ids: &[&str], next_page_token: Option<&str>) -> MessagePage {
    MessagePage {
        messages: ids.iter().map(|id| stub(id)).collect(),
        next_page_token: next_page_token.map(str::to_string),
        result_size_estimate: Some(ids.len() as u32),
    }
}

/// Page of `count` generated ids, prefixed to keep pages distinct
pub fn numbered_page(prefix: &str, count: usize, next_page_token: Option<&str>) -> MessagePage {
    let ids: Vec<String> = (0..count).map(|i| format!("{}{}", prefix, i)).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    page(&refs, next_page_token)
}

pub fn header(name: &str, value: &str) -> Header {
    Header {
        name: name.to_string(),
        value: value.to_string(),
    }
}

pub fn text_part(mime_type: &str, content: &str) -> MessagePart {
    MessagePart {
        mime_type: Some(mime_type.to_string()),
        body: Some(MessagePartBody {
            size: Some(content.len() as i64),
            data: Some(URL_SAFE.encode(content.as_bytes())),
            attachment_id: None,
        }),
        ..Default::default()
    }
}

/// Metadata-format message with the usual summary headers
pub fn metadata_message(id: &str, from: &str, subject: &str) -> Message {
    Message {
        id: id.to_string(),
        thread_id: format!("thread_{}", id),
        label_ids: vec!["INBOX".to_string(), "UNREAD".to_string()],
        snippet: format!("Snippet of {}", id),
        payload: Some(MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
            headers: vec![
                header("From", from),
                header("To", "me@example.com"),
                header("Subject", subject),
                header("Date", "Mon, 1 Jan 2024 10:00:00 -0800"),
            ],
            ..Default::default()
        }),
        internal_date: Some(1_704_124_800_000),
        size_estimate: None,
    }
}

/// Full-format message with a text/plain + text/html alternative body
pub fn full_message(id: &str, text: &str, html: &str) -> Message {
    let mut message = metadata_message(id, "sender@example.com", "Full message");
    if let Some(payload) = message.payload.as_mut() {
        payload.parts = vec![text_part("text/plain", text), text_part("text/html", html)];
    }
    message.size_estimate = Some(2048);
    message
}

pub fn service_unavailable() -> GmailError {
    GmailError::from_status(503, "Service Unavailable", None)
}

pub fn not_found(id: &str) -> GmailError {
    GmailError::NotFound(format!("message {}", id))
}
