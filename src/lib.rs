//! Read-only Gmail reader
//!
//! A small request-orchestration core for reading a Gmail mailbox without ever
//! being able to change it.
//!
//! # Overview
//!
//! - **Rate limiting**: a token bucket shared by every API call
//! - **Retry**: exponential backoff on 429/5xx, honouring Retry-After
//! - **Pagination**: bounded listing with cycle detection and memory caps
//! - **Body decoding**: recursive MIME walk with charset fallback
//! - **Operations**: list, search, read, threads, labels and date-range export
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_reader::{auth, client::ProductionGmailClient, config::Config, GmailReader};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!
//!     let hub = auth::initialize_gmail_hub(
//!         "credentials.json".as_ref(),
//!         ".gmail-reader/token.json".as_ref(),
//!     )
//!     .await?;
//!
//!     let client = ProductionGmailClient::new(hub, Duration::from_secs(30));
//!     let reader = GmailReader::new(Box::new(client), &config);
//!
//!     for summary in reader.list_messages(Some("is:unread"), Some(10)).await? {
//!         println!("{} {}", summary.date, summary.subject);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication with the read-only scope
//! - [`body`] - MIME body decoding
//! - [`cli`] - Command-line definitions and output rendering
//! - [`client`] - Gmail API transport trait and production client
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`executor`] - Rate-limited request execution with retry
//! - [`export`] - Streaming JSON export
//! - [`models`] - API resources and display records
//! - [`paginator`] - Bounded pagination over messages.list
//! - [`queries`] - Query building and input validation
//! - [`rate_limiter`] - Token bucket rate limiter
//! - [`reader`] - High-level read operations

pub mod auth;
pub mod body;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod export;
pub mod models;
pub mod paginator;
pub mod queries;
pub mod rate_limiter;
pub mod reader;

// Re-export commonly used types for convenience
pub use error::{GmailError, Result};

pub use body::{BodyDecoder, DecodedBody, PARSE_ERROR};
pub use client::{GetMessageRequest, GmailApi, ListMessagesRequest, ProductionGmailClient};
pub use config::Config;
pub use executor::{RequestExecutor, RetryPolicy};
pub use models::{
    ExportedMessage, LabelInfo, Message, MessagePage, MessagePart, MessageStub, MessageSummary,
    MessageView, Profile, Thread, ThreadEntry,
};
pub use paginator::{Pagination, PaginationLimits, Paginator, StopReason};
pub use rate_limiter::{RateLimiter, RateLimiterStats};
pub use reader::{DetailLevel, ExportReport, GmailReader};
