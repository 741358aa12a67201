//! Bounded walk over messages.list pages
//!
//! A listing stops at the first of these conditions:
//! - the API returns no continuation token (complete)
//! - `max_results` references have been collected
//! - the in-memory cap is reached
//! - the page cap is reached
//! - the API repeats a continuation token it already handed out
//!
//! Every early stop other than `max_results` is logged as a warning, and the
//! references collected so far are returned rather than discarded.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::client::{GmailApi, ListMessagesRequest};
use crate::config::PaginationConfig;
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::models::MessageStub;

/// Safety limits for one listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationLimits {
    pub max_pages: usize,
    pub max_messages_in_memory: usize,
    pub page_size: u32,
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self::from_config(&PaginationConfig::default())
    }
}

impl PaginationLimits {
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_messages_in_memory: config.max_messages_in_memory,
            page_size: config.page_size,
        }
    }
}

/// Why a listing stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The API reported no further pages
    Exhausted,
    /// The caller's `max_results` was reached
    MaxResults,
    /// `max_messages_in_memory` was reached; results truncated
    MemoryCap,
    /// The API returned a continuation token seen earlier in this listing
    RepeatedToken,
    /// `max_pages` pages were fetched
    PageCap,
}

/// Message references collected by one listing
#[derive(Debug, Clone)]
pub struct Pagination {
    pub stubs: Vec<MessageStub>,
    pub stop_reason: StopReason,
    pub pages_fetched: usize,
}

impl Pagination {
    /// True when a safety limit cut the listing short
    pub fn is_partial(&self) -> bool {
        matches!(
            self.stop_reason,
            StopReason::MemoryCap | StopReason::RepeatedToken | StopReason::PageCap
        )
    }

    pub fn ids(&self) -> Vec<String> {
        self.stubs.iter().map(|s| s.id.clone()).collect()
    }
}

/// Drives messages.list through the request executor
pub struct Paginator<'a> {
    api: &'a dyn GmailApi,
    executor: &'a RequestExecutor,
    limits: PaginationLimits,
}

impl<'a> Paginator<'a> {
    pub fn new(api: &'a dyn GmailApi, executor: &'a RequestExecutor, limits: PaginationLimits) -> Self {
        Self {
            api,
            executor,
            limits,
        }
    }

    /// Collect message references for `query`, in API order
    ///
    /// `max_results` of `None` means "as many as the safety limits allow".
    ///
    /// # Errors
    /// Any failed page request (after the executor's retries) aborts the
    /// listing and is returned to the caller.
    pub async fn list_all(&self, query: Option<&str>, max_results: Option<usize>) -> Result<Pagination> {
        if max_results == Some(0) {
            return Ok(Pagination {
                stubs: Vec::new(),
                stop_reason: StopReason::MaxResults,
                pages_fetched: 0,
            });
        }

        let page_size = match max_results {
            Some(max) => self.limits.page_size.min(u32::try_from(max).unwrap_or(u32::MAX)),
            None => self.limits.page_size,
        };

        let mut stubs: Vec<MessageStub> = Vec::new();
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut page_token: Option<String> = None;
        let mut pages_fetched = 0usize;

        let stop_reason = loop {
            if pages_fetched >= self.limits.max_pages {
                warn!(
                    "Pagination stopped after reaching max pages limit ({}). Results may be incomplete.",
                    self.limits.max_pages
                );
                break StopReason::PageCap;
            }

            let request = ListMessagesRequest {
                query: query.map(str::to_owned),
                page_size,
                page_token: page_token.clone(),
            };
            let label = request.label();
            let page = self
                .executor
                .execute(&label, || self.api.list_messages(&request))
                .await?;

            stubs.extend(page.messages);
            pages_fetched += 1;

            if pages_fetched % 5 == 0 {
                debug!(
                    "Pagination progress: {} pages, {} messages",
                    pages_fetched,
                    stubs.len()
                );
            }

            if stubs.len() >= self.limits.max_messages_in_memory {
                stubs.truncate(self.limits.max_messages_in_memory);
                warn!(
                    "Reached memory limit of {} messages. Results truncated.",
                    self.limits.max_messages_in_memory
                );
                break StopReason::MemoryCap;
            }

            if let Some(max) = max_results {
                if stubs.len() >= max {
                    stubs.truncate(max);
                    break StopReason::MaxResults;
                }
            }

            match page.next_page_token {
                None => break StopReason::Exhausted,
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        warn!(
                            "Pagination cycle detected: token {:?} was already seen. Stopping.",
                            token
                        );
                        break StopReason::RepeatedToken;
                    }
                    page_token = Some(token);
                }
            }
        };

        info!(
            "Listed {} messages in {} pages ({:?})",
            stubs.len(),
            pages_fetched,
            stop_reason
        );

        Ok(Pagination {
            stubs,
            stop_reason,
            pages_fetched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = PaginationLimits::default();
        assert_eq!(limits.max_pages, 1000);
        assert_eq!(limits.max_messages_in_memory, 10_000);
        assert_eq!(limits.page_size, 500);
    }

    #[test]
    fn test_partial_stop_reasons() {
        let result = |stop_reason| Pagination {
            stubs: Vec::new(),
            stop_reason,
            pages_fetched: 1,
        };
        assert!(!result(StopReason::Exhausted).is_partial());
        assert!(!result(StopReason::MaxResults).is_partial());
        assert!(result(StopReason::MemoryCap).is_partial());
        assert!(result(StopReason::RepeatedToken).is_partial());
        assert!(result(StopReason::PageCap).is_partial());
    }
}
