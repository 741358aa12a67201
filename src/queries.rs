//! Gmail query construction, partial-response field selectors and input validation

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{GmailError, Result};

/// Fields requested for each page of messages.list
pub const LIST_PAGE_FIELDS: &str = "messages(id,threadId),nextPageToken,resultSizeEstimate";

/// Fields requested for metadata-format message fetches
pub const MESSAGE_METADATA_FIELDS: &str = "id,threadId,labelIds,snippet,payload,internalDate";

/// Fields requested for full message fetches
pub const MESSAGE_FULL_FIELDS: &str =
    "id,threadId,labelIds,snippet,payload,internalDate,sizeEstimate";

pub const THREAD_FIELDS: &str = "id,messages(id,threadId,labelIds,snippet,payload,internalDate)";

pub const LABEL_FIELDS: &str = "labels(id,name,type)";

/// Headers requested with metadata-format fetches
pub const SUMMARY_HEADERS: &[&str] = &["From", "To", "Subject", "Date"];

/// Longest search query accepted from callers
pub const MAX_QUERY_LENGTH: usize = 1024;

static GMAIL_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid id pattern"));

/// Message format options for messages.get
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Headers, labels and snippet without body data
    Metadata,
    /// Full message data including the MIME tree and bodies
    Full,
}

impl MessageFormat {
    /// Get format string for API call
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Metadata => "metadata",
            MessageFormat::Full => "full",
        }
    }

    /// Get partial response field selector
    pub fn fields(&self) -> &'static str {
        match self {
            MessageFormat::Metadata => MESSAGE_METADATA_FIELDS,
            MessageFormat::Full => MESSAGE_FULL_FIELDS,
        }
    }
}

/// Build a Gmail search query for a date range
///
/// Dates are YYYY-MM-DD; Gmail expects `after:YYYY/MM/DD before:YYYY/MM/DD`.
pub fn build_date_query(start_date: &str, end_date: &str) -> String {
    format!(
        "after:{} before:{}",
        start_date.replace('-', "/"),
        end_date.replace('-', "/")
    )
}

/// Validate a date string in YYYY-MM-DD format
pub fn validate_date_format(date: &str) -> Result<NaiveDate> {
    // NaiveDate accepts unpadded fields, so check the shape first
    let shape_ok = date.len() == 10
        && date
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });

    if !shape_ok {
        return Err(GmailError::InvalidInput(format!(
            "Invalid date format: {}. Use YYYY-MM-DD.",
            date
        )));
    }

    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        GmailError::InvalidInput(format!("Invalid date format: {}. Use YYYY-MM-DD.", date))
    })
}

/// Validate that a date range is well-formed and ordered
pub fn validate_date_range(start_date: &str, end_date: &str) -> Result<()> {
    let start = validate_date_format(start_date)?;
    let end = validate_date_format(end_date)?;
    if start > end {
        return Err(GmailError::InvalidInput(format!(
            "Start date {} is after end date {}",
            start_date, end_date
        )));
    }
    Ok(())
}

/// Validate a message or thread id before it is sent to the API
pub fn validate_gmail_id(id: &str, label: &str) -> Result<()> {
    if GMAIL_ID_PATTERN.is_match(id) {
        Ok(())
    } else {
        Err(GmailError::InvalidInput(format!(
            "Invalid {}: {:?}. Expected 1-64 letters, digits, '-' or '_'.",
            label, id
        )))
    }
}

/// Validate a free-form search query
pub fn validate_query_length(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(GmailError::InvalidInput("Search query cannot be empty".to_string()));
    }
    let length = query.chars().count();
    if length > MAX_QUERY_LENGTH {
        return Err(GmailError::InvalidInput(format!(
            "Search query is {} characters; the maximum is {}",
            length, MAX_QUERY_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_date_query() {
        assert_eq!(
            build_date_query("2026-02-01", "2026-02-17"),
            "after:2026/02/01 before:2026/02/17"
        );
    }

    #[test]
    fn test_validate_date_format() {
        assert!(validate_date_format("2026-02-01").is_ok());
        assert!(validate_date_format("2024-02-29").is_ok());

        assert!(validate_date_format("2026/02/01").is_err());
        assert!(validate_date_format("2026-2-1").is_err());
        assert!(validate_date_format("2023-02-29").is_err());
        assert!(validate_date_format("2026-13-01").is_err());
        assert!(validate_date_format("").is_err());

        let err = validate_date_format("tomorrow").unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_validate_date_range() {
        assert!(validate_date_range("2026-01-01", "2026-02-17").is_ok());
        assert!(validate_date_range("2026-01-01", "2026-01-01").is_ok());
        assert!(validate_date_range("2026-02-17", "2026-01-01").is_err());
        assert!(validate_date_range("2026-01-01", "garbage").is_err());
    }

    #[test]
    fn test_validate_gmail_id() {
        assert!(validate_gmail_id("18c2a4f9b3e1d7a0", "message ID").is_ok());
        assert!(validate_gmail_id("thread_01-A", "thread ID").is_ok());

        assert!(validate_gmail_id("", "message ID").is_err());
        assert!(validate_gmail_id("../etc/passwd", "message ID").is_err());
        assert!(validate_gmail_id("id with space", "message ID").is_err());
        assert!(validate_gmail_id(&"a".repeat(65), "message ID").is_err());

        let err = validate_gmail_id("bad id", "thread ID").unwrap_err();
        assert!(err.to_string().contains("thread ID"));
    }

    #[test]
    fn test_validate_query_length() {
        assert!(validate_query_length("from:boss@company.com is:unread").is_ok());
        assert!(validate_query_length(&"x".repeat(MAX_QUERY_LENGTH)).is_ok());

        assert!(validate_query_length("   ").is_err());
        assert!(validate_query_length(&"x".repeat(MAX_QUERY_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_message_format() {
        assert_eq!(MessageFormat::Metadata.as_str(), "metadata");
        assert_eq!(MessageFormat::Full.as_str(), "full");
        assert!(MessageFormat::Full.fields().contains("sizeEstimate"));
        assert!(!MessageFormat::Metadata.fields().contains("sizeEstimate"));
    }
}
