use thiserror::Error;

/// Type alias for Result with GmailError
pub type Result<T> = std::result::Result<T, GmailError>;

/// Error types for the read-only Gmail client
#[derive(Error, Debug)]
pub enum GmailError {
    /// Gmail API returned an error that carries no HTTP status
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// HTTP 429 from the API, optionally with the server's Retry-After hint in seconds
    #[error("Rate limit exceeded (HTTP 429){}", fmt_retry_after(*.retry_after))]
    RateLimitExceeded { retry_after: Option<f64> },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError {
        status: u16,
        message: String,
        retry_after: Option<f64>,
    },

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Any other non-success HTTP status
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Retryable failures persisted past the retry budget
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<GmailError>,
    },

    /// Invalid message format or parsing error
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// Caller-supplied id, query or date failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

fn fmt_retry_after(retry_after: Option<f64>) -> String {
    match retry_after {
        Some(secs) => format!(", retry after {} seconds", secs),
        None => String::new(),
    }
}

impl GmailError {
    /// HTTP status code behind this error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            GmailError::RateLimitExceeded { .. } => Some(429),
            GmailError::ServerError { status, .. } => Some(*status),
            GmailError::NotFound(_) => Some(404),
            GmailError::BadRequest(_) => Some(400),
            GmailError::Forbidden(_) => Some(403),
            GmailError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-supplied Retry-After value in seconds
    pub fn retry_after(&self) -> Option<f64> {
        match self {
            GmailError::RateLimitExceeded { retry_after } => *retry_after,
            GmailError::ServerError { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Build the error for a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<f64>) -> Self {
        let message = message.into();
        match status {
            429 => GmailError::RateLimitExceeded { retry_after },
            404 => GmailError::NotFound(message),
            400 => GmailError::BadRequest(message),
            403 => GmailError::Forbidden(message),
            500..=599 => GmailError::ServerError {
                status,
                message,
                retry_after,
            },
            _ => GmailError::HttpStatus { status, message },
        }
    }
}

/// Parse the Retry-After header from an HTTP response
///
/// Only the delay-seconds form is honoured (e.g. "120" or "1.5"). A missing,
/// non-numeric or negative value yields `None` so the caller falls back to its
/// own backoff schedule.
fn parse_retry_after_header<B>(response: &hyper::Response<B>) -> Option<f64> {
    let value = response.headers().get("retry-after")?.to_str().ok()?;
    parse_retry_after(value)
}

/// Parse a Retry-After value given as a number of seconds
pub fn parse_retry_after(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}

impl From<google_gmail1::Error> for GmailError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            // HTTP response with status code (non-success responses)
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let message = format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                );
                GmailError::from_status(status.as_u16(), message, parse_retry_after_header(response))
            }
            // BadRequest variant (request not understood by server)
            google_gmail1::Error::BadRequest(ref err) => GmailError::BadRequest(format!("{}", err)),
            // Network/connection errors
            google_gmail1::Error::HttpError(ref err) => {
                GmailError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => GmailError::NetworkError(err.to_string()),
            google_gmail1::Error::MissingToken(err) => GmailError::AuthError(err.to_string()),
            // All other errors
            _ => GmailError::ApiError(error.to_string()),
        }
    }
}
