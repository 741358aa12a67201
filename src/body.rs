//! Message body extraction from Gmail's MIME tree
//!
//! Gmail returns a message payload as a tree of parts. Leaves carry base64url
//! data; containers (`multipart/*`) carry ordered children. The decoder walks
//! the tree depth-first and keeps the first plain-text and first HTML body it
//! finds, so an outer part always beats a deeper or later one.
//!
//! Decoding never fails outright:
//! - invalid base64 at a level yields [`PARSE_ERROR`] for that level only
//! - subtrees nested deeper than the configured limit are skipped
//! - bytes are decoded with a charset fallback chain ending in lossy UTF-8

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use tracing::warn;

use crate::models::MessagePart;

/// Placeholder stored in both fields when a level of the tree cannot be parsed
pub const PARSE_ERROR: &str = "(parsing error)";

/// Gmail emits base64url with or without padding
const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Plain-text and HTML bodies of a message; either may be empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    pub html: String,
}

impl DecodedBody {
    pub fn parse_error() -> Self {
        Self {
            text: PARSE_ERROR.to_string(),
            html: PARSE_ERROR.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.html.is_empty()
    }

    /// Fill slots that are still empty from `other`
    fn fill_from(&mut self, other: DecodedBody) {
        if self.text.is_empty() {
            self.text = other.text;
        }
        if self.html.is_empty() {
            self.html = other.html;
        }
    }
}

/// Recursive MIME body decoder with a hard depth limit
#[derive(Debug, Clone, Copy)]
pub struct BodyDecoder {
    max_depth: usize,
}

impl Default for BodyDecoder {
    fn default() -> Self {
        Self::new(50)
    }
}

impl BodyDecoder {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Extract the first text and first HTML body from a payload tree
    pub fn decode(&self, payload: &MessagePart) -> DecodedBody {
        self.decode_at(payload, 0)
    }

    fn decode_at(&self, part: &MessagePart, depth: usize) -> DecodedBody {
        if depth > self.max_depth {
            warn!(
                "MIME parsing exceeded maximum depth ({}). Skipping remaining nested parts.",
                self.max_depth
            );
            return DecodedBody::default();
        }

        match self.decode_level(part, depth) {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    "Failed to parse message body (mimeType={}): {}",
                    part.mime_type.as_deref().unwrap_or("unknown"),
                    e
                );
                DecodedBody::parse_error()
            }
        }
    }

    fn decode_level(
        &self,
        part: &MessagePart,
        depth: usize,
    ) -> Result<DecodedBody, base64::DecodeError> {
        let mut body = DecodedBody::default();

        if let Some(data) = part.inline_data() {
            let decoded = decode_bytes(&GMAIL_BASE64.decode(data)?);
            let mime_type = part.mime_type.as_deref().unwrap_or("text/plain");
            if mime_type.to_ascii_lowercase().contains("html") {
                body.html = decoded;
            } else {
                body.text = decoded;
            }
            return Ok(body);
        }

        for child in &part.parts {
            let data = child.body.as_ref().and_then(|b| b.data.as_deref());
            match (child.mime_type.as_deref(), data) {
                (Some("text/plain"), Some(data)) => {
                    if body.text.is_empty() {
                        body.text = decode_bytes(&GMAIL_BASE64.decode(data)?);
                    }
                }
                (Some("text/html"), Some(data)) => {
                    if body.html.is_empty() {
                        body.html = decode_bytes(&GMAIL_BASE64.decode(data)?);
                    }
                }
                _ if child.has_children() => {
                    body.fill_from(self.decode_at(child, depth + 1));
                }
                _ => {}
            }
        }

        Ok(body)
    }
}

/// Character sets tried, in order, when turning body bytes into text
///
/// ISO-8859-1 maps every byte, so it must stay after Windows-1252 or the
/// latter would never be reached.
const FALLBACK_CHARSETS: [Charset; 3] = [Charset::Utf8, Charset::Windows1252, Charset::Latin1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Windows1252,
    Latin1,
}

impl Charset {
    /// Strict decode; `None` if any byte is invalid in this charset
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Charset::Windows1252 => bytes.iter().map(|&b| windows_1252_char(b)).collect(),
            Charset::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Decode body bytes with the charset fallback chain
pub fn decode_bytes(bytes: &[u8]) -> String {
    FALLBACK_CHARSETS
        .iter()
        .find_map(|charset| charset.decode(bytes))
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}

/// Windows-1252 code points for 0x80..=0x9F; zero marks the undefined slots
const WINDOWS_1252_HIGH: [u16; 32] = [
    0x20AC, 0x0000, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, //
    0x02C6, 0x2030, 0x0160, 0x2039, 0x0152, 0x0000, 0x017D, 0x0000, //
    0x0000, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, //
    0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x0000, 0x017E, 0x0178,
];

fn windows_1252_char(byte: u8) -> Option<char> {
    match byte {
        0x80..=0x9F => match WINDOWS_1252_HIGH[usize::from(byte - 0x80)] {
            0 => None,
            code => char::from_u32(u32::from(code)),
        },
        _ => Some(char::from(byte)),
    }
}
