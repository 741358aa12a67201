use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Message reference returned by messages.list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStub {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
}

/// One page of a messages.list response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<MessageStub>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_size_estimate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Body of a MIME part; `data` is base64url as delivered by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
}

/// A node of the MIME tree: either an inline payload or a container of parts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<MessagePartBody>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    /// Inline base64url payload, if present and non-empty
    pub fn inline_data(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    }

    pub fn has_children(&self) -> bool {
        !self.parts.is_empty()
    }
}

/// Gmail message resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,
    #[serde(
        default,
        with = "serde_helpers::millis_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_estimate: Option<i64>,
}

impl Message {
    pub fn headers(&self) -> MessageHeaders {
        self.payload
            .as_ref()
            .map(MessageHeaders::from_part)
            .unwrap_or_default()
    }
}

/// Gmail thread resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub label_type: String,
}

/// Account profile, used to verify credentials and connectivity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email_address: String,
    pub messages_total: Option<i64>,
    pub threads_total: Option<i64>,
}

/// Commonly displayed headers, with placeholders for missing ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeaders {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub cc: String,
    pub bcc: String,
}

impl Default for MessageHeaders {
    fn default() -> Self {
        Self {
            from: "(unknown)".to_string(),
            to: "(unknown)".to_string(),
            subject: "(no subject)".to_string(),
            date: "(unknown)".to_string(),
            cc: String::new(),
            bcc: String::new(),
        }
    }
}

impl MessageHeaders {
    /// Pick From/To/Subject/Date/Cc/Bcc out of a payload's header list
    pub fn from_part(part: &MessagePart) -> Self {
        let mut headers = Self::default();
        for header in &part.headers {
            let slot = match header.name.to_ascii_lowercase().as_str() {
                "from" => &mut headers.from,
                "to" => &mut headers.to,
                "subject" => &mut headers.subject,
                "date" => &mut headers.date,
                "cc" => &mut headers.cc,
                "bcc" => &mut headers.bcc,
                _ => continue,
            };
            *slot = header.value.clone();
        }
        headers
    }
}

/// Render Gmail's internalDate (milliseconds since epoch) as local time
pub fn format_internal_date(millis: Option<i64>) -> String {
    match millis.and_then(DateTime::from_timestamp_millis) {
        Some(dt) => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => {
            tracing::debug!("Invalid internalDate value: {:?}", millis);
            "(invalid date)".to_string()
        }
    }
}

/// Row produced by list and search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub date: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub snippet: String,
}

/// A single message as shown by `read`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    pub date: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub labels: Vec<String>,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub id: String,
    pub date: String,
    pub from: String,
    pub subject: String,
    pub snippet: String,
}

/// Decoded message record written by exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedMessage {
    pub id: String,
    pub thread_id: String,
    pub date: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub snippet: String,
    pub labels: Vec<String>,
    pub text_body: String,
    pub html_body: String,
}

/// Custom serde helpers for Gmail API types
pub mod serde_helpers {
    /// Gmail sends int64 values such as internalDate as JSON strings
    pub mod millis_string {
        use serde::{de, Deserialize, Deserializer, Serializer};

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNumber {
            String(String),
            Number(i64),
        }

        pub fn serialize<S>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(millis) => serializer.serialize_str(&millis.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<StringOrNumber>::deserialize(deserializer)? {
                Some(StringOrNumber::String(s)) => s.parse::<i64>().map(Some).map_err(de::Error::custom),
                Some(StringOrNumber::Number(n)) => Ok(Some(n)),
                None => Ok(None),
            }
        }
    }
}
