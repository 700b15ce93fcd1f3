use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque server-assigned notification identifier.
///
/// The server currently sends integers, but nothing on the client relies on
/// that, so both JSON numbers and strings are accepted and kept as text.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new(id: impl Into<String>) -> Self {
        NotificationId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NotificationId {
    fn from(id: i64) -> Self {
        NotificationId(id.to_string())
    }
}

impl From<&str> for NotificationId {
    fn from(id: &str) -> Self {
        NotificationId(id.to_string())
    }
}

impl<'de> Deserialize<'de> for NotificationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => NotificationId::from(n),
            RawId::Text(s) => NotificationId(s),
        })
    }
}

/// Kind of event a notification describes.
///
/// The set is open: anything the client does not know about is carried as
/// `Other` so it can still be listed with a generic icon.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    Follow,
    Reaction,
    Comment,
    Other(String),
}

impl From<String> for NotificationKind {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "follow" => NotificationKind::Follow,
            // post_reaction is what the backend stores
            "reaction" | "post_reaction" => NotificationKind::Reaction,
            "comment" => NotificationKind::Comment,
            _ => NotificationKind::Other(s),
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(s: &str) -> Self {
        NotificationKind::from(s.to_string())
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NotificationKind::Follow => write!(f, "follow"),
            NotificationKind::Reaction => write!(f, "reaction"),
            NotificationKind::Comment => write!(f, "comment"),
            NotificationKind::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A single notification as returned by `/notifications/with-details`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    /// Username of the actor that triggered the event
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}

/// Acknowledgement body of the mark-read endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MarkReadAck {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

impl Default for MarkReadAck {
    fn default() -> Self {
        Self {
            success: true,
            message: None,
        }
    }
}
