// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Parlor workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Unique identifier for a visitor session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a remote device (cursor scope).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

/// Store-assigned position in a conversation log.
///
/// Strictly increasing across the log's lifetime, never reused, never chosen
/// by the writer. Doubles as an opaque cursor value on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LogPosition(pub i64);

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resumption cursor into a conversation log.
///
/// Wire encodings: `"0"` = from the beginning, `"$"` = only entries appended
/// after this point, any integer = strictly after that position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Read from the beginning of the log.
    Start,
    /// Skip all history; only entries appended after the call begins.
    Tail,
    /// Read entries strictly after this position.
    At(LogPosition),
}

/// Error returned when a wire cursor string cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid cursor `{0}`")]
pub struct InvalidCursor(pub String);

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Start => f.write_str("0"),
            Cursor::Tail => f.write_str("$"),
            Cursor::At(pos) => write!(f, "{pos}"),
        }
    }
}

impl FromStr for Cursor {
    type Err = InvalidCursor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "0" => Ok(Cursor::Start),
            "$" => Ok(Cursor::Tail),
            other => other
                .parse::<i64>()
                .map(|p| Cursor::At(LogPosition(p)))
                .map_err(|_| InvalidCursor(other.to_string())),
        }
    }
}

/// Which side of the conversation authored a message.
///
/// The log stores exactly these two values. The `contact`/`user` labels some
/// clients use are a presentation-layer relabeling handled at the gateway.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Visitor,
    Owner,
}

impl Sender {
    /// Normalize the sender labels accepted on the wire.
    ///
    /// `contact` is the visitor as seen from the owner's client; `user` and
    /// `me` are the owner as seen from their own clients.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "visitor" | "contact" => Some(Sender::Visitor),
            "owner" | "user" | "me" => Some(Sender::Owner),
            _ => None,
        }
    }
}

/// Delivery status carried by a log entry.
///
/// `Read` is never stored in the log itself -- it lives in the read-status
/// overlay and is merged onto entries at read time.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sending,
    #[default]
    Sent,
    Delivered,
    Read,
}

/// An immutable entry in a conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Store-assigned position; also the entry's resumption cursor.
    pub position: LogPosition,
    /// Client-assigned identifier, unique within the conversation by
    /// convention (not enforced by the store; consumers dedup on it).
    pub message_id: String,
    /// Message body, UTF-8, no length limit enforced by the core.
    pub text: String,
    pub sender: Sender,
    /// Origin-assigned creation time, ISO 8601.
    pub timestamp: String,
    /// Stored status; only a fallback once the overlay has an entry.
    pub status: DeliveryStatus,
}

/// A message as submitted by a client for appending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub message_id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: String,
    /// Defaults to [`DeliveryStatus::Sent`] when not supplied.
    pub status: Option<DeliveryStatus>,
}

/// Storage key for one conversation's log, overlay, and cursor rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey(pub String);

impl ConversationKey {
    pub fn new(session: &SessionId, conversation_id: &str) -> Self {
        Self(format!("conv:{}:{}", session.0, conversation_id))
    }

    /// Split back into the session and conversation id, or `None` when the
    /// key is not in the `conv:{session}:{id}` shape.
    pub fn parts(&self) -> Option<(SessionId, String)> {
        let rest = self.0.strip_prefix("conv:")?;
        let (session, conversation_id) = rest.split_once(':')?;
        Some((SessionId(session.to_string()), conversation_id.to_string()))
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversation identity, tagged by kind.
///
/// Transient conversations (the AI lane) have no storage key at all -- the
/// variant split keeps transient traffic out of the store at the type level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversation {
    /// The durable visitor<->owner conversation (conventionally id "1").
    Persistent {
        session: SessionId,
        conversation_id: String,
    },
    /// The AI lane (conventionally id "2"); exists only in client memory.
    Transient {
        session: SessionId,
        conversation_id: String,
    },
}

impl Conversation {
    pub fn session(&self) -> &SessionId {
        match self {
            Conversation::Persistent { session, .. } => session,
            Conversation::Transient { session, .. } => session,
        }
    }

    /// Conversation id as presented on the wire, echoing what the client sent.
    pub fn conversation_id(&self) -> &str {
        match self {
            Conversation::Persistent {
                conversation_id, ..
            }
            | Conversation::Transient {
                conversation_id, ..
            } => conversation_id,
        }
    }

    /// Storage key, or `None` for transient conversations (which must never
    /// reach the store).
    pub fn key(&self) -> Option<ConversationKey> {
        match self {
            Conversation::Persistent {
                session,
                conversation_id,
            } => Some(ConversationKey::new(session, conversation_id)),
            Conversation::Transient { .. } => None,
        }
    }
}

/// One row of the owner's inbox: a live conversation with its tail message
/// and unread count. Ordering is the presentation layer's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub session: SessionId,
    pub conversation_id: String,
    /// Text of the newest entry.
    pub last_message: String,
    /// Timestamp of the newest entry.
    pub timestamp: String,
    /// Visitor-authored entries not yet marked read.
    pub unread: u64,
    pub message_count: u64,
}

/// A session registry record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    /// ISO 8601 creation time.
    pub created_at: String,
    /// ISO 8601 expiry; the record is treated as absent once passed.
    pub expires_at: String,
}
