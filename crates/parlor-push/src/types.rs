// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Expo push API.

use serde::{Deserialize, Serialize};

/// One push message, as Expo's `/push/send` endpoint expects it.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    /// The recipient's Expo push token.
    pub to: String,
    pub title: String,
    pub body: String,
    pub sound: String,
    /// Opaque payload handed back to the app; carries the conversation id and
    /// a resumption cursor.
    pub data: PushData,
}

/// App-side payload. `stream_id` is the log position of the message that
/// triggered the push, so the device can resume from exactly there.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushData {
    pub conversation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub stream_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Expo wraps the per-message ticket in a `data` field. A single message sent
/// as an object comes back as an object; batch sends come back as an array.
#[derive(Debug, Deserialize)]
pub struct PushResponse {
    pub data: TicketData,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TicketData {
    One(PushTicket),
    Many(Vec<PushTicket>),
}

impl TicketData {
    pub fn into_first(self) -> Option<PushTicket> {
        match self {
            TicketData::One(ticket) => Some(ticket),
            TicketData::Many(tickets) => tickets.into_iter().next(),
        }
    }
}

/// Per-message delivery ticket. `status` is `"ok"` or `"error"`; an error
/// ticket carries a human message and optional structured details.
#[derive(Debug, Clone, Deserialize)]
pub struct PushTicket {
    pub status: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl PushTicket {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_message_serializes_with_camel_case_data() {
        let msg = PushMessage {
            to: "ExponentPushToken[abc]".into(),
            title: "New message".into(),
            body: "hello".into(),
            sound: "default".into(),
            data: PushData {
                conversation_id: "1".into(),
                session_id: Some("abc".into()),
                stream_id: "42".into(),
                timestamp: None,
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["data"]["conversationId"], "1");
        assert_eq!(json["data"]["sessionId"], "abc");
        assert_eq!(json["data"]["streamId"], "42");
        assert!(json["data"].get("timestamp").is_none());
        assert_eq!(json["sound"], "default");
    }

    #[test]
    fn single_and_batch_tickets_both_parse() {
        let single: PushResponse =
            serde_json::from_str(r#"{"data":{"status":"ok","id":"t1"}}"#).unwrap();
        assert_eq!(single.data.into_first().unwrap().id.as_deref(), Some("t1"));

        let batch: PushResponse =
            serde_json::from_str(r#"{"data":[{"status":"ok","id":"t2"}]}"#).unwrap();
        assert_eq!(batch.data.into_first().unwrap().id.as_deref(), Some("t2"));
    }

    #[test]
    fn error_ticket_carries_details() {
        let resp: PushResponse = serde_json::from_str(
            r#"{"data":{"status":"error","message":"not registered","details":{"error":"DeviceNotRegistered"}}}"#,
        )
        .unwrap();
        let ticket = resp.data.into_first().unwrap();
        assert!(!ticket.is_ok());
        assert_eq!(ticket.message.as_deref(), Some("not registered"));
        assert!(ticket.details.is_some());
    }
}
