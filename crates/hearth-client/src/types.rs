//! Wire types for the pagination and context endpoints.

use hearth_core::{EventId, EventKind, RoomEvent, RoomId, UserId};
use serde::Deserialize;
use serde_json::Value;

/// Pagination direction for `/messages`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Towards older events.
    Backward,
    /// Towards newer events.
    Forward,
}

impl Direction {
    /// Query-string value for the `dir` parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            Self::Backward => "b",
            Self::Forward => "f",
        }
    }
}

/// An event as it appears on the wire.
///
/// Some responses omit `room_id` on the individual events;
/// [`RawEvent::into_event`] fills it from the requested room.
#[derive(Clone, Debug, Deserialize)]
pub struct RawEvent {
    /// Globally unique event id.
    pub event_id: EventId,
    /// Owning room, when the server includes it.
    #[serde(default)]
    pub room_id: Option<RoomId>,
    /// Sending user.
    pub sender: UserId,
    /// Event type string.
    #[serde(rename = "type")]
    pub kind: String,
    /// Server timestamp, milliseconds.
    pub origin_server_ts: i64,
    /// State key for state events.
    #[serde(default)]
    pub state_key: Option<String>,
    /// Event content, kept opaque.
    #[serde(default)]
    pub content: Value,
}

impl RawEvent {
    /// Normalize into a domain event, defaulting the room id to the room
    /// the request was made for.
    pub fn into_event(self, room: &RoomId) -> RoomEvent {
        RoomEvent {
            event_id: self.event_id,
            room_id: self.room_id.unwrap_or_else(|| room.clone()),
            sender: self.sender,
            kind: EventKind::from(self.kind.as_str()),
            origin_server_ts: self.origin_server_ts,
            state_key: self.state_key,
            content: self.content,
        }
    }
}

/// Response of `GET /rooms/{roomId}/messages`.
///
/// For backward pagination the chunk is ordered newest-first; `end` is the
/// token to continue from, absent once history is exhausted.
#[derive(Debug, Deserialize)]
pub struct MessageChunk {
    /// The page of events.
    #[serde(default)]
    pub chunk: Vec<RawEvent>,
    /// Token corresponding to the start of the chunk.
    #[serde(default)]
    pub start: Option<String>,
    /// Token to continue pagination, absent when exhausted.
    #[serde(default)]
    pub end: Option<String>,
}

/// Response of `GET /rooms/{roomId}/context/{eventId}`.
#[derive(Debug, Deserialize)]
pub struct EventContext {
    /// The anchor event itself.
    #[serde(default)]
    pub event: Option<RawEvent>,
    /// Events just before the anchor, newest-first.
    #[serde(default)]
    pub events_before: Vec<RawEvent>,
    /// Token for paginating further into the past, absent when exhausted.
    #[serde(default)]
    pub start: Option<String>,
    /// Token for paginating towards the present.
    #[serde(default)]
    pub end: Option<String>,
}

/// Standard error body returned by the server.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Matrix error code.
    #[serde(default)]
    pub errcode: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub error: Option<String>,
}
