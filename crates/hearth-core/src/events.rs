//! Room timeline events, the event-kind vocabulary, and timeline ordering.
//!
//! Events are immutable once received. Their `content` stays opaque
//! [`serde_json::Value`] so unknown event types round-trip untouched.
//!
//! Ordering within a room is server-defined. Locally we order by
//! `(origin_server_ts, event_id)`: the timestamp is authoritative and ties
//! are broken by the event id, so two stores holding the same events always
//! agree on a timeline. Ordering is never compared across rooms.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::ids::{EventId, RoomId, UserId};

/// Event type discriminator.
///
/// Known kinds get a variant; anything else is preserved verbatim in
/// [`EventKind::Other`] so serialization round-trips exactly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `m.room.message`
    Message,
    /// `m.room.member`
    Member,
    /// `m.room.name`
    Name,
    /// `m.room.topic`
    Topic,
    /// `m.room.avatar`
    Avatar,
    /// `m.room.create`
    Create,
    /// `m.room.redaction`
    Redaction,
    /// Any event type without a dedicated variant.
    Other(String),
}

impl EventKind {
    /// The wire string for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Message => "m.room.message",
            Self::Member => "m.room.member",
            Self::Name => "m.room.name",
            Self::Topic => "m.room.topic",
            Self::Avatar => "m.room.avatar",
            Self::Create => "m.room.create",
            Self::Redaction => "m.room.redaction",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            "m.room.message" => Self::Message,
            "m.room.member" => Self::Member,
            "m.room.name" => Self::Name,
            "m.room.topic" => Self::Topic,
            "m.room.avatar" => Self::Avatar,
            "m.room.create" => Self::Create,
            "m.room.redaction" => Self::Redaction,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Err(D::Error::custom("event type must not be empty"));
        }
        Ok(Self::from(s.as_str()))
    }
}

/// A single room timeline event, as received from the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomEvent {
    /// Globally unique event id.
    pub event_id: EventId,
    /// Room the event belongs to.
    pub room_id: RoomId,
    /// User that sent the event.
    pub sender: UserId,
    /// Event type discriminator.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Server-assigned timestamp, milliseconds since the epoch.
    pub origin_server_ts: i64,
    /// State key for state events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    /// Event-specific data, kept opaque.
    #[serde(default)]
    pub content: Value,
}

impl RoomEvent {
    /// Ordering key within a room timeline: timestamp, then event id.
    pub fn timeline_key(&self) -> (i64, &str) {
        (self.origin_server_ts, self.event_id.as_str())
    }

    /// Whether this event sorts strictly before `other` in timeline order.
    pub fn is_older_than(&self, other: &RoomEvent) -> bool {
        self.timeline_key() < other.timeline_key()
    }
}

/// Sort events into ascending timeline order (oldest first).
pub fn sort_timeline(events: &mut [RoomEvent]) {
    events.sort_by(|a, b| a.timeline_key().cmp(&b.timeline_key()));
}

/// One page of backward history, normalized oldest-first.
///
/// `prev_key` is the continuation token for the next page further into the
/// past; `None` means no further history exists upstream.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchedBatch {
    /// Page contents, oldest event first.
    pub messages: Vec<RoomEvent>,
    /// Token resuming pagination past the oldest message, if any.
    pub prev_key: Option<String>,
}

impl FetchedBatch {
    /// Build a batch from a server page delivered newest-first, reversing
    /// it into oldest-first order.
    pub fn from_newest_first(mut messages: Vec<RoomEvent>, prev_key: Option<String>) -> Self {
        messages.reverse();
        Self { messages, prev_key }
    }

    /// Whether this page marks the upstream end of history.
    pub fn is_exhausted(&self) -> bool {
        self.prev_key.is_none()
    }

    /// The oldest event of the page, if the page is non-empty.
    pub fn oldest(&self) -> Option<&RoomEvent> {
        self.messages.first()
    }
}
