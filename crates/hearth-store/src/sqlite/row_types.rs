//! Row structs mirroring the SQLite schema.

use hearth_core::{EventId, EventKind, RoomEvent, RoomId, UserId};

use crate::errors::Result;

/// A persisted room timeline event.
///
/// `preceding_stored == false` marks a boundary row: older history has not
/// yet been fetched past it. `preceding_batch` holds the continuation token
/// to resume backward pagination, or `None` when the only way to resume is
/// a context lookup on the event itself.
#[derive(Clone, Debug, PartialEq)]
pub struct EventRow {
    /// Globally unique event id.
    pub event_id: String,
    /// Owning room.
    pub room_id: String,
    /// Sending user.
    pub sender: String,
    /// Event type string.
    pub event_type: String,
    /// Server timestamp, milliseconds.
    pub origin_server_ts: i64,
    /// State key for state events.
    pub state_key: Option<String>,
    /// Event content as JSON text.
    pub content: String,
    /// Continuation token for fetching older history, if recorded.
    pub preceding_batch: Option<String>,
    /// Whether the history immediately preceding this event is stored.
    pub preceding_stored: bool,
    /// Local insertion timestamp (RFC 3339).
    pub inserted_at: String,
}

impl EventRow {
    /// Reconstruct the domain event from this row.
    pub fn to_event(&self) -> Result<RoomEvent> {
        Ok(RoomEvent {
            event_id: EventId::new(self.event_id.clone()),
            room_id: RoomId::new(self.room_id.clone()),
            sender: UserId::new(self.sender.clone()),
            kind: EventKind::from(self.event_type.as_str()),
            origin_server_ts: self.origin_server_ts,
            state_key: self.state_key.clone(),
            content: serde_json::from_str(&self.content)?,
        })
    }
}

/// A cached room with its latest known display state.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomRow {
    /// Room id.
    pub room_id: String,
    /// Latest known room name, if any.
    pub name: Option<String>,
    /// Latest known avatar `mxc://` URI, if any.
    pub avatar_url: Option<String>,
    /// Local creation timestamp (RFC 3339).
    pub created_at: String,
}
