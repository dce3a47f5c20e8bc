//! Shared test doubles for the pager and coordinator tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use hearth_client::types::{EventContext, MessageChunk, RawEvent};
use hearth_client::{ClientError, PaginationSource};
use hearth_core::{EventId, RoomEvent, RoomId, UserId};
use hearth_store::{EventRow, TimelineStore};

pub(crate) fn raw_event(id: &str, ts: i64) -> RawEvent {
    serde_json::from_value(serde_json::json!({
        "event_id": id,
        "sender": "@bob:example.org",
        "type": "m.room.message",
        "origin_server_ts": ts,
        "content": {"body": "hi"}
    }))
    .expect("valid raw event")
}

pub(crate) fn boundary_row(event_id: &str, ts: i64, token: Option<&str>) -> EventRow {
    EventRow {
        event_id: event_id.to_string(),
        room_id: "!r:example.org".to_string(),
        sender: "@alice:example.org".to_string(),
        event_type: "m.room.message".to_string(),
        origin_server_ts: ts,
        state_key: None,
        content: r#"{"body":"boundary"}"#.to_string(),
        preceding_batch: token.map(str::to_string),
        preceding_stored: false,
        inserted_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

/// An in-memory store pre-seeded with one boundary event.
pub(crate) fn store_with_boundary(token: Option<&str>) -> (TimelineStore, EventRow) {
    let store = TimelineStore::in_memory().expect("in-memory store");
    let event = RoomEvent {
        event_id: EventId::new("$e1"),
        room_id: RoomId::new("!r:example.org"),
        sender: UserId::new("@alice:example.org"),
        kind: hearth_core::EventKind::Message,
        origin_server_ts: 1000,
        state_key: None,
        content: serde_json::json!({"body": "boundary"}),
    };
    let row = store.save_event(&event, token).expect("seed boundary");
    (store, row)
}

/// A pagination source answering from scripted queues.
///
/// Responses can be gated behind a semaphore so tests can hold a fetch
/// in flight deterministically.
pub(crate) struct ScriptedSource {
    messages: Mutex<VecDeque<Result<MessageChunk, ClientError>>>,
    contexts: Mutex<VecDeque<Result<EventContext, ClientError>>>,
    messages_calls: AtomicUsize,
    context_calls: AtomicUsize,
    gate: Semaphore,
}

impl ScriptedSource {
    /// A source that answers immediately.
    pub fn new() -> Self {
        Self::with_permits(Semaphore::MAX_PERMITS)
    }

    /// A source that holds every call until [`Self::release`].
    pub fn gated() -> Self {
        Self::with_permits(0)
    }

    fn with_permits(permits: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            contexts: Mutex::new(VecDeque::new()),
            messages_calls: AtomicUsize::new(0),
            context_calls: AtomicUsize::new(0),
            gate: Semaphore::new(permits),
        }
    }

    /// Let `n` gated calls proceed.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn messages_calls(&self) -> usize {
        self.messages_calls.load(Ordering::SeqCst)
    }

    pub fn context_calls(&self) -> usize {
        self.context_calls.load(Ordering::SeqCst)
    }

    /// Script one `/messages` response. `events` is newest-first, matching
    /// the wire order for backward pagination.
    pub fn push_chunk(&self, events: Vec<RawEvent>, end: Option<&str>) {
        let chunk = MessageChunk {
            chunk: events,
            start: Some("start".to_string()),
            end: end.map(str::to_string),
        };
        self.messages.lock().unwrap().push_back(Ok(chunk));
    }

    pub fn push_messages_err(&self, err: ClientError) {
        self.messages.lock().unwrap().push_back(Err(err));
    }

    /// Script one `/context` response. `events_before` is newest-first.
    pub fn push_context(&self, events_before: Vec<RawEvent>, start: Option<&str>) {
        let context = EventContext {
            event: None,
            events_before,
            start: start.map(str::to_string),
            end: None,
        };
        self.contexts.lock().unwrap().push_back(Ok(context));
    }
}

#[async_trait]
impl PaginationSource for ScriptedSource {
    async fn messages_before(
        &self,
        _room: &RoomId,
        _from: &str,
        _limit: u32,
    ) -> Result<MessageChunk, ClientError> {
        let _ = self.messages_calls.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        self.messages
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted messages call")
    }

    async fn context_before(
        &self,
        _room: &RoomId,
        _event: &EventId,
        _limit: u32,
    ) -> Result<EventContext, ClientError> {
        let _ = self.context_calls.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        self.contexts
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted context call")
    }
}
