//! Per-room fetch coordination: one pagination in flight per room, with an
//! observable loading signal.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use hearth_client::PaginationSource;
use hearth_store::{EventRow, TimelineStore};

use crate::pager;

struct InFlight {
    event_id: String,
    signal: watch::Receiver<bool>,
}

/// Coordinates backward pagination per room.
///
/// At most one pager call is outstanding per room at a time: continuation
/// tokens are room-global, and a racing second fetch could insert a
/// duplicate or out-of-order page. Duplicate requests for the same boundary
/// row coalesce into the in-flight operation; requests for a different
/// boundary of a busy room are rejected and resolve immediately.
///
/// The returned `watch::Receiver<bool>` is the loading signal: `true` while
/// the fetch is in flight, flipped to `false` after the page is persisted
/// or the fetch failed. Observers dropping their receiver never cancels the
/// fetch — a fetched page is always persisted, so nothing is thrown away.
pub struct FetchCoordinator {
    source: Arc<dyn PaginationSource>,
    store: Arc<TimelineStore>,
    page_limit: u32,
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
}

impl FetchCoordinator {
    /// Coordinator with the default page size.
    pub fn new(source: Arc<dyn PaginationSource>, store: Arc<TimelineStore>) -> Self {
        Self::with_page_limit(source, store, pager::DEFAULT_PAGE_LIMIT)
    }

    /// Coordinator requesting `page_limit` events per page.
    pub fn with_page_limit(
        source: Arc<dyn PaginationSource>,
        store: Arc<TimelineStore>,
        page_limit: u32,
    ) -> Self {
        Self {
            source,
            store,
            page_limit,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Request the page preceding `row` and return the loading signal.
    ///
    /// Rows whose preceding history is already stored (including exhausted
    /// boundaries) resolve immediately without a network call.
    pub fn fetch_preceding_rows(&self, row: &EventRow) -> watch::Receiver<bool> {
        if row.preceding_stored {
            debug!(event_id = %row.event_id, "preceding history already stored");
            return settled();
        }

        let mut in_flight = self.in_flight.lock();
        if let Some(flight) = in_flight.get(&row.room_id) {
            if flight.event_id == row.event_id {
                counter!("hearth_fetch_coalesced_total").increment(1);
                debug!(room_id = %row.room_id, "joining in-flight pagination");
                return flight.signal.clone();
            }
            // Tokens are room-global; racing a second boundary would
            // corrupt the preceding_batch chain.
            debug!(
                room_id = %row.room_id,
                event_id = %row.event_id,
                "room already paginating from another boundary, rejecting"
            );
            return settled();
        }
        let (tx, rx) = watch::channel(true);
        let _ = in_flight.insert(
            row.room_id.clone(),
            InFlight {
                event_id: row.event_id.clone(),
                signal: rx.clone(),
            },
        );
        drop(in_flight);
        self.spawn_fetch(tx, row.clone());
        rx
    }

    /// Whether a pagination is currently in flight for the room.
    pub fn is_fetching(&self, room_id: &str) -> bool {
        self.in_flight.lock().contains_key(room_id)
    }

    fn spawn_fetch(&self, tx: watch::Sender<bool>, row: EventRow) {
        let source = Arc::clone(&self.source);
        let store = Arc::clone(&self.store);
        let in_flight = Arc::clone(&self.in_flight);
        let limit = self.page_limit;
        let _ = tokio::spawn(async move {
            match pager::fetch_preceding(source.as_ref(), &row, limit).await {
                Ok(batch) => {
                    let exhausted = batch.is_exhausted();
                    match store.apply_page(&row.room_id, &row.event_id, &batch) {
                        Ok(applied) => {
                            counter!("hearth_pages_fetched_total").increment(1);
                            info!(
                                room_id = %row.room_id,
                                inserted = applied.inserted,
                                exhausted,
                                "persisted history page"
                            );
                        }
                        Err(e) => {
                            counter!("hearth_fetch_failures_total").increment(1);
                            warn!(room_id = %row.room_id, error = %e, "failed to persist fetched page");
                        }
                    }
                }
                Err(e) => {
                    counter!("hearth_fetch_failures_total").increment(1);
                    warn!(
                        room_id = %row.room_id,
                        event_id = %row.event_id,
                        error = %e,
                        "backward pagination failed"
                    );
                }
            }
            // Remove the room before flipping the signal, so an observer
            // that sees `false` can immediately retry from the same row.
            let _ = in_flight.lock().remove(&row.room_id);
            let _ = tx.send(false);
        });
    }
}

/// A loading signal that is already resolved.
fn settled() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    drop(tx);
    rx
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ScriptedSource, boundary_row, raw_event, store_with_boundary};
    use hearth_client::{ClientError, SessionHandle};

    async fn wait_idle(rx: &mut watch::Receiver<bool>) {
        while *rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    fn coordinator(
        source: Arc<ScriptedSource>,
        store: Arc<TimelineStore>,
    ) -> FetchCoordinator {
        FetchCoordinator::with_page_limit(source, store, 10)
    }

    #[tokio::test]
    async fn fetch_persists_page_and_bookkeeping() {
        let (store, row) = store_with_boundary(Some("t1"));
        let store = Arc::new(store);
        let source = Arc::new(ScriptedSource::new());
        source.push_chunk(vec![raw_event("$e0b", 900), raw_event("$e0a", 800)], Some("t0"));

        let c = coordinator(Arc::clone(&source), Arc::clone(&store));
        let mut signal = c.fetch_preceding_rows(&row);
        wait_idle(&mut signal).await;

        assert_eq!(source.messages_calls(), 1);
        let boundary = store.event("$e1").unwrap().unwrap();
        assert!(boundary.preceding_stored);
        let oldest = store.oldest_event("!r:example.org").unwrap().unwrap();
        assert_eq!(oldest.event_id, "$e0a");
        assert_eq!(oldest.preceding_batch.as_deref(), Some("t0"));
        assert!(!c.is_fetching("!r:example.org"));
    }

    #[tokio::test]
    async fn concurrent_requests_for_same_row_coalesce() {
        let (store, row) = store_with_boundary(Some("t1"));
        let store = Arc::new(store);
        let source = Arc::new(ScriptedSource::gated());
        source.push_chunk(vec![raw_event("$e0", 900)], Some("t0"));

        let c = coordinator(Arc::clone(&source), store);
        let mut first = c.fetch_preceding_rows(&row);
        let second = c.fetch_preceding_rows(&row);
        assert!(*first.borrow());
        assert!(*second.borrow());
        assert!(c.is_fetching("!r:example.org"));

        source.release(1);
        wait_idle(&mut first).await;

        assert_eq!(source.messages_calls(), 1);
        assert!(!*second.borrow());
    }

    #[tokio::test]
    async fn different_boundary_rejected_while_room_is_busy() {
        let (store, row) = store_with_boundary(Some("t1"));
        let store = Arc::new(store);
        let source = Arc::new(ScriptedSource::gated());
        source.push_chunk(vec![raw_event("$e0", 900)], Some("t0"));

        let c = coordinator(Arc::clone(&source), store);
        let mut first = c.fetch_preceding_rows(&row);

        let other = boundary_row("$e2", 2000, Some("t9"));
        let rejected = c.fetch_preceding_rows(&other);
        assert!(!*rejected.borrow());

        source.release(1);
        wait_idle(&mut first).await;
        assert_eq!(source.messages_calls(), 1);
    }

    #[tokio::test]
    async fn failure_flips_signal_without_touching_store() {
        let (store, row) = store_with_boundary(Some("t1"));
        let store = Arc::new(store);
        let source = Arc::new(ScriptedSource::new());
        source.push_messages_err(ClientError::Server {
            status: 500,
            errcode: "M_UNKNOWN".into(),
            message: "internal".into(),
        });

        let c = coordinator(Arc::clone(&source), Arc::clone(&store));
        let mut signal = c.fetch_preceding_rows(&row);
        wait_idle(&mut signal).await;

        // Bookkeeping untouched: an identical retry stays valid.
        let boundary = store.event("$e1").unwrap().unwrap();
        assert!(!boundary.preceding_stored);
        assert_eq!(boundary.preceding_batch.as_deref(), Some("t1"));
        assert_eq!(store.event_count("!r:example.org").unwrap(), 1);

        // And the retry succeeds from the same row.
        source.push_chunk(vec![raw_event("$e0", 900)], Some("t0"));
        let mut retry = c.fetch_preceding_rows(&row);
        wait_idle(&mut retry).await;
        assert_eq!(source.messages_calls(), 2);
        assert_eq!(store.event_count("!r:example.org").unwrap(), 2);
    }

    #[tokio::test]
    async fn exhausted_history_is_terminal() {
        let (store, row) = store_with_boundary(None);
        let store = Arc::new(store);
        let source = Arc::new(ScriptedSource::new());
        // Context fallback: one event before, no start token — exhausted.
        source.push_context(vec![raw_event("$e0", 900)], None);

        let c = coordinator(Arc::clone(&source), Arc::clone(&store));
        let mut signal = c.fetch_preceding_rows(&row);
        wait_idle(&mut signal).await;

        assert_eq!(source.context_calls(), 1);
        let oldest = store.oldest_event("!r:example.org").unwrap().unwrap();
        assert_eq!(oldest.event_id, "$e0");
        assert!(oldest.preceding_stored);
        assert!(oldest.preceding_batch.is_none());

        // No further fetch is attempted past the exhausted boundary.
        let again = c.fetch_preceding_rows(&oldest);
        assert!(!*again.borrow());
        assert_eq!(source.messages_calls(), 0);
        assert_eq!(source.context_calls(), 1);
    }

    #[tokio::test]
    async fn stored_boundary_resolves_immediately() {
        let (store, row) = store_with_boundary(Some("t1"));
        let store = Arc::new(store);
        let _ = store.mark_preceding_stored(&row.event_id).unwrap();
        let stored = store.event(&row.event_id).unwrap().unwrap();

        let source = Arc::new(ScriptedSource::new());
        let c = coordinator(Arc::clone(&source), store);
        let signal = c.fetch_preceding_rows(&stored);
        assert!(!*signal.borrow());
        assert_eq!(source.messages_calls(), 0);
    }

    #[tokio::test]
    async fn missing_session_fails_fetch_and_clears_signal() {
        let (store, row) = store_with_boundary(Some("t1"));
        let store = Arc::new(store);
        let handle: Arc<dyn PaginationSource> = Arc::new(SessionHandle::new());

        let c = FetchCoordinator::new(handle, Arc::clone(&store));
        let mut signal = c.fetch_preceding_rows(&row);
        wait_idle(&mut signal).await;

        assert!(!c.is_fetching("!r:example.org"));
        assert_eq!(store.event_count("!r:example.org").unwrap(), 1);
    }

    #[tokio::test]
    async fn rooms_paginate_independently() {
        let (store, row) = store_with_boundary(Some("t1"));
        let store = Arc::new(store);
        let other_room = {
            let event = hearth_core::RoomEvent {
                event_id: hearth_core::EventId::new("$f1"),
                room_id: hearth_core::RoomId::new("!other:example.org"),
                sender: hearth_core::UserId::new("@alice:example.org"),
                kind: hearth_core::EventKind::Message,
                origin_server_ts: 1000,
                state_key: None,
                content: serde_json::json!({}),
            };
            store.save_event(&event, Some("u1")).unwrap()
        };

        let source = Arc::new(ScriptedSource::gated());
        source.push_chunk(vec![raw_event("$e0", 900)], Some("t0"));
        source.push_chunk(vec![], None);

        let c = coordinator(Arc::clone(&source), Arc::clone(&store));
        let mut a = c.fetch_preceding_rows(&row);
        let mut b = c.fetch_preceding_rows(&other_room);
        assert!(c.is_fetching("!r:example.org"));
        assert!(c.is_fetching("!other:example.org"));

        source.release(2);
        wait_idle(&mut a).await;
        wait_idle(&mut b).await;
        assert_eq!(source.messages_calls(), 2);
    }
}
