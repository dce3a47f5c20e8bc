//! High-level transactional [`TimelineStore`] API.
//!
//! Composes the repositories into atomic, room-centric methods. Every write
//! method runs inside a single SQLite transaction — callers never observe
//! partial state.

use tracing::{debug, instrument};

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use hearth_core::{FetchedBatch, RoomEvent};

use crate::errors::{Result, StoreError};
use crate::sqlite::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::sqlite::migrations::run_migrations;
use crate::sqlite::repositories::event::EventRepo;
use crate::sqlite::repositories::room::RoomRepo;
use crate::sqlite::row_types::{EventRow, RoomRow};

/// Result of persisting one fetched page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedPage {
    /// Events newly inserted (duplicates in the page are skipped).
    pub inserted: usize,
    /// The room's new boundary event id after the page, if any row exists.
    pub new_boundary: Option<String>,
    /// Whether upstream history is exhausted past this page.
    pub exhausted: bool,
}

/// Timeline store wrapping a connection pool and the repositories.
///
/// INVARIANT: writes are serialized per-room via in-process mutex locks
/// (`with_room_write_lock`), so pagination bookkeeping for one room is never
/// mutated concurrently. `preceding_batch`/`preceding_stored` change only
/// inside `apply_page`'s transaction, after the whole page is inserted.
pub struct TimelineStore {
    pool: ConnectionPool,
    room_write_locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl TimelineStore {
    const SQLITE_BUSY_MAX_RETRIES: u32 = 32;

    /// Create a store over an existing pool. The schema must already be
    /// migrated.
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            room_write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Open (or create) a database file, run migrations, and build a store.
    pub fn open(path: &Path) -> Result<Self> {
        let pool = connection::open(path, &ConnectionConfig::default())?;
        {
            let conn = pool.get()?;
            run_migrations(&conn)?;
        }
        Ok(Self::new(pool))
    }

    /// In-memory store with a migrated schema, for tests.
    pub fn in_memory() -> Result<Self> {
        let pool = connection::new_in_memory(&ConnectionConfig::default())?;
        {
            let conn = pool.get()?;
            run_migrations(&conn)?;
        }
        Ok(Self::new(pool))
    }

    fn acquire_room_write_lock(&self, room_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .room_write_locks
            .lock()
            .map_err(|_| StoreError::Internal("room lock map poisoned".into()))?;

        // Opportunistically prune dead weak refs when the map grows.
        if locks.len() > 128 {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(room_id).and_then(Weak::upgrade) {
            return Ok(existing);
        }

        let lock = Arc::new(Mutex::new(()));
        let _ = locks.insert(room_id.to_string(), Arc::downgrade(&lock));
        Ok(lock)
    }

    fn with_room_write_lock<T>(&self, room_id: &str, f: impl FnMut() -> Result<T>) -> Result<T> {
        let room_lock = self.acquire_room_write_lock(room_id)?;
        let _guard: MutexGuard<'_, ()> = room_lock
            .lock()
            .map_err(|_| StoreError::Internal("room write lock poisoned".into()))?;
        self.retry_on_sqlite_busy(f)
    }

    /// Retry an operation on SQLite BUSY/LOCKED with linear backoff + jitter.
    #[allow(clippy::unused_self)]
    fn retry_on_sqlite_busy<T>(&self, mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempts = 0;

        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(err)
                    if Self::is_sqlite_busy_or_locked(&err)
                        && attempts < Self::SQLITE_BUSY_MAX_RETRIES =>
                {
                    attempts += 1;
                    let base_ms = u64::from(attempts).saturating_mul(10).min(500);
                    let jitter_range = base_ms / 4;
                    let jitter = if jitter_range > 0 {
                        rand::random::<u64>() % (jitter_range * 2 + 1)
                    } else {
                        0
                    };
                    let backoff_ms = base_ms.saturating_sub(jitter_range) + jitter;
                    std::thread::sleep(Duration::from_millis(backoff_ms));
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn is_sqlite_busy_or_locked(err: &StoreError) -> bool {
        match err {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(code, _)) => {
                matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
            }
            _ => false,
        }
    }

    /// Get a connection from the pool.
    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────

    /// Store an event received outside pagination (live receipt).
    ///
    /// Creates the room row on demand. The new row starts with
    /// `preceding_stored = false`: nothing is known yet about history older
    /// than it. `preceding_batch` records the resume token when the receipt
    /// carried one.
    #[instrument(skip(self, event), fields(room_id = %event.room_id, event_id = %event.event_id))]
    pub fn save_event(&self, event: &RoomEvent, preceding_batch: Option<&str>) -> Result<EventRow> {
        let room_id = event.room_id.as_str().to_string();
        self.with_room_write_lock(&room_id, || {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;

            let _ = RoomRepo::get_or_create(&tx, &room_id)?;
            let row = event_to_row(event, preceding_batch, false);
            let _ = EventRepo::insert(&tx, &row)?;
            tx.commit()?;

            EventRepo::get(&conn, &row.event_id)?
                .ok_or_else(|| StoreError::EventNotFound(row.event_id.clone()))
        })
    }

    /// Persist one fetched page and update the boundary bookkeeping.
    ///
    /// Atomic: page insertion, the boundary row's `preceding_stored` flip,
    /// and the new oldest row's `preceding_batch` all land in a single
    /// transaction. A page replayed after a crash is harmless — duplicate
    /// event ids are ignored and bookkeeping for pre-existing rows is left
    /// alone.
    ///
    /// When `page.prev_key` is `None`, upstream history is exhausted: the
    /// new oldest row is stored with `preceding_stored = true` so no
    /// further pagination is attempted past it. An empty page exhausts the
    /// boundary row itself.
    #[instrument(skip(self, page), fields(events = page.messages.len()))]
    pub fn apply_page(
        &self,
        room_id: &str,
        boundary_event_id: &str,
        page: &FetchedBatch,
    ) -> Result<AppliedPage> {
        self.with_room_write_lock(room_id, || {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;

            let boundary = EventRepo::get(&tx, boundary_event_id)?
                .ok_or_else(|| StoreError::EventNotFound(boundary_event_id.to_string()))?;
            if boundary.room_id != room_id {
                return Err(StoreError::Internal(format!(
                    "boundary event {boundary_event_id} belongs to {}, not {room_id}",
                    boundary.room_id
                )));
            }

            // Already applied (or history exhausted) — nothing to do.
            if boundary.preceding_stored {
                return Ok(AppliedPage {
                    inserted: 0,
                    new_boundary: EventRepo::oldest(&tx, room_id)?.map(|r| r.event_id),
                    exhausted: boundary.preceding_batch.is_none(),
                });
            }

            let exhausted = page.prev_key.is_none();
            let mut inserted = 0usize;
            for (idx, event) in page.messages.iter().enumerate() {
                let is_page_oldest = idx == 0;
                let row = if is_page_oldest {
                    // The page's oldest row carries the continuation token;
                    // a null token means nothing precedes it upstream.
                    event_to_row(event, page.prev_key.as_deref(), exhausted)
                } else {
                    // Interior rows have their predecessor in the same page.
                    event_to_row(event, None, true)
                };
                if EventRepo::insert(&tx, &row)? {
                    inserted += 1;
                }
            }

            let _ = EventRepo::mark_preceding_stored(&tx, boundary_event_id)?;
            if page.messages.is_empty() && exhausted {
                debug!(room_id, "empty terminal page, boundary marked exhausted");
            }

            let new_boundary = EventRepo::oldest(&tx, room_id)?.map(|r| r.event_id);
            tx.commit()?;

            Ok(AppliedPage {
                inserted,
                new_boundary,
                exhausted,
            })
        })
    }

    /// Record the continuation token for an event.
    pub fn set_preceding_token(&self, event_id: &str, token: Option<&str>) -> Result<bool> {
        self.retry_on_sqlite_busy(|| {
            let conn = self.conn()?;
            EventRepo::set_preceding_batch(&conn, event_id, token)
        })
    }

    /// Mark an event's preceding history as stored.
    pub fn mark_preceding_stored(&self, event_id: &str) -> Result<bool> {
        self.retry_on_sqlite_busy(|| {
            let conn = self.conn()?;
            EventRepo::mark_preceding_stored(&conn, event_id)
        })
    }

    /// Update cached room display state.
    pub fn set_room_name(&self, room_id: &str, name: Option<&str>) -> Result<bool> {
        self.with_room_write_lock(room_id, || {
            let conn = self.conn()?;
            RoomRepo::set_name(&conn, room_id, name)
        })
    }

    /// Update the cached room avatar URI.
    pub fn set_room_avatar(&self, room_id: &str, avatar_url: Option<&str>) -> Result<bool> {
        self.with_room_write_lock(room_id, || {
            let conn = self.conn()?;
            RoomRepo::set_avatar(&conn, room_id, avatar_url)
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Get an event by id.
    pub fn event(&self, event_id: &str) -> Result<Option<EventRow>> {
        let conn = self.conn()?;
        EventRepo::get(&conn, event_id)
    }

    /// The oldest stored event of a room (the boundary row).
    pub fn oldest_event(&self, room_id: &str) -> Result<Option<EventRow>> {
        let conn = self.conn()?;
        EventRepo::oldest(&conn, room_id)
    }

    /// The newest stored event of a room.
    pub fn newest_event(&self, room_id: &str) -> Result<Option<EventRow>> {
        let conn = self.conn()?;
        EventRepo::newest(&conn, room_id)
    }

    /// Stored timeline slice, oldest first.
    pub fn timeline(&self, room_id: &str, limit: Option<i64>) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        EventRepo::timeline(&conn, room_id, limit)
    }

    /// Count events stored for a room.
    pub fn event_count(&self, room_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        EventRepo::count(&conn, room_id)
    }

    /// Get a room row.
    pub fn room(&self, room_id: &str) -> Result<Option<RoomRow>> {
        let conn = self.conn()?;
        RoomRepo::get(&conn, room_id)
    }

    /// List all cached rooms.
    pub fn rooms(&self) -> Result<Vec<RoomRow>> {
        let conn = self.conn()?;
        RoomRepo::list(&conn)
    }
}

fn event_to_row(
    event: &RoomEvent,
    preceding_batch: Option<&str>,
    preceding_stored: bool,
) -> EventRow {
    EventRow {
        event_id: event.event_id.as_str().to_string(),
        room_id: event.room_id.as_str().to_string(),
        sender: event.sender.as_str().to_string(),
        event_type: event.kind.as_str().to_string(),
        origin_server_ts: event.origin_server_ts,
        state_key: event.state_key.clone(),
        content: event.content.to_string(),
        preceding_batch: preceding_batch.map(str::to_string),
        preceding_stored,
        inserted_at: chrono::Utc::now().to_rfc3339(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
