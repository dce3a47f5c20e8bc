//! Event repository — timeline rows and pagination bookkeeping.
//!
//! Inserts are idempotent on the event id: a page replayed after a partial
//! failure cannot produce duplicates. Timeline queries order by
//! `(origin_server_ts, event_id)`, the same tie-break the domain layer uses.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::Result;
use crate::sqlite::row_types::EventRow;

const SELECT_COLUMNS: &str = "event_id, room_id, sender, type, origin_server_ts, state_key, \
                              content, preceding_batch, preceding_stored, inserted_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        event_id: row.get(0)?,
        room_id: row.get(1)?,
        sender: row.get(2)?,
        event_type: row.get(3)?,
        origin_server_ts: row.get(4)?,
        state_key: row.get(5)?,
        content: row.get(6)?,
        preceding_batch: row.get(7)?,
        preceding_stored: row.get(8)?,
        inserted_at: row.get(9)?,
    })
}

/// Event repository — stateless, every method takes `&Connection`.
pub struct EventRepo;

impl EventRepo {
    /// Insert an event row. Returns `false` when an event with the same id
    /// is already stored (the existing row is left untouched).
    pub fn insert(conn: &Connection, row: &EventRow) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO room_events
                 (event_id, room_id, sender, type, origin_server_ts, state_key,
                  content, preceding_batch, preceding_stored, inserted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                row.event_id,
                row.room_id,
                row.sender,
                row.event_type,
                row.origin_server_ts,
                row.state_key,
                row.content,
                row.preceding_batch,
                row.preceding_stored,
                row.inserted_at,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Get an event by id.
    pub fn get(conn: &Connection, event_id: &str) -> Result<Option<EventRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM room_events WHERE event_id = ?1"),
                params![event_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Stored timeline slice of a room in ascending timeline order.
    pub fn timeline(conn: &Connection, room_id: &str, limit: Option<i64>) -> Result<Vec<EventRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM room_events WHERE room_id = ?1
             ORDER BY origin_server_ts, event_id LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![room_id, limit.unwrap_or(-1)], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The boundary row: the oldest stored event of a room.
    pub fn oldest(conn: &Connection, room_id: &str) -> Result<Option<EventRow>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM room_events WHERE room_id = ?1
                     ORDER BY origin_server_ts, event_id LIMIT 1"
                ),
                params![room_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// The newest stored event of a room.
    pub fn newest(conn: &Connection, room_id: &str) -> Result<Option<EventRow>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM room_events WHERE room_id = ?1
                     ORDER BY origin_server_ts DESC, event_id DESC LIMIT 1"
                ),
                params![room_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Record the continuation token for fetching history older than an event.
    pub fn set_preceding_batch(
        conn: &Connection,
        event_id: &str,
        token: Option<&str>,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE room_events SET preceding_batch = ?1 WHERE event_id = ?2",
            params![token, event_id],
        )?;
        Ok(changed > 0)
    }

    /// Mark that the history immediately preceding an event is stored.
    pub fn mark_preceding_stored(conn: &Connection, event_id: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE room_events SET preceding_stored = 1 WHERE event_id = ?1",
            params![event_id],
        )?;
        Ok(changed > 0)
    }

    /// Count events stored for a room.
    pub fn count(conn: &Connection, room_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM room_events WHERE room_id = ?1",
            params![room_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
