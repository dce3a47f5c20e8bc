//! Schema migrations, applied in order and tracked via `PRAGMA user_version`.

use rusqlite::Connection;
use tracing::debug;

use crate::errors::Result;

const MIGRATIONS: &[&str] = &[
    // v1: rooms and timeline events with backward-pagination bookkeeping.
    "CREATE TABLE rooms (
        room_id TEXT PRIMARY KEY,
        name TEXT,
        avatar_url TEXT,
        created_at TEXT NOT NULL
    );
    CREATE TABLE room_events (
        event_id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL REFERENCES rooms(room_id),
        sender TEXT NOT NULL,
        type TEXT NOT NULL,
        origin_server_ts INTEGER NOT NULL,
        state_key TEXT,
        content TEXT NOT NULL,
        preceding_batch TEXT,
        preceding_stored INTEGER NOT NULL DEFAULT 0,
        inserted_at TEXT NOT NULL
    );
    CREATE INDEX idx_room_events_timeline
        ON room_events (room_id, origin_server_ts, event_id);",
];

/// Bring the schema up to the latest version.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    for (idx, migration) in MIGRATIONS.iter().enumerate().skip(version as usize) {
        conn.execute_batch(migration)?;
        conn.pragma_update(None, "user_version", idx as i64 + 1)?;
        debug!(version = idx + 1, "applied schema migration");
    }
    Ok(())
}
