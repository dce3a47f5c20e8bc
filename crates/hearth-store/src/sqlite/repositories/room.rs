//! Room repository — CRUD for the `rooms` table.
//!
//! A room row caches the latest display state (name, avatar) alongside the
//! timeline; rows are created on demand when the first event of a room is
//! stored.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::sqlite::row_types::RoomRow;

/// Room repository — stateless, every method takes `&Connection`.
pub struct RoomRepo;

impl RoomRepo {
    /// Create a new room row.
    pub fn create(conn: &Connection, room_id: &str) -> Result<RoomRow> {
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO rooms (room_id, name, avatar_url, created_at) VALUES (?1, NULL, NULL, ?2)",
            params![room_id, now],
        )?;
        Ok(RoomRow {
            room_id: room_id.to_string(),
            name: None,
            avatar_url: None,
            created_at: now,
        })
    }

    /// Get a room by id.
    pub fn get(conn: &Connection, room_id: &str) -> Result<Option<RoomRow>> {
        let row = conn
            .query_row(
                "SELECT room_id, name, avatar_url, created_at FROM rooms WHERE room_id = ?1",
                params![room_id],
                |row| {
                    Ok(RoomRow {
                        room_id: row.get(0)?,
                        name: row.get(1)?,
                        avatar_url: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Get an existing room, or create it.
    pub fn get_or_create(conn: &Connection, room_id: &str) -> Result<RoomRow> {
        if let Some(room) = Self::get(conn, room_id)? {
            return Ok(room);
        }
        Self::create(conn, room_id)
    }

    /// Update the cached room name. `None` records the name as unset.
    pub fn set_name(conn: &Connection, room_id: &str, name: Option<&str>) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE rooms SET name = ?1 WHERE room_id = ?2",
            params![name, room_id],
        )?;
        Ok(changed > 0)
    }

    /// Update the cached avatar URI.
    pub fn set_avatar(conn: &Connection, room_id: &str, avatar_url: Option<&str>) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE rooms SET avatar_url = ?1 WHERE room_id = ?2",
            params![avatar_url, room_id],
        )?;
        Ok(changed > 0)
    }

    /// List all rooms, oldest first.
    pub fn list(conn: &Connection) -> Result<Vec<RoomRow>> {
        let mut stmt = conn.prepare(
            "SELECT room_id, name, avatar_url, created_at FROM rooms ORDER BY created_at, room_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RoomRow {
                    room_id: row.get(0)?,
                    name: row.get(1)?,
                    avatar_url: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn create_room() {
        let conn = setup();
        let room = RoomRepo::create(&conn, "!r:example.org").unwrap();
        assert_eq!(room.room_id, "!r:example.org");
        assert!(room.name.is_none());
    }

    #[test]
    fn create_duplicate_fails() {
        let conn = setup();
        RoomRepo::create(&conn, "!r:example.org").unwrap();
        assert!(RoomRepo::create(&conn, "!r:example.org").is_err());
    }

    #[test]
    fn get_missing_room() {
        let conn = setup();
        assert!(RoomRepo::get(&conn, "!missing:example.org").unwrap().is_none());
    }

    #[test]
    fn get_or_create_reuses_row() {
        let conn = setup();
        let a = RoomRepo::get_or_create(&conn, "!r:example.org").unwrap();
        let b = RoomRepo::get_or_create(&conn, "!r:example.org").unwrap();
        assert_eq!(a.created_at, b.created_at);
    }

    #[test]
    fn set_name_and_avatar() {
        let conn = setup();
        RoomRepo::create(&conn, "!r:example.org").unwrap();
        assert!(RoomRepo::set_name(&conn, "!r:example.org", Some("Lobby")).unwrap());
        assert!(
            RoomRepo::set_avatar(&conn, "!r:example.org", Some("mxc://example.org/abc")).unwrap()
        );

        let room = RoomRepo::get(&conn, "!r:example.org").unwrap().unwrap();
        assert_eq!(room.name.as_deref(), Some("Lobby"));
        assert_eq!(room.avatar_url.as_deref(), Some("mxc://example.org/abc"));

        assert!(RoomRepo::set_name(&conn, "!r:example.org", None).unwrap());
        let room = RoomRepo::get(&conn, "!r:example.org").unwrap().unwrap();
        assert!(room.name.is_none());
    }

    #[test]
    fn set_name_on_missing_room() {
        let conn = setup();
        assert!(!RoomRepo::set_name(&conn, "!missing:example.org", Some("x")).unwrap());
    }

    #[test]
    fn list_rooms() {
        let conn = setup();
        RoomRepo::create(&conn, "!a:example.org").unwrap();
        RoomRepo::create(&conn, "!b:example.org").unwrap();
        let rooms = RoomRepo::list(&conn).unwrap();
        assert_eq!(rooms.len(), 2);
    }
}
