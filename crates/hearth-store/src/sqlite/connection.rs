//! Connection pool construction and per-connection configuration.

use std::path::Path;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// Pool of SQLite connections.
pub type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;
/// A connection checked out of the pool.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool and pragma settings.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionConfig {
    /// Maximum number of pooled connections.
    pub max_size: u32,
    /// SQLite busy timeout per connection.
    pub busy_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

fn configure(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )
}

/// Open (or create) a database file and build a pool around it.
pub fn open(path: &Path, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let busy_timeout_ms = config.busy_timeout_ms;
    let manager =
        SqliteConnectionManager::file(path).with_init(move |c| configure(c, busy_timeout_ms));
    Ok(r2d2::Pool::builder().max_size(config.max_size).build(manager)?)
}

/// Build an in-memory pool for tests.
///
/// Capped at a single connection: every pooled connection to `:memory:`
/// would otherwise see its own empty database.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    let busy_timeout_ms = config.busy_timeout_ms;
    let manager =
        SqliteConnectionManager::memory().with_init(move |c| configure(c, busy_timeout_ms));
    Ok(r2d2::Pool::builder().max_size(1).build(manager)?)
}
