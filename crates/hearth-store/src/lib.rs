//! # hearth-store
//!
//! SQLite-backed storage for room timelines and backward-pagination
//! bookkeeping.
//!
//! Layout follows the repository pattern: `sqlite::repositories` hold
//! stateless per-table operations taking `&Connection`, and
//! [`store::TimelineStore`] composes them into transactional, per-room
//! serialized methods. Rows are never deleted by this subsystem; the only
//! mutation after insert is flipping the `preceding_batch` /
//! `preceding_stored` bookkeeping once older history has been fetched.

#![deny(unsafe_code)]

pub mod errors;
pub mod sqlite;
pub mod store;

pub use errors::{Result, StoreError};
pub use sqlite::row_types::{EventRow, RoomRow};
pub use store::{AppliedPage, TimelineStore};
