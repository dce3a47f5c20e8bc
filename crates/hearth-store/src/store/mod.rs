//! High-level transactional store API.

mod timeline_store;

pub use timeline_store::{AppliedPage, TimelineStore};
