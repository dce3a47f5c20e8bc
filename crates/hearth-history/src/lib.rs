//! # hearth-history
//!
//! On-demand backward pagination for room timelines.
//!
//! - [`pager::fetch_preceding`] retrieves one page of events strictly older
//!   than a stored boundary row, via the recorded continuation token or the
//!   context-lookup fallback. It never touches storage.
//! - [`coordinator::FetchCoordinator`] serializes pagination per room,
//!   coalesces duplicate requests for the same boundary, persists results,
//!   and broadcasts a loading signal observers can watch.
//! - [`media::MediaCache`] is the bounded cache of deferred media
//!   downloads, one shared in-flight future per URI.
//! - [`latest::Latest`] is a latest-value-wins broadcast cell for state
//!   that only ever matters in its newest version.

#![deny(unsafe_code)]

pub mod coordinator;
pub mod latest;
pub mod media;
pub mod pager;

#[cfg(test)]
pub(crate) mod testutil;

pub use coordinator::FetchCoordinator;
pub use latest::Latest;
pub use media::MediaCache;
pub use pager::{DEFAULT_PAGE_LIMIT, fetch_preceding};
