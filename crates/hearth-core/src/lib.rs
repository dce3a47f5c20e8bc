//! # hearth-core
//!
//! Foundation types for the hearth room-history engine.
//!
//! This crate provides the shared vocabulary the other hearth crates depend on:
//!
//! - **Branded IDs**: [`ids::RoomId`], [`ids::EventId`], [`ids::UserId`] as newtypes
//! - **Events**: [`events::RoomEvent`] with the [`events::EventKind`] discriminator
//! - **Pages**: [`events::FetchedBatch`], one normalized page of backward history
//! - **Ordering**: timeline ordering with a deterministic event-id tie-break
//! - **Logging**: [`logging::init`] for binaries
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other hearth crates.

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;

pub use events::{EventKind, FetchedBatch, RoomEvent};
pub use ids::{EventId, IdParseError, RoomId, UserId};
