//! # hearth-client
//!
//! Matrix client-server API access for the history engine: backward
//! pagination (`/messages`), context lookup (`/context`), and media
//! download, plus explicit session handling.
//!
//! The session is always passed in — there is no ambient "current client"
//! global. Login/logout swap the client held by a [`SessionHandle`]; a
//! request through an empty handle fails with
//! [`ClientError::NoActiveSession`].
//!
//! The client performs no retries: transient failures are surfaced as
//! [`ClientError::Network`] and retry policy stays with the caller.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod mxc;
pub mod session;
pub mod source;
pub mod types;

pub use client::MatrixClient;
pub use errors::{ClientError, Result};
pub use mxc::MxcUri;
pub use reqwest::Url;
pub use session::{Session, SessionHandle};
pub use source::{MediaSource, PaginationSource};
pub use types::{Direction, EventContext, MessageChunk, RawEvent};
