//! Client error taxonomy.
//!
//! `NoActiveSession` is fatal to the attempt and never retried here.
//! `Network` is transient — whether to retry is the caller's decision.
//! `Server` carries the protocol-level rejection verbatim.

use thiserror::Error;

/// Errors surfaced by the remote fetch client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No authenticated client is installed in the session handle.
    #[error("no active session")]
    NoActiveSession,

    /// Transport-level failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server rejected the request.
    #[error("server rejected request ({status} {errcode}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Matrix error code, e.g. `M_FORBIDDEN`.
        errcode: String,
        /// Human-readable server message.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// A malformed `mxc://` URI.
    #[error("invalid mxc uri: {0}")]
    BadMxc(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
