//! Branded ID newtypes for rooms, events, and users.
//!
//! IDs arriving from the server are taken at face value via [`RoomId::new`]
//! and friends; IDs typed by a person (CLI flags, config) go through
//! [`FromStr`], which checks the leading sigil and, where the grammar
//! requires one, the `:server` part.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to parse an identifier from untrusted input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    /// The value does not begin with the sigil the grammar requires.
    #[error("{kind} id must start with '{sigil}': {value:?}")]
    MissingSigil {
        /// Human name of the id class.
        kind: &'static str,
        /// Required leading character.
        sigil: char,
        /// The offending input.
        value: String,
    },
    /// The value has no `:server` part.
    #[error("{kind} id is missing the ':server' part: {value:?}")]
    MissingServer {
        /// Human name of the id class.
        kind: &'static str,
        /// The offending input.
        value: String,
    },
}

macro_rules! branded_id {
    ($(#[$doc:meta])* $name:ident, $kind:literal, $sigil:literal, server: $server:literal) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a server-supplied value without validation.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The part after the first ':', if any.
            pub fn server_name(&self) -> Option<&str> {
                self.0.split_once(':').map(|(_, s)| s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if !s.starts_with($sigil) || s.len() < 2 {
                    return Err(IdParseError::MissingSigil {
                        kind: $kind,
                        sigil: $sigil,
                        value: s.to_string(),
                    });
                }
                if $server && s.split_once(':').is_none_or(|(_, srv)| srv.is_empty()) {
                    return Err(IdParseError::MissingServer {
                        kind: $kind,
                        value: s.to_string(),
                    });
                }
                Ok(Self(s.to_string()))
            }
        }
    };
}

branded_id!(
    /// A room identifier (`!opaque:server`).
    RoomId, "room", '!', server: true
);

branded_id!(
    /// An event identifier (`$opaque`). Modern event ids carry no server
    /// part, so only the sigil is checked.
    EventId, "event", '$', server: false
);

branded_id!(
    /// A user identifier (`@local:server`).
    UserId, "user", '@', server: true
);
