//! `mxc://` content URIs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ClientError;

/// A parsed `mxc://server/mediaId` content URI.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MxcUri {
    server: String,
    media_id: String,
}

impl MxcUri {
    /// The homeserver that owns the media.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// The opaque media id.
    pub fn media_id(&self) -> &str {
        &self.media_id
    }
}

impl FromStr for MxcUri {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("mxc://")
            .ok_or_else(|| ClientError::BadMxc(s.to_string()))?;
        let (server, media_id) = rest
            .split_once('/')
            .ok_or_else(|| ClientError::BadMxc(s.to_string()))?;
        if server.is_empty() || media_id.is_empty() || media_id.contains('/') {
            return Err(ClientError::BadMxc(s.to_string()));
        }
        Ok(Self {
            server: server.to_string(),
            media_id: media_id.to_string(),
        })
    }
}

impl fmt::Display for MxcUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mxc://{}/{}", self.server, self.media_id)
    }
}

impl Serialize for MxcUri {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MxcUri {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_well_formed_uri() {
        let uri: MxcUri = "mxc://example.org/abcDEF123".parse().unwrap();
        assert_eq!(uri.server(), "example.org");
        assert_eq!(uri.media_id(), "abcDEF123");
        assert_eq!(uri.to_string(), "mxc://example.org/abcDEF123");
    }

    #[test]
    fn rejects_malformed_uris() {
        for bad in [
            "https://example.org/abc",
            "mxc://",
            "mxc://example.org",
            "mxc://example.org/",
            "mxc:///abc",
            "mxc://example.org/a/b",
        ] {
            assert_matches!(bad.parse::<MxcUri>(), Err(ClientError::BadMxc(_)), "{bad}");
        }
    }

    #[test]
    fn serde_round_trip() {
        let uri: MxcUri = "mxc://example.org/abc".parse().unwrap();
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, "\"mxc://example.org/abc\"");
        let back: MxcUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
    }
}
