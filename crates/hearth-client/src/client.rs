//! The reqwest-backed client for the endpoints the history engine needs.

use std::time::Duration;

use bytes::Bytes;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use hearth_core::{EventId, RoomId};

use crate::errors::{ClientError, Result};
use crate::mxc::MxcUri;
use crate::session::Session;
use crate::types::{ApiErrorBody, Direction, EventContext, MessageChunk};

/// Characters escaped when an id is placed in a URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client bound to one authenticated session.
///
/// Stateless beyond the session: no caching, no retries, no bookkeeping.
pub struct MatrixClient {
    http: reqwest::Client,
    session: Session,
}

impl MatrixClient {
    /// Build a client for the given session.
    pub fn new(session: Session) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, session })
    }

    /// The session this client was built with.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn api_url(&self, prefix: &str, segments: &[&str]) -> String {
        let mut url = self
            .session
            .homeserver
            .as_str()
            .trim_end_matches('/')
            .to_string();
        url.push_str(prefix);
        for segment in segments {
            url.push('/');
            url.push_str(&utf8_percent_encode(segment, SEGMENT).to_string());
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String, query: &[(&str, &str)]) -> Result<T> {
        let res = self
            .http
            .get(&url)
            .bearer_auth(&self.session.access_token)
            .query(query)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body: ApiErrorBody = res.json().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                errcode: body.errcode.unwrap_or_else(|| "M_UNKNOWN".to_string()),
                message: body.error.unwrap_or_default(),
            });
        }
        res.json().await.map_err(|e| {
            if e.is_decode() {
                ClientError::Decode(e.to_string())
            } else {
                ClientError::Network(e)
            }
        })
    }

    /// One page of room history starting at `from`.
    ///
    /// For [`Direction::Backward`] the returned chunk is newest-first and
    /// `end` resumes pagination further into the past.
    #[instrument(skip(self), fields(room_id = %room_id))]
    pub async fn messages(
        &self,
        room_id: &RoomId,
        from: &str,
        dir: Direction,
        limit: u32,
    ) -> Result<MessageChunk> {
        let url = self.api_url("/_matrix/client/v3/rooms", &[room_id.as_str(), "messages"]);
        let limit = limit.to_string();
        let chunk: MessageChunk = self
            .get_json(url, &[("from", from), ("dir", dir.as_query()), ("limit", &limit)])
            .await?;
        debug!(events = chunk.chunk.len(), end = ?chunk.end, "fetched message chunk");
        Ok(chunk)
    }

    /// Events around a single event, with tokens to paginate away from it.
    ///
    /// The fallback used when a boundary row never recorded a continuation
    /// token: `events_before` plus `start` re-derive one.
    #[instrument(skip(self), fields(room_id = %room_id, event_id = %event_id))]
    pub async fn event_context(
        &self,
        room_id: &RoomId,
        event_id: &EventId,
        limit: u32,
    ) -> Result<EventContext> {
        let url = self.api_url(
            "/_matrix/client/v3/rooms",
            &[room_id.as_str(), "context", event_id.as_str()],
        );
        let limit = limit.to_string();
        self.get_json(url, &[("limit", &limit)]).await
    }

    /// Download media content addressed by an `mxc://` URI.
    #[instrument(skip(self), fields(mxc = %mxc))]
    pub async fn download_media(&self, mxc: &MxcUri) -> Result<Bytes> {
        let url = self.api_url(
            "/_matrix/client/v1/media/download",
            &[mxc.server(), mxc.media_id()],
        );
        let res = self
            .http
            .get(&url)
            .bearer_auth(&self.session.access_token)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body: ApiErrorBody = res.json().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                errcode: body.errcode.unwrap_or_else(|| "M_UNKNOWN".to_string()),
                message: body.error.unwrap_or_default(),
            });
        }
        Ok(res.bytes().await?)
    }
}
