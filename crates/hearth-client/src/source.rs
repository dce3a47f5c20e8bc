//! Capability traits consumed by the history engine.
//!
//! The pager and the media cache depend on these rather than on
//! [`MatrixClient`] directly, so tests can script responses and the
//! [`SessionHandle`] can inject the no-active-session failure.

use async_trait::async_trait;
use bytes::Bytes;

use hearth_core::{EventId, RoomId};

use crate::client::MatrixClient;
use crate::errors::{ClientError, Result};
use crate::mxc::MxcUri;
use crate::session::SessionHandle;
use crate::types::{Direction, EventContext, MessageChunk};

/// Backward pagination and context lookup.
#[async_trait]
pub trait PaginationSource: Send + Sync {
    /// One page of events older than `from`, newest-first.
    async fn messages_before(&self, room: &RoomId, from: &str, limit: u32)
    -> Result<MessageChunk>;

    /// Context around `event`, used to re-derive a pagination token.
    async fn context_before(
        &self,
        room: &RoomId,
        event: &EventId,
        limit: u32,
    ) -> Result<EventContext>;
}

/// Media download by `mxc://` URI.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fetch the raw media bytes.
    async fn fetch_media(&self, mxc: &MxcUri) -> Result<Bytes>;
}

#[async_trait]
impl PaginationSource for MatrixClient {
    async fn messages_before(
        &self,
        room: &RoomId,
        from: &str,
        limit: u32,
    ) -> Result<MessageChunk> {
        self.messages(room, from, Direction::Backward, limit).await
    }

    async fn context_before(
        &self,
        room: &RoomId,
        event: &EventId,
        limit: u32,
    ) -> Result<EventContext> {
        self.event_context(room, event, limit).await
    }
}

#[async_trait]
impl MediaSource for MatrixClient {
    async fn fetch_media(&self, mxc: &MxcUri) -> Result<Bytes> {
        self.download_media(mxc).await
    }
}

#[async_trait]
impl PaginationSource for SessionHandle {
    async fn messages_before(
        &self,
        room: &RoomId,
        from: &str,
        limit: u32,
    ) -> Result<MessageChunk> {
        let client = self.client().ok_or(ClientError::NoActiveSession)?;
        client.messages_before(room, from, limit).await
    }

    async fn context_before(
        &self,
        room: &RoomId,
        event: &EventId,
        limit: u32,
    ) -> Result<EventContext> {
        let client = self.client().ok_or(ClientError::NoActiveSession)?;
        client.context_before(room, event, limit).await
    }
}

#[async_trait]
impl MediaSource for SessionHandle {
    async fn fetch_media(&self, mxc: &MxcUri) -> Result<Bytes> {
        let client = self.client().ok_or(ClientError::NoActiveSession)?;
        client.fetch_media(mxc).await
    }
}
