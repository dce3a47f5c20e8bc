//! Fetching one page of history older than a stored boundary row.

use tracing::warn;

use hearth_client::{ClientError, PaginationSource};
use hearth_core::{EventId, FetchedBatch, RoomId};
use hearth_store::EventRow;

/// Default page size requested from the server.
pub const DEFAULT_PAGE_LIMIT: u32 = 30;

/// Fetch the page of events strictly older than `row`.
///
/// When the row carries a `preceding_batch` token, pagination resumes from
/// it. Otherwise — the row was the first event we ever saw for the room, so
/// no token was recorded — the event's context is looked up and the events
/// before it, together with the context's `start` token, stand in for the
/// page.
///
/// The chunk arrives newest-first either way and is normalized to
/// oldest-first. `prev_key` of the result is the token for the next page
/// into the past, `None` once history is exhausted.
///
/// Read-only with respect to storage: persisting the batch and updating
/// the row's bookkeeping is the caller's job, which keeps failures free of
/// side effects and retries safe.
pub async fn fetch_preceding(
    source: &dyn PaginationSource,
    row: &EventRow,
    limit: u32,
) -> Result<FetchedBatch, ClientError> {
    let room = RoomId::new(row.room_id.clone());
    match row.preceding_batch.as_deref() {
        Some(token) => {
            let chunk = source.messages_before(&room, token, limit).await?;
            let events = chunk
                .chunk
                .into_iter()
                .map(|e| e.into_event(&room))
                .collect();
            Ok(FetchedBatch::from_newest_first(events, chunk.end))
        }
        None => {
            warn!(
                event_id = %row.event_id,
                "no pagination token recorded, deriving one from event context"
            );
            let event_id = EventId::new(row.event_id.clone());
            let context = source.context_before(&room, &event_id, limit).await?;
            let events = context
                .events_before
                .into_iter()
                .map(|e| e.into_event(&room))
                .collect();
            Ok(FetchedBatch::from_newest_first(events, context.start))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ScriptedSource, boundary_row, raw_event};
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn token_path_reverses_chunk_to_oldest_first() {
        let source = ScriptedSource::new();
        source.push_chunk(vec![raw_event("$e0b", 900), raw_event("$e0a", 800)], Some("t0"));

        let row = boundary_row("$e1", 1000, Some("t1"));
        let batch = fetch_preceding(&source, &row, 10).await.unwrap();

        assert_eq!(source.messages_calls(), 1);
        assert_eq!(source.context_calls(), 0);
        assert_eq!(batch.prev_key.as_deref(), Some("t0"));
        let ids: Vec<_> = batch.messages.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, ["$e0a", "$e0b"]);
    }

    #[tokio::test]
    async fn context_fallback_used_without_token() {
        let source = ScriptedSource::new();
        source.push_context(vec![raw_event("$e0", 900)], Some("t0"));

        let row = boundary_row("$e1", 1000, None);
        let batch = fetch_preceding(&source, &row, 10).await.unwrap();

        assert_eq!(source.messages_calls(), 0);
        assert_eq!(source.context_calls(), 1);
        assert_eq!(batch.prev_key.as_deref(), Some("t0"));
        assert_eq!(batch.messages[0].event_id.as_str(), "$e0");
    }

    #[tokio::test]
    async fn context_without_start_token_is_exhausted() {
        let source = ScriptedSource::new();
        source.push_context(vec![raw_event("$e0", 900)], None);

        let row = boundary_row("$e1", 1000, None);
        let batch = fetch_preceding(&source, &row, 10).await.unwrap();
        assert!(batch.is_exhausted());
    }

    #[tokio::test]
    async fn fetched_page_is_strictly_older_than_row() {
        let source = ScriptedSource::new();
        source.push_chunk(
            vec![raw_event("$e0c", 990), raw_event("$e0b", 900), raw_event("$e0a", 800)],
            Some("t0"),
        );

        let row = boundary_row("$e1", 1000, Some("t1"));
        let batch = fetch_preceding(&source, &row, 10).await.unwrap();
        let boundary_event = row.to_event().unwrap();
        assert!(
            batch
                .messages
                .iter()
                .all(|m| m.is_older_than(&boundary_event))
        );
    }

    #[tokio::test]
    async fn failures_pass_through_untouched() {
        let source = ScriptedSource::new();
        source.push_messages_err(ClientError::Server {
            status: 429,
            errcode: "M_LIMIT_EXCEEDED".into(),
            message: "slow down".into(),
        });

        let row = boundary_row("$e1", 1000, Some("t1"));
        let err = fetch_preceding(&source, &row, 10).await.unwrap_err();
        assert_matches!(err, ClientError::Server { status: 429, .. });
    }
}
