//! Backfill a room's history into the local store, page by page.
//!
//! Drives the same pager/coordinator stack the interactive client uses:
//! the room's boundary row is looked up, one page is fetched and persisted,
//! and the loop continues until history is exhausted or the page budget is
//! spent. With an empty database, `--seed-event` anchors the timeline via a
//! context lookup, which also exercises the token-less fallback path.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use hearth_client::{MatrixClient, PaginationSource, Session, SessionHandle, Url};
use hearth_core::{EventId, RoomId, UserId};
use hearth_history::FetchCoordinator;
use hearth_store::TimelineStore;

#[derive(Parser, Debug)]
#[command(name = "hearth-backfill", about = "Backfill room history into the local event store")]
struct Args {
    /// Homeserver base URL, e.g. https://matrix.example.org
    #[arg(long)]
    homeserver: String,

    /// Access token for the session.
    #[arg(long)]
    token: String,

    /// User the token belongs to, e.g. @alice:example.org
    #[arg(long)]
    user: String,

    /// Path of the SQLite database (created if missing).
    #[arg(long)]
    db: PathBuf,

    /// Room to backfill, e.g. !abc:example.org
    #[arg(long)]
    room: String,

    /// Event to anchor the timeline on when the room has nothing stored yet.
    #[arg(long)]
    seed_event: Option<String>,

    /// Maximum number of pages to fetch.
    #[arg(long, default_value_t = 10)]
    pages: u32,

    /// Events requested per page.
    #[arg(long, default_value_t = 50)]
    limit: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    hearth_core::logging::init("info,hearth=debug");
    let args = Args::parse();

    let room: RoomId = args.room.parse()?;
    let user_id: UserId = args.user.parse()?;
    let homeserver = Url::parse(&args.homeserver).context("invalid --homeserver URL")?;

    let store = Arc::new(TimelineStore::open(&args.db).context("opening event store")?);
    let client = Arc::new(MatrixClient::new(Session {
        homeserver,
        user_id,
        access_token: args.token,
    })?);
    let handle = Arc::new(SessionHandle::new());
    handle.install(Arc::clone(&client));

    seed_if_empty(&store, &client, &room, args.seed_event.as_deref()).await?;

    let coordinator = FetchCoordinator::with_page_limit(
        handle as Arc<dyn PaginationSource>,
        Arc::clone(&store),
        args.limit,
    );

    for page in 1..=args.pages {
        let Some(boundary) = store.oldest_event(room.as_str())? else {
            bail!("room {room} has no stored events");
        };
        if boundary.preceding_stored {
            info!(room_id = %room, "history exhausted, nothing older to fetch");
            break;
        }

        let mut signal = coordinator.fetch_preceding_rows(&boundary);
        while *signal.borrow() {
            if signal.changed().await.is_err() {
                break;
            }
        }

        let after = store.oldest_event(room.as_str())?;
        let stalled = after
            .as_ref()
            .is_none_or(|row| row.event_id == boundary.event_id && !row.preceding_stored);
        if stalled {
            warn!(room_id = %room, boundary = %boundary.event_id, "page fetch made no progress, stopping");
            break;
        }

        info!(
            page,
            events = store.event_count(room.as_str())?,
            oldest = after.map(|r| r.event_id).unwrap_or_default(),
            "page complete"
        );
    }

    info!(
        room_id = %room,
        events = store.event_count(room.as_str())?,
        "backfill finished"
    );
    Ok(())
}

/// Anchor the timeline on `--seed-event` when the room has nothing stored.
///
/// The anchor row is saved without a continuation token, so the first page
/// goes through the context-lookup fallback and re-derives one.
async fn seed_if_empty(
    store: &TimelineStore,
    client: &MatrixClient,
    room: &RoomId,
    seed_event: Option<&str>,
) -> Result<()> {
    if store.oldest_event(room.as_str())?.is_some() {
        return Ok(());
    }
    let Some(seed) = seed_event else {
        bail!("room {room} has no stored events; pass --seed-event to anchor the timeline");
    };
    let seed_id: EventId = seed.parse()?;
    let context = client.event_context(room, &seed_id, 1).await?;
    let Some(anchor) = context.event else {
        bail!("server returned no event for {seed_id}");
    };
    let row = store.save_event(&anchor.into_event(room), None)?;
    info!(event_id = %row.event_id, "seeded timeline from context lookup");
    Ok(())
}
