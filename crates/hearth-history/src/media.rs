//! Bounded cache of deferred media downloads.
//!
//! Maps an `mxc://` URI to one shared in-progress-or-completed download
//! future with compute-if-absent semantics: concurrent requests for the
//! same URI share a single underlying HTTP request. Entries are evicted
//! least-recently-used once the capacity is reached. A failed download
//! resolves to `None` and stays cached until evicted, matching how avatar
//! slots render a placeholder instead of re-requesting on every paint.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use metrics::counter;
use parking_lot::Mutex;
use tracing::warn;

use hearth_client::{MediaSource, MxcUri};

/// A download that is either still running or already resolved.
pub type SharedDownload = Shared<BoxFuture<'static, Option<Bytes>>>;

/// Default entry capacity.
pub const DEFAULT_CAPACITY: usize = 100;

struct Entries {
    map: HashMap<MxcUri, SharedDownload>,
    // Front is least recently used.
    order: VecDeque<MxcUri>,
}

impl Entries {
    fn touch(&mut self, uri: &MxcUri) {
        if let Some(pos) = self.order.iter().position(|u| u == uri) {
            let _ = self.order.remove(pos);
        }
        self.order.push_back(uri.clone());
    }
}

/// Capacity-bounded LRU cache of shared media downloads.
pub struct MediaCache {
    source: Arc<dyn MediaSource>,
    capacity: usize,
    entries: Mutex<Entries>,
}

impl MediaCache {
    /// Cache with the default capacity.
    pub fn new(source: Arc<dyn MediaSource>) -> Self {
        Self::with_capacity(source, DEFAULT_CAPACITY)
    }

    /// Cache holding at most `capacity` entries.
    pub fn with_capacity(source: Arc<dyn MediaSource>, capacity: usize) -> Self {
        Self {
            source,
            capacity: capacity.max(1),
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// The shared download for `uri`, starting one if none is cached.
    ///
    /// The future is lazy: the download begins when the first holder awaits
    /// it, and every clone resolves to the same result.
    pub fn get(&self, uri: &MxcUri) -> SharedDownload {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.map.get(uri).cloned() {
            counter!("hearth_media_cache_hits_total").increment(1);
            entries.touch(uri);
            return existing;
        }

        let source = Arc::clone(&self.source);
        let owned = uri.clone();
        let download: SharedDownload = async move {
            match source.fetch_media(&owned).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(mxc = %owned, error = %e, "media download failed");
                    None
                }
            }
        }
        .boxed()
        .shared();

        let _ = entries.map.insert(uri.clone(), download.clone());
        entries.order.push_back(uri.clone());
        while entries.map.len() > self.capacity {
            let Some(evicted) = entries.order.pop_front() else {
                break;
            };
            let _ = entries.map.remove(&evicted);
        }
        download
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
