//! Latest-value-wins broadcast cell.
//!
//! A single-slot overwritable publish/subscribe cell: publishing replaces
//! any unread prior value, and a subscriber only ever observes the newest
//! value at the time it looks. Useful for state where intermediate values
//! are worthless once superseded — an avatar to display, the newest room
//! name, a download result.

use tokio::sync::watch;

/// The publishing side of the cell. Cheap to share behind an `Arc`.
pub struct Latest<T> {
    tx: watch::Sender<Option<T>>,
}

/// A subscription observing the newest published value.
pub struct LatestWatch<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> Latest<T> {
    /// An empty cell.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publish a value, replacing any unread prior one.
    pub fn publish(&self, value: T) {
        let _ = self.tx.send_replace(Some(value));
    }

    /// The current value, if any was ever published.
    pub fn peek(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// Subscribe; the subscription starts at the newest value.
    pub fn subscribe(&self) -> LatestWatch<T> {
        LatestWatch {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone> Default for Latest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> LatestWatch<T> {
    /// The newest value right now, marking it as seen.
    pub fn latest(&mut self) -> Option<T> {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for a value newer than the last one seen.
    ///
    /// Returns `None` once the publisher is gone and nothing newer will
    /// arrive.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let value = self.rx.borrow_and_update().clone();
            if value.is_some() {
                return value;
            }
        }
    }
}
