//! Authenticated sessions and the login/logout client slot.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Url;

use hearth_core::UserId;

use crate::client::MatrixClient;

/// Credentials and endpoint of an authenticated homeserver session.
///
/// Passed explicitly into [`MatrixClient::new`] — the session is part of
/// the client's construction, never ambient state.
#[derive(Clone, Debug)]
pub struct Session {
    /// Base URL of the homeserver, e.g. `https://matrix.example.org`.
    pub homeserver: Url,
    /// The authenticated user.
    pub user_id: UserId,
    /// Access token sent as a bearer credential.
    pub access_token: String,
}

/// A swap-out slot holding the currently logged-in client, if any.
///
/// Components that outlive a login (the fetch coordinator, the media cache)
/// hold a `SessionHandle`; login installs a client, logout clears it, and a
/// fetch through an empty handle fails with
/// [`ClientError::NoActiveSession`](crate::ClientError::NoActiveSession).
#[derive(Default)]
pub struct SessionHandle {
    inner: RwLock<Option<Arc<MatrixClient>>>,
}

impl SessionHandle {
    /// An empty handle; no session is active.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a client, replacing any previous one.
    pub fn install(&self, client: Arc<MatrixClient>) {
        *self.inner.write() = Some(client);
    }

    /// Drop the active client.
    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    /// The active client, if one is installed.
    pub fn client(&self) -> Option<Arc<MatrixClient>> {
        self.inner.read().clone()
    }
}
