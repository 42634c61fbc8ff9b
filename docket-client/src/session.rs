//! Session seam
//!
//! The authentication provider is external; the client only needs to know
//! the current authentication status and the bearer token to attach.

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;

/// Authentication status reported by the session provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Source of authentication state for outgoing requests
pub trait Session: Send + Sync {
    fn status(&self) -> AuthStatus;

    /// Bearer token for the next request, if any
    fn token(&self) -> Option<String>;
}

/// Shared, observable session state
///
/// Clones share the same state. Status changes can be observed through
/// [`SessionHandle::subscribe`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    status: Arc<watch::Sender<AuthStatus>>,
    token: Arc<RwLock<Option<String>>>,
}

impl SessionHandle {
    /// A session whose status is still being resolved
    pub fn new() -> Self {
        let (status, _) = watch::channel(AuthStatus::Loading);
        Self {
            status: Arc::new(status),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// A session that is already authenticated with `token`
    pub fn authenticated(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.authenticate(token);
        session
    }

    pub fn authenticate(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
        self.set_status(AuthStatus::Authenticated);
    }

    pub fn begin_loading(&self) {
        self.set_status(AuthStatus::Loading);
    }

    pub fn sign_out(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.set_status(AuthStatus::Unauthenticated);
    }

    /// Watch status transitions
    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    fn set_status(&self, next: AuthStatus) {
        self.status.send_if_modified(|current| {
            let changed = *current != next;
            *current = next;
            changed
        });
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for SessionHandle {
    fn status(&self) -> AuthStatus {
        *self.status.borrow()
    }

    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
