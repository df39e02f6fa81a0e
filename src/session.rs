//! Session gating for uploads.
//!
//! [`SessionGate`] owns the one piece of shared mutable state in the crate: whether
//! the current session is authenticated and which CSRF token it carries. Tasks
//! read it when they start; nothing locks it across a request, so a session can
//! expire between the check and the upload. That case is handled when the server
//! answers `401`, not prevented here.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::backend::{AuthOutcome, UploadBackend};
use crate::error::{Error, Result};
use crate::types::{Event, SessionState};

/// Message used when the server gives no reason for refusing a credential
pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed";

/// Tracks authentication state and the CSRF token of the current session
#[derive(Clone)]
pub struct SessionGate {
    backend: Arc<dyn UploadBackend>,
    state: Arc<watch::Sender<SessionState>>,
    event_tx: broadcast::Sender<Event>,
}

impl SessionGate {
    /// Create a closed gate (unauthenticated, no token)
    pub fn new(backend: Arc<dyn UploadBackend>, event_tx: broadcast::Sender<Event>) -> Self {
        let (state, _rx) = watch::channel(SessionState::default());
        Self {
            backend,
            state: Arc::new(state),
            event_tx,
        }
    }

    /// Query the backend for the current session state.
    ///
    /// A transport failure closes the gate. The CSRF token is only replaced when
    /// the server supplies a non-empty one.
    pub async fn check_status(&self) -> SessionState {
        match self.backend.auth_status().await {
            Ok(status) => {
                self.update(|state| {
                    state.authenticated = status.authenticated;
                    if !status.csrf_token.is_empty() {
                        state.csrf_token = status.csrf_token;
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "auth status check failed, treating session as unauthenticated");
                self.update(|state| state.authenticated = false);
            }
        }
        self.snapshot()
    }

    /// Exchange a password for an authenticated session.
    ///
    /// On failure the gate stays as it was and the error carries the message to
    /// show next to the login form.
    pub async fn authenticate(&self, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(Error::AuthenticationFailed("Password required".to_string()));
        }

        let csrf_token = self.token();
        match self.backend.authenticate(password, &csrf_token).await {
            Ok(AuthOutcome::Accepted {
                authenticated: true,
            }) => {
                self.update(|state| state.authenticated = true);
                tracing::info!("session authenticated");
                Ok(())
            }
            Ok(AuthOutcome::Accepted {
                authenticated: false,
            }) => Err(Error::AuthenticationFailed(AUTH_FAILED_MESSAGE.to_string())),
            Ok(AuthOutcome::Rejected { status, message }) => {
                tracing::warn!(status, "authentication rejected by server");
                Err(Error::AuthenticationFailed(
                    message.unwrap_or_else(|| AUTH_FAILED_MESSAGE.to_string()),
                ))
            }
            Err(e) => {
                tracing::warn!(error = %e, "authentication request failed");
                Err(e)
            }
        }
    }

    /// Force the session back to unauthenticated, e.g. after the server answered `401`
    pub fn invalidate(&self) {
        self.update(|state| state.authenticated = false);
    }

    /// Whether upload requests may be issued
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().authenticated
    }

    /// The CSRF token to send with an upload, or `NotAuthenticated` when the gate is closed
    pub fn require_authenticated(&self) -> Result<String> {
        let state = self.state.borrow();
        if !state.authenticated {
            return Err(Error::NotAuthenticated);
        }
        Ok(state.csrf_token.clone())
    }

    /// Current CSRF token (empty until the first status check)
    pub fn token(&self) -> String {
        self.state.borrow().csrf_token.clone()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch the session state, e.g. to switch between the login and upload views
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn update(&self, change: impl FnOnce(&mut SessionState)) {
        let mut flipped = None;
        self.state.send_if_modified(|state| {
            let before = state.clone();
            change(state);
            if before.authenticated != state.authenticated {
                flipped = Some(state.authenticated);
            }
            before != *state
        });

        if let Some(authenticated) = flipped {
            tracing::info!(authenticated, "session state changed");
            self.event_tx
                .send(Event::SessionChanged { authenticated })
                .ok();
        }
    }
}
