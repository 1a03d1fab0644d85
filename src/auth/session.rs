//! Session state management
//!
//! [`SessionManager`] is the single owner of the client's belief about who is
//! logged in. The state is always derived from the [`TokenStore`] and replaced
//! as a whole; subscribers are notified through a watch channel after the
//! new state is in place.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::AuthApi;
use crate::auth::jwt::decode_claims;
use crate::auth::models::{CredentialPair, Identity, LoginRequest, Role};
use crate::auth::store::TokenStore;
use crate::error::{Error, Result};

/// Current authentication status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub role: Option<Role>,
    pub identity: Option<Identity>,
}

impl SessionState {
    /// The "no session" state
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated && self.role == Some(Role::Admin)
    }
}

/// Derives session state from stored tokens and tracks login/logout
#[derive(Clone)]
pub struct SessionManager {
    tokens: TokenStore,
    auth: Arc<dyn AuthApi>,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionManager {
    /// Create a manager and compute the initial state from storage
    pub fn new(tokens: TokenStore, auth: Arc<dyn AuthApi>) -> Self {
        let (state, _) = watch::channel(SessionState::unauthenticated());
        let manager = Self {
            tokens,
            auth,
            state: Arc::new(state),
        };
        manager.refresh();
        manager
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Latest computed state, without re-reading storage
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Recompute the state from storage using the current time
    pub fn refresh(&self) -> SessionState {
        self.refresh_at(chrono::Utc::now().timestamp())
    }

    /// Recompute the state from storage against an explicit clock.
    ///
    /// A stored token that cannot be decoded or has expired is removed from
    /// storage.
    pub fn refresh_at(&self, now: i64) -> SessionState {
        let next = match self.tokens.access_token() {
            None => SessionState::unauthenticated(),
            Some(token) => match decode_claims(&token) {
                Err(e) => {
                    warn!("Discarding unreadable access token: {}", e);
                    self.tokens.clear();
                    SessionState::unauthenticated()
                }
                Ok(claims) if claims.is_expired_at(now) => {
                    debug!("Access token expired, clearing session");
                    self.tokens.clear();
                    SessionState::unauthenticated()
                }
                Ok(claims) => SessionState {
                    is_authenticated: true,
                    role: Some(claims.role),
                    identity: Some(claims.identity()),
                },
            },
        };

        self.replace(next)
    }

    /// Log in through the backend and persist the issued tokens.
    ///
    /// Backend and network errors are returned as-is; storage is left
    /// untouched when login fails.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<SessionState> {
        let request = LoginRequest {
            email: identifier.to_string(),
            password: secret.to_string(),
        };
        let response = self.auth.login(&request).await?;

        self.tokens
            .save(&CredentialPair::new(response.access, response.refresh));
        if let (Some(email), Some(role)) = (&response.email, &response.role) {
            self.tokens.save_profile(email, role);
        }

        let state = self.refresh();
        if state.is_authenticated {
            info!("Logged in as {}", identifier);
        } else {
            warn!("Backend issued an unusable token for {}", identifier);
        }
        Ok(state)
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// A rejected refresh token ends the session.
    pub async fn renew(&self) -> Result<SessionState> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            self.logout();
            return Err(Error::NotAuthenticated);
        };

        match self.auth.refresh(&refresh_token).await {
            Ok(response) => {
                let refresh_token = response.refresh.unwrap_or(refresh_token);
                self.tokens
                    .save(&CredentialPair::new(response.access, refresh_token));
                debug!("Access token renewed");
                Ok(self.refresh())
            }
            Err(e) if e.is_unauthorized() => {
                info!("Refresh token rejected, logging out");
                self.logout();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Forget the credentials
    pub fn logout(&self) -> SessionState {
        self.tokens.clear();
        let state = self.replace(SessionState::unauthenticated());
        info!("Logged out");
        state
    }

    fn replace(&self, next: SessionState) -> SessionState {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        next
    }
}
