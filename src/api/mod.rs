//! Backend REST API collaborators
//!
//! The session core and the notification poller only see the traits defined
//! here; [`ApiClient`] is the HTTP implementation used by the binary.

mod client;

use async_trait::async_trait;

use crate::auth::models::{
    LoginRequest, LoginResponse, RefreshResponse, RegisterRequest, UserProfile,
};
use crate::error::Result;
use crate::notifications::Notification;

pub use client::ApiClient;

/// Token issuance endpoints
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse>;

    async fn register(&self, request: &RegisterRequest) -> Result<UserProfile>;
}

/// Notification endpoints for the logged-in user
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>>;

    async fn mark_as_read(&self, id: i64) -> Result<()>;

    async fn clear_all(&self) -> Result<()>;
}
