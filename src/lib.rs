//! RainSafe - session core for the campus weather dashboard
//!
//! This is the library interface: token storage, claim decoding, session
//! state, route guarding and notification polling against the RainSafe
//! REST API.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod notifications;

pub use auth::{Decision, Requirement, RouteGuard, SessionManager, SessionState, TokenStore};
pub use config::Config;
pub use error::Error;
pub use notifications::NotificationPoller;
