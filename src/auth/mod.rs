//! Authentication and session management

pub mod guard;
pub mod jwt;
pub mod models;
pub mod session;
pub mod store;

pub use guard::{Decision, Requirement, RouteGuard};
pub use jwt::{decode_claims, DecodeError, DecodedClaims};
pub use models::{CredentialPair, Identity, RegisterRequest, Role};
pub use session::{SessionManager, SessionState};
pub use store::{FileStore, KeyValueStore, MemoryStore, TokenStore};
