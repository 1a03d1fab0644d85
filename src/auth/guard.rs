//! Route protection
//!
//! One guard for every protected view. Each call re-reads the session from
//! storage, so a token that expired since the last navigation is caught.
//! Authentication is checked before role: an expired admin session goes to
//! the login page, never to "unauthorized".

use crate::auth::models::Role;
use crate::auth::session::{SessionManager, SessionState};

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// What a protected view needs from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    AnyAuthenticated,
    RoleEquals(Role),
}

impl Requirement {
    pub fn admin() -> Self {
        Requirement::RoleEquals(Role::Admin)
    }
}

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    RedirectToUnauthorized,
}

impl Decision {
    /// Where to send the user, `None` when access is allowed
    pub fn redirect_path(&self) -> Option<&'static str> {
        match self {
            Decision::Allow => None,
            Decision::RedirectToLogin => Some(LOGIN_PATH),
            Decision::RedirectToUnauthorized => Some(UNAUTHORIZED_PATH),
        }
    }
}

/// Decide against an already computed state
pub fn decide(state: &SessionState, requirement: Requirement) -> Decision {
    if !state.is_authenticated {
        return Decision::RedirectToLogin;
    }
    match requirement {
        Requirement::RoleEquals(role) if state.role != Some(role) => {
            Decision::RedirectToUnauthorized
        }
        _ => Decision::Allow,
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    session: SessionManager,
}

impl RouteGuard {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn authorize(&self, requirement: Requirement) -> Decision {
        let state = self.session.refresh();
        let decision = decide(&state, requirement);
        tracing::debug!("Guard {:?} -> {:?}", requirement, decision);
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Identity;

    fn signed_in(role: Role) -> SessionState {
        SessionState {
            is_authenticated: true,
            role: Some(role),
            identity: Some(Identity {
                email: "x@campus.edu".to_string(),
                subject_id: "1".to_string(),
            }),
        }
    }

    #[test]
    fn test_unauthenticated_always_goes_to_login() {
        let state = SessionState::unauthenticated();
        assert_eq!(decide(&state, Requirement::AnyAuthenticated), Decision::RedirectToLogin);
        assert_eq!(decide(&state, Requirement::admin()), Decision::RedirectToLogin);
        assert_eq!(
            decide(&state, Requirement::RoleEquals(Role::Member)),
            Decision::RedirectToLogin
        );
    }

    #[test]
    fn test_role_mismatch() {
        assert_eq!(
            decide(&signed_in(Role::Member), Requirement::admin()),
            Decision::RedirectToUnauthorized
        );
        assert_eq!(
            decide(&signed_in(Role::Admin), Requirement::RoleEquals(Role::Member)),
            Decision::RedirectToUnauthorized
        );
    }

    #[test]
    fn test_allow() {
        assert_eq!(decide(&signed_in(Role::Admin), Requirement::admin()), Decision::Allow);
        assert_eq!(
            decide(&signed_in(Role::Member), Requirement::AnyAuthenticated),
            Decision::Allow
        );
    }

    #[test]
    fn test_redirect_paths() {
        assert_eq!(Decision::Allow.redirect_path(), None);
        assert_eq!(Decision::RedirectToLogin.redirect_path(), Some("/login"));
        assert_eq!(Decision::RedirectToUnauthorized.redirect_path(), Some("/unauthorized"));
    }
}
