//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use rainsafe::api::AuthApi;
use rainsafe::auth::models::{
    LoginRequest, LoginResponse, RefreshResponse, RegisterRequest, UserProfile,
};
use rainsafe::error::{Error, Result};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const SERVER_SECRET: &[u8] = b"django-insecure-test-secret";

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Mint an access token the way the backend does
pub fn access_token(role: &str, exp: i64) -> String {
    encode(
        &Header::default(),
        &json!({
            "token_type": "access",
            "user_id": 17,
            "email": format!("{}@campus.edu", role),
            "role": role,
            "exp": exp,
        }),
        &EncodingKey::from_secret(SERVER_SECRET),
    )
    .expect("Failed to create token")
}

/// In-process stand-in for the login endpoints
pub struct FakeAuth {
    pub password: String,
    pub role: String,
    pub lifetime_secs: i64,
    pub login_calls: AtomicUsize,
    pub accept_refresh: bool,
}

impl FakeAuth {
    pub fn new(password: &str, role: &str) -> Self {
        Self {
            password: password.to_string(),
            role: role.to_string(),
            lifetime_secs: 3600,
            login_calls: AtomicUsize::new(0),
            accept_refresh: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for FakeAuth {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if request.password != self.password {
            return Err(Error::Api {
                status: 401,
                message: "No active account found with the given credentials".to_string(),
            });
        }
        Ok(LoginResponse {
            access: access_token(&self.role, now() + self.lifetime_secs),
            refresh: "refresh-token".to_string(),
            email: Some(request.email.clone()),
            role: Some(self.role.clone()),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        if !self.accept_refresh || refresh_token != "refresh-token" {
            return Err(Error::Api {
                status: 401,
                message: "Token is invalid or expired".to_string(),
            });
        }
        Ok(RefreshResponse {
            access: access_token(&self.role, now() + 3600),
            refresh: None,
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<UserProfile> {
        Ok(UserProfile {
            id: Some(1),
            email: request.email.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            role: None,
        })
    }
}
