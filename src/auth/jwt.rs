//! Access token decoding
//!
//! Claims are read without verifying the signature. The backend verifies
//! every token it receives; the client only inspects claims to route the
//! user between views. Role checks made from these claims are a UX aid and
//! must not be treated as a security boundary.

use crate::auth::models::{Identity, Role};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

/// Why a token could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected 3 segments, found {0}")]
    Segments(usize),

    #[error("invalid token encoding")]
    Encoding,

    #[error("malformed token payload: {0}")]
    Payload(String),

    #[error("missing claim '{0}'")]
    MissingClaim(&'static str),

    #[error("unknown role '{0}'")]
    UnknownRole(String),
}

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedClaims {
    pub subject_id: String,
    pub role: Role,
    pub email: String,
    /// Expiry in epoch seconds. `None` is treated as already expired.
    pub expires_at: Option<i64>,
}

impl DecodedClaims {
    /// Check expiry against an explicit clock
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expires_at {
            Some(exp) => exp <= now,
            None => true,
        }
    }

    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    pub fn identity(&self) -> Identity {
        Identity {
            email: self.email.clone(),
            subject_id: self.subject_id.clone(),
        }
    }
}

/// Subject ids are integers from the backend but may be strings elsewhere
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SubjectId {
    Number(i64),
    Text(String),
}

impl SubjectId {
    fn into_string(self) -> String {
        match self {
            SubjectId::Number(n) => n.to_string(),
            SubjectId::Text(s) => s,
        }
    }
}

/// Raw payload as found in the token
#[derive(Debug, Clone, Deserialize)]
struct RawClaims {
    #[serde(default)]
    user_id: Option<SubjectId>,
    #[serde(default)]
    sub: Option<SubjectId>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

impl TryFrom<RawClaims> for DecodedClaims {
    type Error = DecodeError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let subject_id = raw
            .user_id
            .or(raw.sub)
            .map(SubjectId::into_string)
            .ok_or(DecodeError::MissingClaim("user_id"))?;
        let role = raw.role.ok_or(DecodeError::MissingClaim("role"))?;
        let role = role.parse::<Role>().map_err(DecodeError::UnknownRole)?;
        let email = raw.email.ok_or(DecodeError::MissingClaim("email"))?;

        Ok(Self {
            subject_id,
            role,
            email,
            expires_at: raw.exp,
        })
    }
}

fn inspection_only() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation
}

/// Decode the claims of an access token without checking its signature
///
/// Only HS256 tokens are accepted. A token whose header names any other
/// algorithm (RS256, ES256, ...) is rejected and therefore reads as no
/// session.
pub fn decode_claims(token: &str) -> Result<DecodedClaims, DecodeError> {
    let segments = token.split('.').count();
    if segments != 3 {
        return Err(DecodeError::Segments(segments));
    }

    let data = decode::<RawClaims>(token, &DecodingKey::from_secret(&[]), &inspection_only())
        .map_err(|e| match e.kind() {
            ErrorKind::Base64(_) | ErrorKind::Utf8(_) => DecodeError::Encoding,
            ErrorKind::Json(inner) => DecodeError::Payload(inner.to_string()),
            _ => DecodeError::Payload(e.to_string()),
        })?;

    DecodedClaims::try_from(data.claims)
}
