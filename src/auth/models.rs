//! Authentication models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse permission tier gating dashboard views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator - station management and report review
    Admin,
    /// Regular member. The backend names this role "user".
    #[serde(alias = "user")]
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Member => write!(f, "member"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "member" | "user" => Ok(Role::Member),
            other => Err(other.to_string()),
        }
    }
}

/// Access and refresh token as issued by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

/// Who the current session belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub subject_id: String,
}

/// Login credentials
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response with tokens and convenience profile fields
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Token refresh response. The refresh token is only present when the
/// backend rotates it.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Account registration payload
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password2: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purok: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barangay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
}

impl RegisterRequest {
    /// Check the form locally before submitting it.
    ///
    /// Returns field name to message pairs, empty when the form is acceptable.
    pub fn validate(&self) -> Vec<(&'static str, &'static str)> {
        let mut errors = Vec::new();

        if self.password.chars().count() < 8 {
            errors.push(("password", "Password must be at least 8 characters."));
        }
        if self.password != self.password2 {
            errors.push(("password2", "Passwords do not match."));
        }
        if self.first_name.trim().is_empty() {
            errors.push(("first_name", "First name is required."));
        }
        if self.last_name.trim().is_empty() {
            errors.push(("last_name", "Last name is required."));
        }
        if self.email.trim().is_empty() {
            errors.push(("email", "Email is required."));
        }
        if let Some(age) = self.age {
            if !(1..=120).contains(&age) {
                errors.push(("age", "Please enter a valid age."));
            }
        }
        if let Some(number) = &self.contact_number {
            let digits_only = number.chars().all(|c| c.is_ascii_digit());
            if !digits_only || !(10..=11).contains(&number.len()) {
                errors.push(("contact_number", "Contact number must be 10-11 digits."));
            }
        }

        errors
    }
}

/// Profile returned after registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Option<Role>,
}
