//! Error types for RainSafe

use std::collections::BTreeMap;

use thiserror::Error;

use crate::auth::jwt::DecodeError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Validation failed: {}", format_field_errors(.0))]
    Validation(BTreeMap<String, Vec<String>>),

    #[error("Invalid token: {0}")]
    Decode(#[from] DecodeError),

    #[error("Not logged in. Run 'rainsafe login' first.")]
    NotAuthenticated,

    #[error("Notification {0} not found")]
    NotificationNotFound(i64),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the backend rejected the request as unauthorized
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status: 401 | 403, .. })
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

fn format_field_errors(errors: &BTreeMap<String, Vec<String>>) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
