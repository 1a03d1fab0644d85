//! HTTP client for the RainSafe backend

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::debug;

use super::{AuthApi, NotificationApi};
use crate::auth::models::{
    LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest, UserProfile,
};
use crate::auth::store::TokenStore;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::notifications::Notification;

/// Backend client. Requests carry the stored access token as a bearer token.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, tokens: TokenStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.tokens.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url());
        if status.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(status, response.text().await.unwrap_or_default()))
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        Ok(self.send(builder).await?.json::<T>().await?)
    }
}

/// Turn a non-success response into an error.
///
/// 400 bodies shaped like `{"field": ["message", ...]}` become field-level
/// validation errors; anything else keeps the backend's `detail` message.
fn error_from_response(status: StatusCode, body: String) -> Error {
    let parsed = serde_json::from_str::<serde_json::Value>(&body).ok();

    if status == StatusCode::BAD_REQUEST {
        if let Some(serde_json::Value::Object(map)) = &parsed {
            let fields: BTreeMap<String, Vec<String>> = map
                .iter()
                .filter(|(field, _)| field.as_str() != "detail")
                .map(|(field, value)| (field.clone(), messages(value)))
                .collect();
            if !fields.is_empty() {
                return Error::Validation(fields);
            }
        }
    }

    let message = parsed
        .as_ref()
        .and_then(|v| v.get("detail"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });

    Error::Api {
        status: status.as_u16(),
        message,
    }
}

fn messages(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items.iter().flat_map(messages).collect(),
        serde_json::Value::String(s) => vec![s.clone()],
        other => vec![other.to_string()],
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        // A stale token must not ride along with a login attempt
        let builder = self.http.post(self.url("users/login/")).json(request);
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(status, response.text().await.unwrap_or_default()));
        }
        Ok(response.json::<LoginResponse>().await?)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let body = RefreshRequest {
            refresh: refresh_token.to_string(),
        };
        let response = self
            .http
            .post(self.url("users/token/refresh/"))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(status, response.text().await.unwrap_or_default()));
        }
        Ok(response.json::<RefreshResponse>().await?)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<UserProfile> {
        self.send_json(self.http.post(self.url("users/register/")).json(request))
            .await
    }
}

#[async_trait]
impl NotificationApi for ApiClient {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        self.send_json(self.http.get(self.url("notifications/all/")))
            .await
    }

    async fn mark_as_read(&self, id: i64) -> Result<()> {
        let path = format!("notifications/{}/read/", id);
        match self.send(self.http.patch(self.url(&path))).await {
            Err(Error::Api { status: 404, .. }) => Err(Error::NotificationNotFound(id)),
            other => other.map(|_| ()),
        }
    }

    async fn clear_all(&self) -> Result<()> {
        self.send(self.http.delete(self.url("notifications/clear_all/")))
            .await
            .map(|_| ())
    }
}
