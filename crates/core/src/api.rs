#![allow(missing_docs)]

//! HTTP client for the backend endpoints the front-end calls.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    error::PortalError,
    forms::{ForgotPasswordForm, ResetPasswordForm, Validate},
    search::SearchBackend,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const FORGOT_PASSWORD_PATH: &str = "auth/users/reset_password/";
const RESET_PASSWORD_PATH: &str = "auth/users/reset_password_confirm/";
const SEARCH_PATH: &str = "search/";

/// Body of a password reset confirmation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResetPasswordRequest {
    pub uid: String,
    pub token: String,
    pub new_password: String,
}

impl ResetPasswordRequest {
    /// Build from the link parameters and a validated form.
    pub fn new(uid: &str, token: &str, form: &ResetPasswordForm) -> Self {
        Self {
            uid: uid.to_string(),
            token: token.to_string(),
            new_password: form.password.clone(),
        }
    }
}

/// One search result.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchPayload {
    List(Vec<SearchHit>),
    Paged { results: Vec<SearchHit> },
}

/// Thin async wrapper over the backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: AppConfig,
}

impl ApiClient {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, config })
    }

    /// Ask the backend to email a reset link. Invalid forms are rejected
    /// before any request is made.
    pub async fn forgot_password(&self, form: &ForgotPasswordForm) -> Result<(), PortalError> {
        form.validate()?;
        let url = self.config.endpoint(FORGOT_PASSWORD_PATH);
        debug!(%url, "Requesting password reset email");
        let body = ForgotPasswordForm {
            email: form.email.trim().to_string(),
        };
        let response = self.http.post(url).json(&body).send().await?;
        ensure_success(response).await.map(|_| ())
    }

    /// Confirm a password reset with the uid/token from the emailed link.
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<(), PortalError> {
        let url = self.config.endpoint(RESET_PASSWORD_PATH);
        debug!(%url, "Confirming password reset");
        let response = self.http.post(url).json(request).send().await?;
        ensure_success(response).await.map(|_| ())
    }

    /// Full-text search.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, PortalError> {
        let url = self.config.endpoint(SEARCH_PATH);
        let response = self
            .http
            .get(url)
            .query(&[("q", query)])
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let payload = response.json::<SearchPayload>().await?;
        Ok(match payload {
            SearchPayload::List(hits) => hits,
            SearchPayload::Paged { results } => results,
        })
    }
}

#[async_trait]
impl SearchBackend for ApiClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, PortalError> {
        ApiClient::search(self, query).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, PortalError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    warn!(status = status.as_u16(), %message, "API request failed");
    Err(PortalError::Api {
        status: status.as_u16(),
        message,
    })
}

/// First human-readable message in an error body.
///
/// Understands `{"non_field_errors": [..]}`, `{"detail": ".."}` and per-field
/// lists such as `{"email": [..]}`; falls back to the status reason.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    };
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return fallback();
    };
    let Some(object) = value.as_object() else {
        return fallback();
    };

    if let Some(message) = object.get("non_field_errors").and_then(first_text) {
        return message;
    }
    if let Some(message) = object.get("detail").and_then(first_text) {
        return message;
    }
    object
        .values()
        .find_map(first_text)
        .unwrap_or_else(fallback)
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}
