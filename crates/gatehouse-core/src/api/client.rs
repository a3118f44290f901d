//! HTTP client for the identity service.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{Credential, UserIdentity};

use super::{ApiError, ProfileUpdate, SignupRequest};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Response wrapper used by every identity service endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// `data` of a successful response, or `Rejected` with the service's
    /// message.
    pub fn into_result(self) -> std::result::Result<Option<T>, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApiError::Rejected(
                self.message
                    .unwrap_or_else(|| "Request was rejected".to_string()),
            ))
        }
    }
}

/// `data` of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub user: UserIdentity,
    pub token: Credential,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Identity service client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
    token: Option<Credential>,
}

impl IdentityClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Client sending `token` as a bearer credential, sharing the connection pool.
    pub fn with_token(&self, token: Credential) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange email and password for a user and credential.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload> {
        let url = self.url("/login");
        let request = self.client.post(&url).json(&LoginRequest { email, password });
        let envelope: ApiEnvelope<AuthPayload> = self.send(request, &url).await?;

        envelope
            .into_result()?
            .ok_or_else(|| ApiError::InvalidResponse("Login response has no data".to_string()).into())
    }

    /// Create an account; returns the service's confirmation message.
    pub async fn signup(&self, request: &SignupRequest) -> Result<String> {
        let url = self.url("/signup");
        let envelope: ApiEnvelope<serde_json::Value> =
            self.send(self.client.post(&url).json(request), &url).await?;
        Self::message_of(envelope)
    }

    /// Update the signed-in user's profile.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<String> {
        let url = self.url("/profile");
        let request = self.client.put(&url).headers(self.auth_headers()?).json(update);
        let envelope: ApiEnvelope<serde_json::Value> = self.send(request, &url).await?;
        Self::message_of(envelope)
    }

    fn message_of(envelope: ApiEnvelope<serde_json::Value>) -> Result<String> {
        let message = envelope.message.clone().unwrap_or_default();
        envelope.into_result()?;
        Ok(message)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let token = self.token.as_ref().ok_or(ApiError::Unauthorized)?;
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))?,
        );
        Ok(headers)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T> {
        debug!(%url, "Identity service request");
        let response = request
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Rejections often come back as a 4xx carrying the usual envelope
        if let Ok(envelope) = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body) {
            if let Some(message) = envelope.message.filter(|_| !envelope.success) {
                return Err(ApiError::Rejected(message).into());
            }
        }
        Err(ApiError::from_status(status, &body).into())
    }
}
