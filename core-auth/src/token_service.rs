//! Developer token service client.
//!
//! The token service hands out short-lived developer tokens. It answers with
//! either `{"developerToken": "..."}` or the bare token as the body.

use crate::error::{AuthError, Result};
use crate::types::DeveloperToken;
use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    developer_token: String,
}

/// Fetches developer tokens over HTTP.
#[derive(Clone)]
pub struct TokenServiceClient {
    http_client: Arc<dyn HttpClient>,
    url: String,
    api_key: Option<String>,
}

impl TokenServiceClient {
    /// # Arguments
    ///
    /// * `url` - Token endpoint
    /// * `api_key` - Sent verbatim as the `Authorization` header when present
    pub fn new(http_client: Arc<dyn HttpClient>, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
            api_key,
        }
    }

    /// Fetch a fresh developer token.
    ///
    /// # Errors
    ///
    /// - `TokenServiceUnreachable` when no response was received
    /// - `TokenServiceFailed` on a non-2xx status or an empty body
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_developer_token(&self) -> Result<DeveloperToken> {
        let mut request = HttpRequest::get(&self.url).timeout(REQUEST_TIMEOUT);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", key.clone());
        }

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::default())
            .await
            .map_err(|e| {
                warn!(error = %e, "Token service request failed");
                AuthError::TokenServiceUnreachable(e.to_string())
            })?;

        if !response.is_success() {
            let message = response.text().unwrap_or_default();
            warn!(status = response.status, "Token service rejected request");
            return Err(AuthError::TokenServiceFailed {
                status: response.status,
                message,
            });
        }

        if let Ok(parsed) = response.json::<TokenResponse>() {
            debug!("Token service answered with JSON payload");
            return Ok(DeveloperToken::new(parsed.developer_token));
        }

        let body = response.text().map_err(|e| AuthError::TokenServiceFailed {
            status: response.status,
            message: e.to_string(),
        })?;
        let token = body.trim().trim_matches('"');
        if token.is_empty() {
            return Err(AuthError::TokenServiceFailed {
                status: response.status,
                message: "empty token body".to_string(),
            });
        }

        debug!("Token service answered with raw token");
        Ok(DeveloperToken::new(token))
    }
}
