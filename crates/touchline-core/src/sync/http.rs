//! HTTP adapter for the batch sync endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::sync::{SyncBackend, SyncRequest, SyncResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`SyncBackend`] speaking the `POST /sync` contract over HTTPS.
///
/// A client-side timeout bounds every round; a request that expires is
/// reported as a transport failure so the coordinator retries the whole
/// batch instead of hanging in the syncing phase forever.
#[derive(Clone)]
pub struct HttpSyncBackend {
    endpoint: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpSyncBackend {
    /// Build a backend for the given endpoint, with an optional bearer
    /// token for the authenticated API
    pub fn new(endpoint: impl Into<String>, auth_token: Option<String>) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        let auth_token = auth_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        Ok(Self {
            endpoint,
            auth_token,
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
        })
    }

    /// Endpoint this backend submits batches to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for HttpSyncBackend {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpSyncBackend")
            .field("endpoint", &self.endpoint)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SyncBackend for HttpSyncBackend {
    async fn submit_batch(&self, request: &SyncRequest) -> Result<SyncResponse> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(parse_api_error(status, &body)));
        }

        Ok(response.json::<SyncResponse>().await?)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = raw.trim();
    if endpoint.is_empty() {
        return Err(Error::InvalidConfiguration(
            "sync endpoint must not be empty".to_string(),
        ));
    }
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidConfiguration(
            "sync endpoint must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_endpoint_rejects_invalid_values() {
        assert!(normalize_endpoint(String::new()).is_err());
        assert!(normalize_endpoint("  ".to_string()).is_err());
        assert!(normalize_endpoint("api.example.com/sync".to_string()).is_err());
    }

    #[test]
    fn normalize_endpoint_trims_trailing_slash() {
        assert_eq!(
            normalize_endpoint("https://api.example.com/sync/".to_string()).unwrap(),
            "https://api.example.com/sync"
        );
    }

    #[test]
    fn parse_api_error_prefers_structured_messages() {
        let rendered = parse_api_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error": "token expired"}"#,
        );
        assert_eq!(rendered, "token expired (401)");

        let rendered = parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(rendered, "HTTP 500");

        let rendered = parse_api_error(StatusCode::BAD_REQUEST, "operations must be an array");
        assert_eq!(rendered, "operations must be an array (400)");
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let backend =
            HttpSyncBackend::new("https://api.example.com/sync", Some("secret".to_string()))
                .unwrap();
        let debug = format!("{backend:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn blank_tokens_count_as_absent() {
        let backend =
            HttpSyncBackend::new("https://api.example.com/sync", Some("  ".to_string())).unwrap();
        assert!(format!("{backend:?}").contains("None"));
    }
}
