//! HTTP client for the BeatNexus backend.
//!
//! Provides a minimal client with Supabase gateway auth (anon `apikey` plus a
//! Bearer token), generic POST helpers, and the domain calls used by the
//! submission pipeline: the two remote procedures and the matchmaking webhook.

pub mod api;
pub mod types;

use beatnexus_core::Config;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

pub use api::SubmissionBackend;
pub use types::{MatchmakingOutcome, SubmissionCreateResult};

/// Remote call failures. Server-provided detail is kept verbatim.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to send request: {0}")]
    Request(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout(e.to_string())
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Request(e.to_string())
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `apikey: {anon_key}` and `Authorization: Bearer {token}`
    Supabase { anon_key: String, token: String },
}

/// HTTP client for the backend with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Auth, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Client for the configured project, authenticated as the session user
    /// when an access token is set and as the anon role otherwise.
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        Self::new(
            config.supabase_url.clone(),
            Auth::Supabase {
                anon_key: config.supabase_anon_key.clone(),
                token: config.bearer_token().to_string(),
            },
            config.http_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Supabase { anon_key, token } => request
                .header("apikey", anon_key.as_str())
                .bearer_auth(token),
        }
    }

    /// POST JSON body and return the raw response text of a 2xx reply.
    pub async fn post_json_text<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<String> {
        let url = self.build_url(path);
        let request = self.client.post(&url).json(body);
        let request = self.apply_auth(request);

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        Ok(response.text().await?)
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let text = self.post_json_text(path, body).await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(format!("{}: {}", e, text)))
    }

    /// Raw client for custom requests. Caller must apply auth via build_url and headers.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_supabase_auth_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/rpc/ping")
            .match_header("apikey", "anon")
            .match_header("authorization", "Bearer jwt")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client = ApiClient::new(
            server.url(),
            Auth::Supabase {
                anon_key: "anon".to_string(),
                token: "jwt".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap();

        let body: serde_json::Value = client
            .post_json("/rest/v1/rpc/ping", &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(body["ok"], true);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_2xx_keeps_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/rpc/ping")
            .with_status(500)
            .with_body("database is down")
            .create_async()
            .await;

        let client = ApiClient::new(
            server.url(),
            Auth::Bearer("jwt".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = client
            .post_json::<serde_json::Value, _>("/rest/v1/rpc/ping", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "API request failed with status 500: database is down"
        );
    }

    #[test]
    fn test_from_config_trims_base_url() {
        let config = Config::for_endpoint("https://project.supabase.co/", "anon");
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(
            client.build_url("/rest/v1/rpc/x"),
            "https://project.supabase.co/rest/v1/rpc/x"
        );
    }
}
