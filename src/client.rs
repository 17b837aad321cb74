//! Client for the GetStream chat application settings API.
//!
//! Only the two calls the SQS resource needs are modelled:
//! `PATCH /app` to update the settings and `GET /app` to read them back.
//! Requests are authenticated with a server-side JWT signed with the
//! application secret.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::ProviderConfig;

const CLIENT_HEADER: &str = concat!("hemmer-provider-getstream-", env!("CARGO_PKG_VERSION"));

/// Errors returned by an [`AppSettingsClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server token could not be signed.
    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// An endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The API answered with a non-success status.
    #[error("API error {status} (code {code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// GetStream error code.
        code: i64,
        /// Error message from the API.
        message: String,
    },
}

/// The SQS subset of the application settings.
///
/// The three values are only ever sent together, so the type can only be
/// built from a complete triple.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct AppSettings {
    sqs_url: String,
    sqs_key: String,
    sqs_secret: String,
}

impl AppSettings {
    /// Settings linking the application to an SQS queue.
    pub fn sqs(
        url: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            sqs_url: url.into(),
            sqs_key: access_key.into(),
            sqs_secret: secret_key.into(),
        }
    }

    /// Settings that remove the SQS link.
    pub fn cleared() -> Self {
        Self::sqs("", "", "")
    }

    /// Queue URL.
    pub fn sqs_url(&self) -> &str {
        &self.sqs_url
    }

    /// Access key.
    pub fn sqs_key(&self) -> &str {
        &self.sqs_key
    }

    /// Secret key.
    pub fn sqs_secret(&self) -> &str {
        &self.sqs_secret
    }

    /// Whether this clears the link.
    pub fn is_cleared(&self) -> bool {
        self.sqs_url.is_empty() && self.sqs_key.is_empty() && self.sqs_secret.is_empty()
    }
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppSettings")
            .field("sqs_url", &self.sqs_url)
            .field("sqs_key", &"[REDACTED]")
            .field("sqs_secret", &"[REDACTED]")
            .finish()
    }
}

/// Application configuration as returned by `GET /app`.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Configured queue URL (empty when unlinked).
    #[serde(default)]
    pub sqs_url: String,
    /// Configured access key.
    #[serde(default)]
    pub sqs_key: String,
    /// Configured secret key.
    #[serde(default)]
    pub sqs_secret: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("sqs_url", &self.sqs_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct AppConfigResponse {
    app: AppConfig,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct ServerClaims {
    server: bool,
}

/// The upstream calls the SQS resource depends on.
///
/// Implementations must be safe to share between lifecycle invocations.
#[async_trait]
pub trait AppSettingsClient: Send + Sync {
    /// Replace the application's SQS settings.
    async fn update_app_settings(&self, settings: &AppSettings) -> Result<(), ClientError>;

    /// Fetch the application's current configuration.
    async fn get_app_config(&self) -> Result<AppConfig, ClientError>;
}

/// HTTP implementation of [`AppSettingsClient`] backed by `reqwest`.
pub struct StreamClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    api_secret: SecretString,
}

impl fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl StreamClient {
    /// Create a client for the given application.
    pub fn new(
        base_url: Url,
        api_key: impl Into<String>,
        api_secret: SecretString,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(CLIENT_HEADER)
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            api_secret,
        })
    }

    /// Create a client from resolved provider configuration.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ClientError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            SecretString::from(config.api_secret.expose_secret().to_owned()),
            config.timeout,
        )
    }

    /// Append `path` to the base URL, keeping any path prefix it carries.
    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(path);
        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        Ok(url)
    }

    /// Sign a server-side token with the application secret.
    fn server_token(&self) -> Result<String, ClientError> {
        let key = EncodingKey::from_secret(self.api_secret.expose_secret().as_bytes());
        Ok(encode(&Header::default(), &ServerClaims { server: true }, &key)?)
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        Ok(request
            .header("Authorization", self.server_token()?)
            .header("Stream-Auth-Type", "jwt")
            .header("X-Stream-Client", CLIENT_HEADER))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ApiErrorBody>(&text).ok();
        let (code, message) = match body {
            Some(body) if !body.message.is_empty() => (body.code, body.message),
            _ => (0, fallback_message(status, text)),
        };
        warn!(status = status.as_u16(), code, "GetStream API request failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

fn fallback_message(status: StatusCode, text: String) -> String {
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        text
    }
}

#[async_trait]
impl AppSettingsClient for StreamClient {
    async fn update_app_settings(&self, settings: &AppSettings) -> Result<(), ClientError> {
        let url = self.endpoint("app")?;
        debug!(cleared = settings.is_cleared(), "PATCH /app");
        let request = self.authorize(self.http.patch(url))?.json(settings);
        self.send(request).await?;
        Ok(())
    }

    async fn get_app_config(&self) -> Result<AppConfig, ClientError> {
        let url = self.endpoint("app")?;
        debug!("GET /app");
        let request = self.authorize(self.http.get(url))?;
        let response: AppConfigResponse = self.send(request).await?.json().await?;
        Ok(response.app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use serde_json::json;

    fn test_client(base_url: &str, timeout: Duration) -> StreamClient {
        StreamClient::new(
            Url::parse(base_url).unwrap(),
            "key",
            SecretString::from("secret"),
            timeout,
        )
        .unwrap()
    }

    #[test]
    fn test_settings_debug_redacts_credentials() {
        let settings = AppSettings::sqs("https://queue", "AKIA-ACCESS", "very-secret");
        let debug = format!("{:?}", settings);
        assert!(debug.contains("https://queue"));
        assert!(!debug.contains("AKIA-ACCESS"));
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn test_cleared_settings() {
        assert!(AppSettings::cleared().is_cleared());
        assert!(!AppSettings::sqs("u", "", "").is_cleared());
        assert_eq!(
            serde_json::to_value(AppSettings::cleared()).unwrap(),
            json!({"sqs_url": "", "sqs_key": "", "sqs_secret": ""})
        );
    }

    #[test]
    fn test_server_token_is_signed_with_secret() {
        let client = test_client("http://localhost", Duration::from_secs(1));
        let token = client.server_token().unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        let decoded = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &validation,
        )
        .unwrap();
        assert_eq!(decoded.claims, json!({"server": true}));

        let wrong = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"other"),
            &validation,
        );
        assert!(wrong.is_err());
    }

    #[test]
    fn test_endpoint_carries_api_key() {
        let client = test_client("https://chat.stream-io-api.com", Duration::from_secs(1));
        let url = client.endpoint("app").unwrap();
        assert_eq!(url.as_str(), "https://chat.stream-io-api.com/app?api_key=key");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = test_client("https://proxy.example.com/stream", Duration::from_secs(1));
        let url = client.endpoint("app").unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/stream/app?api_key=key");

        let client = test_client("https://proxy.example.com/stream/", Duration::from_secs(1));
        let url = client.endpoint("app").unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/stream/app?api_key=key");
    }

    #[test]
    fn test_endpoint_rejects_opaque_base() {
        let client = test_client("mailto:ops@example.com", Duration::from_secs(1));
        assert!(matches!(
            client.endpoint("app"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_update_app_settings_sends_triple() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(Method::PATCH)
                    .path("/app")
                    .query_param("api_key", "key")
                    .header("stream-auth-type", "jwt")
                    .header_exists("authorization")
                    .json_body(json!({
                        "sqs_url": "https://queue",
                        "sqs_key": "two",
                        "sqs_secret": "three"
                    }));
                then.status(200).json_body(json!({"duration": "1ms"}));
            })
            .await;

        let client = test_client(&server.base_url(), Duration::from_secs(5));
        client
            .update_app_settings(&AppSettings::sqs("https://queue", "two", "three"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_app_config() {
        let server = MockServer::start_async().await;
        let _m = server
            .mock_async(|when, then| {
                when.method(Method::GET).path("/app");
                then.status(200).json_body(json!({
                    "app": {
                        "name": "demo",
                        "sqs_url": "https://queue",
                        "sqs_key": "two",
                        "sqs_secret": "three"
                    },
                    "duration": "2ms"
                }));
            })
            .await;

        let client = test_client(&server.base_url(), Duration::from_secs(5));
        let config = client.get_app_config().await.unwrap();
        assert_eq!(config.sqs_url, "https://queue");
        assert_eq!(config.sqs_key, "two");
        assert_eq!(config.sqs_secret, "three");
    }

    #[tokio::test]
    async fn test_api_error_is_decoded() {
        let server = MockServer::start_async().await;
        let _m = server
            .mock_async(|when, then| {
                when.method(Method::PATCH).path("/app");
                then.status(403).json_body(json!({
                    "code": 17,
                    "message": "UpdateApp failed with error: \"not allowed\"",
                    "StatusCode": 403
                }));
            })
            .await;

        let client = test_client(&server.base_url(), Duration::from_secs(5));
        let err = client
            .update_app_settings(&AppSettings::cleared())
            .await
            .unwrap_err();

        match err {
            ClientError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 403);
                assert_eq!(code, 17);
                assert!(message.contains("not allowed"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let server = MockServer::start_async().await;
        let _m = server
            .mock_async(|when, then| {
                when.method(Method::GET).path("/app");
                then.status(502);
            })
            .await;

        let client = test_client(&server.base_url(), Duration::from_secs(5));
        let err = client.get_app_config().await.unwrap_err();
        match err {
            ClientError::Api {
                status, message, ..
            } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start_async().await;
        let _m = server
            .mock_async(|when, then| {
                when.method(Method::PATCH).path("/app");
                then.status(200).delay(Duration::from_secs(2));
            })
            .await;

        let client = test_client(&server.base_url(), Duration::from_millis(100));
        let err = client
            .update_app_settings(&AppSettings::cleared())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Http(ref e) if e.is_timeout()));
        assert!(matches!(
            crate::error::ProviderError::from(err),
            crate::error::ProviderError::DeadlineExceeded(_)
        ));
    }
}
