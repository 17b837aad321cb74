//! Provider configuration.
//!
//! The orchestrator hands the provider block over as JSON. Credentials left
//! out of the block are read from `STREAM_API_KEY` / `STREAM_API_SECRET`.

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::ProviderError;
use crate::schema::{Attribute, Schema, StringFormat};

/// Default GetStream chat API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://chat.stream-io-api.com";

/// Default per-request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "STREAM_API_KEY";

/// Environment variable holding the API secret.
pub const API_SECRET_ENV: &str = "STREAM_API_SECRET";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    api_secret: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    refresh_state: Option<bool>,
}

/// Resolved provider configuration.
#[derive(Debug)]
pub struct ProviderConfig {
    /// Application API key.
    pub api_key: String,
    /// Application API secret, used to sign server tokens.
    pub api_secret: SecretString,
    /// Base URL of the chat API.
    pub base_url: Url,
    /// Timeout applied to every upstream request.
    pub timeout: Duration,
    /// Refresh resource state from upstream on read instead of passing it through.
    pub refresh_state: bool,
}

impl ProviderConfig {
    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("GetStream.io application credentials")
            .with_attribute(
                "api_key",
                Attribute::optional_string()
                    .with_description(format!("Application API key. Defaults to ${}", API_KEY_ENV)),
            )
            .with_attribute(
                "api_secret",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!(
                        "Application API secret. Defaults to ${}",
                        API_SECRET_ENV
                    )),
            )
            .with_attribute(
                "base_url",
                Attribute::optional_string()
                    .with_format(StringFormat::Url)
                    .with_description(format!("Chat API endpoint. Defaults to {}", DEFAULT_BASE_URL)),
            )
            .with_attribute(
                "timeout_secs",
                Attribute::optional_int64().with_description("Timeout for each API request"),
            )
            .with_attribute(
                "refresh_state",
                Attribute::optional_bool()
                    .with_description("Read SQS settings back from the application on refresh"),
            )
    }

    /// Parse the configuration, falling back to the process environment.
    pub fn from_value(config: Value) -> Result<Self, ProviderError> {
        Self::from_value_with_env(config, |name| std::env::var(name).ok())
    }

    /// Parse the configuration with an explicit environment lookup.
    pub fn from_value_with_env<F>(config: Value, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = match config {
            Value::Null => RawConfig::default(),
            other => serde_json::from_value(other)
                .map_err(|e| ProviderError::Configuration(e.to_string()))?,
        };

        let api_key = non_empty(raw.api_key)
            .or_else(|| non_empty(env(API_KEY_ENV)))
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "api_key must be set in the provider block or via {}",
                    API_KEY_ENV
                ))
            })?;
        let api_secret = non_empty(raw.api_secret)
            .or_else(|| non_empty(env(API_SECRET_ENV)))
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "api_secret must be set in the provider block or via {}",
                    API_SECRET_ENV
                ))
            })?;

        let base_url = raw.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::Configuration(format!("invalid base_url: {}", e)))?;

        let timeout_secs = raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ProviderError::Configuration(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            api_secret: SecretString::from(api_secret),
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            refresh_state: raw.refresh_state.unwrap_or(false),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::from_value_with_env(
            json!({"api_key": "123", "api_secret": "456"}),
            no_env,
        )
        .unwrap();

        assert_eq!(config.api_key, "123");
        assert_eq!(config.api_secret.expose_secret(), "456");
        assert_eq!(config.base_url.as_str(), "https://chat.stream-io-api.com/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.refresh_state);
    }

    #[test]
    fn test_env_fallback() {
        let env = |name: &str| match name {
            API_KEY_ENV => Some("env-key".to_string()),
            API_SECRET_ENV => Some("env-secret".to_string()),
            _ => None,
        };
        let config = ProviderConfig::from_value_with_env(Value::Null, env).unwrap();
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.api_secret.expose_secret(), "env-secret");

        // Explicit values win over the environment
        let config =
            ProviderConfig::from_value_with_env(json!({"api_key": "block-key"}), env).unwrap();
        assert_eq!(config.api_key, "block-key");
    }

    #[test]
    fn test_missing_credentials() {
        let err = ProviderConfig::from_value_with_env(json!({"api_key": "k"}), no_env).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.message().contains("api_secret"));

        let err =
            ProviderConfig::from_value_with_env(json!({"api_key": "", "api_secret": "s"}), no_env)
                .unwrap_err();
        assert!(err.message().contains("api_key"));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = ProviderConfig::from_value_with_env(
            json!({
                "api_key": "k",
                "api_secret": "s",
                "base_url": "http://localhost:8080",
                "timeout_secs": 5,
                "refresh_state": true
            }),
            no_env,
        )
        .unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.refresh_state);

        let err = ProviderConfig::from_value_with_env(
            json!({"api_key": "k", "api_secret": "s", "timeout_secs": 0}),
            no_env,
        )
        .unwrap_err();
        assert!(err.message().contains("timeout_secs"));

        let err = ProviderConfig::from_value_with_env(
            json!({"api_key": "k", "api_secret": "s", "base_url": "nope"}),
            no_env,
        )
        .unwrap_err();
        assert!(err.message().contains("base_url"));

        let err = ProviderConfig::from_value_with_env(
            json!({"api_key": "k", "api_secret": "s", "region": "eu"}),
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ProviderConfig::from_value_with_env(
            json!({"api_key": "k", "api_secret": "super-secret"}),
            no_env,
        )
        .unwrap();
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
