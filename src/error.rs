//! Error types for the GetStream provider.

use thiserror::Error;

use crate::client::ClientError;
use crate::schema::Diagnostic;

/// Errors surfaced by provider lifecycle operations.
///
/// None of these abort the process: every failure is returned to the caller,
/// which decides how to report it (see [`ProviderError::to_diagnostic`]).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found upstream.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The upstream API rejected the request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other upstream failure.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl ProviderError {
    /// Get the error message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::PermissionDenied(msg)
            | Self::ResourceExhausted(msg)
            | Self::Unavailable(msg)
            | Self::DeadlineExceeded(msg)
            | Self::Unimplemented(msg)
            | Self::InvalidRequest(msg)
            | Self::Upstream(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
        }
    }

    /// Convert this error into an error diagnostic for the caller.
    ///
    /// The summary names the failed operation; the detail carries the
    /// error itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use hemmer_provider_getstream::ProviderError;
    /// use hemmer_provider_getstream::schema::DiagnosticSeverity;
    ///
    /// let err = ProviderError::Unavailable("upstream is down".to_string());
    /// let diag = err.to_diagnostic("Unable to create SQS link");
    /// assert_eq!(diag.severity, DiagnosticSeverity::Error);
    /// assert_eq!(diag.detail.as_deref(), Some("Service unavailable: upstream is down"));
    /// ```
    pub fn to_diagnostic(&self, summary: impl Into<String>) -> Diagnostic {
        Diagnostic::error(summary).with_detail(self.to_string())
    }
}

impl From<ClientError> for ProviderError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api {
                status, message, ..
            } => match status {
                401 | 403 => Self::PermissionDenied(message),
                404 => Self::NotFound(message),
                429 => Self::ResourceExhausted(message),
                500..=599 => Self::Unavailable(message),
                400..=499 => Self::InvalidRequest(message),
                _ => Self::Upstream(format!("HTTP {}: {}", status, message)),
            },
            ClientError::Http(e) if e.is_timeout() => Self::DeadlineExceeded(e.to_string()),
            ClientError::Http(e) if e.is_connect() => Self::Unavailable(e.to_string()),
            ClientError::Http(e) => Self::Upstream(e.to_string()),
            ClientError::Token(e) => Self::Configuration(format!("Unable to sign API token: {}", e)),
            ClientError::InvalidUrl(e) => Self::Configuration(format!("Invalid base URL: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    fn api_error(status: u16) -> ClientError {
        ClientError::Api {
            status,
            code: 0,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("app".to_string());
        assert_eq!(format!("{}", err), "Resource not found: app");

        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::UnknownResource("getstreamio_channel".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: getstreamio_channel");
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Configuration("missing api_key".to_string());
        assert_eq!(err.message(), "missing api_key");

        let err = ProviderError::Upstream("HTTP 302".to_string());
        assert_eq!(err.message(), "HTTP 302");
    }

    #[test]
    fn test_api_status_mapping() {
        assert!(matches!(
            ProviderError::from(api_error(401)),
            ProviderError::PermissionDenied(_)
        ));
        assert!(matches!(
            ProviderError::from(api_error(403)),
            ProviderError::PermissionDenied(_)
        ));
        assert!(matches!(
            ProviderError::from(api_error(404)),
            ProviderError::NotFound(_)
        ));
        assert!(matches!(
            ProviderError::from(api_error(429)),
            ProviderError::ResourceExhausted(_)
        ));
        assert!(matches!(
            ProviderError::from(api_error(503)),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            ProviderError::from(api_error(400)),
            ProviderError::InvalidRequest(_)
        ));
        assert!(matches!(
            ProviderError::from(api_error(302)),
            ProviderError::Upstream(_)
        ));
    }

    #[test]
    fn test_to_diagnostic() {
        let err = ProviderError::PermissionDenied("bad signature".to_string());
        let diag = err.to_diagnostic("Unable to update SQS link");

        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.summary, "Unable to update SQS link");
        assert_eq!(
            diag.detail,
            Some("Permission denied: bad signature".to_string())
        );
        assert!(diag.attribute.is_none());
    }
}
