//! Remote Store Error Types
//!
//! Structured errors for object store operations.
//! Maps SDK failures and service error codes to variants used for retry decisions.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Object store error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limited, try again after backoff")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request error: {0}")]
    Request(String),
}

impl RemoteError {
    /// Whether this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::RateLimited
                | RemoteError::Timeout
                | RemoteError::Network(_)
                | RemoteError::Server(_, _)
        )
    }

    /// Create a RemoteError from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            403 => RemoteError::Forbidden(body.to_string()),
            404 => RemoteError::NotFound(body.to_string()),
            408 => RemoteError::Timeout,
            429 | 503 => RemoteError::RateLimited,
            500..=599 => RemoteError::Server(status, body.to_string()),
            _ => RemoteError::Request(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Create a RemoteError from an S3 service error code
    pub fn from_code(code: &str, message: &str) -> Self {
        match code {
            "NoSuchBucket" | "NoSuchKey" | "NotFound" => RemoteError::NotFound(message.to_string()),
            "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" => {
                RemoteError::Forbidden(message.to_string())
            }
            "SlowDown" | "Throttling" | "ServiceUnavailable" => RemoteError::RateLimited,
            "InternalError" => RemoteError::Server(500, message.to_string()),
            "RequestTimeout" => RemoteError::Timeout,
            _ => RemoteError::Request(format!("{}: {}", code, message)),
        }
    }

    /// Classify a service response by error code, falling back to the HTTP
    /// status when the body carried no code (e.g. an HTML page from a proxy)
    pub fn from_response(status: u16, code: Option<&str>, message: &str) -> Self {
        match code {
            Some(code) => RemoteError::from_code(code, message),
            None => RemoteError::from_status(status, message),
        }
    }

    /// Classify an AWS SDK error
    pub fn from_sdk<E>(err: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
    {
        match &err {
            SdkError::TimeoutError(_) => RemoteError::Timeout,
            SdkError::DispatchFailure(_) => {
                RemoteError::Network(DisplayErrorContext(&err).to_string())
            }
            SdkError::ServiceError(context) => {
                let service_err = context.err();
                let message = match service_err.message() {
                    Some(message) => message.to_string(),
                    None => DisplayErrorContext(&err).to_string(),
                };
                RemoteError::from_response(
                    context.raw().status().as_u16(),
                    service_err.code(),
                    &message,
                )
            }
            SdkError::ResponseError(context) => RemoteError::from_status(
                context.raw().status().as_u16(),
                &DisplayErrorContext(&err).to_string(),
            ),
            _ => RemoteError::Request(DisplayErrorContext(&err).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert_eq!(
            RemoteError::from_status(404, "missing"),
            RemoteError::NotFound("missing".to_string())
        );
        assert_eq!(RemoteError::from_status(429, ""), RemoteError::RateLimited);
        assert_eq!(
            RemoteError::from_status(502, "bad gateway"),
            RemoteError::Server(502, "bad gateway".to_string())
        );
        assert!(matches!(
            RemoteError::from_status(400, "bad"),
            RemoteError::Request(_)
        ));
    }

    #[test]
    fn test_from_code() {
        assert!(matches!(
            RemoteError::from_code("NoSuchBucket", "gone"),
            RemoteError::NotFound(_)
        ));
        assert!(matches!(
            RemoteError::from_code("AccessDenied", "no"),
            RemoteError::Forbidden(_)
        ));
        assert_eq!(RemoteError::from_code("SlowDown", ""), RemoteError::RateLimited);
    }

    #[test]
    fn test_codeless_responses_classified_by_status() {
        let bad_gateway = RemoteError::from_response(502, None, "<html>Bad Gateway</html>");
        assert_eq!(
            bad_gateway,
            RemoteError::Server(502, "<html>Bad Gateway</html>".to_string())
        );
        assert!(bad_gateway.is_retryable());

        let unavailable = RemoteError::from_response(503, None, "<html>down</html>");
        assert_eq!(unavailable, RemoteError::RateLimited);
        assert!(unavailable.is_retryable());

        // A service code wins over the status
        assert!(matches!(
            RemoteError::from_response(503, Some("NoSuchKey"), "gone"),
            RemoteError::NotFound(_)
        ));
        assert!(!RemoteError::from_response(400, None, "bad").is_retryable());
    }

    #[test]
    fn test_retryable() {
        assert!(RemoteError::Timeout.is_retryable());
        assert!(RemoteError::Network("reset".into()).is_retryable());
        assert!(RemoteError::Server(500, String::new()).is_retryable());
        assert!(!RemoteError::Forbidden(String::new()).is_retryable());
        assert!(!RemoteError::NotFound(String::new()).is_retryable());
    }
}
