//! Error types for the API client.

use thiserror::Error;

/// Errors that can occur while calling the video API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer token was supplied; no request was attempted.
    #[error("authentication required: sign in to obtain a token")]
    AuthenticationRequired,

    /// A required parameter was missing or blank; no request was attempted.
    #[error("{field} is required")]
    Validation {
        /// Human-readable name of the missing parameter.
        field: &'static str,
    },

    /// The API answered with a non-success status (after any retries).
    #[error("HTTP {status} from {url}: {message}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body, or the status text.
        message: String,
    },

    /// Network-level failure: no response was received.
    #[error("network error calling {url}: {source}")]
    Network {
        /// Request URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request timed out before a response arrived.
    #[error("timeout calling {url}")]
    Timeout {
        /// Request URL.
        url: String,
    },

    /// The configured base URL or a derived endpoint URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
    },

    /// A success response did not have the expected shape.
    #[error("unexpected response from {url}: {message}")]
    Decode {
        /// Request URL.
        url: String,
        /// What was wrong with the body.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl ApiError {
    /// Creates a validation error for a missing parameter.
    #[must_use]
    pub fn validation(field: &'static str) -> Self {
        Self::Validation { field }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates a network error, promoting timeouts to [`ApiError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a response shape error.
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status for [`ApiError::HttpStatus`].
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_includes_status_and_message() {
        let error = ApiError::http_status("https://api.example/videos", 404, "Video not found");
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("Video not found"), "Expected message in: {msg}");
        assert_eq!(error.status(), Some(404));
    }

    #[test]
    fn test_validation_display_names_field() {
        let error = ApiError::validation("video id");
        assert_eq!(error.to_string(), "video id is required");
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_authentication_required_display() {
        let msg = ApiError::AuthenticationRequired.to_string();
        assert!(msg.contains("authentication required"), "got: {msg}");
    }
}
