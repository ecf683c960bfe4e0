//! LINE Pay error types
//!
//! Errors fall into three families:
//!
//! - [`Error::Configuration`]: a missing or unrecognized parameter, detected
//!   locally before anything is signed or sent.
//! - Transport errors ([`Error::Http`], [`Error::InvalidUrl`], [`Error::Decode`],
//!   [`Error::InvalidResponse`]): the round trip itself failed or the body
//!   could not be read as a LINE Pay envelope.
//! - [`Error::Provider`]: the body was decoded but `returnCode` is not `"0000"`.
//!
//! [`Error::UnexpectedInfo`] sits outside these families: the provider accepted
//! the call but its `info` did not match the typed view asked for.
//!
//! Provider failures keep `returnCode` and `returnMessage` verbatim so callers
//! can branch on the code:
//!
//! ```json
//! {
//!   "returnCode": "1190",
//!   "returnMessage": "regKey does not exist."
//! }
//! ```
//!
//! Nothing in this crate retries on any of these.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Return code LINE Pay uses for a successful call
pub const SUCCESS_RETURN_CODE: &str = "0000";

/// LINE Pay client error
#[derive(Debug, Error)]
pub enum Error {
    /// Missing required or unrecognized parameter
    #[error("{0}")]
    Configuration(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body is not valid JSON
    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Response is JSON but not a LINE Pay envelope
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Call succeeded but `info` does not fit the requested typed view
    #[error("Unexpected info payload: {0}")]
    UnexpectedInfo(String),

    /// LINE Pay returned a non-success `returnCode`
    #[error("LINE Pay error: {0}")]
    Provider(#[from] ProviderError),
}

impl Error {
    /// Check if this error happened on the wire or while reading the body
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_) | Error::Http(_) | Error::Decode(_) | Error::InvalidResponse(_)
        )
    }

    /// Check if this error was raised before any request was built
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Provider `returnCode`, if LINE Pay rejected the call
    pub fn return_code(&self) -> Option<&str> {
        match self {
            Error::Provider(e) => Some(&e.return_code),
            _ => None,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}

/// Failure reported by LINE Pay in the response envelope
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("[{return_code}] {return_message}")]
pub struct ProviderError {
    /// Provider result code, never `"0000"`
    pub return_code: String,
    /// Human-readable message from the provider
    #[serde(default)]
    pub return_message: String,
}

impl ProviderError {
    /// Check if this error matches a specific return code
    pub fn is_return_code(&self, code: &str) -> bool {
        self.return_code == code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_keeps_fields() {
        let err: Error = ProviderError {
            return_code: "2102".to_string(),
            return_message: "Invalid currency".to_string(),
        }
        .into();

        assert_eq!(err.return_code(), Some("2102"));
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "LINE Pay error: [2102] Invalid currency");
    }

    #[test]
    fn test_configuration_error_message() {
        let err = Error::config("Required parameter channelId is missing.");
        assert!(err.is_configuration());
        assert_eq!(err.return_code(), None);
        assert_eq!(err.to_string(), "Required parameter channelId is missing.");
    }
}
