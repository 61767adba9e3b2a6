use crate::dto::ErrorResponse;
use crate::retry::ProviderMessage;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TwitterError {
    #[error("Twitter API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("{operation} returned cursor {cursor} again; pagination is not advancing")]
    StalledCursor { operation: String, cursor: i64 },
}

impl TwitterError {
    /// Builds an `Api` error from a non-success response.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
        let (code, message) = match parsed.as_ref().and_then(ErrorResponse::first) {
            Some((code, message)) => (code, message.to_string()),
            None if !body.trim().is_empty() => (None, body.trim().to_string()),
            None => (
                None,
                StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown error")
                    .to_string(),
            ),
        };

        TwitterError::Api {
            status,
            code,
            message,
        }
    }
}

impl ProviderMessage for TwitterError {
    fn provider_message(&self) -> Option<&str> {
        match self {
            TwitterError::Api { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}
