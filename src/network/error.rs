//! Error handling for backend calls

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The control server could not be reached at all.
    #[error("server is not running: {0}")]
    NotRunning(String),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Backend {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("request timed out")]
    Timeout,

    /// Any other transport failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The requested operation is not available with the current setup.
    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("unknown snapshot: {0}")]
    UnknownSnapshot(String),
}

/// Error body the control server returns alongside non-2xx statuses
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiError {
    pub async fn from_response(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response text".to_string());

        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody { code, error: Some(message) }) => ApiError::Backend {
                status,
                code,
                message,
            },
            _ => ApiError::Backend {
                status,
                code: None,
                message: if text.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    text
                },
            },
        }
    }

    /// True for failures that describe an expected state rather than a fault
    pub fn is_benign(&self) -> bool {
        is_benign_message(&self.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_connect() {
            ApiError::NotRunning(e.to_string())
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Matches the messages the backend uses for "not started yet" states
pub fn is_benign_message(message: &str) -> bool {
    let message = message.to_lowercase();
    crate::constants::BENIGN_ERROR_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}
