//! The single error type every client call fails with.

use serde::Deserialize;
use thiserror::Error;

/// Status reported for failures where no HTTP response was received.
pub const TRANSPORT_STATUS: u16 = 0;
/// Code for a successful response whose body did not match the contract.
pub const INVALID_RESPONSE_CODE: &str = "invalid_response";

/// A failed API call.
///
/// Transport failures (connect, DNS, timeout) carry status `0`. Application
/// failures carry the HTTP status plus whatever message, detail and machine
/// code the backend put in its error body. A 2xx body that does not decode
/// keeps its status and is tagged [`INVALID_RESPONSE_CODE`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Error {
    pub message: String,
    pub detail: Option<String>,
    pub status: u16,
    pub code: Option<String>,
}

impl Error {
    /// No response was received.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
            status: TRANSPORT_STATUS,
            code: None,
        }
    }

    /// The client could not be configured (bad base URL, unusable API key).
    pub fn config(message: impl Into<String>) -> Self {
        Self::transport(message)
    }

    /// Build an application error from a non-2xx response body.
    ///
    /// Understands FastAPI's `{"detail": "..."}`, its validation shape
    /// `{"detail": [{"msg": "..."}]}`, and the backend's own
    /// `{"error": "...", "detail": "...", "code": "..."}`. Anything else is
    /// kept verbatim as the detail.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let (error, detail, code) = match parsed {
            Some(body) => (body.error, body.detail.and_then(detail_text), body.code),
            None => (None, (!body.trim().is_empty()).then(|| body.trim().to_string()), None),
        };

        let message = error
            .or_else(|| detail.clone())
            .unwrap_or_else(|| format!("Request failed with status {status}"));

        Self {
            detail: detail.or_else(|| Some(message.clone())),
            message,
            status,
            code,
        }
    }

    /// The server answered with a success status but an unreadable body.
    pub fn invalid_response(status: u16, detail: impl Into<String>) -> Self {
        Self {
            message: "Failed to parse response".to_string(),
            detail: Some(detail.into()),
            status,
            code: Some(INVALID_RESPONSE_CODE.to_string()),
        }
    }

    pub fn is_invalid_response(&self) -> bool {
        self.code.as_deref() == Some(INVALID_RESPONSE_CODE)
    }

    pub fn is_transport(&self) -> bool {
        self.status == TRANSPORT_STATUS
    }

    /// The message a child-facing view should show for this failure.
    pub fn user_message(&self) -> String {
        if self.is_invalid_response() {
            return "The story server sent something we couldn't read. Please try again."
                .to_string();
        }
        match self.status {
            TRANSPORT_STATUS => {
                "Can't reach the story server. Check your connection and try again.".to_string()
            }
            400 => self
                .detail
                .clone()
                .unwrap_or_else(|| self.message.clone()),
            401 => "Authentication failed. Check the API key and try again.".to_string(),
            404 => "Your session has expired. Please start a new one.".to_string(),
            429 => "Too many requests. Please wait a moment and try again.".to_string(),
            500..=599 => "Something went wrong on our side. Please try again later.".to_string(),
            _ => self.message.clone(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            "Request timed out".to_string()
        } else if e.is_connect() {
            "Could not connect to server".to_string()
        } else if e.is_decode() {
            "Failed to parse response".to_string()
        } else {
            "Network error".to_string()
        };

        Self {
            message,
            detail: Some(e.to_string()),
            status: TRANSPORT_STATUS,
            code: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    code: Option<String>,
}

fn detail_text(detail: serde_json::Value) -> Option<String> {
    match detail {
        serde_json::Value::String(text) => Some(text),
        serde_json::Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .map(str::to_string)
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
