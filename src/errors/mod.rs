//! Error handling module for the catalog client.
//!
//! Every layer returns [`ClientError`]. The resource client never swallows
//! failures; the stores record [`ClientError::user_message`] and re-propagate,
//! and the view layer turns the error into an outcome value.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use validator::ValidationErrors;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const SERVER_ERROR: &str = "SERVER_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
    pub const MISSING_TOKEN: &str = "MISSING_TOKEN";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure, or a thumbnail download that did not succeed
    #[error("{0}")]
    Transport(String),
    /// Non-2xx response from the API
    #[error("Request failed with status code {status}")]
    Server {
        status: u16,
        message: Option<String>,
    },
    /// The API answered 404
    #[error("Request failed with status code 404")]
    NotFound { message: Option<String> },
    /// Input rejected before any request was sent
    #[error("{0}")]
    Validation(String),
    /// 2xx response whose body could not be decoded
    #[error("Invalid response body: {0}")]
    Decode(String),
    /// Login succeeded but the body carried no token
    #[error("Token não retornado pela API.")]
    MissingToken,
    /// Persisted auth storage could not be written
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Transport(_) => codes::TRANSPORT_ERROR,
            ClientError::Server { .. } => codes::SERVER_ERROR,
            ClientError::NotFound { .. } => codes::NOT_FOUND,
            ClientError::Validation(_) => codes::VALIDATION_ERROR,
            ClientError::Decode(_) => codes::DECODE_ERROR,
            ClientError::MissingToken => codes::MISSING_TOKEN,
            ClientError::Storage(_) => codes::STORAGE_ERROR,
        }
    }

    /// HTTP status reported by the server, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::NotFound { .. } => Some(StatusCode::NOT_FOUND.as_u16()),
            _ => None,
        }
    }

    /// Message carried in the server's response body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Server { message, .. } | ClientError::NotFound { message } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }

    /// Message to show a user: the server's message when present, otherwise
    /// the error's own description.
    pub fn user_message(&self) -> String {
        match self.server_message() {
            Some(message) => message.to_string(),
            None => self.to_string(),
        }
    }

    /// Like [`ClientError::user_message`], falling back to `default` when
    /// nothing meaningful is available.
    pub fn user_message_or(&self, default: &str) -> String {
        let message = self.user_message();
        if message.trim().is_empty() {
            default.to_string()
        } else {
            message
        }
    }

    /// Build the error for a non-2xx response from its status and raw body.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let message = extract_message(body);
        if status == StatusCode::NOT_FOUND {
            ClientError::NotFound { message }
        } else {
            ClientError::Server {
                status: status.as_u16(),
                message,
            }
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        tracing::debug!("Transport error: {:?}", err);
        ClientError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!("JSON error: {:?}", err);
        ClientError::Decode(err.to_string())
    }
}

impl From<ValidationErrors> for ClientError {
    /// Keeps the first failed rule, taking fields in name order.
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .iter()
            .find_map(|(field, failures)| {
                failures.first().map(|failure| match &failure.message {
                    Some(message) => message.to_string(),
                    None => format!("{}: {}", field, failure.code),
                })
            })
            .unwrap_or_else(|| errors.to_string());
        ClientError::Validation(message)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

/// Error body shape used by the API. `message` is either a string or, for
/// validation failures, a list of strings.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
}

fn extract_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.message? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}
