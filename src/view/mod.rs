//! View-model layer: the final error boundary before presentation.
//!
//! Actions never return `Err`; failures come back as outcome values with a
//! message ready to show.

mod auth;
mod products;

pub use auth::*;
pub use products::*;

use serde::Serialize;

use crate::errors::ClientResult;

/// Result of a view action.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActionOutcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn from_result(result: ClientResult<T>, default_message: &str) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failed(err.user_message_or(default_message)),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.data, self.error) {
            (Some(data), _) if self.success => Ok(data),
            (_, Some(error)) => Err(error),
            _ => Err("Erro desconhecido".to_string()),
        }
    }
}
