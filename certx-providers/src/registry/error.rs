//! Enumerates errors of registry clients.

use thiserror::Error;

use crate::http_client;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// 400 / 422, or an acknowledgement with `ok: false`.
    #[error("Rejected by registry: `{0}`")]
    Rejected(String),
    #[error("Unauthorized: `{0}`")]
    Unauthorized(String),
    #[error("Forbidden: `{0}`")]
    Forbidden(String),
    #[error("Not found: `{0}`")]
    NotFound(String),
    #[error("Conflict: `{0}`")]
    Conflict(String),
    #[error("Registry unavailable: `{0}`")]
    Unavailable(String),
    #[error("Mapping error: `{0}`")]
    MappingError(String),

    #[error("HTTP client error: `{0}`")]
    HttpClient(#[from] http_client::Error),
    #[error("JSON error: `{0}`")]
    JsonError(#[from] serde_json::Error),
}

impl RegistryError {
    /// The message the registry sent, to be shown to the caller unchanged.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message) => Some(message),
            _ => None,
        }
    }

    /// Failures of the transport or of the registry itself rather than of the request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::HttpClient(http_client::Error::HttpError(_))
        )
    }
}
