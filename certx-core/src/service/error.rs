use certx_providers::{
    certificate_state::error::TransitionError, common_models::user::UserValidationError,
    registry::error::RegistryError, validity::error::ValidityError,
};
use strum::Display;
use thiserror::Error;

/// The four ways an operation can fail, as far as the caller is concerned.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Caught before anything was sent, or refused by the registry as invalid input.
    Validation,
    Authorization,
    /// The caller's view is stale; the list gets refetched.
    NotFoundOrConflict,
    /// Worth retrying by hand. Never retried automatically.
    Transient,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Transition error: `{0}`")]
    Transition(#[from] TransitionError),
    #[error("Validity error: `{0}`")]
    Validity(#[from] ValidityError),
    #[error("User validation error: `{0}`")]
    UserValidation(#[from] UserValidationError),
    #[error("Validation error: `{0}`")]
    Validation(String),
    #[error("Forbidden: `{0}`")]
    Forbidden(String),
    #[error("Registry error: `{0}`")]
    Registry(#[from] RegistryError),
    #[error("Configuration error: `{0}`")]
    Config(String),
}

const TRANSIENT_MESSAGE: &str = "The registry could not be reached. Please try again.";

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transition(error) if error.is_authorization() => ErrorKind::Authorization,
            Self::Forbidden(_) => ErrorKind::Authorization,
            Self::Transition(
                TransitionError::InvalidState { .. }
                | TransitionError::Expired { .. }
                | TransitionError::PendingResubmission(_)
                | TransitionError::InconsistentRecord(_),
            ) => ErrorKind::NotFoundOrConflict,
            Self::Transition(_)
            | Self::Validity(_)
            | Self::UserValidation(_)
            | Self::Validation(_)
            | Self::Config(_) => ErrorKind::Validation,
            Self::Registry(error) => match error {
                RegistryError::Rejected(_) => ErrorKind::Validation,
                RegistryError::Unauthorized(_) | RegistryError::Forbidden(_) => {
                    ErrorKind::Authorization
                }
                RegistryError::NotFound(_) | RegistryError::Conflict(_) => {
                    ErrorKind::NotFoundOrConflict
                }
                RegistryError::Unavailable(_)
                | RegistryError::MappingError(_)
                | RegistryError::HttpClient(_)
                | RegistryError::JsonError(_) => ErrorKind::Transient,
            },
        }
    }

    /// Blocked before any request went out.
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::Registry(_))
    }

    pub fn requires_refresh(&self) -> bool {
        self.kind() == ErrorKind::NotFoundOrConflict
    }

    /// Text for the end user: the registry's own message when it sent one, a generic
    /// retry prompt for transient failures.
    pub fn user_message(&self) -> String {
        if let Self::Registry(error) = self {
            if let Some(message) = error.server_message() {
                return message.to_owned();
            }
        }

        match self.kind() {
            ErrorKind::Transient => TRANSIENT_MESSAGE.to_owned(),
            _ => match self {
                Self::Transition(error) => error.to_string(),
                Self::Validity(error) => error.to_string(),
                Self::UserValidation(error) => error.to_string(),
                other => other.to_string(),
            },
        }
    }
}
