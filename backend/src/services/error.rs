//! Business-level failures shared by the auth and race services.

use thiserror::Error;

use crate::db::RepositoryError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed identifiers, dates or coordinates.
    #[error("{0}")]
    InvalidInput(String),

    /// Duplicate username, racer already in race, or lost concurrent update.
    #[error("{0}")]
    Conflict(String),

    /// Illegal racer-state transition.
    #[error("{0}")]
    InvalidState(String),

    /// Login with an unknown user or a wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Access denied. No token provided.")]
    Unauthenticated,

    /// Bad signature, malformed or expired token.
    #[error("Invalid token")]
    InvalidCredential,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn invalid_id() -> Self {
        Self::InvalidInput("Invalid ID format".to_string())
    }

    pub fn race_not_found() -> Self {
        Self::NotFound("Race not found".to_string())
    }

    pub fn user_not_found() -> Self {
        Self::NotFound("User not found".to_string())
    }

    pub fn admin_required() -> Self {
        Self::Forbidden("Access denied. Admin privileges required.".to_string())
    }

    /// Whether the failure is the caller's fault (4xx) rather than the server's.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::Internal(_))
    }
}

impl From<crate::models::TimeParseError> for ServiceError {
    fn from(err: crate::models::TimeParseError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
