//! HTTP error handling and response types.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::db::RepositoryError;
use crate::services::ServiceError;

/// API error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Underlying failure, exposed for server errors in development mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Full body of a server error, kept out of the response until
/// [`expose_error_details`] decides whether to render it.
#[derive(Debug, Clone)]
struct DetailedError(ApiError);

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    Service(ServiceError),
    /// Body that could not be decoded into the expected request shape.
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Service(err) => match err {
                ServiceError::InvalidInput(_)
                | ServiceError::Conflict(_)
                | ServiceError::InvalidState(_)
                | ServiceError::InvalidCredentials => StatusCode::BAD_REQUEST,
                ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
                ServiceError::InvalidCredential | ServiceError::Forbidden(_) => {
                    StatusCode::FORBIDDEN
                }
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Repository(_) | ServiceError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "INVALID_INPUT",
            AppError::Service(err) => match err {
                ServiceError::InvalidInput(_) => "INVALID_INPUT",
                ServiceError::Conflict(_) => "CONFLICT",
                ServiceError::InvalidState(_) => "INVALID_STATE",
                ServiceError::InvalidCredentials => "INVALID_CREDENTIALS",
                ServiceError::Unauthenticated => "UNAUTHENTICATED",
                ServiceError::InvalidCredential => "INVALID_TOKEN",
                ServiceError::Forbidden(_) => "FORBIDDEN",
                ServiceError::NotFound(_) => "NOT_FOUND",
                ServiceError::Repository(_) => "REPOSITORY_ERROR",
                ServiceError::Internal(_) => "INTERNAL_ERROR",
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            let details = match &self {
                AppError::Service(err) => err.to_string(),
                AppError::BadRequest(msg) => msg.clone(),
            };
            tracing::error!(code, "request failed: {}", details);
            let body = ApiError::new(code, "Server error");
            let detailed = DetailedError(body.clone().with_details(details));
            let mut response = (status, Json(body)).into_response();
            response.extensions_mut().insert(detailed);
            return response;
        }

        let message = match self {
            AppError::Service(err) => err.to_string(),
            AppError::BadRequest(msg) => msg,
        };
        (status, Json(ApiError::new(code, message))).into_response()
    }
}

/// Response middleware: in development mode, server errors carry the
/// underlying failure in `details`.
pub async fn expose_error_details(State(state): State<AppState>, response: Response) -> Response {
    if !state.config.environment.is_development() {
        return response;
    }
    let Some(DetailedError(body)) = response.extensions().get::<DetailedError>().cloned() else {
        return response;
    };
    (response.status(), Json(body)).into_response()
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError::Service(err)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Service(ServiceError::Repository(err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
