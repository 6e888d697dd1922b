//! Request extractors.

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::error::AppError;
use super::state::AppState;
use crate::services::Claims;

/// JSON body whose decoding failures render as [`AppError`] instead of
/// axum's plain-text rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Caller identity from `Authorization: Bearer <token>`.
///
/// A missing header is rejected as unauthenticated (401), an unverifiable
/// token as an invalid credential (403).
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

/// Strip an optional `Bearer` scheme prefix.
fn bearer_token(header: &str) -> &str {
    let header = header.trim();
    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => header,
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(bearer_token);
        let claims = state.auth.verify(token)?;
        Ok(AuthUser(claims))
    }
}
