//! Mapping of domain outcomes onto HTTP responses.
//!
//! The status for a given `AuthError` depends on the endpoint (an unknown user
//! is 401 on login but 404 on reset-request), so every endpoint names its
//! [`Flow`] and the match below is exhaustive per flow. Anything not listed is
//! logged and rendered as a generic 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::AuthError;

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Register,
    Login,
    VerifyCode,
    Refresh,
    ResetRequest,
    ResetConfirm,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    #[must_use]
    pub fn from_auth(err: AuthError, flow: Flow) -> Self {
        match (flow, &err) {
            (Flow::Register, AuthError::EmailExists) => {
                Self::new(StatusCode::CONFLICT, "email already exists")
            }
            (Flow::Login, AuthError::UserNotFound | AuthError::InvalidPassword) => {
                Self::new(StatusCode::UNAUTHORIZED, "invalid credentials")
            }
            (Flow::Login, AuthError::EmailNotConfirmed) => {
                Self::new(StatusCode::UNAUTHORIZED, "email not confirmed")
            }
            (
                Flow::VerifyCode | Flow::ResetConfirm,
                AuthError::InvalidCode | AuthError::CodeExpired,
            ) => Self::new(StatusCode::BAD_REQUEST, &err.to_string()),
            (Flow::Refresh, AuthError::InvalidRefreshToken | AuthError::RefreshTokenExpired) => {
                Self::new(StatusCode::UNAUTHORIZED, &err.to_string())
            }
            (Flow::ResetRequest, AuthError::UserNotFound) => {
                Self::new(StatusCode::NOT_FOUND, "user not found")
            }
            (_, AuthError::Internal(inner)) => {
                error!("{flow:?} failed: {inner:#}");
                Self::internal()
            }
            (_, other) => {
                error!("{flow:?} failed with unexpected outcome: {other}");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}
