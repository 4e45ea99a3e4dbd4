//! `/api/v1/auth` endpoints.
//!
//! Registration and login only ever answer with "code sent"; tokens come back
//! from the verify endpoints and from refresh.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::{valid_code, valid_email, valid_password};
use crate::{
    api::error::{ApiError, ErrorBody, Flow},
    auth::{AuthService, LoginOutcome, TokenPair},
};

const CODE_SENT: &str = "verification code sent to your email";
const PASSWORD_RULES: &str =
    "password must be at least 8 characters and contain numbers and letters in different cases";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    fn code_sent() -> Json<Self> {
        Json(Self {
            message: CODE_SENT.to_string(),
        })
    }
}

#[derive(ToSchema, Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

#[derive(ToSchema, Deserialize)]
pub struct CodeSubmission {
    email: String,
    code: String,
}

#[derive(ToSchema, Deserialize)]
pub struct RefreshRequest {
    refresh_token: String,
}

#[derive(ToSchema, Deserialize)]
pub struct ResetRequest {
    email: String,
}

#[derive(ToSchema, Deserialize)]
pub struct ResetConfirm {
    email: String,
    code: String,
    new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetDone {
    pub message: String,
    pub details: String,
}

fn payload<T>(payload: Option<Json<T>>) -> Result<T, ApiError> {
    payload
        .map(|Json(payload)| payload)
        .ok_or_else(|| ApiError::bad_request("missing or malformed payload"))
}

fn email_from(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim();
    if valid_email(email) {
        Ok(email.to_string())
    } else {
        Err(ApiError::bad_request("invalid email format"))
    }
}

fn code_from(raw: &str) -> Result<&str, ApiError> {
    let code = raw.trim();
    if valid_code(code) {
        Ok(code)
    } else {
        Err(ApiError::bad_request("verification code must be 6 digits"))
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = Credentials,
    responses(
        (status = 200, description = "Account created, registration code sent", body = MessageBody),
        (status = 400, description = "Invalid email or weak password", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    auth: Extension<AuthService>,
    request: Option<Json<Credentials>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload(request)?;
    let email = email_from(&request.email)?;
    if !valid_password(&request.password) {
        return Err(ApiError::bad_request(PASSWORD_RULES));
    }

    auth.register(&email, &request.password)
        .await
        .map_err(|err| ApiError::from_auth(err, Flow::Register))?;

    Ok(MessageBody::code_sent())
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Credentials accepted, login code sent", body = MessageBody),
        (status = 400, description = "Malformed request", body = ErrorBody),
        (status = 401, description = "Invalid credentials or email not confirmed", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    auth: Extension<AuthService>,
    request: Option<Json<Credentials>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload(request)?;
    let email = email_from(&request.email)?;

    match auth
        .login(&email, &request.password)
        .await
        .map_err(|err| ApiError::from_auth(err, Flow::Login))?
    {
        LoginOutcome::VerificationSent => Ok(MessageBody::code_sent()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-email",
    request_body = CodeSubmission,
    responses(
        (status = 200, description = "Email confirmed", body = TokenPair),
        (status = 400, description = "Invalid or expired code", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify_email(
    auth: Extension<AuthService>,
    request: Option<Json<CodeSubmission>>,
) -> Result<Json<TokenPair>, ApiError> {
    let request = payload(request)?;
    let email = email_from(&request.email)?;
    let code = code_from(&request.code)?;

    auth.verify_email(&email, code)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_auth(err, Flow::VerifyCode))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-login",
    request_body = CodeSubmission,
    responses(
        (status = 200, description = "Login confirmed", body = TokenPair),
        (status = 400, description = "Invalid or expired code", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify_login(
    auth: Extension<AuthService>,
    request: Option<Json<CodeSubmission>>,
) -> Result<Json<TokenPair>, ApiError> {
    let request = payload(request)?;
    let email = email_from(&request.email)?;
    let code = code_from(&request.code)?;

    auth.verify_login(&email, code)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_auth(err, Flow::VerifyCode))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 400, description = "Refresh token missing", body = ErrorBody),
        (status = 401, description = "Unknown, rotated or expired refresh token", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    auth: Extension<AuthService>,
    request: Option<Json<RefreshRequest>>,
) -> Result<Json<TokenPair>, ApiError> {
    let request = payload(request)?;
    if request.refresh_token.is_empty() {
        return Err(ApiError::bad_request("refresh token is required"));
    }

    auth.refresh_tokens(&request.refresh_token)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_auth(err, Flow::Refresh))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password/request",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Password code sent", body = MessageBody),
        (status = 400, description = "Invalid email", body = ErrorBody),
        (status = 404, description = "No account for this email", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn request_password_reset(
    auth: Extension<AuthService>,
    request: Option<Json<ResetRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload(request)?;
    let email = email_from(&request.email)?;

    auth.initiate_password_reset(&email)
        .await
        .map_err(|err| ApiError::from_auth(err, Flow::ResetRequest))?;

    Ok(MessageBody::code_sent())
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password/confirm",
    request_body = ResetConfirm,
    responses(
        (status = 200, description = "Password changed, every session revoked", body = ResetDone),
        (status = 400, description = "Invalid code or weak password", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn confirm_password_reset(
    auth: Extension<AuthService>,
    request: Option<Json<ResetConfirm>>,
) -> Result<Json<ResetDone>, ApiError> {
    let request = payload(request)?;
    let email = email_from(&request.email)?;
    let code = code_from(&request.code)?;
    if !valid_password(&request.new_password) {
        return Err(ApiError::bad_request(PASSWORD_RULES));
    }

    auth.reset_password(&email, code, &request.new_password)
        .await
        .map_err(|err| ApiError::from_auth(err, Flow::ResetConfirm))?;

    Ok(Json(ResetDone {
        message: "password successfully changed, all active sessions have been terminated"
            .to_string(),
        details: "you will need to log in again on all devices".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/oauth/google",
    responses(
        (status = 501, description = "Federated login is not available", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn google_oauth() -> impl IntoResponse {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(ErrorBody {
            error: "not implemented".to_string(),
        }),
    )
}
