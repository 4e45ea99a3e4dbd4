mod common;

use anyhow::{ensure, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{harness, Harness, PASSWORD};
use edu_auth::{api, auth::VerificationKind};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(h: &Harness) -> Router {
    api::app(h.auth.clone(), None)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => request.body(Body::empty())?,
    };
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

async fn post(app: Router, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
    send(app, Method::POST, uri, Some(body)).await
}

#[tokio::test]
async fn register_verify_refresh_over_http() -> Result<()> {
    let h = harness()?;
    let credentials = json!({ "email": " a@x.com ", "password": PASSWORD });

    let (status, body) = post(app(&h), "/api/v1/auth/register", credentials.clone()).await?;
    ensure!(status == StatusCode::OK, "register: {status} {body}");
    ensure!(body["message"] == "verification code sent to your email");

    let (status, body) = post(app(&h), "/api/v1/auth/register", credentials.clone()).await?;
    ensure!(status == StatusCode::CONFLICT);
    ensure!(body["error"] == "email already exists");

    let (status, body) = post(app(&h), "/api/v1/auth/login", credentials.clone()).await?;
    ensure!(status == StatusCode::UNAUTHORIZED);
    ensure!(body["error"] == "email not confirmed");

    let code = h.mail.last("a@x.com", VerificationKind::Registration)?;
    let (status, tokens) = post(
        app(&h),
        "/api/v1/auth/verify-email",
        json!({ "email": "a@x.com", "code": code }),
    )
    .await?;
    ensure!(status == StatusCode::OK, "verify-email: {status} {tokens}");
    let refresh_token = tokens["refresh_token"].as_str().unwrap_or_default().to_string();
    ensure!(tokens["access_token"].is_string() && !refresh_token.is_empty());

    let (status, body) = post(
        app(&h),
        "/api/v1/auth/verify-email",
        json!({ "email": "a@x.com", "code": code }),
    )
    .await?;
    ensure!(status == StatusCode::BAD_REQUEST);
    ensure!(body["error"] == "verification code expired");

    let (status, rotated) = post(
        app(&h),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await?;
    ensure!(status == StatusCode::OK);
    ensure!(rotated["refresh_token"] != tokens["refresh_token"]);

    let (status, _) = post(
        app(&h),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await?;
    ensure!(status == StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_then_verify_login_over_http() -> Result<()> {
    let h = harness()?;
    h.confirmed_user("a@x.com").await?;

    let (status, body) = post(
        app(&h),
        "/api/v1/auth/login",
        json!({ "email": "a@x.com", "password": "Wrong1234" }),
    )
    .await?;
    ensure!(status == StatusCode::UNAUTHORIZED);
    ensure!(body["error"] == "invalid credentials");

    let (status, body) = post(
        app(&h),
        "/api/v1/auth/login",
        json!({ "email": "nobody@x.com", "password": PASSWORD }),
    )
    .await?;
    ensure!(status == StatusCode::UNAUTHORIZED);
    ensure!(body["error"] == "invalid credentials");

    let (status, body) = post(
        app(&h),
        "/api/v1/auth/login",
        json!({ "email": "a@x.com", "password": PASSWORD }),
    )
    .await?;
    ensure!(status == StatusCode::OK);
    ensure!(body.get("access_token").is_none());

    let code = h.mail.last("a@x.com", VerificationKind::Login)?;
    let (status, tokens) = post(
        app(&h),
        "/api/v1/auth/verify-login",
        json!({ "email": "a@x.com", "code": code }),
    )
    .await?;
    ensure!(status == StatusCode::OK);
    ensure!(tokens["access_token"].is_string());
    Ok(())
}

#[tokio::test]
async fn password_reset_over_http() -> Result<()> {
    let h = harness()?;
    h.confirmed_user("a@x.com").await?;

    let (status, body) = post(
        app(&h),
        "/api/v1/auth/reset-password/request",
        json!({ "email": "nobody@x.com" }),
    )
    .await?;
    ensure!(status == StatusCode::NOT_FOUND);
    ensure!(body["error"] == "user not found");

    let (status, _) = post(
        app(&h),
        "/api/v1/auth/reset-password/request",
        json!({ "email": "a@x.com" }),
    )
    .await?;
    ensure!(status == StatusCode::OK);
    let code = h.mail.last("a@x.com", VerificationKind::Password)?;

    let (status, body) = post(
        app(&h),
        "/api/v1/auth/reset-password/confirm",
        json!({ "email": "a@x.com", "code": code, "new_password": "weak" }),
    )
    .await?;
    ensure!(status == StatusCode::BAD_REQUEST);
    ensure!(body["error"].as_str().unwrap_or_default().starts_with("password must be"));

    let (status, body) = post(
        app(&h),
        "/api/v1/auth/reset-password/confirm",
        json!({ "email": "a@x.com", "code": code, "new_password": "NewPass1" }),
    )
    .await?;
    ensure!(status == StatusCode::OK, "confirm: {status} {body}");
    ensure!(body["details"].is_string());
    Ok(())
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() -> Result<()> {
    let h = harness()?;

    let (status, body) = send(app(&h), Method::POST, "/api/v1/auth/register", None).await?;
    ensure!(status == StatusCode::BAD_REQUEST);
    ensure!(body["error"] == "missing or malformed payload");

    let (status, body) = post(
        app(&h),
        "/api/v1/auth/register",
        json!({ "email": "not-an-email", "password": PASSWORD }),
    )
    .await?;
    ensure!(status == StatusCode::BAD_REQUEST);
    ensure!(body["error"] == "invalid email format");

    let (status, _) = post(
        app(&h),
        "/api/v1/auth/register",
        json!({ "email": "a@x.com", "password": "alllowercase1" }),
    )
    .await?;
    ensure!(status == StatusCode::BAD_REQUEST);

    let (status, _) = post(
        app(&h),
        "/api/v1/auth/verify-email",
        json!({ "email": "a@x.com", "code": "12345" }),
    )
    .await?;
    ensure!(status == StatusCode::BAD_REQUEST);

    let (status, body) = post(app(&h), "/api/v1/auth/refresh", json!({ "refresh_token": "" })).await?;
    ensure!(status == StatusCode::BAD_REQUEST);
    ensure!(body["error"] == "refresh token is required");
    Ok(())
}

#[tokio::test]
async fn oauth_stub_and_health() -> Result<()> {
    let h = harness()?;

    let (status, body) = send(app(&h), Method::GET, "/api/v1/auth/oauth/google", None).await?;
    ensure!(status == StatusCode::NOT_IMPLEMENTED);
    ensure!(body["error"] == "not implemented");

    let (status, body) = send(app(&h), Method::GET, "/health", None).await?;
    ensure!(status == StatusCode::OK);
    ensure!(body["database"] == "memory");
    Ok(())
}

#[tokio::test]
async fn responses_carry_a_request_id() -> Result<()> {
    let h = harness()?;
    let response = app(&h)
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    ensure!(response.headers().contains_key("x-request-id"));

    let response = app(&h)
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "caller-chosen")
                .body(Body::empty())?,
        )
        .await?;
    ensure!(response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        == Some("caller-chosen"));
    Ok(())
}
