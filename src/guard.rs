//! Role enforcement for downstream axum services.
//!
//! ```ignore
//! let guard = RoleGuard::new(checker, [Role::Author, Role::Admin]);
//! let router = Router::new()
//!     .route("/courses", post(create_course))
//!     .layer(middleware::from_fn_with_state(guard, require_access));
//! ```
//!
//! Handlers read the caller through the [`CallerId`] extractor. They never see
//! the token or its role claim.

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    auth::{AuthError, AuthService, Role},
    rpc::{self, AccessDecision},
};

const BEARER_PREFIX: &str = "Bearer ";

/// Denial reason that maps to 401 instead of 403.
const INVALID_TOKEN_REASON: &str = "invalid or expired token";

/// Anything that can answer `CheckAccess`.
#[async_trait]
pub trait AccessChecker: Send + Sync {
    /// `Err` means the check itself could not run.
    async fn check_access(&self, token: &str, required_roles: &[String]) -> Result<AccessDecision>;
}

/// In-process checker for services that embed the auth core directly.
#[derive(Clone)]
pub struct LocalAccessChecker {
    auth: AuthService,
}

impl LocalAccessChecker {
    #[must_use]
    pub fn new(auth: AuthService) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl AccessChecker for LocalAccessChecker {
    async fn check_access(&self, token: &str, required_roles: &[String]) -> Result<AccessDecision> {
        rpc::check_access(&self.auth, token, required_roles)
            .await
            .map_err(|err| match err {
                AuthError::Internal(err) => err,
                other => anyhow::anyhow!(other.to_string()),
            })
    }
}

/// Required roles for a group of routes plus the checker to ask.
#[derive(Clone)]
pub struct RoleGuard {
    required_roles: Arc<[String]>,
    checker: Arc<dyn AccessChecker>,
}

impl RoleGuard {
    /// An empty role list admits any authenticated caller.
    pub fn new(checker: Arc<dyn AccessChecker>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            required_roles: roles.into_iter().map(|role| role.as_str().to_string()).collect(),
            checker,
        }
    }

    #[must_use]
    pub fn authenticated(checker: Arc<dyn AccessChecker>) -> Self {
        Self::new(checker, Vec::<Role>::new())
    }

    #[must_use]
    pub fn required_roles(&self) -> &[String] {
        &self.required_roles
    }
}

/// Authenticated caller, inserted into request extensions by [`require_access`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerId>()
            .copied()
            .ok_or_else(|| message(StatusCode::UNAUTHORIZED, "unauthorized"))
    }
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn bearer_token(request: &Request) -> Option<String> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Middleware for `axum::middleware::from_fn_with_state`.
pub async fn require_access(
    State(guard): State<RoleGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        debug!("missing bearer token");
        return message(StatusCode::UNAUTHORIZED, "authorization header required");
    };

    let decision = match guard
        .checker
        .check_access(&token, guard.required_roles())
        .await
    {
        Ok(decision) => decision,
        Err(err) => {
            error!("access check failed: {err:#}");
            return message(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
        }
    };

    if !decision.allowed {
        let status = if decision.error == INVALID_TOKEN_REASON {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::FORBIDDEN
        };
        return message(status, &decision.error);
    }

    let Ok(user_id) = Uuid::parse_str(&decision.user_id) else {
        error!("access check returned malformed user id");
        return message(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
    };

    request.extensions_mut().insert(CallerId(user_id));
    next.run(request).await
}
