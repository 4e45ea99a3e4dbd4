//! `CheckAccess`: token validation plus role check for other services.
//!
//! Every authentication or authorization outcome is a structured response
//! (`allowed = false` and a reason). Only internal faults such as an
//! unreachable store become transport-level errors.

use std::future::Future;

use anyhow::{anyhow, Context, Result};
use tokio::net::TcpListener;
use tonic::transport::{server::TcpIncoming, Server};
use tracing::info;

use crate::auth::{AuthError, AuthResult, AuthService};

pub mod client;
pub mod proto;
pub mod server;

pub use client::GrpcAccessChecker;
pub use server::AccessService;

pub const INSUFFICIENT_PERMISSIONS: &str = "insufficient permissions";

/// Answer to one `CheckAccess` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub user_id: String,
    pub error: String,
}

impl AccessDecision {
    #[must_use]
    pub fn allow(user_id: String) -> Self {
        Self {
            allowed: true,
            user_id,
            error: String::new(),
        }
    }

    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            user_id: String::new(),
            error: reason.into(),
        }
    }
}

impl From<AccessDecision> for proto::CheckAccessResponse {
    fn from(decision: AccessDecision) -> Self {
        Self {
            allowed: decision.allowed,
            user_id: decision.user_id,
            error: decision.error,
        }
    }
}

impl From<proto::CheckAccessResponse> for AccessDecision {
    fn from(response: proto::CheckAccessResponse) -> Self {
        Self {
            allowed: response.allowed,
            user_id: response.user_id,
            error: response.error,
        }
    }
}

/// Validate `token` and require its role to be one of `required_roles`.
///
/// Role names compare exactly (case-sensitive). An empty list admits any
/// valid token.
///
/// # Errors
/// Only `AuthError::Internal` is returned; every other failure becomes a denial.
pub async fn check_access(
    auth: &AuthService,
    token: &str,
    required_roles: &[String],
) -> AuthResult<AccessDecision> {
    let claims = match auth.validate_token(token).await {
        Ok(claims) => claims,
        Err(AuthError::Internal(err)) => return Err(AuthError::Internal(err)),
        Err(err) => return Ok(AccessDecision::deny(err.to_string())),
    };

    if !required_roles.is_empty()
        && !required_roles
            .iter()
            .any(|role| role == claims.role.as_str())
    {
        return Ok(AccessDecision::deny(INSUFFICIENT_PERMISSIONS));
    }

    Ok(AccessDecision::allow(claims.user_id.to_string()))
}

/// Serve `CheckAccess` on `listener` until `shutdown` resolves.
///
/// # Errors
/// Returns an error if the listener cannot be adopted or the server fails.
pub async fn serve<F>(auth: AuthService, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let local_addr = listener.local_addr().context("failed to read gRPC address")?;
    let incoming = TcpIncoming::from_listener(listener, true, None)
        .map_err(|err| anyhow!("failed to adopt gRPC listener: {err}"))?;

    info!("gRPC listening on {local_addr}");

    Server::builder()
        .add_service(proto::auth_service_server::AuthServiceServer::new(
            AccessService::new(auth),
        ))
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await
        .context("gRPC server failed")
}
