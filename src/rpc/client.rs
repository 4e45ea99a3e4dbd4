use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

use super::{
    proto::{auth_service_client::AuthServiceClient, CheckAccessRequest},
    AccessDecision,
};
use crate::{guard::AccessChecker, APP_USER_AGENT};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// `AccessChecker` backed by a remote `CheckAccess` endpoint.
#[derive(Clone, Debug)]
pub struct GrpcAccessChecker {
    client: AuthServiceClient<Channel>,
}

impl GrpcAccessChecker {
    /// Build a lazily connecting checker for `url` (for example `http://auth:9090`).
    ///
    /// # Errors
    /// Returns an error if `url` is not a valid endpoint.
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let channel = Endpoint::from_shared(url.to_string())
            .with_context(|| format!("invalid auth endpoint: {url}"))?
            .user_agent(APP_USER_AGENT)
            .context("invalid user agent")?
            .timeout(DEFAULT_TIMEOUT)
            .connect_lazy();
        Ok(Self::from_channel(channel))
    }

    #[must_use]
    pub fn from_channel(channel: Channel) -> Self {
        Self {
            client: AuthServiceClient::new(channel),
        }
    }
}

#[async_trait]
impl AccessChecker for GrpcAccessChecker {
    async fn check_access(&self, token: &str, required_roles: &[String]) -> Result<AccessDecision> {
        let request = CheckAccessRequest {
            token: token.to_string(),
            required_roles: required_roles.to_vec(),
        };
        let mut client = self.client.clone();
        let response = client
            .check_access(request)
            .await
            .context("CheckAccess call failed")?;
        Ok(response.into_inner().into())
    }
}
