use tonic::{Request, Response, Status};
use tracing::{error, instrument};

use super::{
    check_access,
    proto::{auth_service_server::AuthService as AuthRpc, CheckAccessRequest, CheckAccessResponse},
};
use crate::auth::{AuthError, AuthService};

#[derive(Clone)]
pub struct AccessService {
    auth: AuthService,
}

impl AccessService {
    #[must_use]
    pub fn new(auth: AuthService) -> Self {
        Self { auth }
    }
}

#[tonic::async_trait]
impl AuthRpc for AccessService {
    #[instrument(skip_all, fields(roles = ?request.get_ref().required_roles))]
    async fn check_access(
        &self,
        request: Request<CheckAccessRequest>,
    ) -> Result<Response<CheckAccessResponse>, Status> {
        let request = request.into_inner();
        match check_access(&self.auth, &request.token, &request.required_roles).await {
            Ok(decision) => Ok(Response::new(decision.into())),
            Err(AuthError::Internal(err)) => {
                error!("check access failed: {err:#}");
                Err(Status::internal("internal error"))
            }
            // check_access only surfaces internal faults.
            Err(err) => Err(Status::internal(err.to_string())),
        }
    }
}
