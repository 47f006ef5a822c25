//! gRPC implementation of [`RemoteAuthority`] over the things service.

use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tracing::debug;
use warden_core::{AuthorityConfig, AuthorityError, CallContext, ChannelId, Credential, ThingId};

use crate::proto::things_service_client::ThingsServiceClient;
use crate::proto::{AccessByIdReq, Token};
use crate::traits::RemoteAuthority;

/// Which RPC a status came back from; the same code can mean different
/// things for the two calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rpc {
    Identify,
    CanAccessById,
}

/// [`RemoteAuthority`] backed by `mainflux.ThingsService`.
#[derive(Debug, Clone)]
pub struct GrpcAuthority {
    client: ThingsServiceClient,
    request_timeout: Duration,
}

impl GrpcAuthority {
    /// Build a client over a lazily connected channel.
    ///
    /// No connection is attempted until the first call, so the things service
    /// does not have to be up when Warden starts.
    pub fn connect_lazy(config: &AuthorityConfig) -> Result<Self, AuthorityError> {
        let endpoint = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|e| AuthorityError::Unavailable {
                reason: format!("invalid authority endpoint '{}': {}", config.endpoint, e),
            })?
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout());

        debug!(endpoint = %config.endpoint, "Things service channel configured");
        Ok(Self::new(endpoint.connect_lazy(), config.request_timeout()))
    }

    /// Wrap an existing channel shared with other clients.
    pub fn new(channel: Channel, request_timeout: Duration) -> Self {
        Self {
            client: ThingsServiceClient::new(channel),
            request_timeout,
        }
    }

    fn request<T>(&self, ctx: &CallContext, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        // Sent as `grpc-timeout` so the server can give up too.
        request.set_timeout(ctx.stage_budget(self.request_timeout));
        request
    }
}

#[async_trait]
impl RemoteAuthority for GrpcAuthority {
    async fn resolve_identity(
        &self,
        ctx: &CallContext,
        credential: &Credential,
    ) -> Result<ThingId, AuthorityError> {
        let request = self.request(
            ctx,
            Token {
                value: credential.expose().to_string(),
            },
        );

        let mut client = self.client.clone();
        let response = client
            .identify(request)
            .await
            .map_err(|status| map_status(Rpc::Identify, status))?;

        ThingId::try_new(response.into_inner().value).map_err(|_| {
            AuthorityError::InvalidResponse {
                reason: "identify returned an empty thing id".to_string(),
            }
        })
    }

    async fn check_access(
        &self,
        ctx: &CallContext,
        channel_id: &ChannelId,
        thing_id: &ThingId,
    ) -> Result<(), AuthorityError> {
        let request = self.request(
            ctx,
            AccessByIdReq {
                thing_id: thing_id.to_string(),
                chan_id: channel_id.to_string(),
            },
        );

        let mut client = self.client.clone();
        client
            .can_access_by_id(request)
            .await
            .map(|_| ())
            .map_err(|status| map_status(Rpc::CanAccessById, status))
    }
}

fn map_status(rpc: Rpc, status: Status) -> AuthorityError {
    match (rpc, status.code()) {
        (Rpc::Identify, Code::NotFound | Code::Unauthenticated) => AuthorityError::UnknownCredential,
        (Rpc::CanAccessById, Code::NotFound | Code::Unauthenticated) | (_, Code::PermissionDenied) => {
            AuthorityError::Denied {
                reason: status.message().to_string(),
            }
        }
        (_, Code::DeadlineExceeded) => AuthorityError::DeadlineExceeded,
        (_, Code::Cancelled) => AuthorityError::Cancelled,
        (_, Code::Unavailable) => AuthorityError::Unavailable {
            reason: status.message().to_string(),
        },
        (_, code) => AuthorityError::Rpc {
            code: format!("{:?}", code),
            message: status.message().to_string(),
        },
    }
}
