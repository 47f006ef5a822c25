//! Remote authority trait.

use async_trait::async_trait;
use warden_core::{AuthorityError, CallContext, ChannelId, Credential, ThingId};

/// The system of record for thing identity and channel access.
///
/// Implementations make exactly one attempt per call: no retries, no
/// caching. They should forward the context deadline to the remote side
/// where the protocol allows it; the resolver additionally bounds each call
/// from the outside and drops the future on cancellation.
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Resolve the thing that owns `credential`.
    async fn resolve_identity(
        &self,
        ctx: &CallContext,
        credential: &Credential,
    ) -> Result<ThingId, AuthorityError>;

    /// `Ok(())` when `thing_id` is connected to `channel_id`.
    async fn check_access(
        &self,
        ctx: &CallContext,
        channel_id: &ChannelId,
        thing_id: &ThingId,
    ) -> Result<(), AuthorityError>;
}
