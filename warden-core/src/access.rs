//! Inbound contract consumed by message-path components.

use async_trait::async_trait;

use crate::context::CallContext;
use crate::error::AccessError;
use crate::ids::ThingId;

/// Identity resolution and channel authorization for things.
///
/// Message adapters and gateways depend on this trait rather than on a
/// concrete resolver so they can be exercised against test doubles.
#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Resolve the thing behind a thing key.
    async fn identify(&self, ctx: &CallContext, thing_key: &str) -> Result<ThingId, AccessError>;

    /// Check that `thing_id` may publish/subscribe on `channel_id`.
    ///
    /// Fails closed: any outcome other than a positive answer is an error.
    async fn authorize(
        &self,
        ctx: &CallContext,
        channel_id: &str,
        thing_id: &str,
    ) -> Result<(), AccessError>;
}
