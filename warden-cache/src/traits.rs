//! Cache store traits.
//!
//! [`CacheStore`] is the read side used by the resolver. [`CacheWriter`] is
//! the write side for provisioning and connection-event handlers; the
//! resolver never touches it. Both sides go through [`NamespacedKey`] so
//! readers and writers cannot disagree on key layout.

use std::time::Duration;

use async_trait::async_trait;
use warden_core::{CacheError, ChannelId, Credential, ThingId};

use crate::keys::NamespacedKey;

/// Read access to cached access-control projections.
///
/// Implementations must be safe to share between concurrent callers and
/// should bound each call by their own response timeout; the resolver also
/// applies a deadline from the outside. Errors are advisory: the resolver
/// treats any `Err` as a cache miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a credential mapping. `Ok(None)` means the key is absent.
    async fn get_mapping(&self, key: &NamespacedKey) -> Result<Option<ThingId>, CacheError>;

    /// Test whether `member` belongs to the set stored at `key`.
    async fn is_member(&self, key: &NamespacedKey, member: &ThingId) -> Result<bool, CacheError>;
}

/// Write access used by the collaborators that own cache population.
///
/// A typical writer calls `put_mapping` when a thing is provisioned,
/// `remove_mapping` when it is deleted or its key rotated, and
/// `add_member`/`remove_member` on connect/disconnect events.
#[async_trait]
pub trait CacheWriter: Send + Sync {
    /// Store the credential → thing mapping, optionally expiring after `ttl`.
    async fn put_mapping(
        &self,
        credential: &Credential,
        thing_id: &ThingId,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;

    /// Drop a credential mapping. Removing an absent mapping is not an error.
    async fn remove_mapping(&self, credential: &Credential) -> Result<(), CacheError>;

    /// Add a thing to a channel's member set.
    async fn add_member(&self, channel_id: &ChannelId, thing_id: &ThingId) -> Result<(), CacheError>;

    /// Remove a thing from a channel's member set.
    async fn remove_member(
        &self,
        channel_id: &ChannelId,
        thing_id: &ThingId,
    ) -> Result<(), CacheError>;

    /// Drop a channel's entire member set, e.g. when the channel is deleted.
    async fn remove_channel(&self, channel_id: &ChannelId) -> Result<(), CacheError>;
}
