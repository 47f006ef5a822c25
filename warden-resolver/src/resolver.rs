//! Cache-first identity and access resolution.
//!
//! Each call walks the same two stages:
//!
//! ```text
//! START -> CACHE_LOOKUP -> RETURN_CACHED
//!                       -> REMOTE_LOOKUP -> RETURN_REMOTE
//!                                        -> RETURN_ERROR
//! ```
//!
//! The cache stage can only short-circuit on a positive answer. Absent
//! entries, negative membership, store errors and cache-stage timeouts all
//! fall through to the authority, which is asked exactly once. Nothing is
//! ever written back to the cache.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info_span, warn, Instrument};
use warden_authority::RemoteAuthority;
use warden_cache::{CacheStore, NamespacedKey};
use warden_core::{
    AccessControl, AccessError, AuthorityError, CacheError, CallContext, ChannelId, Credential,
    Interrupted, ResolverConfig, ThingId,
};

use crate::resolution::Resolution;

const OP_IDENTIFY: &str = "identify";
const OP_AUTHORIZE: &str = "authorize";

/// Access-control resolver: cache in front, remote authority behind.
///
/// Holds nothing but shared handles to its collaborators and its stage
/// timeouts, so one instance serves any number of concurrent callers.
/// Collaborators may be trait objects:
///
/// ```ignore
/// let resolver: AccessResolver<dyn CacheStore, dyn RemoteAuthority> =
///     AccessResolver::new(store, authority, config.resolver.clone());
/// let thing = resolver.identify(&CallContext::background(), "abc123").await?;
/// ```
pub struct AccessResolver<C, A>
where
    C: CacheStore + ?Sized,
    A: RemoteAuthority + ?Sized,
{
    cache: Arc<C>,
    authority: Arc<A>,
    config: ResolverConfig,
}

impl<C, A> AccessResolver<C, A>
where
    C: CacheStore + ?Sized,
    A: RemoteAuthority + ?Sized,
{
    pub fn new(cache: Arc<C>, authority: Arc<A>, config: ResolverConfig) -> Self {
        Self {
            cache,
            authority,
            config,
        }
    }

    /// Create a resolver with default stage timeouts.
    pub fn with_defaults(cache: Arc<C>, authority: Arc<A>) -> Self {
        Self::new(cache, authority, ResolverConfig::default())
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Resolve the thing that owns `credential`.
    ///
    /// A cached mapping is returned as-is. Otherwise the authority's answer
    /// is returned verbatim, or its error wrapped in
    /// [`AccessError::IdentityResolution`].
    pub async fn resolve_identity(
        &self,
        ctx: &CallContext,
        credential: &Credential,
    ) -> Result<Resolution<ThingId>, AccessError> {
        let key = NamespacedKey::thing_key(credential);
        let span = info_span!("warden.identify", key = %key);
        self.lookup_identity(ctx, credential, &key)
            .instrument(span)
            .await
    }

    /// Check that `thing_id` may act on `channel_id`.
    ///
    /// Fails closed: cached membership is the only way to succeed without
    /// the authority, and every authority outcome other than a grant is an
    /// error.
    pub async fn resolve_access(
        &self,
        ctx: &CallContext,
        channel_id: &ChannelId,
        thing_id: &ThingId,
    ) -> Result<Resolution<()>, AccessError> {
        let key = NamespacedKey::channel(channel_id);
        let span = info_span!("warden.authorize", key = %key, thing_id = %thing_id);
        self.lookup_access(ctx, channel_id, thing_id, &key)
            .instrument(span)
            .await
    }

    async fn lookup_identity(
        &self,
        ctx: &CallContext,
        credential: &Credential,
        key: &NamespacedKey,
    ) -> Result<Resolution<ThingId>, AccessError> {
        let lookup = self.cache.get_mapping(key);
        let cache_fault = match self.cache_stage(ctx, OP_IDENTIFY, key, lookup).await? {
            Ok(Some(thing_id)) => {
                debug!(thing_id = %thing_id, "Identity served from cache");
                return Ok(Resolution::from_cache(thing_id));
            }
            Ok(None) => {
                debug!("Identity cache miss");
                None
            }
            Err(fault) => Some(fault),
        };

        let call = self.authority.resolve_identity(ctx, credential);
        match self.authority_stage(ctx, OP_IDENTIFY, call).await? {
            Ok(thing_id) => {
                debug!(thing_id = %thing_id, "Identity resolved by authority");
                Ok(Resolution::from_authority(thing_id, cache_fault))
            }
            Err(source) => {
                if source.is_verdict() {
                    debug!(error = %source, "Authority rejected credential");
                } else {
                    warn!(error = %source, "Identity resolution failed");
                }
                Err(AccessError::IdentityResolution {
                    key: key.to_string(),
                    source,
                })
            }
        }
    }

    async fn lookup_access(
        &self,
        ctx: &CallContext,
        channel_id: &ChannelId,
        thing_id: &ThingId,
        key: &NamespacedKey,
    ) -> Result<Resolution<()>, AccessError> {
        let lookup = self.cache.is_member(key, thing_id);
        let cache_fault = match self.cache_stage(ctx, OP_AUTHORIZE, key, lookup).await? {
            Ok(true) => {
                debug!("Access granted from cache");
                return Ok(Resolution::from_cache(()));
            }
            Ok(false) => {
                debug!("Membership not cached");
                None
            }
            Err(fault) => Some(fault),
        };

        let call = self.authority.check_access(ctx, channel_id, thing_id);
        match self.authority_stage(ctx, OP_AUTHORIZE, call).await? {
            Ok(()) => {
                debug!("Access granted by authority");
                Ok(Resolution::from_authority((), cache_fault))
            }
            Err(source) if source.is_verdict() => {
                debug!(error = %source, "Access denied by authority");
                let reason = match source {
                    AuthorityError::Denied { reason } => reason,
                    other => other.to_string(),
                };
                Err(AccessError::AuthorizationDenied {
                    key: key.to_string(),
                    thing: thing_id.to_string(),
                    reason,
                })
            }
            Err(source) => {
                warn!(error = %source, "Authorization check failed");
                Err(AccessError::Authorization {
                    key: key.to_string(),
                    thing: thing_id.to_string(),
                    source,
                })
            }
        }
    }

    /// Run a cache lookup under the cache-stage deadline.
    ///
    /// The outer `Err` is cancellation and ends the call. An inner `Err` is a
    /// cache fault, already logged, that the caller treats as a miss.
    async fn cache_stage<T, F>(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        key: &NamespacedKey,
        lookup: F,
    ) -> Result<Result<T, CacheError>, AccessError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        let result = match ctx.run(self.config.cache_timeout(), lookup).await {
            Ok(result) => result,
            Err(Interrupted::Cancelled) => return Err(AccessError::Cancelled { operation }),
            Err(Interrupted::DeadlineExceeded) => Err(CacheError::Timeout {
                key: key.to_string(),
            }),
        };
        if let Err(fault) = &result {
            warn!(error = %fault, "Cache lookup failed, falling back to authority");
        }
        Ok(result)
    }

    /// Run an authority call under the remote-stage deadline.
    async fn authority_stage<T, F>(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        call: F,
    ) -> Result<Result<T, AuthorityError>, AccessError>
    where
        F: Future<Output = Result<T, AuthorityError>>,
    {
        match ctx.run(self.config.authority_timeout(), call).await {
            Ok(result) => Ok(result),
            Err(Interrupted::Cancelled) => Err(AccessError::Cancelled { operation }),
            Err(Interrupted::DeadlineExceeded) => Ok(Err(AuthorityError::DeadlineExceeded)),
        }
    }
}

impl<C, A> Clone for AccessResolver<C, A>
where
    C: CacheStore + ?Sized,
    A: RemoteAuthority + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            authority: Arc::clone(&self.authority),
            config: self.config.clone(),
        }
    }
}

impl<C, A> std::fmt::Debug for AccessResolver<C, A>
where
    C: CacheStore + ?Sized,
    A: RemoteAuthority + ?Sized,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C, A> AccessControl for AccessResolver<C, A>
where
    C: CacheStore + ?Sized,
    A: RemoteAuthority + ?Sized,
{
    async fn identify(&self, ctx: &CallContext, thing_key: &str) -> Result<ThingId, AccessError> {
        let credential = Credential::try_new(thing_key)?;
        self.resolve_identity(ctx, &credential)
            .await
            .map(Resolution::into_value)
    }

    async fn authorize(
        &self,
        ctx: &CallContext,
        channel_id: &str,
        thing_id: &str,
    ) -> Result<(), AccessError> {
        let channel_id = ChannelId::try_new(channel_id)?;
        let thing_id = ThingId::try_new(thing_id)?;
        self.resolve_access(ctx, &channel_id, &thing_id)
            .await
            .map(Resolution::into_value)
    }
}
