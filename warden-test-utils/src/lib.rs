//! Warden Test Utilities
//!
//! Centralized test infrastructure for the Warden workspace:
//! - Fake remote authority with call counting and scripted failures
//! - Cache store doubles (failing, slow, recording)
//! - A shared call log to assert cache-before-authority ordering
//! - Proptest generators for identifiers
//! - Fixtures for the canonical identify/authorize scenarios

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;

pub use warden_authority::RemoteAuthority;
pub use warden_cache::{CacheStore, CacheWriter, InMemoryCacheStore, KeyNamespace, NamespacedKey};
pub use warden_core::{
    AccessControl, AccessError, AuthorityError, CacheError, CallContext, CancellationToken,
    ChannelId, Credential, ResolverConfig, ThingId,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// CALL LOG
// ============================================================================

/// One collaborator call, as seen by a [`CallLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CacheGetMapping { key: String },
    CacheIsMember { key: String, member: String },
    ResolveIdentity { credential_fingerprint: String },
    CheckAccess { channel_id: String, thing_id: String },
}

impl Call {
    pub fn is_cache(&self) -> bool {
        matches!(self, Self::CacheGetMapping { .. } | Self::CacheIsMember { .. })
    }

    pub fn is_authority(&self) -> bool {
        !self.is_cache()
    }
}

/// Ordered record of collaborator calls shared by several doubles.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}

// ============================================================================
// FAKE AUTHORITY
// ============================================================================

/// Scripted [`RemoteAuthority`] that counts every call.
///
/// Credentials resolve through a fixed table; access is granted for the
/// configured (channel, thing) pairs and denied otherwise. A forced error or
/// an artificial delay can be layered on top.
#[derive(Debug, Default)]
pub struct FakeAuthority {
    identities: HashMap<String, ThingId>,
    grants: HashSet<(ChannelId, ThingId)>,
    forced_error: Option<AuthorityError>,
    delay: Option<Duration>,
    log: Option<CallLog>,
    identify_calls: AtomicUsize,
    check_access_calls: AtomicUsize,
    access_requests: Mutex<Vec<(ChannelId, ThingId)>>,
}

impl FakeAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `credential` to `thing_id`.
    pub fn with_identity(mut self, credential: &str, thing_id: &str) -> Self {
        self.identities
            .insert(credential.to_string(), thing(thing_id));
        self
    }

    /// Grant `thing_id` access to `channel_id`.
    pub fn with_grant(mut self, channel_id: &str, thing_id: &str) -> Self {
        self.grants.insert((channel(channel_id), thing(thing_id)));
        self
    }

    /// Fail every call with `error`.
    pub fn failing_with(mut self, error: AuthorityError) -> Self {
        self.forced_error = Some(error);
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn identify_calls(&self) -> usize {
        self.identify_calls.load(Ordering::SeqCst)
    }

    pub fn check_access_calls(&self) -> usize {
        self.check_access_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.identify_calls() + self.check_access_calls()
    }

    /// (channel, thing) pairs passed to `check_access`, in call order.
    pub fn access_requests(&self) -> Vec<(ChannelId, ThingId)> {
        lock(&self.access_requests).clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteAuthority for FakeAuthority {
    async fn resolve_identity(
        &self,
        _ctx: &CallContext,
        credential: &Credential,
    ) -> Result<ThingId, AuthorityError> {
        self.identify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.record(Call::ResolveIdentity {
                credential_fingerprint: credential.fingerprint(),
            });
        }
        self.pause().await;

        if let Some(error) = &self.forced_error {
            return Err(error.clone());
        }
        self.identities
            .get(credential.expose())
            .cloned()
            .ok_or(AuthorityError::UnknownCredential)
    }

    async fn check_access(
        &self,
        _ctx: &CallContext,
        channel_id: &ChannelId,
        thing_id: &ThingId,
    ) -> Result<(), AuthorityError> {
        self.check_access_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.access_requests).push((channel_id.clone(), thing_id.clone()));
        if let Some(log) = &self.log {
            log.record(Call::CheckAccess {
                channel_id: channel_id.to_string(),
                thing_id: thing_id.to_string(),
            });
        }
        self.pause().await;

        if let Some(error) = &self.forced_error {
            return Err(error.clone());
        }
        if self.grants.contains(&(channel_id.clone(), thing_id.clone())) {
            Ok(())
        } else {
            Err(AuthorityError::Denied {
                reason: "thing is not connected to channel".to_string(),
            })
        }
    }
}

// ============================================================================
// CACHE STORE DOUBLES
// ============================================================================

/// Cache store whose every lookup fails with the same error.
#[derive(Debug)]
pub struct FailingCacheStore {
    error: CacheError,
    calls: AtomicUsize,
}

impl FailingCacheStore {
    pub fn new(error: CacheError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    /// A store that reports the connection as down.
    pub fn unavailable() -> Self {
        Self::new(CacheError::Unavailable {
            reason: "connection refused".to_string(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get_mapping(&self, _key: &NamespacedKey) -> Result<Option<ThingId>, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    async fn is_member(&self, _key: &NamespacedKey, _member: &ThingId) -> Result<bool, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Cache store that answers from an inner store after a fixed delay.
#[derive(Debug)]
pub struct SlowCacheStore<S> {
    inner: S,
    delay: Duration,
}

impl<S: CacheStore> SlowCacheStore<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for SlowCacheStore<S> {
    async fn get_mapping(&self, key: &NamespacedKey) -> Result<Option<ThingId>, CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_mapping(key).await
    }

    async fn is_member(&self, key: &NamespacedKey, member: &ThingId) -> Result<bool, CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.is_member(key, member).await
    }
}

/// Cache store that records every lookup in a [`CallLog`] before delegating.
#[derive(Debug)]
pub struct RecordingCacheStore<S> {
    inner: S,
    log: CallLog,
}

impl<S: CacheStore> RecordingCacheStore<S> {
    pub fn new(inner: S, log: CallLog) -> Self {
        Self { inner, log }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for RecordingCacheStore<S> {
    async fn get_mapping(&self, key: &NamespacedKey) -> Result<Option<ThingId>, CacheError> {
        self.log.record(Call::CacheGetMapping {
            key: key.to_string(),
        });
        self.inner.get_mapping(key).await
    }

    async fn is_member(&self, key: &NamespacedKey, member: &ThingId) -> Result<bool, CacheError> {
        self.log.record(Call::CacheIsMember {
            key: key.to_string(),
            member: member.to_string(),
        });
        self.inner.is_member(key, member).await
    }
}

// ============================================================================
// IDENTIFIER HELPERS
// ============================================================================

/// Build a [`ThingId`] from a literal known to be non-empty.
pub fn thing(raw: &str) -> ThingId {
    ThingId::try_new(raw).unwrap_or_else(|e| panic!("bad test thing id {:?}: {}", raw, e))
}

/// Build a [`ChannelId`] from a literal known to be non-empty.
pub fn channel(raw: &str) -> ChannelId {
    ChannelId::try_new(raw).unwrap_or_else(|e| panic!("bad test channel id {:?}: {}", raw, e))
}

/// Build a [`Credential`] from a literal known to be non-empty.
pub fn credential(raw: &str) -> Credential {
    Credential::try_new(raw).unwrap_or_else(|e| panic!("bad test credential: {}", e))
}

/// Fresh UUIDv7 string, the shape the things service issues.
pub fn fresh_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Thing keys: UUIDs or arbitrary printable tokens.
pub fn arb_credential_raw() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        "[!-~]{1,40}",
    ]
}

pub fn arb_thing_id() -> impl Strategy<Value = ThingId> {
    "thing-[0-9a-z]{1,12}".prop_map(|raw| thing(&raw))
}

pub fn arb_channel_id() -> impl Strategy<Value = ChannelId> {
    prop_oneof!["[0-9]{1,6}", "chan-[0-9a-z]{1,12}"].prop_map(|raw| channel(&raw))
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Credential cached as belonging to [`CACHED_THING`].
pub const CACHED_CREDENTIAL: &str = "abc123";
/// Thing cached under [`CACHED_CREDENTIAL`] and as a member of [`CACHED_CHANNEL`].
pub const CACHED_THING: &str = "thing-42";
/// Credential absent from the cache, known to the authority.
pub const REMOTE_CREDENTIAL: &str = "zzz";
/// Thing the authority resolves [`REMOTE_CREDENTIAL`] to.
pub const REMOTE_THING: &str = "thing-99";
/// Channel whose member set is cached.
pub const CACHED_CHANNEL: &str = "7";
/// Thing that is neither cached in nor granted on [`CACHED_CHANNEL`].
pub const OUTSIDER_THING: &str = "thing-1";

/// Store holding `thing_key:abc123 -> thing-42` and `channel:7 = {thing-42}`.
pub async fn seeded_store() -> Result<InMemoryCacheStore, CacheError> {
    let store = InMemoryCacheStore::new();
    store
        .put_mapping(&credential(CACHED_CREDENTIAL), &thing(CACHED_THING), None)
        .await?;
    store
        .add_member(&channel(CACHED_CHANNEL), &thing(CACHED_THING))
        .await?;
    Ok(store)
}

/// Authority that resolves `zzz -> thing-99` and grants nothing.
pub fn scenario_authority() -> FakeAuthority {
    FakeAuthority::new().with_identity(REMOTE_CREDENTIAL, REMOTE_THING)
}
