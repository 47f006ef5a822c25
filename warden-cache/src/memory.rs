//! Process-local cache store.
//!
//! Mirrors the Redis layout (string values for mappings, sets for channel
//! membership, keyed by the same encoded [`NamespacedKey`]) so it can stand in
//! for Redis in tests and single-process development setups.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use warden_core::{CacheError, ChannelId, Credential, ThingId};

use crate::keys::NamespacedKey;
use crate::traits::{CacheStore, CacheWriter};

#[derive(Debug, Clone)]
struct MappingEntry {
    thing_id: ThingId,
    expires_at: Option<Instant>,
}

impl MappingEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-memory [`CacheStore`] + [`CacheWriter`].
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    mappings: RwLock<HashMap<String, MappingEntry>>,
    channels: RwLock<HashMap<String, HashSet<ThingId>>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live credential mappings.
    pub fn mapping_count(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mappings = self.mappings.read().map_err(|_| poisoned())?;
        Ok(mappings.values().filter(|entry| entry.is_live(now)).count())
    }

    /// Number of members cached for a channel.
    pub fn member_count(&self, channel_id: &ChannelId) -> Result<usize, CacheError> {
        let key = NamespacedKey::channel(channel_id).encode();
        let channels = self.channels.read().map_err(|_| poisoned())?;
        Ok(channels.get(&key).map_or(0, HashSet::len))
    }

    /// Drop expired mappings. Lookups already ignore them; this only frees memory.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut mappings = self.mappings.write().map_err(|_| poisoned())?;
        let before = mappings.len();
        mappings.retain(|_, entry| entry.is_live(now));
        Ok(before - mappings.len())
    }
}

fn poisoned() -> CacheError {
    CacheError::Unavailable {
        reason: "in-memory cache lock poisoned".to_string(),
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get_mapping(&self, key: &NamespacedKey) -> Result<Option<ThingId>, CacheError> {
        let mappings = self.mappings.read().map_err(|_| poisoned())?;
        Ok(mappings
            .get(&key.encode())
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.thing_id.clone()))
    }

    async fn is_member(&self, key: &NamespacedKey, member: &ThingId) -> Result<bool, CacheError> {
        let channels = self.channels.read().map_err(|_| poisoned())?;
        Ok(channels
            .get(&key.encode())
            .is_some_and(|members| members.contains(member)))
    }
}

#[async_trait]
impl CacheWriter for InMemoryCacheStore {
    async fn put_mapping(
        &self,
        credential: &Credential,
        thing_id: &ThingId,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let entry = MappingEntry {
            thing_id: thing_id.clone(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        let mut mappings = self.mappings.write().map_err(|_| poisoned())?;
        mappings.insert(NamespacedKey::thing_key(credential).encode(), entry);
        Ok(())
    }

    async fn remove_mapping(&self, credential: &Credential) -> Result<(), CacheError> {
        let mut mappings = self.mappings.write().map_err(|_| poisoned())?;
        mappings.remove(&NamespacedKey::thing_key(credential).encode());
        Ok(())
    }

    async fn add_member(&self, channel_id: &ChannelId, thing_id: &ThingId) -> Result<(), CacheError> {
        let mut channels = self.channels.write().map_err(|_| poisoned())?;
        channels
            .entry(NamespacedKey::channel(channel_id).encode())
            .or_default()
            .insert(thing_id.clone());
        Ok(())
    }

    async fn remove_member(
        &self,
        channel_id: &ChannelId,
        thing_id: &ThingId,
    ) -> Result<(), CacheError> {
        let key = NamespacedKey::channel(channel_id).encode();
        let mut channels = self.channels.write().map_err(|_| poisoned())?;
        if let Some(members) = channels.get_mut(&key) {
            members.remove(thing_id);
            // Redis deletes a set once its last member is removed.
            if members.is_empty() {
                channels.remove(&key);
            }
        }
        Ok(())
    }

    async fn remove_channel(&self, channel_id: &ChannelId) -> Result<(), CacheError> {
        let mut channels = self.channels.write().map_err(|_| poisoned())?;
        channels.remove(&NamespacedKey::channel(channel_id).encode());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(raw: &str) -> Credential {
        Credential::try_new(raw).unwrap()
    }

    fn thing(raw: &str) -> ThingId {
        ThingId::try_new(raw).unwrap()
    }

    fn channel(raw: &str) -> ChannelId {
        ChannelId::try_new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_mapping_put_get_remove() {
        let store = InMemoryCacheStore::new();
        let key = NamespacedKey::thing_key(&credential("abc123"));

        assert_eq!(store.get_mapping(&key).await.unwrap(), None);

        store
            .put_mapping(&credential("abc123"), &thing("thing-42"), None)
            .await
            .unwrap();
        assert_eq!(store.get_mapping(&key).await.unwrap(), Some(thing("thing-42")));
        assert_eq!(store.mapping_count().unwrap(), 1);

        store.remove_mapping(&credential("abc123")).await.unwrap();
        assert_eq!(store.get_mapping(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mapping_ttl_expires() {
        let store = InMemoryCacheStore::new();
        store
            .put_mapping(&credential("k"), &thing("t"), Some(Duration::ZERO))
            .await
            .unwrap();

        let key = NamespacedKey::thing_key(&credential("k"));
        assert_eq!(store.get_mapping(&key).await.unwrap(), None);
        assert_eq!(store.mapping_count().unwrap(), 0);
        assert_eq!(store.purge_expired().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_membership() {
        let store = InMemoryCacheStore::new();
        let key = NamespacedKey::channel(&channel("7"));

        assert!(!store.is_member(&key, &thing("thing-42")).await.unwrap());

        store.add_member(&channel("7"), &thing("thing-42")).await.unwrap();
        store.add_member(&channel("7"), &thing("thing-43")).await.unwrap();
        assert!(store.is_member(&key, &thing("thing-42")).await.unwrap());
        assert!(!store.is_member(&key, &thing("thing-1")).await.unwrap());
        assert_eq!(store.member_count(&channel("7")).unwrap(), 2);

        store.remove_member(&channel("7"), &thing("thing-42")).await.unwrap();
        assert!(!store.is_member(&key, &thing("thing-42")).await.unwrap());

        store.remove_channel(&channel("7")).await.unwrap();
        assert_eq!(store.member_count(&channel("7")).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        let store = InMemoryCacheStore::new();
        store
            .put_mapping(&credential("X"), &thing("thing-from-key"), None)
            .await
            .unwrap();

        let channel_key = NamespacedKey::channel(&channel("X"));
        assert!(!store
            .is_member(&channel_key, &thing("thing-from-key"))
            .await
            .unwrap());
        assert_eq!(store.get_mapping(&channel_key).await.unwrap(), None);
    }
}
