//! Live Redis tests for the cache store.
//!
//! Run with `--features redis-tests` against a disposable Redis instance
//! (`WARDEN_TEST_REDIS_URL`, default `redis://127.0.0.1:6379/15`). Each test
//! uses fresh UUID identifiers so runs do not interfere.

#![cfg(feature = "redis-tests")]

use std::time::Duration;

use uuid::Uuid;
use warden_cache::{CacheStore, CacheWriter, NamespacedKey, RedisCacheStore};
use warden_core::{CacheError, CacheStoreConfig, ChannelId, Credential, ThingId};

async fn test_store() -> Result<RedisCacheStore, CacheError> {
    let config = CacheStoreConfig {
        url: std::env::var("WARDEN_TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string()),
        ..CacheStoreConfig::default()
    };
    RedisCacheStore::connect(&config).await
}

fn fresh<T: TryFrom<String>>() -> T
where
    T::Error: std::fmt::Debug,
{
    T::try_from(Uuid::now_v7().to_string()).unwrap()
}

#[tokio::test]
async fn redis_mapping_lifecycle() -> Result<(), CacheError> {
    let store = test_store().await?;
    let credential = Credential::try_new(Uuid::now_v7().to_string()).unwrap();
    let thing: ThingId = fresh();
    let key = NamespacedKey::thing_key(&credential);

    assert_eq!(store.get_mapping(&key).await?, None);

    store.put_mapping(&credential, &thing, None).await?;
    assert_eq!(store.get_mapping(&key).await?, Some(thing.clone()));

    store.remove_mapping(&credential).await?;
    assert_eq!(store.get_mapping(&key).await?, None);
    Ok(())
}

#[tokio::test]
async fn redis_mapping_ttl() -> Result<(), CacheError> {
    let store = test_store().await?;
    let credential = Credential::try_new(Uuid::now_v7().to_string()).unwrap();
    let thing: ThingId = fresh();
    let key = NamespacedKey::thing_key(&credential);

    store
        .put_mapping(&credential, &thing, Some(Duration::from_millis(50)))
        .await?;
    assert_eq!(store.get_mapping(&key).await?, Some(thing));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(store.get_mapping(&key).await?, None);
    Ok(())
}

#[tokio::test]
async fn redis_membership_lifecycle() -> Result<(), CacheError> {
    let store = test_store().await?;
    let channel: ChannelId = fresh();
    let member: ThingId = fresh();
    let stranger: ThingId = fresh();
    let key = NamespacedKey::channel(&channel);

    store.add_member(&channel, &member).await?;
    assert!(store.is_member(&key, &member).await?);
    assert!(!store.is_member(&key, &stranger).await?);

    store.remove_member(&channel, &member).await?;
    assert!(!store.is_member(&key, &member).await?);

    store.add_member(&channel, &member).await?;
    store.remove_channel(&channel).await?;
    assert!(!store.is_member(&key, &member).await?);
    Ok(())
}
