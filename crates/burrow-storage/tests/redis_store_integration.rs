//! Integration tests for [`RedisStore`] against a real Redis container.

use std::time::Duration;

use burrow_storage::{AtomicWrite, CommitResult, KvStore, RedisStore, RedisStoreConfig};
use burrow_test_infra::redis::{RedisServer, RedisServerConfig};

/// Test fixture that keeps the Redis container alive for the store.
struct Fixture {
    _redis: RedisServer,
    store: RedisStore,
}

impl Fixture {
    async fn start() -> Self {
        let redis = RedisServer::new(RedisServerConfig::default())
            .await
            .expect("Failed to start Redis");
        let url = redis.url().await.expect("Failed to get Redis url");
        let store = RedisStore::connect(RedisStoreConfig::builder().url(url).build())
            .await
            .expect("Failed to connect Redis store");

        Self {
            _redis: redis,
            store,
        }
    }
}

fn bytes(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

#[tokio::test]
async fn test_redis_store_set_get_list() {
    let fixture = Fixture::start().await;
    let store = &fixture.store;

    assert!(store.get("link:abc1234").await.unwrap().is_none());

    let first = store.set("link:abc1234", bytes("a")).await.unwrap();
    let second = store.set("link:abd1234", bytes("b")).await.unwrap();
    store.set("click:abc1234:1", bytes("c")).await.unwrap();
    assert!(second > first);

    let entry = store.get("link:abc1234").await.unwrap().unwrap();
    assert_eq!(entry.value, bytes("a"));
    assert_eq!(entry.versionstamp, first);

    let keys: Vec<String> = store
        .list("link:")
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    assert_eq!(keys, vec!["link:abc1234".to_string(), "link:abd1234".to_string()]);

    let many = store
        .get_many(&["link:abd1234".to_string(), "link:missing".to_string()])
        .await
        .unwrap();
    assert_eq!(many[0].as_ref().unwrap().value, bytes("b"));
    assert!(many[1].is_none());
}

#[tokio::test]
async fn test_redis_store_checks() {
    let fixture = Fixture::start().await;
    let store = &fixture.store;

    let create = AtomicWrite::new().check("k", None).set("k", bytes("1"));
    let CommitResult::Committed { versionstamp } = store.commit(create.clone()).await.unwrap()
    else {
        panic!("first create should commit");
    };
    assert_eq!(store.commit(create).await.unwrap(), CommitResult::CheckFailed);

    let update = AtomicWrite::new()
        .check("k", Some(versionstamp))
        .set("k", bytes("2"))
        .set("event:2", bytes("e"));
    assert!(store.commit(update.clone()).await.unwrap().is_committed());

    // Same stale stamp again: nothing may be written.
    let stale = AtomicWrite::new()
        .check("k", Some(versionstamp))
        .set("k", bytes("3"))
        .set("event:3", bytes("e"));
    assert_eq!(store.commit(stale).await.unwrap(), CommitResult::CheckFailed);
    assert!(store.get("event:3").await.unwrap().is_none());
    assert_eq!(store.get("k").await.unwrap().unwrap().value, bytes("2"));
}

#[tokio::test]
async fn test_redis_store_watch() {
    let fixture = Fixture::start().await;
    let store = &fixture.store;

    let mut watch = store.watch("link:abc1234").await.unwrap();

    store.set("link:abc1234", bytes("1")).await.unwrap();
    store.set("link:zzz9999", bytes("x")).await.unwrap();
    store.set("link:abc1234", bytes("2")).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), watch.next())
        .await
        .expect("watch should yield")
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), watch.next())
        .await
        .expect("watch should yield")
        .unwrap();

    assert_eq!(first.value, bytes("1"));
    assert_eq!(second.value, bytes("2"));
    assert!(second.versionstamp > first.versionstamp);

    watch.close();
}
