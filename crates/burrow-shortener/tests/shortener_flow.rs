use burrow_generator::RandomGenerator;
use burrow_shortener::{ClickOutcome, RetryPolicy, Shortener, ShortenerService, ShortenerSettings};
use burrow_storage::{InMemoryStore, RedisStore, RedisStoreConfig};
use burrow_test_infra::redis::{RedisServer, RedisServerConfig};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn contended_settings() -> ShortenerSettings {
    ShortenerSettings::builder()
        .click_retry(
            RetryPolicy::builder()
                .max_attempts(200)
                .initial_backoff(Duration::from_millis(1))
                .max_backoff(Duration::from_millis(10))
                .build(),
        )
        .build()
}

async fn concurrent_clicks_are_counted_once_each(shortener: Arc<dyn Shortener>) {
    let code = shortener
        .create_short_link("https://example.com/landing", "alice")
        .await
        .unwrap();
    let mut watch = shortener
        .subscribe_to_link_updates(code.as_str())
        .await
        .unwrap();

    let mut handles = vec![];
    for _ in 0..16 {
        let shortener = Arc::clone(&shortener);
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            shortener.record_click(code.as_str(), None).await.unwrap()
        }));
    }
    for handle in handles {
        assert!(matches!(handle.await.unwrap(), ClickOutcome::Recorded(_)));
    }

    let link = shortener
        .resolve_short_link(code.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.click_count, 16);

    let events = shortener.list_click_events(code.as_str()).await.unwrap();
    let sequences: Vec<u64> = events.iter().map(|event| event.sequence).collect();
    assert_eq!(sequences, (1..=16).collect::<Vec<_>>());

    // Every committed click reaches the subscriber, in commit order.
    for expected in 1..=16 {
        let update = tokio::time::timeout(Duration::from_secs(5), watch.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(update.click_count, expected);
    }
    watch.close();
}

async fn concurrent_creates_get_distinct_codes(shortener: Arc<dyn Shortener>) {
    let mut handles = vec![];
    for i in 0..25 {
        let shortener = Arc::clone(&shortener);
        handles.push(tokio::spawn(async move {
            let owner = if i % 2 == 0 { "alice" } else { "bob" };
            shortener
                .create_short_link(&format!("https://example.com/{i}"), owner)
                .await
                .unwrap()
        }));
    }

    let mut codes = HashSet::new();
    for handle in handles {
        assert!(codes.insert(handle.await.unwrap()));
    }

    let alice = shortener.list_links_for_owner("alice").await.unwrap();
    let bob = shortener.list_links_for_owner("bob").await.unwrap();
    assert_eq!(alice.len(), 13);
    assert_eq!(bob.len(), 12);
    assert!(alice.iter().all(|link| link.owner_id.as_str() == "alice"));
    assert_eq!(shortener.list_all_links().await.unwrap().len(), 25);
}

fn in_memory() -> Arc<dyn Shortener> {
    Arc::new(ShortenerService::with_settings(
        Arc::new(InMemoryStore::new()),
        RandomGenerator::new(),
        contended_settings(),
    ))
}

#[tokio::test]
async fn in_memory_concurrent_clicks() {
    concurrent_clicks_are_counted_once_each(in_memory()).await;
}

#[tokio::test]
async fn in_memory_concurrent_creates() {
    concurrent_creates_get_distinct_codes(in_memory()).await;
}

struct Fixture {
    _server: RedisServer,
    shortener: Arc<dyn Shortener>,
}

impl Fixture {
    async fn new() -> Self {
        let server = RedisServer::new(RedisServerConfig::default()).await.unwrap();
        let store = RedisStore::connect(
            RedisStoreConfig::builder()
                .url(server.url().await.unwrap())
                .build(),
        )
        .await
        .unwrap();
        let shortener = Arc::new(ShortenerService::with_settings(
            Arc::new(store),
            RandomGenerator::new(),
            contended_settings(),
        ));
        Self {
            _server: server,
            shortener,
        }
    }
}

#[tokio::test]
async fn redis_concurrent_clicks() {
    let fixture = Fixture::new().await;
    concurrent_clicks_are_counted_once_each(fixture.shortener.clone()).await;
}

#[tokio::test]
async fn redis_concurrent_creates() {
    let fixture = Fixture::new().await;
    concurrent_creates_get_distinct_codes(fixture.shortener.clone()).await;
}
