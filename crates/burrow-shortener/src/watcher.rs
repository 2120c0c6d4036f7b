use crate::error::Result;
use burrow_core::{keys, KvStore, LinkRecord, ShortCode, WatchStream};
use std::sync::Arc;
use tracing::trace;

/// Subscribes to changes of individual links.
#[derive(Debug)]
pub struct ChangeWatcher<S> {
    store: Arc<S>,
}

impl<S> Clone for ChangeWatcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KvStore> ChangeWatcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Starts watching `short_code`. The watch yields one record per commit
    /// that touches the link after this call returns; earlier state is not
    /// replayed.
    pub async fn watch(&self, short_code: &ShortCode) -> Result<LinkWatch> {
        let stream = self.store.watch(&keys::link(short_code)).await?;
        trace!(code = %short_code, "Watching link");
        Ok(LinkWatch {
            short_code: short_code.clone(),
            stream,
        })
    }
}

/// A live feed of [`LinkRecord`] updates for one short code.
///
/// Dropping the watch or calling [`LinkWatch::close`] releases the
/// underlying subscription.
#[derive(Debug)]
pub struct LinkWatch {
    short_code: ShortCode,
    stream: WatchStream,
}

impl LinkWatch {
    pub fn short_code(&self) -> &ShortCode {
        &self.short_code
    }

    /// Waits for the next update. Returns `None` once the store ends the
    /// feed.
    pub async fn next(&mut self) -> Option<Result<LinkRecord>> {
        let entry = self.stream.next().await?;
        Some(entry.decode::<LinkRecord>().map_err(Into::into))
    }

    pub fn close(self) {
        trace!(code = %self.short_code, "Closing link watch");
        self.stream.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clicks::ClickRecorder;
    use crate::repository::LinkRepository;
    use crate::settings::RetryPolicy;
    use burrow_core::OwnerId;
    use burrow_storage::InMemoryStore;
    use std::time::Duration;

    async fn next_update(watch: &mut LinkWatch) -> LinkRecord {
        tokio::time::timeout(Duration::from_secs(1), watch.next())
            .await
            .expect("update within timeout")
            .expect("watch still open")
            .unwrap()
    }

    #[tokio::test]
    async fn emits_each_click_in_order() {
        let store = Arc::new(InMemoryStore::new());
        let code = ShortCode::new("abc1234").unwrap();
        LinkRepository::new(store.clone())
            .create("https://example.com", &code, &OwnerId::new("alice").unwrap())
            .await
            .unwrap();
        let watcher = ChangeWatcher::new(store.clone());
        let clicks = ClickRecorder::new(store, RetryPolicy::default());

        let mut watch = watcher.watch(&code).await.unwrap();
        for _ in 0..3 {
            clicks.record_click(&code, None).await.unwrap();
        }

        for expected in 1..=3 {
            assert_eq!(next_update(&mut watch).await.click_count, expected);
        }
        watch.close();
    }

    #[tokio::test]
    async fn sees_link_creation() {
        let store = Arc::new(InMemoryStore::new());
        let code = ShortCode::new("abc1234").unwrap();
        let mut watch = ChangeWatcher::new(store.clone()).watch(&code).await.unwrap();
        assert_eq!(watch.short_code(), &code);

        LinkRepository::new(store)
            .create("https://example.com", &code, &OwnerId::new("alice").unwrap())
            .await
            .unwrap();

        let record = next_update(&mut watch).await;
        assert_eq!(record.long_url, "https://example.com");
        assert_eq!(record.click_count, 0);
    }

    #[tokio::test]
    async fn ignores_other_links() {
        let store = Arc::new(InMemoryStore::new());
        let watched = ShortCode::new("abc1234").unwrap();
        let other = ShortCode::new("zzz9999").unwrap();
        let mut watch = ChangeWatcher::new(store.clone()).watch(&watched).await.unwrap();

        LinkRepository::new(store)
            .create("https://example.com", &other, &OwnerId::new("alice").unwrap())
            .await
            .unwrap();

        let pending = tokio::time::timeout(Duration::from_millis(50), watch.next()).await;
        assert!(pending.is_err());
    }
}
