use crate::error::Result;
use async_trait::async_trait;
use burrow_core::kv::{AtomicWrite, CommitResult, KvEntry, KvStore, Versionstamp, WatchStream};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{trace, warn};

const DEFAULT_EVENT_BUFFER: usize = 1024;
const WATCH_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    versionstamp: Versionstamp,
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    last_versionstamp: u64,
}

#[derive(Debug)]
struct Inner {
    state: RwLock<State>,
    events: broadcast::Sender<KvEntry>,
}

/// In-memory implementation of [`KvStore`].
///
/// Entries live in an ordered map behind a single lock, so a commit checks
/// and applies all of its keys without interleaving with other writers.
/// Committed values are published on a broadcast channel while the lock is
/// still held, which keeps watchers in commit order. Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::with_event_buffer(DEFAULT_EVENT_BUFFER)
    }

    /// Creates a new in-memory store whose change feed buffers up to
    /// `capacity` events for slow watchers before they start skipping.
    pub fn with_event_buffer(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                events,
            }),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.inner.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn to_kv_entry(key: &str, entry: &Entry) -> KvEntry {
    KvEntry {
        key: key.to_string(),
        value: entry.value.clone(),
        versionstamp: entry.versionstamp,
    }
}

#[async_trait]
impl KvStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<KvEntry>> {
        let state = self.inner.state.read();
        Ok(state.entries.get(key).map(|entry| to_kv_entry(key, entry)))
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<KvEntry>>> {
        let state = self.inner.state.read();
        Ok(keys
            .iter()
            .map(|key| state.entries.get(key).map(|entry| to_kv_entry(key, entry)))
            .collect())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<KvEntry>> {
        let state = self.inner.state.read();
        Ok(state
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| to_kv_entry(key, entry))
            .collect())
    }

    async fn commit(&self, write: AtomicWrite) -> Result<CommitResult> {
        let mut state = self.inner.state.write();

        for check in &write.checks {
            let current = state.entries.get(&check.key).map(|entry| entry.versionstamp);
            if current != check.expected {
                trace!(
                    key = %check.key,
                    expected = ?check.expected,
                    current = ?current,
                    "Atomic write check failed"
                );
                return Ok(CommitResult::CheckFailed);
            }
        }

        state.last_versionstamp += 1;
        let versionstamp = Versionstamp::new(state.last_versionstamp);

        for mutation in write.mutations {
            let entry = KvEntry {
                key: mutation.key,
                value: mutation.value,
                versionstamp,
            };
            state.entries.insert(
                entry.key.clone(),
                Entry {
                    value: entry.value.clone(),
                    versionstamp,
                },
            );
            // No subscribers is not an error.
            let _ = self.inner.events.send(entry);
        }

        trace!(versionstamp = %versionstamp, "Committed atomic write");
        Ok(CommitResult::Committed { versionstamp })
    }

    async fn watch(&self, key: &str) -> Result<WatchStream> {
        let mut events = self.inner.events.subscribe();
        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let watched = key.to_string();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(entry) if entry.key == watched => {
                        if tx.send(entry).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(key = %watched, skipped, "Watcher fell behind the change feed");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(WatchStream::new(key, rx, task))
    }
}
