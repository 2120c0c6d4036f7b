//! The key-value store contract the link layer is built on.
//!
//! A store keeps an ordered key space of byte values. Every write is stamped
//! with a store-assigned [`Versionstamp`]; [`AtomicWrite`]s use those stamps
//! for compare-and-swap checks across several keys at once.

use crate::error::StorageError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Type alias for store results.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A strictly increasing version token assigned by the store on every commit.
///
/// All keys written by the same commit share one versionstamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Versionstamp(u64);

impl Versionstamp {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl Display for Versionstamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:020}", self.0)
    }
}

/// A value read from the store together with its current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub versionstamp: Versionstamp,
}

impl KvEntry {
    /// Decodes the JSON value into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        decode(&self.key, &self.value)
    }
}

/// A precondition of an [`AtomicWrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub key: String,
    /// `None` asserts the key does not exist.
    pub expected: Option<Versionstamp>,
}

/// A write applied by an [`AtomicWrite`] once all checks pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub key: String,
    pub value: Vec<u8>,
}

/// A set of checks and mutations committed as one all-or-nothing unit.
///
/// ```ignore
/// let write = AtomicWrite::new()
///     .check(keys::link(&code), Some(versionstamp))
///     .set_json(keys::link(&code), &updated)?;
/// store.commit(write).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomicWrite {
    pub checks: Vec<Check>,
    pub mutations: Vec<Mutation>,
}

impl AtomicWrite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `key` to be at `expected` (or absent when `None`) at commit time.
    pub fn check(mut self, key: impl Into<String>, expected: Option<Versionstamp>) -> Self {
        self.checks.push(Check {
            key: key.into(),
            expected,
        });
        self
    }

    pub fn set(mut self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.mutations.push(Mutation {
            key: key.into(),
            value,
        });
        self
    }

    /// Like [`AtomicWrite::set`] but JSON-encodes `value` first.
    pub fn set_json<T: Serialize>(self, key: impl Into<String>, value: &T) -> Result<Self> {
        let key = key.into();
        let value = encode(&key, value)?;
        Ok(self.set(key, value))
    }
}

/// Outcome of [`KvStore::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    /// Every mutation was applied with this versionstamp.
    Committed { versionstamp: Versionstamp },
    /// A check did not hold; nothing was written.
    CheckFailed,
}

impl CommitResult {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitResult::Committed { .. })
    }
}

/// A live subscription to the committed values of one key.
///
/// Events arrive in commit order. The subscription is released by
/// [`WatchStream::close`] or when the stream is dropped; a closed stream
/// cannot be reopened.
#[derive(Debug)]
pub struct WatchStream {
    key: String,
    receiver: mpsc::Receiver<KvEntry>,
    task: Option<JoinHandle<()>>,
}

impl WatchStream {
    /// Wraps a channel fed by a backend task. The task is aborted when the
    /// stream is released.
    pub fn new(key: impl Into<String>, receiver: mpsc::Receiver<KvEntry>, task: JoinHandle<()>) -> Self {
        Self {
            key: key.into(),
            receiver,
            task: Some(task),
        }
    }

    /// The watched key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Waits for the next committed value. Returns `None` once the backend
    /// has gone away.
    pub async fn next(&mut self) -> Option<KvEntry> {
        self.receiver.recv().await
    }

    /// Releases the underlying subscription.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.receiver.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for WatchStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// An ordered, transactional key-value store.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Reads one key. Returns `Ok(None)` if it does not exist.
    async fn get(&self, key: &str) -> Result<Option<KvEntry>>;

    /// Reads several keys; the result has one slot per input key, in order.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<KvEntry>>>;

    /// Unconditionally writes one key.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<Versionstamp> {
        match self.commit(AtomicWrite::new().set(key, value)).await? {
            CommitResult::Committed { versionstamp } => Ok(versionstamp),
            CommitResult::CheckFailed => Err(StorageError::Operation(format!(
                "unconditional write to '{key}' reported a failed check"
            ))),
        }
    }

    /// Lists every entry whose key starts with `prefix`, in ascending key order.
    async fn list(&self, prefix: &str) -> Result<Vec<KvEntry>>;

    /// Applies `write` atomically if all of its checks hold.
    async fn commit(&self, write: AtomicWrite) -> Result<CommitResult>;

    /// Subscribes to committed values of `key`, starting after the call.
    async fn watch(&self, key: &str) -> Result<WatchStream>;
}

/// JSON-encodes a value destined for `key`.
pub fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| StorageError::Serialization(format!("failed to encode value for '{key}': {e}")))
}

/// Decodes a JSON value read from `key`.
pub fn decode<T: DeserializeOwned>(key: &str, value: &[u8]) -> Result<T> {
    serde_json::from_slice(value)
        .map_err(|e| StorageError::InvalidData(format!("invalid value at '{key}': {e}")))
}
