//! Key-value store backends for Burrow.
//!
//! [`InMemoryStore`] keeps everything in process and is what the tests and
//! local development use. [`RedisStore`] implements the same contract on a
//! Redis server, using Lua scripts for atomic commits and pub/sub for watches.

pub mod error;
pub mod memory;
pub mod redis;

pub use burrow_core::kv::{AtomicWrite, CommitResult, KvEntry, KvStore, Versionstamp, WatchStream};
pub use error::{Result, StorageError};
pub use memory::InMemoryStore;
pub use self::redis::{RedisStore, RedisStoreConfig};
