use crate::error::{map_redis_error, Result};
use async_trait::async_trait;
use burrow_core::kv::{AtomicWrite, CommitResult, KvEntry, KvStore, Versionstamp, WatchStream};
use burrow_core::StorageError;
use futures_util::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::Script;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

/// Width of the zero-padded versionstamp stored next to each value and
/// prefixed to every watch payload.
const STAMP_WIDTH: usize = 20;

/// Applies an [`AtomicWrite`] in one server-side step.
///
/// KEYS: counter, index, check data keys..., mutation data keys...
/// ARGV: #checks, #mutations, expected stamps..., then (key, value, channel)
/// per mutation. An empty expected stamp means "must be absent". Returns the
/// new versionstamp, or nil when a check fails.
const COMMIT_SCRIPT: &str = r#"
local n_checks = tonumber(ARGV[1])
local n_sets = tonumber(ARGV[2])
for i = 1, n_checks do
  local current = redis.call('HGET', KEYS[2 + i], 'vs')
  local expected = ARGV[2 + i]
  if expected == '' then
    if current then return false end
  elseif current ~= expected then
    return false
  end
end
local vs = redis.call('INCR', KEYS[1])
local stamp = string.format('%020d', vs)
local base = 2 + n_checks
for j = 1, n_sets do
  local data_key = KEYS[2 + n_checks + j]
  local offset = base + 3 * (j - 1)
  local logical = ARGV[offset + 1]
  local value = ARGV[offset + 2]
  local channel = ARGV[offset + 3]
  redis.call('HSET', data_key, 'v', value, 'vs', stamp)
  redis.call('ZADD', KEYS[2], 0, logical)
  redis.call('PUBLISH', channel, stamp .. value)
end
return vs
"#;

/// Connection settings for [`RedisStore`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct RedisStoreConfig {
    /// Redis connection URL, e.g. `redis://127.0.0.1:6379`.
    #[builder(setter(into))]
    pub url: String,
    /// Prefix applied to every Redis key and channel the store touches.
    #[builder(default = "burrow:".to_string(), setter(into))]
    pub key_prefix: String,
    /// Events buffered per watcher before the pub/sub reader waits.
    #[builder(default = 64)]
    pub watch_buffer: usize,
}

/// A Redis-backed implementation of [`KvStore`].
///
/// Each logical key is a hash holding the value (`v`) and its zero-padded
/// versionstamp (`vs`). A sorted set with equal scores indexes all logical
/// keys so prefix listing can use `ZRANGEBYLEX`. Commits run as a single Lua
/// script, which Redis executes atomically. Watches subscribe to a per-key
/// channel whose messages carry the committed value.
#[derive(Debug, Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: MultiplexedConnection,
    key_prefix: String,
    watch_buffer: usize,
    commit_script: Script,
}

impl RedisStore {
    /// Opens a multiplexed connection to the configured server.
    pub async fn connect(config: RedisStoreConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StorageError::Unavailable(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StorageError::Unavailable(format!("failed to connect to redis: {e}")))?;

        debug!(key_prefix = %config.key_prefix, "Connected Redis store");

        Ok(Self {
            client,
            conn,
            key_prefix: config.key_prefix,
            watch_buffer: config.watch_buffer.max(1),
            commit_script: Script::new(COMMIT_SCRIPT),
        })
    }

    fn data_key(&self, key: &str) -> String {
        format!("{}kv:{}", self.key_prefix, key)
    }

    fn index_key(&self) -> String {
        format!("{}index", self.key_prefix)
    }

    fn counter_key(&self) -> String {
        format!("{}versionstamp", self.key_prefix)
    }

    fn channel(&self, key: &str) -> String {
        format!("{}watch:{}", self.key_prefix, key)
    }

    async fn fetch(&self, keys: &[String]) -> Result<Vec<Option<KvEntry>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("HMGET").arg(self.data_key(key)).arg("v").arg("vs");
        }

        let mut conn = self.conn.clone();
        let rows: Vec<(Option<Vec<u8>>, Option<String>)> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to read values from Redis", e))?;

        keys.iter()
            .zip(rows)
            .map(|(key, row)| match row {
                (Some(value), Some(stamp)) => Ok(Some(KvEntry {
                    key: key.clone(),
                    value,
                    versionstamp: parse_stamp(key, stamp.as_bytes())?,
                })),
                _ => Ok(None),
            })
            .collect()
    }
}

fn parse_stamp(key: &str, raw: &[u8]) -> Result<Versionstamp> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Versionstamp::new)
        .ok_or_else(|| StorageError::InvalidData(format!("invalid versionstamp stored for '{key}'")))
}

fn parse_watch_payload(key: &str, payload: &[u8]) -> Result<KvEntry> {
    if payload.len() < STAMP_WIDTH {
        return Err(StorageError::InvalidData(format!(
            "truncated watch payload for '{key}'"
        )));
    }
    let (stamp, value) = payload.split_at(STAMP_WIDTH);
    Ok(KvEntry {
        key: key.to_string(),
        value: value.to_vec(),
        versionstamp: parse_stamp(key, stamp)?,
    })
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<KvEntry>> {
        trace!(key = %key, "Fetching value from Redis");
        let mut entries = self.fetch(&[key.to_string()]).await?;
        Ok(entries.pop().flatten())
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<KvEntry>>> {
        self.fetch(keys).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<KvEntry>> {
        let mut min = b"[".to_vec();
        min.extend_from_slice(prefix.as_bytes());
        let mut max = min.clone();
        max.push(0xff);

        let mut conn = self.conn.clone();
        let keys: Vec<String> = redis::cmd("ZRANGEBYLEX")
            .arg(self.index_key())
            .arg(min)
            .arg(max)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to list keys from Redis", e))?;

        Ok(self.fetch(&keys).await?.into_iter().flatten().collect())
    }

    async fn commit(&self, write: AtomicWrite) -> Result<CommitResult> {
        let mut invocation = self.commit_script.prepare_invoke();
        invocation
            .key(self.counter_key())
            .key(self.index_key())
            .arg(write.checks.len())
            .arg(write.mutations.len());

        for check in &write.checks {
            invocation.key(self.data_key(&check.key));
            match check.expected {
                Some(stamp) => invocation.arg(stamp.to_string()),
                None => invocation.arg(""),
            };
        }
        for mutation in &write.mutations {
            invocation
                .key(self.data_key(&mutation.key))
                .arg(mutation.key.as_str())
                .arg(mutation.value.as_slice())
                .arg(self.channel(&mutation.key));
        }

        let mut conn = self.conn.clone();
        let result: Option<u64> = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to commit atomic write", e))?;

        match result {
            Some(stamp) => {
                let versionstamp = Versionstamp::new(stamp);
                trace!(versionstamp = %versionstamp, "Committed atomic write to Redis");
                Ok(CommitResult::Committed { versionstamp })
            }
            None => {
                trace!("Atomic write check failed in Redis");
                Ok(CommitResult::CheckFailed)
            }
        }
    }

    async fn watch(&self, key: &str) -> Result<WatchStream> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| StorageError::Unavailable(format!("failed to open pub/sub: {e}")))?;
        pubsub
            .subscribe(self.channel(key))
            .await
            .map_err(|e| map_redis_error("failed to subscribe", e))?;

        let (tx, rx) = mpsc::channel(self.watch_buffer);
        let watched = key.to_string();

        let task = tokio::spawn(async move {
            let mut messages = Box::pin(pubsub.into_on_message());
            while let Some(message) = messages.next().await {
                match parse_watch_payload(&watched, message.get_payload_bytes()) {
                    Ok(entry) => {
                        if tx.send(entry).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(key = %watched, error = %e, "Dropping malformed watch message"),
                }
            }
            debug!(key = %watched, "Redis watch ended");
        });

        Ok(WatchStream::new(key, rx, task))
    }
}
