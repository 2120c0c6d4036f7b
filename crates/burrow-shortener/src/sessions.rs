use crate::error::Result;
use burrow_core::{keys, KvStore, SessionUser};
use std::sync::Arc;
use tracing::trace;

/// Maps session ids to the signed-in user.
#[derive(Debug)]
pub struct SessionStore<S> {
    store: Arc<S>,
}

impl<S> Clone for SessionStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KvStore> SessionStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Stores `user` under `session_id`, replacing any previous value.
    pub async fn store(&self, session_id: &str, user: &SessionUser) -> Result<()> {
        let key = keys::session(session_id);
        let value = burrow_core::kv::encode(&key, user)?;
        self.store.set(&key, value).await?;
        trace!(login = %user.login, "Session stored");
        Ok(())
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<SessionUser>> {
        match self.store.get(&keys::session(session_id)).await? {
            Some(entry) => Ok(Some(entry.decode()?)),
            None => Ok(None),
        }
    }
}
