use crate::allocator::CodeAllocator;
use crate::clicks::{ClickOutcome, ClickRecorder};
use crate::error::{Result, ShortenerError};
use crate::repository::LinkRepository;
use crate::sessions::SessionStore;
use crate::settings::ShortenerSettings;
use crate::shortener::Shortener;
use crate::watcher::{ChangeWatcher, LinkWatch};
use async_trait::async_trait;
use burrow_core::{
    ClickEvent, ClickMetadata, CommitResult, KvStore, LinkRecord, OwnerId, SessionUser, ShortCode,
};
use burrow_generator::Generator;
use std::sync::Arc;
use tracing::{info, trace, warn};

/// A concrete implementation of the [`Shortener`] trait.
///
/// All components share one store. Creating a link allocates a candidate
/// code and then writes it with create-if-absent checks; if another writer
/// claims the code in between, the whole allocate-and-create round is
/// repeated up to `create_attempts` times.
#[derive(Debug)]
pub struct ShortenerService<S, G> {
    allocator: CodeAllocator<S, G>,
    links: LinkRepository<S>,
    clicks: ClickRecorder<S>,
    watcher: ChangeWatcher<S>,
    sessions: SessionStore<S>,
    create_attempts: u32,
}

impl<S, G> Clone for ShortenerService<S, G> {
    fn clone(&self) -> Self {
        Self {
            allocator: self.allocator.clone(),
            links: self.links.clone(),
            clicks: self.clicks.clone(),
            watcher: self.watcher.clone(),
            sessions: self.sessions.clone(),
            create_attempts: self.create_attempts,
        }
    }
}

impl<S: KvStore, G: Generator> ShortenerService<S, G> {
    /// Creates a service with default settings.
    pub fn new(store: S, generator: G) -> Self {
        Self::with_settings(Arc::new(store), generator, ShortenerSettings::default())
    }

    pub fn with_settings(store: Arc<S>, generator: G, settings: ShortenerSettings) -> Self {
        let links = LinkRepository::new(Arc::clone(&store));
        Self {
            allocator: CodeAllocator::new(
                links.clone(),
                Arc::new(generator),
                settings.allocation_attempts,
            ),
            clicks: ClickRecorder::new(Arc::clone(&store), settings.click_retry),
            watcher: ChangeWatcher::new(Arc::clone(&store)),
            sessions: SessionStore::new(store),
            links,
            create_attempts: settings.create_attempts.max(1),
        }
    }
}

#[async_trait]
impl<S: KvStore, G: Generator> Shortener for ShortenerService<S, G> {
    async fn create_short_link(&self, long_url: &str, owner_id: &str) -> Result<ShortCode> {
        let owner_id = OwnerId::new(owner_id)?;

        for attempt in 1..=self.create_attempts {
            let allocation = self.allocator.allocate(long_url).await?;
            let result = self
                .links
                .create(&allocation.long_url, &allocation.short_code, &owner_id)
                .await?;

            match result {
                CommitResult::Committed { .. } => {
                    info!(
                        code = %allocation.short_code,
                        owner = %owner_id,
                        url = %allocation.long_url,
                        "Short link created"
                    );
                    return Ok(allocation.short_code);
                }
                CommitResult::CheckFailed => warn!(
                    code = %allocation.short_code,
                    attempt,
                    "Short code was claimed before create, allocating again"
                ),
            }
        }

        Err(ShortenerError::CodeExhaustion {
            attempts: self.create_attempts,
        })
    }

    async fn resolve_short_link(&self, short_code: &str) -> Result<Option<LinkRecord>> {
        let Ok(short_code) = ShortCode::new(short_code) else {
            trace!(code = %short_code, "Resolving malformed short code");
            return Ok(None);
        };
        self.links.get_by_code(&short_code).await
    }

    async fn list_all_links(&self) -> Result<Vec<LinkRecord>> {
        self.links.list_all().await
    }

    async fn list_links_for_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>> {
        let owner_id = OwnerId::new(owner_id)?;
        self.links.list_by_owner(&owner_id).await
    }

    async fn record_click(
        &self,
        short_code: &str,
        metadata: Option<ClickMetadata>,
    ) -> Result<ClickOutcome> {
        let Ok(short_code) = ShortCode::new(short_code) else {
            return Ok(ClickOutcome::NotFound);
        };
        self.clicks.record_click(&short_code, metadata).await
    }

    async fn list_click_events(&self, short_code: &str) -> Result<Vec<ClickEvent>> {
        let Ok(short_code) = ShortCode::new(short_code) else {
            return Ok(Vec::new());
        };
        self.clicks.events(&short_code).await
    }

    async fn subscribe_to_link_updates(&self, short_code: &str) -> Result<LinkWatch> {
        let short_code = ShortCode::new(short_code)?;
        self.watcher.watch(&short_code).await
    }

    async fn store_session_user(&self, session_id: &str, user: SessionUser) -> Result<()> {
        self.sessions.store(session_id, &user).await
    }

    async fn get_session_user(&self, session_id: &str) -> Result<Option<SessionUser>> {
        self.sessions.get(session_id).await
    }
}
