use crate::error::Result;
use crate::repository::LinkRepository;
use crate::settings::RetryPolicy;
use burrow_core::{
    keys, AtomicWrite, ClickEvent, ClickMetadata, CommitResult, KvStore, LinkRecord, ShortCode,
    Versionstamp,
};
use jiff::Timestamp;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Result of [`ClickRecorder::record_click`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// The click was stored; carries the link as written.
    Recorded(LinkRecord),
    /// Every attempt lost its versionstamp check to a concurrent click.
    Conflict,
    /// No link exists for the code.
    NotFound,
}

/// Records clicks with optimistic concurrency.
///
/// Each attempt reads the link and its versionstamp, then commits the
/// incremented link together with a new click event, guarded by a check that
/// the link is unchanged. A commit that loses the race writes nothing and is
/// retried according to the [`RetryPolicy`].
#[derive(Debug)]
pub struct ClickRecorder<S> {
    store: Arc<S>,
    links: LinkRepository<S>,
    retry: RetryPolicy,
}

impl<S> Clone for ClickRecorder<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            links: self.links.clone(),
            retry: self.retry.clone(),
        }
    }
}

impl<S: KvStore> ClickRecorder<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self {
            links: LinkRepository::new(Arc::clone(&store)),
            store,
            retry,
        }
    }

    pub async fn record_click(
        &self,
        short_code: &ShortCode,
        metadata: Option<ClickMetadata>,
    ) -> Result<ClickOutcome> {
        let metadata = metadata.unwrap_or_default();
        let attempts = self.retry.attempts();

        for attempt in 0..attempts {
            let Some((link, versionstamp)) = self.links.get_versioned(short_code).await? else {
                trace!(code = %short_code, "Click on unknown short code");
                return Ok(ClickOutcome::NotFound);
            };

            if let Some(updated) = self.try_commit(link, versionstamp, &metadata).await? {
                trace!(code = %short_code, clicks = updated.click_count, "Click recorded");
                return Ok(ClickOutcome::Recorded(updated));
            }

            if attempt + 1 < attempts {
                let backoff = self.retry.backoff_duration(attempt);
                debug!(
                    code = %short_code,
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    "Click lost a concurrent update, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }

        error!(code = %short_code, attempts, "Failed to record click after retries");
        Ok(ClickOutcome::Conflict)
    }

    /// One read-modify-write round against a snapshot taken by the caller.
    /// Returns `None` when the link changed since `versionstamp`.
    pub(crate) async fn try_commit(
        &self,
        link: LinkRecord,
        versionstamp: Versionstamp,
        metadata: &ClickMetadata,
    ) -> Result<Option<LinkRecord>> {
        let sequence = link.click_count + 1;
        let link_key = keys::link(&link.short_code);
        let event_key = keys::click(&link.short_code, sequence);

        let event = ClickEvent {
            short_code: link.short_code.clone(),
            sequence,
            created_at: Timestamp::now(),
            metadata: metadata.clone(),
        };
        let updated = LinkRecord {
            click_count: sequence,
            last_click_event_id: Some(event_key.clone()),
            ..link
        };

        let write = AtomicWrite::new()
            .check(link_key.clone(), Some(versionstamp))
            .check(event_key.clone(), None)
            .set_json(link_key, &updated)?
            .set_json(event_key, &event)?;

        match self.store.commit(write).await? {
            CommitResult::Committed { .. } => Ok(Some(updated)),
            CommitResult::CheckFailed => Ok(None),
        }
    }

    /// Click events for a code, oldest first.
    pub async fn events(&self, short_code: &ShortCode) -> Result<Vec<ClickEvent>> {
        let entries = self.store.list(&keys::click_prefix(short_code)).await?;
        let events = entries
            .iter()
            .map(|entry| entry.decode::<ClickEvent>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }
}
