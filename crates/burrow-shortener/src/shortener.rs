use crate::clicks::ClickOutcome;
use crate::error::Result;
use crate::watcher::LinkWatch;
use async_trait::async_trait;
use burrow_core::{ClickEvent, ClickMetadata, LinkRecord, SessionUser, ShortCode};

/// The public operations of the link shortener.
///
/// Inputs arrive as raw strings from callers; implementations validate them.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens `long_url` on behalf of `owner_id` and returns the new code.
    async fn create_short_link(&self, long_url: &str, owner_id: &str) -> Result<ShortCode>;

    /// Looks up a link. A malformed code resolves to `None`.
    async fn resolve_short_link(&self, short_code: &str) -> Result<Option<LinkRecord>>;

    async fn list_all_links(&self) -> Result<Vec<LinkRecord>>;

    async fn list_links_for_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>>;

    /// Counts a visit to `short_code` and stores a click event for it.
    async fn record_click(
        &self,
        short_code: &str,
        metadata: Option<ClickMetadata>,
    ) -> Result<ClickOutcome>;

    async fn list_click_events(&self, short_code: &str) -> Result<Vec<ClickEvent>>;

    /// Streams every later update of the link behind `short_code`.
    async fn subscribe_to_link_updates(&self, short_code: &str) -> Result<LinkWatch>;

    async fn store_session_user(&self, session_id: &str, user: SessionUser) -> Result<()>;

    async fn get_session_user(&self, session_id: &str) -> Result<Option<SessionUser>>;
}
