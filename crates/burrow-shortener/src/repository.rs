use crate::error::Result;
use burrow_core::{
    keys, AtomicWrite, CommitResult, KvStore, LinkRecord, OwnerId, ShortCode, Versionstamp,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// Reads and writes [`LinkRecord`]s and the per-owner index.
///
/// A link lives at `link:{code}` and is indexed at `owner_index:{owner}:{code}`.
/// Both keys are written by one atomic commit, so an index entry never exists
/// without its link.
#[derive(Debug)]
pub struct LinkRepository<S> {
    store: Arc<S>,
}

impl<S> Clone for LinkRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KvStore> LinkRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Writes a new link and its owner index entry.
    ///
    /// Both keys must be absent. If another writer claimed the code first the
    /// store reports [`CommitResult::CheckFailed`] and nothing is written.
    pub async fn create(
        &self,
        long_url: &str,
        short_code: &ShortCode,
        owner_id: &OwnerId,
    ) -> Result<CommitResult> {
        let record = LinkRecord::new(short_code.clone(), long_url, owner_id.clone());
        let link_key = keys::link(short_code);
        let index_key = keys::owner_index(owner_id, short_code);

        let write = AtomicWrite::new()
            .check(link_key.clone(), None)
            .check(index_key.clone(), None)
            .set_json(link_key, &record)?
            .set_json(index_key, short_code)?;

        let result = self.store.commit(write).await?;
        match &result {
            CommitResult::Committed { versionstamp } => {
                trace!(code = %short_code, owner = %owner_id, versionstamp = %versionstamp, "Link created")
            }
            CommitResult::CheckFailed => {
                debug!(code = %short_code, "Link create lost to an existing key")
            }
        }
        Ok(result)
    }

    pub async fn get_by_code(&self, short_code: &ShortCode) -> Result<Option<LinkRecord>> {
        Ok(self
            .get_versioned(short_code)
            .await?
            .map(|(record, _)| record))
    }

    /// Fetches a link together with the versionstamp of its last write.
    pub async fn get_versioned(
        &self,
        short_code: &ShortCode,
    ) -> Result<Option<(LinkRecord, Versionstamp)>> {
        let Some(entry) = self.store.get(&keys::link(short_code)).await? else {
            return Ok(None);
        };
        let record = entry.decode::<LinkRecord>()?;
        Ok(Some((record, entry.versionstamp)))
    }

    /// Every stored link, in key order.
    pub async fn list_all(&self) -> Result<Vec<LinkRecord>> {
        let entries = self.store.list(keys::LINK_PREFIX).await?;
        let records = entries
            .iter()
            .map(|entry| entry.decode::<LinkRecord>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Links owned by `owner_id`: the index is scanned first, then the
    /// referenced links are fetched in one batch. Index entries whose link
    /// is missing are skipped.
    pub async fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<LinkRecord>> {
        let index = self.store.list(&keys::owner_index_prefix(owner_id)).await?;
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let link_keys = index
            .iter()
            .map(|entry| entry.decode::<ShortCode>().map(|code| keys::link(&code)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(link_keys.len());
        for (key, entry) in link_keys.iter().zip(self.store.get_many(&link_keys).await?) {
            match entry {
                Some(entry) => records.push(entry.decode::<LinkRecord>()?),
                None => trace!(key = %key, owner = %owner_id, "Skipping index entry without a link"),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_storage::InMemoryStore;

    fn code(s: &str) -> ShortCode {
        ShortCode::new(s).unwrap()
    }

    fn owner(s: &str) -> OwnerId {
        OwnerId::new(s).unwrap()
    }

    fn repository() -> (Arc<InMemoryStore>, LinkRepository<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), LinkRepository::new(store))
    }

    #[tokio::test]
    async fn create_then_get() {
        let (_, links) = repository();

        let result = links
            .create("https://example.com", &code("abc1234"), &owner("alice"))
            .await
            .unwrap();
        assert!(result.is_committed());

        let record = links.get_by_code(&code("abc1234")).await.unwrap().unwrap();
        assert_eq!(record.long_url, "https://example.com");
        assert_eq!(record.owner_id, owner("alice"));
        assert_eq!(record.click_count, 0);
        assert!(record.last_click_event_id.is_none());
    }

    #[tokio::test]
    async fn get_missing_code() {
        let (_, links) = repository();
        assert!(links.get_by_code(&code("missing")).await.unwrap().is_none());
        assert!(links.get_versioned(&code("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_on_taken_code_fails_and_keeps_original() {
        let (_, links) = repository();
        links
            .create("https://first.com", &code("abc1234"), &owner("alice"))
            .await
            .unwrap();

        let result = links
            .create("https://second.com", &code("abc1234"), &owner("bob"))
            .await
            .unwrap();
        assert_eq!(result, CommitResult::CheckFailed);

        let record = links.get_by_code(&code("abc1234")).await.unwrap().unwrap();
        assert_eq!(record.long_url, "https://first.com");
        assert_eq!(record.owner_id, owner("alice"));
        assert!(links.list_by_owner(&owner("bob")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn link_and_index_share_a_versionstamp() {
        let (store, links) = repository();
        let result = links
            .create("https://example.com", &code("abc1234"), &owner("alice"))
            .await
            .unwrap();
        let CommitResult::Committed { versionstamp } = result else {
            panic!("create should commit");
        };

        let link = store.get("link:abc1234").await.unwrap().unwrap();
        let index = store.get("owner_index:alice:abc1234").await.unwrap().unwrap();
        assert_eq!(link.versionstamp, versionstamp);
        assert_eq!(index.versionstamp, versionstamp);
    }

    #[tokio::test]
    async fn list_all_returns_every_link() {
        let (_, links) = repository();
        for (c, o) in [("aaaaaaa", "alice"), ("bbbbbbb", "bob"), ("ccccccc", "alice")] {
            links.create("https://example.com", &code(c), &owner(o)).await.unwrap();
        }

        let codes: Vec<String> = links
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.short_code.to_string())
            .collect();
        assert_eq!(codes, vec!["aaaaaaa", "bbbbbbb", "ccccccc"]);
    }

    #[tokio::test]
    async fn list_by_owner_is_exact() {
        let (_, links) = repository();
        links.create("https://a.com", &code("aaaaaaa"), &owner("alice")).await.unwrap();
        links.create("https://b.com", &code("bbbbbbb"), &owner("bob")).await.unwrap();
        links.create("https://c.com", &code("ccccccc"), &owner("alice")).await.unwrap();
        // "ali" must not match "alice"'s index entries.
        links.create("https://d.com", &code("ddddddd"), &owner("ali")).await.unwrap();

        let alice: Vec<String> = links
            .list_by_owner(&owner("alice"))
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.long_url)
            .collect();
        assert_eq!(alice, vec!["https://a.com", "https://c.com"]);

        let ali = links.list_by_owner(&owner("ali")).await.unwrap();
        assert_eq!(ali.len(), 1);
        assert!(links.list_by_owner(&owner("carol")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_by_owner_skips_dangling_index_entries() {
        let (store, links) = repository();
        links.create("https://a.com", &code("aaaaaaa"), &owner("alice")).await.unwrap();
        store
            .set("owner_index:alice:zzzzzzz", b"\"zzzzzzz\"".to_vec())
            .await
            .unwrap();

        let records = links.list_by_owner(&owner("alice")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].short_code, code("aaaaaaa"));
    }

    #[tokio::test]
    async fn corrupt_record_is_a_storage_error() {
        let (store, links) = repository();
        store.set("link:abc1234", b"not json".to_vec()).await.unwrap();

        let err = links.get_by_code(&code("abc1234")).await.unwrap_err();
        assert!(matches!(err, crate::ShortenerError::Storage(_)));
    }
}
