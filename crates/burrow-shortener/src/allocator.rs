use crate::error::{Result, ShortenerError};
use crate::repository::LinkRepository;
use burrow_core::{normalize_url, KvStore, ShortCode};
use burrow_generator::Generator;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A normalized URL paired with a short code that was free when checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub short_code: ShortCode,
    pub long_url: String,
}

/// Picks unused short codes for new links.
///
/// The existence check here is advisory: another writer can claim the code
/// between this check and the create. [`LinkRepository::create`] closes that
/// window with create-if-absent checks.
#[derive(Debug)]
pub struct CodeAllocator<S, G> {
    links: LinkRepository<S>,
    generator: Arc<G>,
    max_attempts: u32,
}

impl<S, G> Clone for CodeAllocator<S, G> {
    fn clone(&self) -> Self {
        Self {
            links: self.links.clone(),
            generator: Arc::clone(&self.generator),
            max_attempts: self.max_attempts,
        }
    }
}

impl<S: KvStore, G: Generator> CodeAllocator<S, G> {
    pub fn new(links: LinkRepository<S>, generator: Arc<G>, max_attempts: u32) -> Self {
        Self {
            links,
            generator,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Normalizes `long_url` and finds a code with no existing link.
    ///
    /// Fails with [`ShortenerError::InvalidUrl`] before touching the store,
    /// or with [`ShortenerError::CodeExhaustion`] once every candidate was
    /// taken.
    pub async fn allocate(&self, long_url: &str) -> Result<Allocation> {
        let long_url = normalize_url(long_url)?;

        for attempt in 1..=self.max_attempts {
            let candidate: ShortCode = self.generator.generate().into();
            if self.links.get_by_code(&candidate).await?.is_none() {
                trace!(code = %candidate, attempt, "Allocated short code");
                return Ok(Allocation {
                    short_code: candidate,
                    long_url,
                });
            }
            debug!(code = %candidate, attempt, "Short code already in use");
        }

        warn!(attempts = self.max_attempts, "Could not find a free short code");
        Err(ShortenerError::CodeExhaustion {
            attempts: self.max_attempts,
        })
    }
}
