//! The Burrow link shortener.
//!
//! [`ShortenerService`] ties together code allocation, link storage, click
//! counting, change feeds and sessions on top of any [`KvStore`]. Writes that
//! can race are expressed as atomic commits guarded by versionstamp checks,
//! so concurrent creators and clickers never overwrite each other.
//!
//! [`KvStore`]: burrow_core::KvStore

pub mod allocator;
pub mod clicks;
pub mod error;
pub mod repository;
pub mod service;
pub mod sessions;
pub mod settings;
pub mod shortener;
pub mod watcher;

pub use allocator::{Allocation, CodeAllocator};
pub use clicks::{ClickOutcome, ClickRecorder};
pub use error::{Result, ShortenerError};
pub use repository::LinkRepository;
pub use service::ShortenerService;
pub use sessions::SessionStore;
pub use settings::{RetryPolicy, ShortenerSettings};
pub use shortener::Shortener;
pub use watcher::{ChangeWatcher, LinkWatch};
