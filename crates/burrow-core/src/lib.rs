//! Core types and traits for the Burrow URL shortener.
//!
//! This crate provides the domain records, the key layout, URL validation and
//! the [`KvStore`] contract shared by the storage backends and the shortener
//! service.

pub mod error;
pub mod keys;
pub mod kv;
pub mod owner;
pub mod record;
pub mod session;
pub mod shortcode;
pub mod validation;

pub use error::{CoreError, StorageError};
pub use kv::{AtomicWrite, CommitResult, KvEntry, KvStore, Versionstamp, WatchStream};
pub use owner::OwnerId;
pub use record::{ClickEvent, ClickMetadata, LinkRecord};
pub use session::SessionUser;
pub use shortcode::ShortCode;
pub use validation::normalize_url;
