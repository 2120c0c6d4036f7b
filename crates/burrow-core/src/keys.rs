//! Key layout of the link namespaces in the key-value store.
//!
//! ```text
//! link:{short_code}                      -> LinkRecord
//! owner_index:{owner_id}:{short_code}    -> ShortCode
//! click:{short_code}:{sequence:020}      -> ClickEvent
//! session:{session_id}                   -> SessionUser
//! ```
//!
//! Sequence numbers are zero-padded so that the store's lexicographic key
//! order matches numeric order.

use crate::owner::OwnerId;
use crate::shortcode::ShortCode;

pub const LINK_PREFIX: &str = "link:";
pub const OWNER_INDEX_PREFIX: &str = "owner_index:";
pub const CLICK_PREFIX: &str = "click:";
pub const SESSION_PREFIX: &str = "session:";

pub fn link(code: &ShortCode) -> String {
    format!("{LINK_PREFIX}{code}")
}

pub fn owner_index(owner: &OwnerId, code: &ShortCode) -> String {
    format!("{}{code}", owner_index_prefix(owner))
}

/// Prefix covering every index entry of one owner. The trailing separator
/// keeps `alice` from matching `alice2`.
pub fn owner_index_prefix(owner: &OwnerId) -> String {
    format!("{OWNER_INDEX_PREFIX}{owner}:")
}

pub fn click(code: &ShortCode, sequence: u64) -> String {
    format!("{}{sequence:020}", click_prefix(code))
}

pub fn click_prefix(code: &ShortCode) -> String {
    format!("{CLICK_PREFIX}{code}:")
}

pub fn session(session_id: &str) -> String {
    format!("{SESSION_PREFIX}{session_id}")
}
