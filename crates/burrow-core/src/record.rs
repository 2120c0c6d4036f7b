use crate::owner::OwnerId;
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// A stored short link.
///
/// `click_count` always equals the number of [`ClickEvent`]s persisted for
/// `short_code`; only the click recorder mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub short_code: ShortCode,
    /// The normalized target URL.
    pub long_url: String,
    pub owner_id: OwnerId,
    pub created_at: Timestamp,
    pub click_count: u64,
    /// Key of the most recent click event, if any.
    pub last_click_event_id: Option<String>,
}

impl LinkRecord {
    /// Creates a fresh record with no clicks.
    pub fn new(short_code: ShortCode, long_url: impl Into<String>, owner_id: OwnerId) -> Self {
        Self {
            short_code,
            long_url: long_url.into(),
            owner_id,
            created_at: Timestamp::now(),
            click_count: 0,
            last_click_event_id: None,
        }
    }
}

/// Optional request metadata captured with a click.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct ClickMetadata {
    #[builder(default, setter(strip_option, into))]
    pub ip_address: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub user_agent: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub country: Option<String>,
}

/// A single recorded click. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub short_code: ShortCode,
    /// 1-based ordinal, equal to the link's click count after this click.
    pub sequence: u64,
    pub created_at: Timestamp,
    #[serde(flatten)]
    pub metadata: ClickMetadata,
}
