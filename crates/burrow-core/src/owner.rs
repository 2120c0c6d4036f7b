use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identifier of the user that owns a link (the session login).
///
/// Owner ids are embedded in index keys, so they must be non-empty and must
/// not contain the `:` key separator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> std::result::Result<Self, CoreError> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::InvalidOwner("owner id cannot be empty".to_string()));
        }
        if id.contains(':') {
            return Err(CoreError::InvalidOwner(format!(
                "owner id must not contain ':': '{}'",
                id
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = CoreError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OwnerId> for String {
    fn from(owner: OwnerId) -> Self {
        owner.0
    }
}
