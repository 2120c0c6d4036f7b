use serde::{Deserialize, Serialize};

/// The signed-in user attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub login: String,
    pub avatar_url: String,
    pub profile_url: String,
}
