use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::order::UserId;

// ============================================================================
// User Info - read-only snapshot from the user directory
// ============================================================================

pub const PLACEHOLDER_NAME: &str = "Unknown";
pub const PLACEHOLDER_SURNAME: &str = "User";
pub const UNAVAILABLE_EMAIL: &str = "unavailable";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Option<UserId>,
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub active: bool,
}

impl UserInfo {
    /// Stand-in used when the directory cannot answer. Inactive, no id.
    pub fn placeholder(email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: PLACEHOLDER_NAME.to_string(),
            surname: PLACEHOLDER_SURNAME.to_string(),
            email: email.into(),
            birth_date: None,
            active: false,
        }
    }

    pub fn placeholder_unavailable() -> Self {
        Self::placeholder(UNAVAILABLE_EMAIL)
    }

    /// Active with a known id: usable as an order owner
    pub fn is_usable_owner(&self) -> bool {
        self.active && self.id.is_some()
    }
}
