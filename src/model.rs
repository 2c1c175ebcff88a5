use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type LinkId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: LinkId,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Image reference a row held at the moment it was updated or deleted.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ImageRef {
    pub url: Option<String>,
}

impl ImageRef {
    pub fn file_name(&self) -> Option<&str> {
        self.url.as_deref().filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);
