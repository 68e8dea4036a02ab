use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: String,
    /// Author profile.
    pub profile_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub hashtag: String,
    pub created_at: DateTime<Utc>,
}
