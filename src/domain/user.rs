use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
    pub is_moderator: bool,
    pub karma: i64,
    pub about: String,
    /// Avatar path relative to the site base URL.
    pub avatar_short_url: String,
    pub invited_by_user: Option<String>,
    pub github_username: Option<String>,
    pub twitter_username: Option<String>,
    pub inserted_at: DateTime<Utc>,
}

impl User {
    /// Full avatar URL, joined onto the site base.
    pub fn avatar_url(&self, base: &url::Url) -> Option<String> {
        if self.avatar_short_url.is_empty() {
            return None;
        }
        base.join(&self.avatar_short_url).ok().map(|u| u.to_string())
    }

    /// Whether the account is younger than `threshold`. The threshold is a
    /// presentation policy, so the caller supplies it.
    pub fn is_new(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        now - self.created_at < threshold
    }
}
