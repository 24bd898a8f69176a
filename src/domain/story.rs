use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub short_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub score: i64,
    pub comment_count: i64,
    pub description: String,
    /// Submitting user, denormalized by username.
    pub username: String,
    pub tags: Vec<String>,
    /// Front-page position: which remote page this story arrived on.
    ///
    /// `None` for stories cached via a comments deep link; such stories
    /// never appear in the feed window and must not be read as page zero.
    pub page_index: Option<i64>,
    /// Position within the remote page named by `page_index`.
    pub page_sub_index: Option<i64>,
    pub inserted_at: DateTime<Utc>,
}

impl Story {
    pub fn page_coordinates(&self) -> Option<(i64, i64)> {
        match (self.page_index, self.page_sub_index) {
            (Some(page), Some(sub)) => Some((page, sub)),
            _ => None,
        }
    }

    /// Self-submitted text posts have an empty `url`; link to the
    /// discussion page in that case.
    pub fn link_url(&self, base: &url::Url) -> String {
        if self.url.is_empty() {
            base.join(&format!("s/{}", self.short_id))
                .map(|u| u.to_string())
                .unwrap_or_else(|_| self.url.clone())
        } else {
            self.url.clone()
        }
    }
}
