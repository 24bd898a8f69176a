pub mod http_client;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{Comment, Story, User};

pub use http_client::HttpClient;

/// Failures from the remote API. Typed so callers can distinguish them from
/// an empty result; "not found" is reported as an empty result, not here.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status: {0}")]
    Status(u16),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The Lobste.rs JSON endpoints the reader consumes.
#[async_trait]
pub trait LobstersApi {
    /// One front page of stories, in server order. An empty page means
    /// pagination is exhausted.
    async fn front_page(&self, page: u32) -> ApiResult<Vec<StoryJson>>;

    /// A story with its full, ordered comment list, or `None` if the short
    /// ID does not exist.
    async fn story(&self, short_id: &str) -> ApiResult<Option<StoryWithCommentsJson>>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserJson {
    pub username: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_moderator: bool,
    #[serde(default)]
    pub karma: i64,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub invited_by_user: Option<String>,
    #[serde(default)]
    pub github_username: Option<String>,
    #[serde(default)]
    pub twitter_username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoryJson {
    pub short_id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub score: i64,
    pub comment_count: i64,
    #[serde(default)]
    pub description: String,
    pub submitter_user: UserJson,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentJson {
    pub short_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_moderated: bool,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub comment: String,
    pub indent_level: i64,
    pub commenting_user: UserJson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoryWithCommentsJson {
    #[serde(flatten)]
    pub story: StoryJson,
    #[serde(default)]
    pub comments: Vec<CommentJson>,
}

impl UserJson {
    pub fn into_user(self, inserted_at: DateTime<Utc>) -> User {
        User {
            username: self.username,
            created_at: self.created_at,
            is_admin: self.is_admin,
            is_moderator: self.is_moderator,
            karma: self.karma,
            about: self.about,
            avatar_short_url: self.avatar_url,
            invited_by_user: self.invited_by_user,
            github_username: self.github_username,
            twitter_username: self.twitter_username,
            inserted_at,
        }
    }
}

impl StoryJson {
    /// Convert to a domain story plus its submitter. Page coordinates are
    /// not known at the wire level; the write path assigns them.
    pub fn into_story(self, inserted_at: DateTime<Utc>) -> (Story, User) {
        let submitter = self.submitter_user.clone().into_user(inserted_at);
        let story = Story {
            short_id: self.short_id,
            title: self.title,
            created_at: self.created_at,
            url: self.url,
            score: self.score,
            comment_count: self.comment_count,
            description: self.description,
            username: submitter.username.clone(),
            tags: self.tags,
            page_index: None,
            page_sub_index: None,
            inserted_at,
        };
        (story, submitter)
    }
}

impl CommentJson {
    /// Convert to a domain comment tagged with its position in the server's
    /// returned order, plus the commenting user.
    pub fn into_comment(
        self,
        story_id: &str,
        comment_index: i64,
        inserted_at: DateTime<Utc>,
    ) -> (Comment, User) {
        let user = self.commenting_user.into_user(inserted_at);
        let comment = Comment {
            short_id: self.short_id,
            story_id: story_id.to_string(),
            comment_index,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_deleted: self.is_deleted,
            is_moderated: self.is_moderated,
            score: self.score,
            comment: self.comment,
            indent_level: self.indent_level,
            username: user.username.clone(),
            inserted_at,
        };
        (comment, user)
    }
}
