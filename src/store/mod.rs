pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Comment, Story, User};

pub use sqlite::SqliteStore;

pub trait Store {
    // Story operations
    fn upsert_story(&self, story: &Story) -> Result<()>;
    fn get_story(&self, short_id: &str) -> Result<Option<Story>>;
    fn story_count(&self) -> Result<i64>;

    /// Feed window: stories with page coordinates, ordered by
    /// `(page_index, page_sub_index)`, starting strictly after the cursor.
    fn stories_after(&self, after: Option<(i64, i64)>, limit: usize) -> Result<Vec<Story>>;

    /// Write one fetched front page. Assigns `page_sub_index` = position
    /// within the page and upserts users then stories, all in one
    /// transaction. Returns the number of stories written.
    fn insert_page(&self, page_index: i64, stories: &[Story], users: &[User]) -> Result<usize>;

    // User operations
    fn upsert_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, username: &str) -> Result<Option<User>>;

    // Comment operations
    fn upsert_comment(&self, comment: &Comment) -> Result<()>;
    fn delete_comments_for_story(&self, story_id: &str) -> Result<()>;
    fn comments_for_story(&self, story_id: &str) -> Result<Vec<Comment>>;
    fn comments_after(
        &self,
        story_id: &str,
        after_index: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Comment>>;

    /// Minimum `inserted_at` among the story's cached comments, or `None`
    /// when the story has no cached comments. Drives the staleness check.
    fn oldest_comment_inserted_at(&self, story_id: &str) -> Result<Option<DateTime<Utc>>>;

    /// Replace a story's comment set in a single transaction: carry forward
    /// the prior row's page coordinates when the incoming story has none,
    /// delete the old comments, then upsert story, users, and comments.
    /// Readers see the old complete set or the new complete set, never a mix.
    fn replace_story_comments(
        &self,
        story: &Story,
        users: &[User],
        comments: &[Comment],
    ) -> Result<()>;
}
