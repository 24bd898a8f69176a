//! Scripted in-memory API double for repository and pager tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::api::{
    ApiError, ApiResult, CommentJson, LobstersApi, StoryJson, StoryWithCommentsJson, UserJson,
};

#[derive(Default)]
pub struct MockApi {
    pages: Mutex<HashMap<u32, Vec<StoryJson>>>,
    stories: Mutex<HashMap<String, StoryWithCommentsJson>>,
    fail: AtomicBool,
    pub front_page_calls: AtomicUsize,
    pub story_calls: AtomicUsize,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&self, page: u32, stories: Vec<StoryJson>) {
        self.pages.lock().unwrap().insert(page, stories);
    }

    pub fn set_story(&self, story: StoryWithCommentsJson) {
        self.stories
            .lock()
            .unwrap()
            .insert(story.story.short_id.clone(), story);
    }

    /// When set, every call returns a server error.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn story_call_count(&self) -> usize {
        self.story_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LobstersApi for MockApi {
    async fn front_page(&self, page: u32) -> ApiResult<Vec<StoryJson>> {
        self.front_page_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::Status(500));
        }
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&page)
            .cloned()
            .unwrap_or_default())
    }

    async fn story(&self, short_id: &str) -> ApiResult<Option<StoryWithCommentsJson>> {
        self.story_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::Status(500));
        }
        Ok(self.stories.lock().unwrap().get(short_id).cloned())
    }
}

pub fn user_json(username: &str) -> UserJson {
    UserJson {
        username: username.to_string(),
        created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        is_admin: false,
        is_moderator: false,
        karma: 100,
        about: String::new(),
        avatar_url: format!("/avatars/{username}-100.png"),
        invited_by_user: None,
        github_username: None,
        twitter_username: None,
    }
}

pub fn story_json(short_id: &str, title: &str) -> StoryJson {
    StoryJson {
        short_id: short_id.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        title: title.to_string(),
        url: format!("https://example.com/{short_id}"),
        score: 10,
        comment_count: 0,
        description: String::new(),
        submitter_user: user_json("alice"),
        tags: vec!["rust".to_string()],
    }
}

pub fn comment_json(short_id: &str, indent_level: i64, username: &str) -> CommentJson {
    CommentJson {
        short_id: short_id.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap(),
        is_deleted: false,
        is_moderated: false,
        score: 1,
        comment: format!("<p>comment {short_id}</p>"),
        indent_level,
        commenting_user: user_json(username),
    }
}

pub fn story_with_comments(
    short_id: &str,
    title: &str,
    comments: Vec<CommentJson>,
) -> StoryWithCommentsJson {
    let mut story = story_json(short_id, title);
    story.comment_count = comments.len() as i64;
    StoryWithCommentsJson { story, comments }
}
