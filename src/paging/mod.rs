//! Cursor-based incremental loading over the cached feed and comment sets.
//!
//! Each pager owns the remote-boundary decision: serve the next window from
//! the cache when it still has rows past the cursor, otherwise fetch through
//! the repository and re-read. Pagers never schedule their own fetches; they
//! only act when `load_next` is called.

use std::sync::Arc;

use crate::app::Result;
use crate::domain::{Comment, Story};
use crate::repo::{CommentsRepository, StoryRepository};

/// Loader state across boundary requests. `Error` is retryable: the next
/// `load_next` call re-runs the same boundary request, and upsert writes
/// keep the retry from duplicating rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    /// Forward pagination is complete; further loads return nothing.
    Exhausted,
    Error,
}

/// Incremental loader for the front-page feed, ordered by
/// `(page_index, page_sub_index)`.
pub struct FrontPagePager {
    repo: Arc<StoryRepository>,
    page_size: usize,
    cursor: Option<(i64, i64)>,
    state: LoadState,
}

impl FrontPagePager {
    pub fn new(repo: Arc<StoryRepository>, page_size: usize) -> Self {
        Self {
            repo,
            page_size,
            cursor: None,
            state: LoadState::Idle,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Load the next window of stories. Cache rows past the cursor are
    /// served first; a short window means the cache is spent and the next
    /// remote page is fetched. An empty remote page marks the feed
    /// exhausted.
    pub async fn load_next(&mut self) -> Result<Vec<Story>> {
        if self.state == LoadState::Exhausted {
            return Ok(Vec::new());
        }
        self.state = LoadState::Loading;

        let cached = match self.repo.feed_window(self.cursor, self.page_size) {
            Ok(window) => window,
            Err(e) => {
                self.state = LoadState::Error;
                return Err(e);
            }
        };
        if cached.len() >= self.page_size {
            self.advance_past(&cached);
            self.state = LoadState::Idle;
            return Ok(cached);
        }

        // Next remote page follows the last page the cache knows about.
        let last_page = cached
            .last()
            .and_then(|story| story.page_index)
            .or(self.cursor.map(|(page, _)| page))
            .unwrap_or(0);
        match self.repo.refresh_page((last_page + 1) as u32).await {
            Ok(0) => {
                self.advance_past(&cached);
                self.state = LoadState::Exhausted;
                Ok(cached)
            }
            Ok(_) => {
                let window = match self.repo.feed_window(self.cursor, self.page_size) {
                    Ok(window) => window,
                    Err(e) => {
                        self.state = LoadState::Error;
                        return Err(e);
                    }
                };
                self.advance_past(&window);
                self.state = if window.is_empty() {
                    LoadState::Exhausted
                } else {
                    LoadState::Idle
                };
                Ok(window)
            }
            Err(e) => {
                self.state = LoadState::Error;
                Err(e)
            }
        }
    }

    fn advance_past(&mut self, window: &[Story]) {
        if let Some(coordinates) = window.last().and_then(|story| story.page_coordinates()) {
            self.cursor = Some(coordinates);
        }
    }
}

/// Incremental loader for one story's cached comment set, ordered by
/// `comment_index`.
///
/// Comments arrive from the server as a complete snapshot, so the remote
/// boundary is hit once: the first load runs the repository's staleness
/// check, then every window comes from the cache.
pub struct CommentsPager {
    repo: Arc<CommentsRepository>,
    story_id: String,
    page_size: usize,
    cursor: Option<i64>,
    state: LoadState,
    primed: bool,
}

impl CommentsPager {
    pub fn new(repo: Arc<CommentsRepository>, story_id: impl Into<String>, page_size: usize) -> Self {
        Self {
            repo,
            story_id: story_id.into(),
            page_size,
            cursor: None,
            state: LoadState::Idle,
            primed: false,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub async fn load_next(&mut self) -> Result<Vec<Comment>> {
        if self.state == LoadState::Exhausted {
            return Ok(Vec::new());
        }
        self.state = LoadState::Loading;

        if !self.primed {
            match self.repo.fetch_comments(&self.story_id, false).await {
                Ok(_) => self.primed = true,
                Err(e) => {
                    self.state = LoadState::Error;
                    return Err(e);
                }
            }
        }

        let window = match self
            .repo
            .comments_after(&self.story_id, self.cursor, self.page_size)
        {
            Ok(window) => window,
            Err(e) => {
                self.state = LoadState::Error;
                return Err(e);
            }
        };

        if let Some(last) = window.last() {
            self.cursor = Some(last.comment_index);
        }
        self.state = if window.len() < self.page_size {
            LoadState::Exhausted
        } else {
            LoadState::Idle
        };
        Ok(window)
    }
}
