use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tokio::sync::watch;

use crate::api::LobstersApi;
use crate::app::Result;
use crate::domain::{Comment, Story, Visibility};
use crate::store::Store;

/// Cached comments older than this are refetched on the next request.
pub const COMMENTS_TTL_MINUTES: i64 = 60;

/// What `fetch_comments` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Cache is within the TTL; no network call, no write.
    CacheFresh,
    /// Full comment set replaced from the network.
    Refreshed { comments: usize },
    /// The server no longer knows the story; cache left untouched.
    Gone,
}

/// Per-story comment cache policy: a one-hour TTL with all-or-nothing
/// population. Refreshes replace the story's entire comment set inside one
/// store transaction.
pub struct CommentsRepository {
    store: Arc<dyn Store + Send + Sync>,
    api: Arc<dyn LobstersApi + Send + Sync>,
    /// Collapse state per comment. Session-scoped, never persisted.
    visibility: Mutex<HashMap<String, Visibility>>,
    changed: watch::Sender<u64>,
}

impl CommentsRepository {
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        api: Arc<dyn LobstersApi + Send + Sync>,
    ) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            store,
            api,
            visibility: Mutex::new(HashMap::new()),
            changed,
        }
    }

    /// Cache read only; never triggers a network fetch.
    pub fn story(&self, short_id: &str) -> Result<Option<Story>> {
        self.store.get_story(short_id)
    }

    /// Cached comments in server order.
    pub fn comments(&self, short_id: &str) -> Result<Vec<Comment>> {
        self.store.comments_for_story(short_id)
    }

    /// Paging-source read: the next `limit` comments after `after_index`.
    pub fn comments_after(
        &self,
        short_id: &str,
        after_index: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Comment>> {
        self.store.comments_after(short_id, after_index, limit)
    }

    /// Refresh the story's comment set from the network unless the cache is
    /// still fresh.
    ///
    /// Staleness: refresh is required when no cached comment exists, or when
    /// the oldest cached comment was inserted more than
    /// [`COMMENTS_TTL_MINUTES`] ago. `force` skips the check.
    ///
    /// Overlapping calls for the same story are not serialized; each runs
    /// its own transactional replace and the last commit wins.
    pub async fn fetch_comments(&self, short_id: &str, force: bool) -> Result<RefreshOutcome> {
        if !force {
            if let Some(oldest) = self.store.oldest_comment_inserted_at(short_id)? {
                let age = Utc::now() - oldest;
                if age <= Duration::minutes(COMMENTS_TTL_MINUTES) {
                    tracing::debug!(
                        "Comments for {} are {}m old, serving from cache",
                        short_id,
                        age.num_minutes()
                    );
                    return Ok(RefreshOutcome::CacheFresh);
                }
            }
        }

        let Some(snapshot) = self.api.story(short_id).await? else {
            tracing::warn!("Story {} not found on server", short_id);
            return Ok(RefreshOutcome::Gone);
        };

        let now = Utc::now();
        let (story, submitter) = snapshot.story.into_story(now);
        let mut users = vec![submitter];
        let mut comments = Vec::with_capacity(snapshot.comments.len());
        for (index, comment_json) in snapshot.comments.into_iter().enumerate() {
            let (comment, user) = comment_json.into_comment(&story.short_id, index as i64, now);
            comments.push(comment);
            users.push(user);
        }

        let count = comments.len();
        self.store.replace_story_comments(&story, &users, &comments)?;
        tracing::info!("Refreshed {} comments for {}", count, short_id);
        self.notify();
        Ok(RefreshOutcome::Refreshed { comments: count })
    }

    /// Session-local collapse state; does not touch the store.
    pub fn set_visibility(&self, comment_id: &str, visibility: Visibility) {
        self.visibility
            .lock()
            .expect("visibility map poisoned")
            .insert(comment_id.to_string(), visibility);
    }

    pub fn visibility(&self, comment_id: &str) -> Visibility {
        self.visibility
            .lock()
            .expect("visibility map poisoned")
            .get(comment_id)
            .copied()
            .unwrap_or_default()
    }

    /// Change notification for the comment read views.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    fn notify(&self) {
        self.changed.send_modify(|version| *version = version.wrapping_add(1));
    }
}
