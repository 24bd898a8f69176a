use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::api::LobstersApi;
use crate::app::Result;
use crate::domain::Story;
use crate::store::Store;

/// Owns the front-page caching policy: fetched pages are written into the
/// store with page-position bookkeeping, reads come from the cache window.
pub struct StoryRepository {
    store: Arc<dyn Store + Send + Sync>,
    api: Arc<dyn LobstersApi + Send + Sync>,
    changed: watch::Sender<u64>,
}

impl StoryRepository {
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        api: Arc<dyn LobstersApi + Send + Sync>,
    ) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            store,
            api,
            changed,
        }
    }

    /// Fetch one remote front page and upsert it into the cache. Each story
    /// gets `page_sub_index` = its position within the page. Returns the
    /// number of stories written; zero means the feed is exhausted.
    ///
    /// Nothing is committed when the fetch or decode fails.
    pub async fn refresh_page(&self, page: u32) -> Result<usize> {
        let page_json = self.api.front_page(page).await?;
        if page_json.is_empty() {
            tracing::debug!("Front page {} is empty, feed exhausted", page);
            return Ok(0);
        }

        let now = Utc::now();
        let mut stories = Vec::with_capacity(page_json.len());
        let mut users = Vec::with_capacity(page_json.len());
        for story_json in page_json {
            let (story, submitter) = story_json.into_story(now);
            stories.push(story);
            users.push(submitter);
        }

        let written = self.store.insert_page(page as i64, &stories, &users)?;
        tracing::info!("Cached {} stories from front page {}", written, page);
        self.notify();
        Ok(written)
    }

    /// Cache read for the paging source: the next `limit` stories strictly
    /// after the cursor, ordered by page coordinates.
    pub fn feed_window(&self, after: Option<(i64, i64)>, limit: usize) -> Result<Vec<Story>> {
        self.store.stories_after(after, limit)
    }

    pub fn story(&self, short_id: &str) -> Result<Option<Story>> {
        self.store.get_story(short_id)
    }

    /// Change notification: the receiver wakes on every committed write.
    /// Readers then re-poll through the accessors above.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    fn notify(&self) {
        self.changed.send_modify(|version| *version = version.wrapping_add(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{story_json, MockApi};
    use crate::store::SqliteStore;

    fn repo_with_mock() -> (StoryRepository, Arc<MockApi>, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let api = Arc::new(MockApi::new());
        let repo = StoryRepository::new(store.clone(), api.clone());
        (repo, api, store)
    }

    #[tokio::test]
    async fn test_refresh_page_caches_stories_with_coordinates() {
        let (repo, api, _store) = repo_with_mock();
        api.set_page(1, vec![story_json("s_one", "First"), story_json("s_two", "Second")]);

        let written = repo.refresh_page(1).await.unwrap();
        assert_eq!(written, 2);

        let window = repo.feed_window(None, 10).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].short_id, "s_one");
        assert_eq!(window[0].page_coordinates(), Some((1, 0)));
        assert_eq!(window[1].page_coordinates(), Some((1, 1)));
    }

    #[tokio::test]
    async fn test_refresh_page_caches_submitters() {
        let (repo, api, store) = repo_with_mock();
        api.set_page(1, vec![story_json("s_one", "First")]);

        repo.refresh_page(1).await.unwrap();

        let submitter = store.get_user("alice").unwrap().unwrap();
        assert_eq!(submitter.username, "alice");
    }

    #[tokio::test]
    async fn test_empty_page_writes_nothing() {
        let (repo, _api, _store) = repo_with_mock();

        let written = repo.refresh_page(7).await.unwrap();
        assert_eq!(written, 0);
        assert!(repo.feed_window(None, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_untouched() {
        let (repo, api, _store) = repo_with_mock();
        api.set_page(1, vec![story_json("s_one", "First")]);
        repo.refresh_page(1).await.unwrap();

        api.set_failing(true);
        assert!(repo.refresh_page(2).await.is_err());
        assert_eq!(repo.feed_window(None, 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_page_is_idempotent_under_retry() {
        let (repo, api, _store) = repo_with_mock();
        api.set_page(1, vec![story_json("s_one", "First"), story_json("s_two", "Second")]);

        repo.refresh_page(1).await.unwrap();
        repo.refresh_page(1).await.unwrap();

        assert_eq!(repo.feed_window(None, 10).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_subscribe_sees_committed_writes() {
        let (repo, api, _store) = repo_with_mock();
        api.set_page(1, vec![story_json("s_one", "First")]);

        let mut rx = repo.subscribe();
        let before = *rx.borrow_and_update();
        repo.refresh_page(1).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_ne!(*rx.borrow_and_update(), before);
    }
}
