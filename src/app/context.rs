use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use crate::api::{HttpClient, LobstersApi};
use crate::app::error::{Result, TidepoolError};
use crate::config::Config;
use crate::repo::{CommentsRepository, StoryRepository};
use crate::store::{SqliteStore, Store};

/// Wires the store, API client, and repositories together. Every dependency
/// is constructed and passed explicitly.
pub struct AppContext {
    pub config: Config,
    pub base_url: Url,
    pub store: Arc<SqliteStore>,
    pub stories: Arc<StoryRepository>,
    pub comments: Arc<CommentsRepository>,
}

impl AppContext {
    pub fn new(db_path: Option<PathBuf>, config: Config) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::wire(store, config)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::wire(store, config)
    }

    fn wire(store: Arc<SqliteStore>, config: Config) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let api: Arc<dyn LobstersApi + Send + Sync> = Arc::new(HttpClient::new(base_url.clone()));

        let store_seam: Arc<dyn Store + Send + Sync> = store.clone();
        let stories = Arc::new(StoryRepository::new(store_seam.clone(), api.clone()));
        let comments = Arc::new(CommentsRepository::new(store_seam, api));

        Ok(Self {
            config,
            base_url,
            store,
            stories,
            comments,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| TidepoolError::Config("Could not find data directory".into()))?;
        let tidepool_dir = data_dir.join("tidepool");
        std::fs::create_dir_all(&tidepool_dir)?;
        Ok(tidepool_dir.join("tidepool.db"))
    }
}
