use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum TidepoolError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Story not found: {0}")]
    StoryNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TidepoolError>;
