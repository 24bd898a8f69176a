pub mod comments;
pub mod stories;

pub use comments::{CommentsRepository, RefreshOutcome};
pub use stories::StoryRepository;
