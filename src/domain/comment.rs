use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub short_id: String,
    pub story_id: String,
    /// Zero-based position within the server's returned comment list;
    /// reconstructs server order on read.
    pub comment_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub is_moderated: bool,
    pub score: i64,
    /// Raw HTML body as returned by the server.
    pub comment: String,
    /// Reply depth, >= 1 for top-level comments.
    pub indent_level: i64,
    /// Commenting user, denormalized by username.
    pub username: String,
    pub inserted_at: DateTime<Utc>,
}

/// Collapse state of a comment subtree. Session-scoped UI state, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    /// Header shown, body hidden.
    Compact,
    /// Hidden entirely (an ancestor is collapsed).
    Gone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_defaults_to_visible() {
        assert_eq!(Visibility::default(), Visibility::Visible);
    }
}
