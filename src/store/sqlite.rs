use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, TidepoolError};
use crate::domain::{Comment, Story, User};
use crate::store::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock_conn()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| TidepoolError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            TidepoolError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }
}

fn millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

fn encode_tags(tags: &[String]) -> String {
    tags.join(",")
}

fn decode_tags(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(',').map(str::to_string).collect()
    }
}

const STORY_COLUMNS: &str = "short_id, title, created_at, url, score, comment_count, \
     description, username, tags, page_index, page_sub_index, inserted_at";

const USER_COLUMNS: &str = "username, created_at, is_admin, about, is_moderator, karma, \
     avatar_short_url, invited_by_user, github_username, twitter_username, inserted_at";

const COMMENT_COLUMNS: &str = "short_id, story_id, comment_index, created_at, updated_at, \
     is_deleted, is_moderated, score, comment, indent_level, username, inserted_at";

fn story_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Story> {
    Ok(Story {
        short_id: row.get(0)?,
        title: row.get(1)?,
        created_at: from_millis(row.get(2)?),
        url: row.get(3)?,
        score: row.get(4)?,
        comment_count: row.get(5)?,
        description: row.get(6)?,
        username: row.get(7)?,
        tags: decode_tags(&row.get::<_, String>(8)?),
        page_index: row.get(9)?,
        page_sub_index: row.get(10)?,
        inserted_at: from_millis(row.get(11)?),
    })
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        username: row.get(0)?,
        created_at: from_millis(row.get(1)?),
        is_admin: row.get::<_, i64>(2)? != 0,
        about: row.get(3)?,
        is_moderator: row.get::<_, i64>(4)? != 0,
        karma: row.get(5)?,
        avatar_short_url: row.get(6)?,
        invited_by_user: row.get(7)?,
        github_username: row.get(8)?,
        twitter_username: row.get(9)?,
        inserted_at: from_millis(row.get(10)?),
    })
}

fn comment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        short_id: row.get(0)?,
        story_id: row.get(1)?,
        comment_index: row.get(2)?,
        created_at: from_millis(row.get(3)?),
        updated_at: from_millis(row.get(4)?),
        is_deleted: row.get::<_, i64>(5)? != 0,
        is_moderated: row.get::<_, i64>(6)? != 0,
        score: row.get(7)?,
        comment: row.get(8)?,
        indent_level: row.get(9)?,
        username: row.get(10)?,
        inserted_at: from_millis(row.get(11)?),
    })
}

fn upsert_story_inner(conn: &Connection, story: &Story) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO stories (short_id, title, created_at, url, score, comment_count,
                              description, username, tags, page_index, page_sub_index, inserted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(short_id) DO UPDATE SET
             title = excluded.title,
             created_at = excluded.created_at,
             url = excluded.url,
             score = excluded.score,
             comment_count = excluded.comment_count,
             description = excluded.description,
             username = excluded.username,
             tags = excluded.tags,
             page_index = excluded.page_index,
             page_sub_index = excluded.page_sub_index,
             inserted_at = excluded.inserted_at",
        params![
            story.short_id,
            story.title,
            millis(story.created_at),
            story.url,
            story.score,
            story.comment_count,
            story.description,
            story.username,
            encode_tags(&story.tags),
            story.page_index,
            story.page_sub_index,
            millis(story.inserted_at),
        ],
    )?;
    Ok(())
}

fn upsert_user_inner(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (username, created_at, is_admin, about, is_moderator, karma,
                            avatar_short_url, invited_by_user, github_username,
                            twitter_username, inserted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(username) DO UPDATE SET
             created_at = excluded.created_at,
             is_admin = excluded.is_admin,
             about = excluded.about,
             is_moderator = excluded.is_moderator,
             karma = excluded.karma,
             avatar_short_url = excluded.avatar_short_url,
             invited_by_user = excluded.invited_by_user,
             github_username = excluded.github_username,
             twitter_username = excluded.twitter_username,
             inserted_at = excluded.inserted_at",
        params![
            user.username,
            millis(user.created_at),
            user.is_admin as i64,
            user.about,
            user.is_moderator as i64,
            user.karma,
            user.avatar_short_url,
            user.invited_by_user,
            user.github_username,
            user.twitter_username,
            millis(user.inserted_at),
        ],
    )?;
    Ok(())
}

fn upsert_comment_inner(conn: &Connection, comment: &Comment) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO comments (short_id, story_id, comment_index, created_at, updated_at,
                               is_deleted, is_moderated, score, comment, indent_level,
                               username, inserted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(short_id) DO UPDATE SET
             story_id = excluded.story_id,
             comment_index = excluded.comment_index,
             created_at = excluded.created_at,
             updated_at = excluded.updated_at,
             is_deleted = excluded.is_deleted,
             is_moderated = excluded.is_moderated,
             score = excluded.score,
             comment = excluded.comment,
             indent_level = excluded.indent_level,
             username = excluded.username,
             inserted_at = excluded.inserted_at",
        params![
            comment.short_id,
            comment.story_id,
            comment.comment_index,
            millis(comment.created_at),
            millis(comment.updated_at),
            comment.is_deleted as i64,
            comment.is_moderated as i64,
            comment.score,
            comment.comment,
            comment.indent_level,
            comment.username,
            millis(comment.inserted_at),
        ],
    )?;
    Ok(())
}

impl Store for SqliteStore {
    fn upsert_story(&self, story: &Story) -> Result<()> {
        let conn = self.lock_conn()?;
        upsert_story_inner(&conn, story)?;
        Ok(())
    }

    fn get_story(&self, short_id: &str) -> Result<Option<Story>> {
        let conn = self.lock_conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {STORY_COLUMNS} FROM stories WHERE short_id = ?1"),
                params![short_id],
                story_from_row,
            )
            .optional()?;
        Ok(result)
    }

    fn story_count(&self) -> Result<i64> {
        let conn = self.lock_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM stories", [], |row| row.get(0))?;
        Ok(count)
    }

    fn stories_after(&self, after: Option<(i64, i64)>, limit: usize) -> Result<Vec<Story>> {
        let conn = self.lock_conn()?;

        // Stories without page coordinates (deep-link cached) are not part
        // of the feed and never match.
        let stories = match after {
            Some((page, sub)) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {STORY_COLUMNS} FROM stories
                     WHERE page_index IS NOT NULL AND page_sub_index IS NOT NULL
                       AND (page_index > ?1 OR (page_index = ?1 AND page_sub_index > ?2))
                     ORDER BY page_index, page_sub_index
                     LIMIT ?3"
                ))?;
                let stories = stmt
                    .query_map(params![page, sub, limit as i64], story_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                stories
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {STORY_COLUMNS} FROM stories
                     WHERE page_index IS NOT NULL AND page_sub_index IS NOT NULL
                     ORDER BY page_index, page_sub_index
                     LIMIT ?1"
                ))?;
                let stories = stmt
                    .query_map(params![limit as i64], story_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                stories
            }
        };

        Ok(stories)
    }

    fn insert_page(&self, page_index: i64, stories: &[Story], users: &[User]) -> Result<usize> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        for user in users {
            upsert_user_inner(&tx, user)?;
        }
        for (position, story) in stories.iter().enumerate() {
            let mut story = story.clone();
            story.page_index = Some(page_index);
            story.page_sub_index = Some(position as i64);
            upsert_story_inner(&tx, &story)?;
        }

        tx.commit()?;
        Ok(stories.len())
    }

    fn upsert_user(&self, user: &User) -> Result<()> {
        let conn = self.lock_conn()?;
        upsert_user_inner(&conn, user)?;
        Ok(())
    }

    fn get_user(&self, username: &str) -> Result<Option<User>> {
        let conn = self.lock_conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(result)
    }

    fn upsert_comment(&self, comment: &Comment) -> Result<()> {
        let conn = self.lock_conn()?;
        upsert_comment_inner(&conn, comment)?;
        Ok(())
    }

    fn delete_comments_for_story(&self, story_id: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM comments WHERE story_id = ?1", params![story_id])?;
        Ok(())
    }

    fn comments_for_story(&self, story_id: &str) -> Result<Vec<Comment>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments
             WHERE story_id = ?1
             ORDER BY comment_index"
        ))?;
        let comments = stmt
            .query_map(params![story_id], comment_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    fn comments_after(
        &self,
        story_id: &str,
        after_index: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Comment>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments
             WHERE story_id = ?1 AND comment_index > ?2
             ORDER BY comment_index
             LIMIT ?3"
        ))?;
        let comments = stmt
            .query_map(
                params![story_id, after_index.unwrap_or(-1), limit as i64],
                comment_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    fn oldest_comment_inserted_at(&self, story_id: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.lock_conn()?;
        let result: Option<i64> = conn.query_row(
            "SELECT MIN(inserted_at) FROM comments WHERE story_id = ?1",
            params![story_id],
            |row| row.get(0),
        )?;
        Ok(result.map(from_millis))
    }

    fn replace_story_comments(
        &self,
        story: &Story,
        users: &[User],
        comments: &[Comment],
    ) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        // A story refetched via deep link carries no page coordinates;
        // the prior row's coordinates survive the overwrite.
        let prior: Option<(Option<i64>, Option<i64>)> = tx
            .query_row(
                "SELECT page_index, page_sub_index FROM stories WHERE short_id = ?1",
                params![story.short_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let mut story = story.clone();
        if story.page_coordinates().is_none() {
            if let Some((page_index, page_sub_index)) = prior {
                story.page_index = page_index;
                story.page_sub_index = page_sub_index;
            }
        }

        tx.execute(
            "DELETE FROM comments WHERE story_id = ?1",
            params![story.short_id],
        )?;
        upsert_story_inner(&tx, &story)?;
        for user in users {
            upsert_user_inner(&tx, user)?;
        }
        for comment in comments {
            upsert_comment_inner(&tx, comment)?;
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn story(short_id: &str) -> Story {
        Story {
            short_id: short_id.into(),
            title: format!("Story {short_id}"),
            created_at: Utc::now(),
            url: format!("https://example.com/{short_id}"),
            score: 5,
            comment_count: 0,
            description: String::new(),
            username: "alice".into(),
            tags: vec!["rust".into(), "programming".into()],
            page_index: None,
            page_sub_index: None,
            inserted_at: Utc::now(),
        }
    }

    fn user(username: &str) -> User {
        User {
            username: username.into(),
            created_at: Utc::now() - Duration::days(365),
            is_admin: false,
            is_moderator: false,
            karma: 50,
            about: String::new(),
            avatar_short_url: format!("/avatars/{username}-100.png"),
            invited_by_user: None,
            github_username: None,
            twitter_username: None,
            inserted_at: Utc::now(),
        }
    }

    fn comment(short_id: &str, story_id: &str, index: i64) -> Comment {
        Comment {
            short_id: short_id.into(),
            story_id: story_id.into(),
            comment_index: index,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_deleted: false,
            is_moderated: false,
            score: 1,
            comment: format!("<p>{short_id}</p>"),
            indent_level: 1,
            username: "bob".into(),
            inserted_at: Utc::now(),
        }
    }

    #[test]
    fn test_upsert_and_get_story() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_story(&story("abc123")).unwrap();

        let retrieved = store.get_story("abc123").unwrap().unwrap();
        assert_eq!(retrieved.title, "Story abc123");
        assert_eq!(retrieved.tags, vec!["rust", "programming"]);
        assert_eq!(retrieved.page_coordinates(), None);
    }

    #[test]
    fn test_upsert_story_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        let mut s = story("abc123");
        store.upsert_story(&s).unwrap();

        s.score = 99;
        s.tags = vec!["go".into()];
        store.upsert_story(&s).unwrap();

        let retrieved = store.get_story("abc123").unwrap().unwrap();
        assert_eq!(retrieved.score, 99);
        assert_eq!(retrieved.tags, vec!["go"]);
        assert_eq!(store.story_count().unwrap(), 1);
    }

    #[test]
    fn test_get_story_nonexistent() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_story("missing").unwrap().is_none());
    }

    #[test]
    fn test_empty_tags_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        let mut s = story("abc123");
        s.tags.clear();
        store.upsert_story(&s).unwrap();

        let retrieved = store.get_story("abc123").unwrap().unwrap();
        assert!(retrieved.tags.is_empty());
    }

    #[test]
    fn test_insert_page_assigns_coordinates() {
        let store = SqliteStore::in_memory().unwrap();
        let stories = vec![story("s_one"), story("s_two"), story("s_three")];
        let written = store.insert_page(2, &stories, &[user("alice")]).unwrap();
        assert_eq!(written, 3);

        let second = store.get_story("s_two").unwrap().unwrap();
        assert_eq!(second.page_coordinates(), Some((2, 1)));
    }

    #[test]
    fn test_insert_page_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        let stories = vec![story("s_one"), story("s_two")];
        store.insert_page(1, &stories, &[]).unwrap();
        store.insert_page(1, &stories, &[]).unwrap();

        assert_eq!(store.story_count().unwrap(), 2);
        let first = store.get_story("s_one").unwrap().unwrap();
        assert_eq!(first.page_coordinates(), Some((1, 0)));
    }

    #[test]
    fn test_stories_after_orders_by_coordinates() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_page(2, &[story("p2_a"), story("p2_b")], &[])
            .unwrap();
        store
            .insert_page(1, &[story("p1_a"), story("p1_b")], &[])
            .unwrap();
        // Deep-link cached story with no coordinates: excluded from the feed.
        store.upsert_story(&story("orphan")).unwrap();

        let all = store.stories_after(None, 10).unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.short_id.as_str()).collect();
        assert_eq!(ids, vec!["p1_a", "p1_b", "p2_a", "p2_b"]);

        let rest = store.stories_after(Some((1, 1)), 10).unwrap();
        let ids: Vec<&str> = rest.iter().map(|s| s.short_id.as_str()).collect();
        assert_eq!(ids, vec!["p2_a", "p2_b"]);
    }

    #[test]
    fn test_stories_after_respects_limit() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_page(1, &[story("a"), story("b"), story("c")], &[])
            .unwrap();

        let window = store.stories_after(None, 2).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[1].short_id, "b");
    }

    #[test]
    fn test_upsert_and_get_user() {
        let store = SqliteStore::in_memory().unwrap();
        let mut u = user("alice");
        u.github_username = Some("alice-gh".into());
        store.upsert_user(&u).unwrap();

        let retrieved = store.get_user("alice").unwrap().unwrap();
        assert_eq!(retrieved.karma, 50);
        assert_eq!(retrieved.github_username, Some("alice-gh".into()));
        assert!(store.get_user("nobody").unwrap().is_none());
    }

    #[test]
    fn test_comments_ordered_by_index() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_comment(&comment("c_two", "abc123", 2)).unwrap();
        store.upsert_comment(&comment("c_zero", "abc123", 0)).unwrap();
        store.upsert_comment(&comment("c_one", "abc123", 1)).unwrap();

        let comments = store.comments_for_story("abc123").unwrap();
        let ids: Vec<&str> = comments.iter().map(|c| c.short_id.as_str()).collect();
        assert_eq!(ids, vec!["c_zero", "c_one", "c_two"]);
    }

    #[test]
    fn test_comments_after_window() {
        let store = SqliteStore::in_memory().unwrap();
        for i in 0..5 {
            store
                .upsert_comment(&comment(&format!("c{i}"), "abc123", i))
                .unwrap();
        }

        let first = store.comments_after("abc123", None, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].comment_index, 1);

        let next = store.comments_after("abc123", Some(1), 10).unwrap();
        assert_eq!(next.len(), 3);
        assert_eq!(next[0].comment_index, 2);
    }

    #[test]
    fn test_oldest_comment_inserted_at() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.oldest_comment_inserted_at("abc123").unwrap().is_none());

        let now = Utc::now();
        let mut old = comment("c_old", "abc123", 0);
        old.inserted_at = now - Duration::hours(3);
        let mut fresh = comment("c_new", "abc123", 1);
        fresh.inserted_at = now;
        store.upsert_comment(&old).unwrap();
        store.upsert_comment(&fresh).unwrap();

        let oldest = store.oldest_comment_inserted_at("abc123").unwrap().unwrap();
        assert!((oldest - (now - Duration::hours(3))).num_seconds().abs() < 1);
    }

    #[test]
    fn test_replace_story_comments_swaps_whole_set() {
        let store = SqliteStore::in_memory().unwrap();
        let s = story("abc123");
        store
            .replace_story_comments(
                &s,
                &[user("bob")],
                &[comment("c_a", "abc123", 0), comment("c_b", "abc123", 1)],
            )
            .unwrap();

        store
            .replace_story_comments(&s, &[user("bob")], &[comment("c_c", "abc123", 0)])
            .unwrap();

        let comments = store.comments_for_story("abc123").unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].short_id, "c_c");
    }

    #[test]
    fn test_replace_story_comments_preserves_page_coordinates() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_page(3, &[story("abc123")], &[]).unwrap();

        // Refetch via deep link: incoming story has no coordinates.
        let refetched = story("abc123");
        assert_eq!(refetched.page_coordinates(), None);
        store
            .replace_story_comments(&refetched, &[], &[comment("c_a", "abc123", 0)])
            .unwrap();

        let stored = store.get_story("abc123").unwrap().unwrap();
        assert_eq!(stored.page_coordinates(), Some((3, 0)));
    }

    #[test]
    fn test_replace_story_comments_does_not_touch_other_stories() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_comment(&comment("c_other", "other", 0))
            .unwrap();

        store
            .replace_story_comments(&story("abc123"), &[], &[comment("c_a", "abc123", 0)])
            .unwrap();

        assert_eq!(store.comments_for_story("other").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_comments_for_story() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_comment(&comment("c_a", "abc123", 0)).unwrap();
        store.upsert_comment(&comment("c_b", "abc123", 1)).unwrap();

        store.delete_comments_for_story("abc123").unwrap();
        assert!(store.comments_for_story("abc123").unwrap().is_empty());
        assert!(store.oldest_comment_inserted_at("abc123").unwrap().is_none());
    }

    #[test]
    fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidepool.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.upsert_story(&story("abc123")).unwrap();
        }

        let reopened = SqliteStore::new(&path).unwrap();
        assert!(reopened.get_story("abc123").unwrap().is_some());
    }
}
