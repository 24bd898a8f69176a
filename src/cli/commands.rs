use chrono::{Duration, Utc};

use crate::app::{AppContext, Result, TidepoolError};
use crate::domain::Visibility;
use crate::paging::{FrontPagePager, LoadState};
use crate::repo::RefreshOutcome;

/// Accounts younger than this get a "new user" marker.
const NEW_USER_DAYS: i64 = 70;

pub async fn front(ctx: &AppContext, pages: u32, refresh: bool) -> Result<()> {
    if refresh {
        for page in 1..=pages {
            ctx.stories.refresh_page(page).await?;
        }
    }

    let mut pager = FrontPagePager::new(ctx.stories.clone(), ctx.config.page_size);
    let mut rank = 1;

    for _ in 0..pages {
        let window = pager.load_next().await?;
        if window.is_empty() {
            break;
        }
        for story in window {
            println!(
                "{:>3}. [{:>3}] {} ({})",
                rank,
                story.score,
                story.title,
                story.tags.join(", ")
            );
            println!(
                "            {} comments · by {} · {}",
                story.comment_count, story.username, story.short_id
            );
            rank += 1;
        }
    }

    if pager.state() == LoadState::Exhausted {
        println!("(end of feed)");
    }

    Ok(())
}

pub async fn story(ctx: &AppContext, short_id: &str, force: bool) -> Result<()> {
    match ctx.comments.fetch_comments(short_id, force).await {
        Ok(RefreshOutcome::Gone) => {
            // The server no longer has it; the cache may still.
            if ctx.comments.story(short_id)?.is_none() {
                return Err(TidepoolError::StoryNotFound(short_id.to_string()));
            }
            eprintln!("Story gone from server, showing cached copy");
        }
        Ok(_) => {}
        Err(e) => {
            // Offline-friendly: fall back to whatever the cache holds.
            if ctx.comments.story(short_id)?.is_none() {
                return Err(e);
            }
            eprintln!("Refresh failed ({e}), showing cached copy");
        }
    }

    let story = ctx
        .comments
        .story(short_id)?
        .ok_or_else(|| TidepoolError::StoryNotFound(short_id.to_string()))?;

    println!("{} [{}]", story.title, story.score);
    println!("{}", story.link_url(&ctx.base_url));
    println!(
        "by {} · {} · {}",
        story.username,
        story.created_at.format("%Y-%m-%d"),
        story.tags.join(", ")
    );
    if !story.description.is_empty() {
        println!("\n{}", html_to_text(&story.description));
    }

    let comments = ctx.comments.comments(short_id)?;
    println!("\n{} comments", comments.len());

    for comment in comments {
        if ctx.comments.visibility(&comment.short_id) == Visibility::Gone {
            continue;
        }

        let indent = "  ".repeat(comment.indent_level.saturating_sub(1) as usize);
        println!("\n{}{} · {} points", indent, comment.username, comment.score);

        if ctx.comments.visibility(&comment.short_id) == Visibility::Compact {
            println!("{indent}[collapsed]");
            continue;
        }

        let body = if comment.is_deleted {
            "[deleted]".to_string()
        } else if comment.is_moderated {
            "[moderated]".to_string()
        } else {
            html_to_text(&comment.comment)
        };
        for line in body.lines() {
            println!("{indent}{line}");
        }
    }

    Ok(())
}

pub fn user(ctx: &AppContext, username: &str) -> Result<()> {
    use crate::store::Store;

    let Some(user) = ctx.store.get_user(username)? else {
        println!("{username} is not cached yet; view one of their stories first");
        return Ok(());
    };

    let new_marker = if user.is_new(Utc::now(), Duration::days(NEW_USER_DAYS)) {
        " (new user)"
    } else {
        ""
    };
    let mut flags = Vec::new();
    if user.is_admin {
        flags.push("admin");
    }
    if user.is_moderator {
        flags.push("moderator");
    }

    println!("{}{}", user.username, new_marker);
    println!(
        "karma {} · joined {}",
        user.karma,
        user.created_at.format("%Y-%m-%d")
    );
    if !flags.is_empty() {
        println!("{}", flags.join(", "));
    }
    if let Some(inviter) = &user.invited_by_user {
        println!("invited by {inviter}");
    }
    if let Some(github) = &user.github_username {
        println!("github: {github}");
    }
    if let Some(twitter) = &user.twitter_username {
        println!("twitter: {twitter}");
    }
    if let Some(avatar) = user.avatar_url(&ctx.base_url) {
        println!("avatar: {avatar}");
    }
    if !user.about.is_empty() {
        println!("\n{}", html_to_text(&user.about));
    }

    Ok(())
}

pub fn list(ctx: &AppContext) -> Result<()> {
    use crate::store::Store;

    let stories = ctx.store.stories_after(None, 10_000)?;
    if stories.is_empty() {
        println!("No cached stories; run `tidepool front` first");
        return Ok(());
    }

    for story in &stories {
        println!(
            "{}  {} ({} comments)",
            story.short_id, story.title, story.comment_count
        );
    }
    println!("\n{} cached stories", ctx.store.story_count()?);

    Ok(())
}

pub fn open_story(ctx: &AppContext, short_id: &str) -> Result<()> {
    use crate::store::Store;

    let story = ctx
        .store
        .get_story(short_id)?
        .ok_or_else(|| TidepoolError::StoryNotFound(short_id.to_string()))?;

    let url = story.link_url(&ctx.base_url);
    println!("Opening {url}");
    open::that(&url)?;
    Ok(())
}

/// Flatten comment/description HTML into terminal text: paragraph and line
/// break tags become newlines, remaining tags are dropped, entities decoded.
fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        text.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find('>') {
            Some(end) => {
                let tag = &tail[1..end];
                let name = tag
                    .trim_start_matches('/')
                    .split(|c: char| c == ' ' || c == '/')
                    .next()
                    .unwrap_or("");
                if matches!(name, "p" | "br" | "blockquote" | "li" | "pre") {
                    if !text.ends_with('\n') && !text.is_empty() {
                        text.push('\n');
                    }
                }
                rest = &tail[end + 1..];
            }
            None => {
                // Unterminated tag, keep the rest verbatim.
                text.push_str(tail);
                rest = "";
            }
        }
    }
    text.push_str(rest);

    html_escape::decode_html_entities(text.trim()).to_string()
}
