//! # Tidepool
//!
//! An offline-first terminal reader for [Lobste.rs](https://lobste.rs).
//!
//! ## Architecture
//!
//! ```text
//! Api → Repositories → Store
//!          ↑
//!        Pagers → CLI
//! ```
//!
//! - [`api`]: JSON client for the Lobste.rs endpoints
//! - [`store`]: SQLite cache of stories, users, and comments
//! - [`repo`]: caching policy (page bookkeeping, comment TTL, transactional refresh)
//! - [`paging`]: cursor-based incremental loaders deciding cache vs. network
//! - [`cli`]: command-line interface
//!
//! ## Quick Start
//!
//! ```bash
//! # Read the front page
//! tidepool front
//!
//! # Read a story's comments (cached for an hour)
//! tidepool story ztm5yh
//!
//! # Open a story in the browser
//! tidepool open ztm5yh
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires together the store, API client,
/// and repositories by explicit construction.
pub mod app;

/// Remote API: the [`LobstersApi`](api::LobstersApi) trait, wire models,
/// and the reqwest-based [`HttpClient`](api::HttpClient).
///
/// Failures are typed [`ApiError`](api::ApiError) values; a missing story
/// is an empty result, not an error.
pub mod api;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/tidepool/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Story`](domain::Story): front-page entries with optional page coordinates
/// - [`Comment`](domain::Comment): HTML bodies ordered by server index
/// - [`User`](domain::User): profiles, denormalized onto stories and comments
pub mod domain;

/// Cursor-based incremental loading.
///
/// [`FrontPagePager`](paging::FrontPagePager) and
/// [`CommentsPager`](paging::CommentsPager) decide at each load boundary
/// whether the cache suffices or a network page must be fetched.
pub mod paging;

/// Repositories owning the caching policy.
///
/// - [`StoryRepository`](repo::StoryRepository): front-page writes with page bookkeeping
/// - [`CommentsRepository`](repo::CommentsRepository): one-hour TTL,
///   all-or-nothing comment refresh
pub mod repo;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait defining cache operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
