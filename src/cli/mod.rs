pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tidepool")]
#[command(about = "An offline-first Lobste.rs reader", long_about = None)]
pub struct Cli {
    /// Database path (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the front-page feed
    Front {
        /// Number of paging windows to load
        #[arg(short = 'n', long, default_value_t = 1)]
        pages: u32,

        /// Refetch the pages from the network before displaying
        #[arg(long)]
        refresh: bool,
    },
    /// Show a story and its comment tree
    Story {
        /// Story short ID (the part after /s/ in the URL)
        short_id: String,

        /// Refetch even if the cached comments are fresh
        #[arg(long)]
        force: bool,
    },
    /// Show a cached user profile
    User {
        username: String,
    },
    /// List cached stories
    List,
    /// Open a story's link in the browser
    Open {
        short_id: String,
    },
}
