use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tidepool::app::AppContext;
use tidepool::cli::{commands, Cli, Commands};
use tidepool::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(cli.db, config)?;

    match cli.command {
        Commands::Front { pages, refresh } => {
            commands::front(&ctx, pages, refresh).await?;
        }
        Commands::Story { short_id, force } => {
            commands::story(&ctx, &short_id, force).await?;
        }
        Commands::User { username } => {
            commands::user(&ctx, &username)?;
        }
        Commands::List => {
            commands::list(&ctx)?;
        }
        Commands::Open { short_id } => {
            commands::open_story(&ctx, &short_id)?;
        }
    }

    Ok(())
}
