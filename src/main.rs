use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod config;

use cli::{Cli, Command};
use config::DashboardConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = DashboardConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Annotate(args) => commands::annotate(&config, args),
        Command::Recognize(args) => commands::recognize(&config, args).await,
        Command::Live(args) => commands::live(&config, args).await,
        Command::History { limit } => commands::history(&config, *limit).await,
        Command::Watchlist { action } => commands::watchlist(&config, action).await,
    }
}
