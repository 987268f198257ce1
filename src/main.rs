use clap::{Parser, Subcommand};
use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod config;
mod dashboard;
mod event_kind;
mod feed;
mod filter;
mod identity;
mod output;
mod repos;
mod sort;
mod status;
mod sync;
mod telemetry;
mod util;
mod view;

#[derive(Parser)]
#[command(name = "gitcast", about = "GitHub activity feed for Farcaster users")]
struct Cli {
    /// Feed service base URL (overrides GITCAST_BASE_URL)
    #[arg(global = true, long)]
    base_url: Option<String>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Feed(feed::FeedCmd),
    Repos(repos::ReposCmd),
    Dashboard(dashboard::DashboardCmd),
    Status(status::StatusCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // logs go to stderr; respects RUST_LOG and GITCAST_LOG_FORMAT
    telemetry::config::init_tracing();

    let mut cfg = config::ClientConfig::from_env();
    if let Some(base) = cli.base_url {
        cfg.base_url = base;
    }
    cfg.validate()?;

    let client = Arc::new(api::HttpFeedApi::new(&cfg)?);

    match cli.command {
        Commands::Feed(args) => feed::run(client, &cfg, args).await?,
        Commands::Repos(args) => repos::run(client.as_ref(), &identity::CliHost::default(), args).await?,
        Commands::Dashboard(args) => dashboard::run(client, &cfg, args).await?,
        Commands::Status(args) => status::run(client.as_ref(), &cfg, args).await?,
    }

    Ok(())
}
