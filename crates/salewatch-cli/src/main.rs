mod refresh;
mod unlisted;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "salewatch-cli")]
#[command(about = "Retailer sale monitor command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch every category once and rewrite the cached snapshots
    Refresh,
    /// Print discounted products missing from the retailer's sale page
    Unlisted {
        /// Show at most this many products, smallest discount first
        #[arg(long)]
        limit: Option<usize>,

        /// Print the products as a JSON array instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("salewatch-cli: use --help to list commands");
        return Ok(());
    };

    let config = salewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Refresh => refresh::run_refresh(&config).await,
        Commands::Unlisted { limit, json } => unlisted::run_unlisted(&config, limit, json).await,
    }
}
