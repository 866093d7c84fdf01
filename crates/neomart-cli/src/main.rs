mod intake;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use neomart_core::{load_store_directory, ShippingType, StoreDirectory};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "neomart")]
#[command(about = "NeoMart order intake command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse order text and print the resulting order as JSON
    Parse {
        /// Order text file (reads stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Parse order text and submit it to the order-intake endpoint
    Submit {
        /// Order text file (reads stdin when omitted)
        file: Option<PathBuf>,
        /// Extra attempts on network or 5xx failures (defaults to NEOMART_SUBMIT_MAX_RETRIES)
        #[arg(long)]
        retries: Option<u32>,
        /// Print the order that would be sent without sending it
        #[arg(long)]
        dry_run: bool,
    },
    /// Prepare a cart for checkout and submit the resulting orders
    Checkout {
        /// Cart JSON file: `{ "customer": {...}, "items": [...] }`
        cart: PathBuf,
        /// `fast` (one order per store) or `unified` (one order)
        #[arg(long)]
        shipping: ShippingType,
        /// Print the prepared orders without sending them
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = neomart_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let stores = match &config.stores_path {
        Some(path) => load_store_directory(path)?,
        None => StoreDirectory::default(),
    };
    tracing::debug!(env = %config.env, stores = stores.len(), "configuration loaded");

    match cli.command {
        Commands::Parse { file } => intake::run_parse(&config, stores, file.as_deref()),
        Commands::Submit {
            file,
            retries,
            dry_run,
        } => intake::run_submit(&config, stores, file.as_deref(), retries, dry_run).await,
        Commands::Checkout {
            cart,
            shipping,
            dry_run,
        } => intake::run_checkout(&config, stores, &cart, shipping, dry_run).await,
    }
}
