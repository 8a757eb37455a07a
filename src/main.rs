use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokenworth::config::{default_config_path, Config};
use tokenworth::fixture::Fixture;
use tokenworth::guard::{MemoryKeyValueCache, MemoryLockProvider};
use tokenworth::models::{ChainId, ChainScope};
use tokenworth::storage::MemoryValuationStore;
use tokenworth::valuation::ValuationService;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "tokenworth")]
#[command(about = "Token and NFT holdings valuation")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the resolved configuration
    Config,
    /// Value one address's current holdings
    Current {
        /// JSON fixture with holders, prices and NFT sales
        #[arg(long)]
        fixture: PathBuf,
        #[arg(long)]
        chain: String,
        #[arg(long)]
        address: String,
    },
    /// Run the daily valuation for a chain, or all chains merged
    Daily {
        #[arg(long)]
        fixture: PathBuf,
        /// Chain id; omit to merge every chain
        #[arg(long)]
        chain: Option<String>,
    },
}

fn build_service(fixture: &Fixture, config: Config, store: Arc<MemoryValuationStore>) -> ValuationService {
    ValuationService::new(
        Arc::new(fixture.holder_source()),
        Arc::new(fixture.price_oracle(&config.fiat_symbol)),
        Arc::new(fixture.nft_sale_source()),
        store,
        Arc::new(MemoryLockProvider::new()),
        Arc::new(MemoryKeyValueCache::new()),
        config,
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .json(),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = Config::load_or_default(&config_path)?;

    match cli.command {
        Command::Config => {
            println!("# Config file: {}", config_path.display());
            print!("{}", toml::to_string(&config).context("Failed to render config")?);
        }
        Command::Current {
            fixture,
            chain,
            address,
        } => {
            let fixture = Fixture::load(&fixture)?;
            let chain = ChainId::new(chain)?;
            let store = Arc::new(MemoryValuationStore::new());
            let service = build_service(&fixture, config, store);

            let valuation = service.compute_current(&chain, &address).await?;
            println!("{}", serde_json::to_string_pretty(&valuation)?);
        }
        Command::Daily { fixture, chain } => {
            let fixture = Fixture::load(&fixture)?;
            let scope = match chain {
                Some(chain) => ChainScope::Chain(ChainId::new(chain)?),
                None => ChainScope::All,
            };
            let store = Arc::new(MemoryValuationStore::new());
            let service = build_service(&fixture, config, store.clone());

            let outcome = service.compute_daily(scope).await?;
            let output = serde_json::json!({
                "outcome": outcome,
                "valuations": store.all().await,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
