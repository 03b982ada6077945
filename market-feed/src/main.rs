use anyhow::Context;
use market_feed::{CatalogSource, FeedConfig, FeedServer, JsonFileCatalog};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        r#"Market Feed - simulated market data over WebSocket

USAGE:
    market-feed [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --catalog <PATH>    Instrument catalog file (overrides config)
    --help              Print this help message

ENVIRONMENT VARIABLES:
    HOST                Server host (default: 0.0.0.0)
    PORT                Server port (default: 8080)
    MAX_ROWS            Instruments listed and mutated (default: 100)
    REFRESH_RATE_MS     Tick interval in milliseconds (default: 500)
    CATALOG_PATH        Instrument catalog file (default: data/items.json)
    RUST_LOG            Log level filter

EXAMPLES:
    # Run with defaults
    market-feed

    # Run with config file
    market-feed --config config.json

    # Faster ticks on a custom port
    PORT=9000 REFRESH_RATE_MS=100 market-feed
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_feed=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut catalog_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            flag @ ("--config" | "-c" | "--catalog") => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: {} requires a path argument", flag);
                    std::process::exit(1);
                }
                if flag == "--catalog" {
                    catalog_path = Some(args[i].clone());
                } else {
                    config_path = Some(args[i].clone());
                }
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            FeedConfig::from_file(&path)
                .with_context(|| format!("loading configuration from {}", path))?
        }
        None => {
            tracing::info!("Using default configuration");
            FeedConfig::default()
        }
    };
    config
        .apply_env()
        .context("applying environment overrides")?;
    if let Some(path) = catalog_path {
        config.catalog_path = path;
    }

    let catalog = JsonFileCatalog::new(&config.catalog_path)
        .load()
        .with_context(|| format!("loading catalog from {}", config.catalog_path))?;

    tracing::info!("Starting {}", config.name);
    tracing::info!("Instruments: {}", catalog.len());
    tracing::info!("Max rows: {}", config.max_rows);
    tracing::info!("Refresh rate: {}ms", config.refresh_rate_ms);
    tracing::info!(
        "WebSocket: ws://{}:{}{}",
        config.server.host,
        config.server.port,
        config.server.ws_path
    );

    let server = FeedServer::new(config, catalog);
    server.run().await.context("market feed stopped")?;

    Ok(())
}
