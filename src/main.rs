use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use protected_assets::client::{self, AssetClient};
use protected_assets::config::{self, AppState};
use protected_assets::{logger, server};

/// Environment variable holding a JSON asset map for `fetch --asset`
const ASSET_MAP_ENV: &str = "ASSET_MAP";

#[derive(Parser)]
#[command(name = "protected-assets")]
#[command(about = "Serve files from a protected directory over HTTP")]
#[command(version)]
struct Cli {
    /// Configuration file path without extension
    #[arg(long, default_value = "config")]
    config: String,

    /// Override `assets.root`
    #[arg(long)]
    root: Option<String>,

    /// Override `server.port`
    #[arg(long)]
    port: Option<u16>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one asset from a running server
    Fetch {
        /// Query endpoint of the server
        #[arg(long, default_value = "http://127.0.0.1:3000/api/protected-asset")]
        server: String,

        /// Authorization token; defaults to SECRET_TOKEN
        #[arg(long)]
        token: Option<String>,

        /// Logical asset name to resolve through the asset map
        #[arg(long, conflicts_with = "path")]
        asset: Option<String>,

        /// Asset path relative to the server's root
        #[arg(required_unless_present = "asset")]
        path: Option<String>,

        /// Write the body here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut cfg = config::Config::load_from(&cli.config)?;
    if let Some(root) = cli.root {
        cfg.assets.root = root;
    }
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }

    if cli.print_config {
        print!("{}", cfg.to_toml()?);
        return Ok(());
    }

    // Build the runtime with `server.workers` threads, or one per core
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    match cli.command {
        Some(Command::Fetch {
            server,
            token,
            asset,
            path,
            output,
        }) => runtime.block_on(run_fetch(server, token, asset, path, output)),
        None => runtime.block_on(async_main(cfg)),
    }
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&cfg)?;

    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(AppState::new(&cfg)?);
    if !state.asset_root.path().is_dir() {
        logger::log_warning(&format!(
            "Asset root {} is not a directory; every asset request will fail",
            state.asset_root.path().display()
        ));
    }

    let listener = server::create_listener(addr)?;
    let bound = listener.local_addr()?;
    logger::log_server_start(&bound, &cfg, state.asset_root.path());

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals))?;

    server::start_server_loop(listener, state, Arc::clone(&signals.shutdown)).await?;
    logger::log_info("Server stopped");
    Ok(())
}

async fn run_fetch(
    endpoint: String,
    token: Option<String>,
    asset: Option<String>,
    path: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut asset_client = AssetClient::new(endpoint)?;

    let token = token.or_else(|| {
        std::env::var(config::SECRET_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
    });
    if let Some(token) = token {
        asset_client = asset_client.with_token(token);
    }
    if let Ok(raw_map) = std::env::var(ASSET_MAP_ENV) {
        asset_client = asset_client.with_asset_map(client::parse_asset_map(&raw_map)?);
    }

    let path = match (asset, path) {
        (Some(logical_name), _) => asset_client.mapped_asset_path(&logical_name)?,
        (None, Some(path)) => path,
        (None, None) => return Err("an asset path or --asset is required".into()),
    };

    let body = if path.to_ascii_lowercase().ends_with(".json") {
        let value = asset_client.fetch_json(&path).await?;
        serde_json::to_vec_pretty(&value)?.into()
    } else {
        asset_client.fetch_asset(&path).await?
    };

    match output {
        Some(file) => tokio::fs::write(&file, &body).await?,
        None => std::io::stdout().lock().write_all(&body)?,
    }
    Ok(())
}
