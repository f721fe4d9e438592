//! # Pillgraph Server
//!
//! Backend for the medication label scanner.
//!
//! Provides:
//! - REST API (Axum) for label scanning, fragment merging, entity lookups,
//!   fuzzy effect search, and full-graph reads for the visualization frontend
//! - Vision-language extraction of label photos (Gemini or any
//!   OpenAI-compatible provider)
//! - JSON snapshot persistence of the knowledge graph
//!
//! # CLI Usage
//!
//! ```bash
//! # Start server with default config
//! pillgraph_server
//!
//! # Start server with custom config file
//! pillgraph_server --config pillgraph.toml
//!
//! # Generate example config file with inline documentation
//! pillgraph_server --init-config
//!
//! # Override specific settings via env vars
//! PILLGRAPH_SERVER_PORT=9000 pillgraph_server
//! ```

use std::sync::Arc;

use clap::Parser;

use pillgraph_config::PillgraphConfig;
use pillgraph_core::GraphStore;
use pillgraph_server::router::build_router;
use pillgraph_server::state::AppState;
use pillgraph_server::vision;

/// Pillgraph medication scanner backend.
#[derive(Parser, Debug)]
#[command(name = "pillgraph_server")]
#[command(about = "Pillgraph backend — label scanning into a medication knowledge graph")]
#[command(version)]
struct Cli {
    /// Path to pillgraph.toml config file.
    /// Can also be set via PILLGRAPH_CONFIG env var.
    #[arg(short, long, env = "PILLGRAPH_CONFIG")]
    config: Option<String>,

    /// Generate an example pillgraph.toml config file with documentation and exit.
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle --init-config: print example config and exit.
    if cli.init_config {
        print!("{}", PillgraphConfig::example_toml_commented());
        return Ok(());
    }

    // Load configuration from file or defaults, then apply env var overrides.
    let config = if let Some(path) = &cli.config {
        PillgraphConfig::from_file(path)?
    } else {
        let mut cfg = PillgraphConfig::default();
        cfg.apply_env_overrides();
        cfg.validate()?;
        cfg
    };

    init_tracing(&config);

    tracing::info!(
        "Pillgraph server starting on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!(
        "Snapshot: {}, vision provider: {} (model: {})",
        config.storage.snapshot_path,
        config.vision.provider,
        config.vision.model
    );

    // Initialize the graph store (fails open on a missing/corrupt snapshot)
    // and the vision provider (absent when no API key is configured).
    let store = Arc::new(GraphStore::open(&config.storage.snapshot_path));
    let vision_client = vision::build_client(&config.vision);

    let state = Arc::new(AppState::new(store, vision_client, config.clone()));
    let app = build_router(state)?;

    // Bind and serve.
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize the tracing subscriber from the `[server]` log settings.
fn init_tracing(config: &PillgraphConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));
    if config.server.log_format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
