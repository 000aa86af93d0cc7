//! kws: stream Kafka topics to WebSocket clients.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml
//!       │
//!       ▼
//!  ┌──────────┐   ListenerDefinition per address
//!  │ routing  │──────────────┬──────────────────────┐
//!  │  table   │              ▼                      ▼
//!  └──────────┘      ┌──────────────┐       ┌──────────────┐
//!                    │ listener :80 │  ...  │ listener :N  │
//!                    └──────┬───────┘       └──────────────┘
//!        GET /test ─────────┤ test page + static assets
//!        GET /ws (upgrade) ─┤
//!                           ▼
//!                    ┌──────────────┐  events  ┌─────────┐
//!   client ◀─binary──│    bridge    │◀─────────│  Kafka  │
//!          ──close──▶│ pump/detector│          │consumer │
//!                    └──────────────┘          └─────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::task::JoinSet;

use kws::bridge::{ConsumerFactory, KafkaConsumerFactory};
use kws::config::{load_config, write_default_config};
use kws::http::AssetSource;
use kws::lifecycle::wait_for_interrupt;
use kws::observability::{logging, metrics};
use kws::{build_listeners, ListenerServer, RELEASE_TAG, VERSION};

#[derive(Parser)]
#[command(name = "kws")]
#[command(about = "Streams Kafka topics to WebSocket clients", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Config file location
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Create initial config file
    #[arg(long)]
    init: bool,

    /// Print product version
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Serve test page assets from this directory instead of the embedded copy
    #[arg(long)]
    assets_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("kws {} ({})", VERSION, RELEASE_TAG);
        return ExitCode::SUCCESS;
    }

    if cli.init {
        return match write_default_config(&cli.config) {
            Ok(()) => {
                println!("Config file {} successfully created.", cli.config.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            eprintln!("kws: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let document = load_config(&cli.config)?;
    logging::init_logging(&document.observability.log_level);

    tracing::info!(
        version = VERSION,
        config = %cli.config.display(),
        schema_version = %document.schema_version,
        endpoints = document.endpoints.len(),
        "kws starting"
    );

    let listeners = build_listeners(&document)?;

    if document.observability.metrics_enabled {
        metrics::init_metrics(document.observability.metrics_address.parse()?)?;
    }

    let assets = match cli.assets_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "Serving assets from disk");
            AssetSource::Directory(dir)
        }
        None => AssetSource::Embedded,
    };
    let factory: Arc<dyn ConsumerFactory> = Arc::new(KafkaConsumerFactory);

    let mut servers = JoinSet::new();
    for definition in listeners {
        tracing::info!(
            address = %definition.address,
            tls = definition.is_tls(),
            test_pages = ?definition.test_pages.keys().collect::<Vec<_>>(),
            websockets = ?definition.websockets.keys().collect::<Vec<_>>(),
            "Listener configured"
        );
        let server = ListenerServer::new(definition, Arc::clone(&factory), assets.clone());
        servers.spawn(server.run());
    }

    // Any listener ending is fatal; an interrupt ends the process without
    // draining connections.
    tokio::select! {
        res = wait_for_interrupt() => res?,
        Some(joined) = servers.join_next() => {
            joined??;
            return Err("listener stopped unexpectedly".into());
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
