//! Grading server binary

use anyhow::Context;
use clap::{Parser, Subcommand};
use grading_scenario::ScenarioStore;
use grading_server::{router, AppState, LogFormat, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "grading-server")]
#[command(about = "Compensation grading scenario engine")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, env = "GRADING_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Override the configured log format
        #[arg(long, value_enum)]
        log_format: Option<LogFormat>,
    },
    /// Validate the configuration and data file, then exit
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_filter));
    let json = config.server.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::CheckConfig => {
            let store = ScenarioStore::from_config(config.engine.clone())
                .context("opening scenario store")?;
            println!(
                "configuration ok: bind {}, {} scenarios, current {}",
                config.server.bind,
                store.len(),
                store
                    .current()
                    .map_or_else(|| "none".to_string(), |s| s.id.to_string())
            );
            Ok(())
        }
        Command::Serve { bind, log_format } => {
            if let Some(bind) = bind {
                config = config.with_bind(bind);
            }
            if let Some(format) = log_format {
                config = config.with_log_format(format);
            }
            init_tracing(&config);
            serve(config).await
        }
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let store = ScenarioStore::from_config(config.engine.clone()).context("opening scenario store")?;
    let app = router(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    tracing::info!("grading server listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("shutting down");
        })
        .await
        .context("server error")
}
