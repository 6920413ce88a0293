//! CLI entry point for transit_heat.
//!
//! Provides subcommands for running a single heat invocation, serving the
//! live endpoint over HTTP, and inspecting which sites the hub list selects.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_heat::config::{HeatConfig, SourceKind};
use transit_heat::fetch::BasicClient;
use transit_heat::output::{print_json, write_json};
use transit_heat::pipeline::Pipeline;
use transit_heat::server;
use transit_heat::sources::DepartureBoardSource;

#[derive(Parser)]
#[command(name = "transit_heat")]
#[command(about = "Live transit heat maps as GeoJSON", long_about = None)]
struct Cli {
    /// JSON config file; defaults to the built-in Stockholm settings
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one invocation and write the FeatureCollection as JSON
    Heat {
        /// Override the configured source
        #[arg(short, long, value_enum)]
        source: Option<SourceKind>,

        /// Use N fabricated vehicle points instead of a live feed
        #[arg(long, value_name = "N")]
        mock: Option<usize>,

        /// Seed for --mock
        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// File to write instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Serve GET /api/live and GET /api/health
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1")]
        bind: String,

        #[arg(short, long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
    /// List the directory sites selected by the hub list
    ListHubs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_heat.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_heat.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = HeatConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Heat {
            source,
            mock,
            seed,
            output,
        } => {
            if let Some(source) = source {
                config.source = source;
                config.validate()?;
            }

            let pipeline = match mock {
                Some(count) => Pipeline::mock(&config, count, seed)?,
                None => Pipeline::with_default_client(&config)?,
            };
            info!(source = pipeline.source_name(), "Running heat invocation");

            let collection = pipeline
                .run_until(shutdown_signal())
                .await
                .context("heat invocation failed")?;

            match output {
                Some(path) => write_json(&path, &collection)?,
                None => print_json(&collection)?,
            }
            info!(features = collection.features.len(), "Heat written");
        }
        Commands::Serve { bind, port } => {
            config.require_credentials()?;
            server::serve(config, &bind, port).await?;
        }
        Commands::ListHubs => {
            list_hubs(&config).await?;
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Fetches the site directory and logs every hub match with its resolved
/// coordinate.
#[tracing::instrument(skip(config))]
async fn list_hubs(config: &HeatConfig) -> Result<()> {
    let client = BasicClient::with_timeouts(
        Duration::from_secs(config.http.timeout_secs),
        Duration::from_secs(config.http.connect_timeout_secs),
    )?;
    let source = DepartureBoardSource::new(
        client,
        config.departures.clone(),
        config.region.bbox,
        config.http.retry,
    );

    let hubs = source.hubs().await?;
    let bbox = config.region.bbox;

    for site in &hubs {
        match site.coordinate {
            Some(c) => info!(
                site_id = %site.id,
                name = %site.name,
                lon = c.lon,
                lat = c.lat,
                in_region = bbox.contains(c.lon, c.lat),
                "Hub"
            ),
            None => info!(site_id = %site.id, name = %site.name, "Hub without coordinate"),
        }
    }

    let usable = hubs
        .iter()
        .filter(|s| s.coordinate.is_some_and(|c| bbox.contains(c.lon, c.lat)))
        .count();
    info!(
        hub_names = config.departures.hubs.len(),
        matched = hubs.len(),
        usable,
        "Hub list summary"
    );

    Ok(())
}
