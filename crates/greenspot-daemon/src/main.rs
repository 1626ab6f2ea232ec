//! greenspot daemon
//!
//! Serves placement decisions, time-shift plans and eviction simulations
//! over HTTP.

use anyhow::Context;
use clap::Parser;
use greenspot_api::create_router;
use greenspot_core::{
    CarbonSourceKind, LoggingConfig, OrchestratorConfig, PriceSourceKind, WeatherSourceKind,
};
use greenspot_scheduler::DecisionEngine;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// greenspot daemon - carbon- and price-aware spot GPU placement
#[derive(Parser, Debug)]
#[command(name = "greenspotd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Address to bind the API server
    #[arg(long)]
    address: Option<String>,

    /// Port for the REST API server
    #[arg(long)]
    port: Option<u16>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format: text or json
    #[arg(long)]
    log_format: Option<String>,

    /// Use catalog prices, static weather and modelled carbon only
    #[arg(long)]
    offline: bool,
}

fn apply_overrides(config: &mut OrchestratorConfig, args: &Args) {
    if let Some(address) = &args.address {
        config.api.rest_address = address.clone();
    }
    if let Some(port) = args.port {
        config.api.rest_port = port;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &args.log_format {
        config.logging.format = format.clone();
    }
    if args.offline {
        config.signals.price_source = PriceSourceKind::Catalog;
        config.signals.weather_source = WeatherSourceKind::Static;
        config.signals.carbon_source = CarbonSourceKind::Model;
    }
}

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("invalid log level '{}'", logging.level))?;

    let writer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer);

    match logging.format.as_str() {
        "json" => tracing::subscriber::set_global_default(builder.json().finish()),
        _ => tracing::subscriber::set_global_default(builder.finish()),
    }
    .context("failed to set tracing subscriber")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => OrchestratorConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => OrchestratorConfig::default(),
    };
    apply_overrides(&mut config, &args);

    init_logging(&config.logging)?;

    info!("Starting greenspot daemon v{}", env!("CARGO_PKG_VERSION"));

    let engine = Arc::new(DecisionEngine::from_config(config.clone())?);
    info!(
        price = ?config.signals.price_source,
        weather = ?config.signals.weather_source,
        carbon = ?config.signals.carbon_source,
        regions = engine.regions_monitored().len(),
        "Decision engine ready"
    );

    let router = create_router(engine, &config.api);

    let addr: SocketAddr = format!("{}:{}", config.api.rest_address, config.api.rest_port)
        .parse()
        .context("invalid listen address")?;

    info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::try_parse_from(["greenspotd"]).unwrap();
        let mut config = OrchestratorConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.api.rest_port, 8787);
        assert_eq!(config.signals.price_source, PriceSourceKind::Catalog);
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "greenspotd",
            "--port",
            "9999",
            "--address",
            "127.0.0.1",
            "--log-format",
            "json",
            "--offline",
        ])
        .unwrap();
        let mut config = OrchestratorConfig::default();
        config.signals.weather_source = WeatherSourceKind::OpenMeteo;
        apply_overrides(&mut config, &args);

        assert_eq!(config.api.rest_port, 9999);
        assert_eq!(config.api.rest_address, "127.0.0.1");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.signals.weather_source, WeatherSourceKind::Static);
        assert_eq!(config.signals.carbon_source, CarbonSourceKind::Model);
    }
}
