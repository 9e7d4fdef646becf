use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use shadowlink::api;
use shadowlink::config::LoggingConfig;
use shadowlink::reconciler;
use shadowlink::shadow;
use shadowlink::Catalog;
use shadowlink::Config;
use shadowlink::Dispatcher;
use shadowlink::HttpGateway;
use shadowlink::LogLevel;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

/// Bridges voice directives to device shadows and the actuator gateway
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(default_value = "shadowlink.toml")]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

fn init_tracing(logging: &LoggingConfig, level_override: Option<LogLevel>) {
    let level = level_override.unwrap_or(logging.level);
    let filter = logging
        .overrides
        .iter()
        .fold(Targets::new().with_default(LevelFilter::from(level)), |targets, (target, level)| {
            targets.with_target(target.clone(), LevelFilter::from(*level))
        });

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)?;

    init_tracing(&config.logging, args.log_level);

    tracing::info!("shadowlink starting");
    tracing::info!("Loaded config from: {}", args.config.display());

    let appliances = config.appliances()?;
    let catalog = if appliances.is_empty() {
        tracing::info!("No appliances configured, using the built-in catalog");
        Catalog::builtin()?
    } else {
        Catalog::new(appliances)?
    };
    let catalog = Arc::new(catalog);
    tracing::info!("Catalog holds {} appliances", catalog.len());

    let (delta_tx, delta_rx) = mpsc::channel(shadow::DELTA_CHANNEL_SIZE);
    let store = shadow::connect(&config.shadow, delta_tx)
        .await
        .context("Failed to connect to the shadow store")?;

    let gateway = Arc::new(HttpGateway::new(&config.gateway)?);

    reconciler::reset_lights(&catalog, store.as_ref()).await;

    let dispatcher = Dispatcher::new(
        catalog.clone(),
        store.clone(),
        gateway.clone(),
        config.gateway.actuation_timeout(),
    );
    let dispatcher_task = tokio::spawn(dispatcher.run(delta_rx));

    let state = Arc::new(api::AppState::new(
        catalog,
        store,
        gateway,
        config.gateway.room.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server = tokio::spawn(async move {
        api::serve(&config.api.listen, config.api.port, state, shutdown_rx).await
    });

    tracing::info!("Press Ctrl+C to exit");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => tracing::info!("Received shutdown signal"),
                Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
            }
            shutdown_tx.send(()).ok();
            match server.await {
                Ok(Err(e)) => tracing::error!("HTTP API server error: {}", e),
                Err(e) => tracing::error!("HTTP API server task failed: {}", e),
                Ok(Ok(())) => {}
            }
        }
        result = dispatcher_task => {
            if let Err(e) = result {
                tracing::error!("Reconciler dispatcher failed: {}", e);
            }
            tracing::error!("Shadow store delta stream ended");
        }
    }

    tracing::info!("shadowlink shutdown complete");

    Ok(())
}
