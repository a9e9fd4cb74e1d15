// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of immich-stats.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! immich-stats - polls Immich server statistics and publishes them as sensors

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

use immich_stats_adapters::{HomeAssistantClient, HomeAssistantSink, ImmichClient};
use immich_stats_core::{
    CoordinatorEvent, EntitySink, LogSink, StatisticsCoordinator, StatisticsSensor,
    StatisticsSource, build_sensors, publish_to_sinks, render_states,
};

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "immich-stats", version, about = "Publish Immich server statistics as sensors")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "IMMICH_STATS_CONFIG")]
    config: Option<PathBuf>,

    /// Refresh once, publish, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Respects RUST_LOG environment variable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    info!("Starting immich-stats");
    info!("   Immich: {}", config.immich.url);
    info!("   Update interval: {}s", config.immich.update_interval_secs);
    info!(
        "   Home Assistant: {}",
        config
            .home_assistant
            .as_ref()
            .map_or("disabled", |ha| ha.base_url.as_str())
    );

    let source: Arc<dyn StatisticsSource> = Arc::new(ImmichClient::with_timeout(
        &config.immich.url,
        &config.immich.api_key,
        config.immich.request_timeout(),
    )?);
    if !source.health_check().await? {
        warn!("Immich server did not answer ping, trying statistics anyway");
    }

    let coordinator = Arc::new(StatisticsCoordinator::new(source, config.immich.update_interval()));
    let sensors = build_sensors(&coordinator);
    let sinks = build_sinks(&config).await?;

    coordinator.start().await?;
    publish_to_sinks(&sinks, &render_states(&coordinator, &sensors)).await;

    if args.once {
        return Ok(());
    }

    let publisher = spawn_publisher(coordinator.clone(), sensors, sinks);
    #[cfg(unix)]
    let manual_refresh = spawn_manual_refresh(coordinator.clone());

    coordinator.run(shutdown_signal()).await;

    publisher.abort();
    #[cfg(unix)]
    manual_refresh.abort();
    info!("Shutting down");
    Ok(())
}

async fn build_sinks(config: &AppConfig) -> Result<Vec<Arc<dyn EntitySink>>> {
    let mut sinks: Vec<Arc<dyn EntitySink>> = vec![Arc::new(LogSink)];

    if let Some(ha) = &config.home_assistant {
        let client = HomeAssistantClient::new(&ha.base_url, &ha.token)?;
        // Unreachable at startup is not fatal, publishing retries every cycle
        if !client.ping().await? {
            warn!("Home Assistant did not answer at {}", ha.base_url);
        }
        sinks.push(Arc::new(HomeAssistantSink::new(client)));
    }

    Ok(sinks)
}

/// Re-render and publish every sensor after each refresh cycle
fn spawn_publisher(
    coordinator: Arc<StatisticsCoordinator>,
    sensors: Vec<StatisticsSensor>,
    sinks: Vec<Arc<dyn EntitySink>>,
) -> JoinHandle<()> {
    let mut events = coordinator.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let CoordinatorEvent::Failed(e) = &event {
                        warn!(error = %e, "Publishing sensors as unavailable after failed update");
                    }
                    let states = render_states(&coordinator, &sensors);
                    publish_to_sinks(&sinks, &states).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Publisher lagged behind coordinator events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// SIGHUP requests an immediate refresh
#[cfg(unix)]
fn spawn_manual_refresh(coordinator: Arc<StatisticsCoordinator>) -> JoinHandle<()> {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                error!("Failed to install SIGHUP handler: {e}");
                return;
            }
        };

        while hangup.recv().await.is_some() {
            info!("SIGHUP received, refreshing statistics");
            // Outcome is logged and broadcast by the coordinator
            let _ = coordinator.refresh().await;
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl+C received"),
        () = terminate => info!("SIGTERM received"),
    }
}
