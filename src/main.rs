//! crowdroute - live crowd density estimation and congestion-aware routing
//!
//! Continuously estimates crowd density per monitored zone and routes
//! between venue nodes using the live estimates as edge-cost multipliers.
//!
//! Module structure:
//! - `domain/` - Core types (DensitySample, VenueGraph, identifiers)
//! - `io/` - External interfaces (frame sources, density egress)
//! - `services/` - Business logic (workers, snapshot store, router)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use crowdroute::domain::VenueGraph;
use crowdroute::infra::config::CameraSpec;
use crowdroute::infra::{Config, Metrics};
use crowdroute::io::camera::FrameSource;
use crowdroute::io::{create_egress_channel, DensityEgress, DotEstimator, SyntheticCamera};
use crowdroute::services::{
    DensityClassifier, OccupancyEstimator, PathFinder, SnapshotStore, ZoneWorker,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// crowdroute - crowd-aware venue routing service
#[derive(Parser, Debug)]
#[command(name = "crowdroute", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

/// Open a camera's frame source; failure is fatal only for that worker
fn build_source(camera: &CameraSpec, config: &Config) -> anyhow::Result<Box<dyn FrameSource>> {
    match camera.kind.as_str() {
        "synthetic" => Ok(Box::new(SyntheticCamera::new(
            config.frame_width(),
            config.frame_height(),
            camera.subjects,
            camera.zone.0 as u64,
        ))),
        other => anyhow::bail!("unsupported camera kind '{other}'"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("crowdroute starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        interval_ms = %config.interval_ms(),
        crowd_threshold = %config.crowd_threshold(),
        cameras = %config.cameras().len(),
        origin = %config.route_origin(),
        destination = %config.route_destination(),
        "config_loaded"
    );

    // Graph problems are fatal at startup, not at query time
    let graph = Arc::new(VenueGraph::new(
        config.graph_nodes(),
        config.graph_edges(),
        config.node_zones(),
    )?);

    let monitored: HashSet<_> = config.cameras().iter().map(|c| c.zone).collect();
    for zone in graph.zones() {
        if !monitored.contains(&zone) {
            warn!(zone = %zone, "zone_unmonitored_costs_as_normal");
        }
    }
    let routed: HashSet<_> = graph.zones().collect();
    for camera in config.cameras() {
        if !routed.contains(&camera.zone) {
            warn!(zone = %camera.zone, name = %camera.name, "camera_zone_not_on_graph");
        }
    }

    let store = Arc::new(SnapshotStore::new(config.cameras().iter().map(|c| c.zone)));
    let metrics = Arc::new(Metrics::new());

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Density egress writer (stops once all worker senders drop)
    let (egress_sender, egress_rx) = create_egress_channel(1000);
    let egress_handle = tokio::spawn(DensityEgress::new(config.egress_file()).run(egress_rx));

    // Start one estimation worker per camera
    let classifier = DensityClassifier::new(config.crowd_threshold());
    let estimator: Arc<dyn OccupancyEstimator> = Arc::new(DotEstimator::default());
    let mut worker_handles = Vec::new();

    for camera in config.cameras() {
        let source = match build_source(camera, &config) {
            Ok(source) => source,
            Err(e) => {
                error!(
                    zone = %camera.zone,
                    name = %camera.name,
                    error = %e,
                    "camera_open_failed_worker_skipped"
                );
                continue;
            }
        };

        let worker = ZoneWorker::new(
            camera.zone,
            camera.name.clone(),
            source,
            estimator.clone(),
            classifier,
            store.clone(),
            metrics.clone(),
            Duration::from_millis(config.interval_ms()),
        )
        .with_egress(egress_sender.clone());

        worker_handles.push(tokio::spawn(worker.run(shutdown_rx.clone())));
    }
    // Writer exits when the last worker drops its sender
    drop(egress_sender);

    if worker_handles.is_empty() {
        warn!("no_workers_started_routing_defaults_normal");
    }

    // Start metrics reporter (lock-free reads with full summary)
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Periodic route report between the configured endpoints, standing in
    // for the out-of-scope presentation layer
    let finder = PathFinder::new(graph.clone(), store.clone());
    let (origin, destination) = (config.route_origin(), config.route_destination());
    let report_interval = config.route_report_interval_secs();
    let route_metrics = metrics.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(report_interval));
        loop {
            interval.tick().await;
            match finder.route(origin, destination) {
                Ok(Some(route)) => {
                    route_metrics.record_route_ok();
                    let path: Vec<u32> = route.nodes.iter().map(|n| n.0).collect();
                    info!(
                        origin = %origin,
                        destination = %destination,
                        path = ?path,
                        cost = %format!("{:.1}", route.total_cost),
                        "route_report"
                    );
                }
                Ok(None) => {
                    route_metrics.record_route_no_path();
                    warn!(origin = %origin, destination = %destination, "route_unreachable");
                }
                Err(e) => {
                    route_metrics.record_route_invalid();
                    warn!(error = %e, "route_query_invalid");
                }
            }
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown_signal_received");
    let _ = shutdown_tx.send(true);

    for handle in worker_handles {
        let _ = handle.await;
    }
    egress_handle.await.ok();

    info!("crowdroute shutdown complete");
    Ok(())
}
