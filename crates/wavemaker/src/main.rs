//! wavemaker - synthetic pod wave generator
//!
//! Repeatedly creates a labeled batch of placeholder pods, waits for them
//! to go ready, holds the wave for a configured duration, tears the batch
//! down, and starts over after a cooldown. Used to exercise autoscaling,
//! scheduling, and capacity behavior under controlled, repeatable load.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use kube::config::KubeConfigOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wavemaker_lib::{
    ExhaustionPolicy, KubeWorkloadClient, PollPolicy, ResourceRequests, WaveConfig, WaveController,
};

/// Synthetic pod wave generator
#[derive(Parser)]
#[command(name = "wavemaker")]
#[command(author, version, about = "Drives waves of placeholder pods to exercise autoscaling", long_about = None)]
struct Cli {
    /// Cooldown between the end of one wave and the next creation
    #[arg(long, env = "WAVEMAKER_INTERVAL", default_value = "1m", value_parser = humantime::parse_duration)]
    interval: Duration,

    /// How long to hold each wave at full scale
    #[arg(long, env = "WAVEMAKER_DURATION", default_value = "1m", value_parser = humantime::parse_duration)]
    duration: Duration,

    /// Number of pods to create per wave
    #[arg(long, env = "WAVEMAKER_COUNT", default_value_t = 100)]
    count: usize,

    /// Resource requests for wave pods, as comma-separated name=quantity pairs
    #[arg(long, env = "WAVEMAKER_REQUESTS", default_value = "cpu=100m,memory=100Mi")]
    requests: ResourceRequests,

    /// Namespace to create wave pods in
    #[arg(long, env = "WAVEMAKER_NAMESPACE", default_value = "default")]
    namespace: String,

    /// What to do when a readiness or termination poll runs out of attempts
    /// (proceed or fail-wave)
    #[arg(long, env = "WAVEMAKER_ON_POLL_EXHAUSTION", default_value = "proceed")]
    on_poll_exhaustion: ExhaustionPolicy,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!(
        count = cli.count,
        interval = %humantime::format_duration(cli.interval),
        duration = %humantime::format_duration(cli.duration),
        namespace = %cli.namespace,
        "starting wavemaker"
    );

    let client = kube_client().await?;
    // Blocks until the label-filtered pod cache has completed its initial
    // sync, so the first wave never races the background watch.
    let workloads = KubeWorkloadClient::new(client, &cli.namespace).await?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    let config = WaveConfig {
        count: cli.count,
        hold: cli.duration,
        interval: cli.interval,
        namespace: cli.namespace,
        requests: cli.requests,
        on_exhaustion: cli.on_poll_exhaustion,
    };
    let controller =
        WaveController::new(config, PollPolicy::default(), Arc::new(workloads), cancel);
    controller.run().await
}

/// Build a Kubernetes client from the local kubeconfig, falling back to the
/// in-cluster environment.
async fn kube_client() -> Result<kube::Client> {
    let config = match kube::Config::from_kubeconfig(&KubeConfigOptions::default()).await {
        Ok(config) => config,
        Err(kubeconfig_err) => match kube::Config::incluster() {
            Ok(config) => config,
            Err(in_cluster_err) => anyhow::bail!(
                "failed to infer kube config: kubeconfig ({kubeconfig_err}), in-cluster ({in_cluster_err})"
            ),
        },
    };
    kube::Client::try_from(config).context("building kube client")
}
