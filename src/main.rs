// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

use anyhow::Result;
use authgate::{
    adapter::ResourceAdapter,
    config::Settings,
    constants::TOKIO_WORKER_THREADS,
    context::Context,
    metrics::serve_metrics,
    proxy::directory::ServiceReplicaDirectory,
    proxy::routes::{serve_proxy, ProxyState},
    proxy::scatter::ScatterGather,
    reconciler::Reconciler,
    watch::run_watch,
};
use clap::Parser;
use kube::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("authgate-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let settings = Settings::parse();

    // Initialize logging with custom format
    // Format: timestamp file:line LEVEL message
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug cargo run
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json cargo run
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting authgate controller");
    debug!(?settings, "Parsed settings");

    // Initialize Kubernetes client
    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    let adapter = ResourceAdapter::new(client);

    // One namespace list up front; if the service account cannot see the
    // cluster there is no point starting the watch.
    match adapter.probe_access().await {
        Ok(count) => debug!(namespaces = count, "Cluster access verified"),
        Err(e) => {
            error!(error = %e, "Cannot access the cluster API, aborting");
            return Err(e.into());
        }
    }

    let ctx = Arc::new(Context::new(adapter.clone(), settings.clone()));
    let reconciler = Reconciler::new(Arc::clone(&ctx));

    let proxy_state = Arc::new(ProxyState {
        resolver: Arc::new(ServiceReplicaDirectory::new(adapter)),
        scatter: ScatterGather::new()?,
        cluster_domain: settings.cluster_domain.clone(),
    });

    info!("Starting controller tasks");

    // Tasks should never exit - if one does, log it and exit the process
    tokio::select! {
        result = run_watch(Arc::clone(&ctx), reconciler) => {
            error!("CRITICAL: watch loop exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("watch loop exited unexpectedly without error")
        }
        result = run_proxy(proxy_state, &settings) => {
            error!("CRITICAL: management proxy exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("management proxy exited unexpectedly without error")
        }
        result = serve_metrics(&settings.metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
    }
}

/// Run the management proxy, or park forever when it is disabled so the
/// select! supervision treats "disabled" as "healthy".
async fn run_proxy(state: Arc<ProxyState>, settings: &Settings) -> Result<()> {
    if settings.disable_proxy {
        info!("Management proxy disabled");
        futures::future::pending::<()>().await;
        unreachable!()
    }
    serve_proxy(state, &settings.proxy_addr).await
}
