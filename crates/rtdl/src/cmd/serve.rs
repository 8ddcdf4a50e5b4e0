//! Serve command - Run the stage server
//!
//! Loads the routing rules, builds the stage from configuration and serves
//! it over HTTP until Ctrl+C or SIGTERM. SIGHUP reloads the rules.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use rtdl_config::Config;
#[cfg(unix)]
use rtdl_pipeline::ControlHandler;
use rtdl_pipeline::StageFunction;
use rtdl_sinks::forwarder::producer_from_config;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::cmd::load_rule_store;
use crate::server::{AppState, build_router, is_routable_stage};

/// How long in-flight requests get to finish after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the serve command
pub async fn run(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        stage = %config.stage.name,
        "rtdl starting"
    );

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("rtdl shutdown complete");
    Ok(())
}

/// Main server run loop
async fn run_server(config: Config) -> Result<()> {
    ensure!(
        is_routable_stage(&config.stage.name),
        "stage name '{}' collides with a built-in route",
        config.stage.name
    );

    let cancel = CancellationToken::new();

    let rules = load_rule_store(&config)?;
    let snapshot = rules.snapshot();
    info!(
        source = %rules.describe(),
        rules = snapshot.len(),
        chained = snapshot.chained_count(),
        "routing rules loaded"
    );

    let producer = producer_from_config(&config.messaging);
    match &producer {
        Some(producer) => info!(kind = producer.kind(), endpoint = ?config.messaging.endpoint(), "messaging ready"),
        None => warn!("no messaging endpoint configured, forwards and publishing will fail"),
    }

    let stage = Arc::new(StageFunction::from_config_with_producer(
        &config,
        rules,
        producer.clone(),
    ));
    info!(
        stage = %stage.stage(),
        storage = stage.writer().store().kind(),
        root_prefix = ?config.storage.root_prefix(),
        cluster = %config.storage.cluster_url(),
        mask_pii = config.stage.mask_pii,
        "stage built"
    );

    #[cfg(unix)]
    let reload_task = spawn_reload_on_hangup(stage.control().clone(), cancel.clone());

    let app = build_router(
        AppState::new(Arc::clone(&stage), producer, &config),
        config.server.max_payload_size,
    )
    .layer(TraceLayer::new_for_http());

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, route = %format!("/{}", stage.stage()), "server listening");

    let server_cancel = cancel.clone();
    let server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_cancel.cancelled().await;
            })
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "HTTP server error");
            });
    });

    wait_for_shutdown().await;

    info!("shutdown signal received, stopping server...");
    cancel.cancel();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "server task panicked during shutdown"),
        Err(_) => warn!("server did not finish within timeout, continuing shutdown"),
    }

    #[cfg(unix)]
    reload_task.abort();

    let metrics = stage.metrics().snapshot();
    info!(
        received = metrics.events_received,
        writes_ok = metrics.writes_ok,
        writes_failed = metrics.writes_failed,
        forwards_ok = metrics.forwards_ok,
        forwards_failed = metrics.forwards_failed,
        "final stage counters"
    );

    Ok(())
}

/// Reload the routing rules on every SIGHUP
#[cfg(unix)]
fn spawn_reload_on_hangup(
    control: ControlHandler,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut sig = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
            Ok(sig) => sig,
            Err(e) => {
                error!(error = %e, "failed to install SIGHUP handler, rule reload by signal disabled");
                return;
            }
        };
        info!("SIGHUP handler installed for rule reload");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = sig.recv() => {
                    if received.is_none() {
                        break;
                    }
                    if let Some(summary) = control.reload().await {
                        info!(
                            loaded = summary.loaded,
                            skipped = summary.skipped,
                            generation = summary.generation,
                            "SIGHUP: reloaded routing rules"
                        );
                    }
                }
            }
        }
    })
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
